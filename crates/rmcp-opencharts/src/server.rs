use base64::{engine::general_purpose::STANDARD, Engine as _};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters, ServerHandler},
    model::*,
    ErrorData as McpError,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::catalog::{self, ParameterFilter, Product, ProductId, RangeFilter};
use crate::client::{ChartImage, OpenChartsClient};
use crate::response::ValidTimes;

// Tool parameter structs
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListProductsParams {
    #[schemars(description = "Filter by forecast range: 'medium', 'sub-seasonal' or 'all' (default)")]
    #[serde(default)]
    pub filter_range: RangeFilter,
    #[schemars(description = "Filter by parameter: 'temperature', 'wind', 'geopotential' or 'all' (default)")]
    #[serde(default)]
    pub filter_parameter: ParameterFilter,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AvailableTimesParams {
    #[schemars(description = "Product identifier")]
    pub product_id: ProductId,
    #[schemars(description = "Base time in ISO format (YYYY-MM-DDTHH:MM:SSZ)")]
    pub base_time: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FetchChartParams {
    #[schemars(description = "Product identifier")]
    pub product_id: ProductId,
    #[schemars(description = "Base time in ISO format (YYYY-MM-DDTHH:MM:SSZ). Use latest available date.")]
    pub base_time: String,
    #[schemars(description = "Valid time in ISO format (YYYY-MM-DDTHH:MM:SSZ). Must be available for the product.")]
    pub valid_time: String,
}

#[derive(Debug, Clone)]
pub struct OpenChartsServer {
    pub tool_router: ToolRouter<Self>,
    client: OpenChartsClient,
}

impl Default for OpenChartsServer {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenChartsServer {
    pub fn new() -> Self {
        Self::with_client(OpenChartsClient::new())
    }

    pub fn with_client(client: OpenChartsClient) -> Self {
        Self {
            tool_router: Self::tool_router(),
            client,
        }
    }
}

pub fn format_products(products: &[&Product]) -> String {
    let mut result = String::from("# ECMWF OpenCharts Products\n\n");

    if products.is_empty() {
        result.push_str("No products match the given filters.\n");
    }

    for p in products {
        result.push_str(&format!("## {}\n", p.id));
        result.push_str(&format!("- Name: {}\n", p.name));
        result.push_str(&format!("- Range: {}\n", p.range.as_str()));
        result.push_str(&format!("- Type: {}\n", p.kind.as_str()));
        result.push_str(&format!("- Parameters: {}\n\n", p.parameter_list()));
    }

    result
}

pub fn format_times(product: ProductId, times: &ValidTimes) -> String {
    match times {
        ValidTimes::Available(times) => {
            let mut result = format!("Available valid times for {}:\n\n", product);
            for t in times {
                result.push_str(&format!("- {}\n", t));
            }
            result
        }
        ValidTimes::Undetermined => {
            format!("Could not determine available times for {}", product)
        }
    }
}

pub fn format_chart_metadata(params: &FetchChartParams, chart: &ChartImage) -> String {
    let product = catalog::get(params.product_id);
    let dimensions = chart
        .dimensions
        .map(|(w, h)| format!("{}x{}", w, h))
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "# ECMWF Chart: {}\n\
         \n\
         **Product ID:** {}\n\
         **Range:** {}\n\
         **Parameters:** {}\n\
         \n\
         **Base time:** {}\n\
         **Valid time:** {}\n\
         \n\
         **Image URL:** {}\n\
         **Original size:** {} bytes\n\
         **Compressed size:** {} bytes\n\
         **Dimensions:** {}\n",
        catalog::display_name(params.product_id),
        params.product_id,
        product.map(|p| p.range.as_str()).unwrap_or("N/A"),
        product.map(|p| p.parameter_list()).unwrap_or_default(),
        params.base_time,
        params.valid_time,
        chart.url,
        chart.original_size,
        chart.final_size(),
        dimensions
    )
}

#[rmcp::tool_router]
impl OpenChartsServer {
    #[rmcp::tool(description = "List all available ECMWF chart products with descriptions")]
    pub async fn list_products(
        &self,
        Parameters(params): Parameters<ListProductsParams>,
    ) -> Result<CallToolResult, McpError> {
        let products = catalog::list(params.filter_range, params.filter_parameter);
        Ok(CallToolResult::success(vec![Content::text(format_products(&products))]))
    }

    #[rmcp::tool(description = "Get available valid times for a product and base time (makes API call to check)")]
    pub async fn get_available_times(
        &self,
        Parameters(params): Parameters<AvailableTimesParams>,
    ) -> Result<CallToolResult, McpError> {
        let output = match self
            .client
            .available_times(params.product_id, &params.base_time)
            .await
        {
            Ok(times) => format_times(params.product_id, &times),
            Err(e) => {
                tracing::warn!(product = %params.product_id, "valid time lookup failed: {}", e);
                e.to_string()
            }
        };

        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    #[rmcp::tool(description = "Fetch weather chart from ECMWF OpenCharts API. Returns chart image and metadata.")]
    pub async fn fetch_chart(
        &self,
        Parameters(params): Parameters<FetchChartParams>,
    ) -> Result<CallToolResult, McpError> {
        let chart = match self
            .client
            .fetch_chart(params.product_id, &params.base_time, &params.valid_time)
            .await
        {
            Ok(chart) => chart,
            Err(e) => {
                tracing::warn!(product = %params.product_id, "chart fetch failed: {}", e);
                return Ok(CallToolResult::success(vec![Content::text(e.to_string())]));
            }
        };

        let metadata = format_chart_metadata(&params, &chart);
        Ok(CallToolResult::success(vec![
            Content::text(metadata),
            Content::image(STANDARD.encode(&chart.data), chart.mime_type),
        ]))
    }
}

#[rmcp::tool_handler]
impl ServerHandler for OpenChartsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "ECMWF OpenCharts weather charts. Use list_products to pick a product, \
                 get_available_times to find valid times for a base time, then fetch_chart."
                    .into(),
            ),
        }
    }
}
