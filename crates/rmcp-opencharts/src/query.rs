//! Builds OpenCharts API requests from a product and a pair of times.

use crate::catalog::ProductId;

pub const OPENCHARTS_API: &str = "https://charts.ecmwf.int/opencharts-api/v1";

/// Valid time far outside any forecast. The API rejects it and lists the
/// valid times it does serve in the error body.
pub const SENTINEL_VALID_TIME: &str = "2099-01-01T00:00:00Z";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    pub url: String,
    pub params: [(&'static str, String); 2],
}

pub fn build_request(
    api_base: &str,
    product: ProductId,
    base_time: &str,
    valid_time: &str,
) -> ChartRequest {
    ChartRequest {
        url: format!("{}/products/{}/", api_base.trim_end_matches('/'), product),
        params: [
            ("base_time", base_time.to_string()),
            ("valid_time", valid_time.to_string()),
        ],
    }
}

pub fn build_times_request(api_base: &str, product: ProductId, base_time: &str) -> ChartRequest {
    build_request(api_base, product, base_time, SENTINEL_VALID_TIME)
}
