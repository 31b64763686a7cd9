//! ecmwf-charts - ECMWF OpenCharts weather charts for AI assistants
//!
//! Serves on stdio by default, or on streamable HTTP at `/mcp` when a port is
//! given (`--port` or `PORT`).

use axum::Router;
use clap::Parser;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::StreamableHttpService;
use rmcp::{transport::stdio, ServiceExt};
use rmcp_opencharts::fit::{DEFAULT_MAX_BYTES, DEFAULT_MAX_DIMENSION};
use rmcp_opencharts::query::OPENCHARTS_API;
use rmcp_opencharts::{FitConfig, ImageMode, OpenChartsClient, OpenChartsServer};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "ecmwf-charts", version, about)]
struct Cli {
    /// Serve streamable HTTP on this port instead of stdio
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Address to bind the HTTP transport to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Return charts exactly as downloaded instead of re-encoding them
    #[arg(long)]
    passthrough: bool,

    /// Byte budget for re-encoded charts
    #[arg(long, default_value_t = DEFAULT_MAX_BYTES)]
    max_bytes: usize,

    /// Longest allowed side of re-encoded charts, in pixels
    #[arg(long, default_value_t = DEFAULT_MAX_DIMENSION, value_parser = clap::value_parser!(u32).range(1..))]
    max_dimension: u32,

    /// OpenCharts API base URL
    #[arg(long, default_value = OPENCHARTS_API)]
    api_url: String,
}

impl Cli {
    fn image_mode(&self) -> ImageMode {
        if self.passthrough {
            ImageMode::PassThrough
        } else {
            ImageMode::Fitted(FitConfig {
                max_bytes: self.max_bytes,
                max_dimension: self.max_dimension,
            })
        }
    }

    fn server(&self) -> OpenChartsServer {
        let client = OpenChartsClient::new()
            .with_api_base(self.api_url.clone())
            .with_image_mode(self.image_mode());
        OpenChartsServer::with_client(client)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (to stderr so it doesn't interfere with stdio transport)
    tracing_subscriber::registry()
        .with(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let server = cli.server();

    match cli.port {
        Some(port) => serve_http(server, &cli.host, port).await?,
        None => {
            tracing::info!(mode = ?cli.image_mode(), "ecmwf-charts starting on stdio");
            let service = server.serve(stdio()).await?;
            service.waiting().await?;
        }
    }

    tracing::info!("ecmwf-charts stopped");
    Ok(())
}

/// `RUST_LOG` directives when set and valid, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

async fn bind(host: &str, port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind((host, port)).await
}

async fn serve_http(server: OpenChartsServer, host: &str, port: u16) -> anyhow::Result<()> {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let router = Router::new().nest_service("/mcp", service);

    let listener = bind(host, port).await?;
    tracing::info!("ecmwf-charts serving at http://{}/mcp", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_directives_are_kept() {
        assert_eq!(log_filter(Some("debug")).to_string(), "debug");
        assert_eq!(
            log_filter(Some("rmcp_opencharts=debug")).to_string(),
            "rmcp_opencharts=debug"
        );
    }

    #[test]
    fn log_filter_defaults_to_info() {
        assert_eq!(log_filter(None).to_string(), "info");
    }

    #[test]
    fn zero_max_dimension_is_rejected() {
        assert!(Cli::try_parse_from(["ecmwf-charts", "--max-dimension", "0"]).is_err());

        let cli = Cli::try_parse_from(["ecmwf-charts", "--max-dimension", "1"]).unwrap();
        assert_eq!(
            cli.image_mode(),
            ImageMode::Fitted(FitConfig {
                max_bytes: DEFAULT_MAX_BYTES,
                max_dimension: 1,
            })
        );
    }

    #[tokio::test]
    async fn binds_host_names() {
        let listener = bind("localhost", 0).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }
}
