//! rmcp-opencharts: MCP tools for ECMWF OpenCharts weather charts.
//!
//! Three tools are exposed: `list_products`, `get_available_times` and
//! `fetch_chart`. Charts are re-encoded as JPEG under a byte budget unless the
//! client is built with [`ImageMode::PassThrough`].

pub mod catalog;
pub mod client;
pub mod error;
pub mod fit;
pub mod query;
pub mod response;
pub mod server;

pub use catalog::{Product, ProductId};
pub use client::{ChartImage, ImageMode, OpenChartsClient, Timeouts};
pub use error::{ChartError, ChartResult};
pub use fit::{FitConfig, FittedImage};
pub use response::ValidTimes;
pub use server::OpenChartsServer;
