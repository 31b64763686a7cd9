use thiserror::Error;

use crate::fit::FitError;

/// Failure of a chart or available-times lookup.
///
/// The `Display` output is what the calling agent sees, so every variant
/// starts with a fixed prefix it can match on.
#[derive(Debug, Error)]
pub enum ChartError {
    /// Non-200 from the products endpoint, carrying `error[0]` of the body.
    #[error("Error: {0}")]
    Upstream(String),

    #[error("Error: No image link found in response")]
    MissingLink,

    #[error("Error downloading image: {0}")]
    ImageDownload(u16),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Error: invalid response body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("Error: {0}")]
    Image(#[from] FitError),

    #[error("Error: {0}")]
    Other(String),
}

pub type ChartResult<T> = Result<T, ChartError>;
