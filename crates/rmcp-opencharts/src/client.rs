use std::io::Cursor;
use std::time::Duration;

use reqwest::StatusCode;

use crate::catalog::ProductId;
use crate::error::{ChartError, ChartResult};
use crate::fit::{self, FitConfig};
use crate::query::{self, ChartRequest, OPENCHARTS_API};
use crate::response::{self, ValidTimes};

const USER_AGENT: &str = concat!("rmcp-opencharts/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Available-times lookup.
    pub times: Duration,
    /// Chart metadata and image download, each.
    pub fetch: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            times: Duration::from_secs(10),
            fetch: Duration::from_secs(30),
        }
    }
}

/// What to do with downloaded chart bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMode {
    /// Return the upstream bytes untouched.
    PassThrough,
    /// Re-encode as JPEG within the given budget.
    Fitted(FitConfig),
}

impl Default for ImageMode {
    fn default() -> Self {
        ImageMode::Fitted(FitConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct ChartImage {
    pub url: String,
    pub data: Vec<u8>,
    pub mime_type: &'static str,
    pub original_size: usize,
    pub dimensions: Option<(u32, u32)>,
}

impl ChartImage {
    pub fn final_size(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Clone)]
pub struct OpenChartsClient {
    http: reqwest::Client,
    api_base: String,
    timeouts: Timeouts,
    image_mode: ImageMode,
}

impl Default for OpenChartsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenChartsClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: OPENCHARTS_API.to_string(),
            timeouts: Timeouts::default(),
            image_mode: ImageMode::default(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_image_mode(mut self, image_mode: ImageMode) -> Self {
        self.image_mode = image_mode;
        self
    }

    pub fn image_mode(&self) -> ImageMode {
        self.image_mode
    }

    async fn get(&self, request: &ChartRequest, timeout: Duration) -> ChartResult<(StatusCode, Vec<u8>)> {
        tracing::debug!(url = %request.url, params = ?request.params, "requesting chart metadata");

        let response = self
            .http
            .get(&request.url)
            .query(&request.params[..])
            .header("User-Agent", USER_AGENT)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        Ok((status, body.to_vec()))
    }

    /// Asks the API for a far-future valid time and reads the valid times
    /// out of the rejection.
    pub async fn available_times(&self, product: ProductId, base_time: &str) -> ChartResult<ValidTimes> {
        let request = query::build_times_request(&self.api_base, product, base_time);
        let (status, body) = self.get(&request, self.timeouts.times).await?;

        let times = response::rejected_valid_times(status.as_u16(), &body);
        if times == ValidTimes::Undetermined {
            tracing::info!(%product, base_time, status = status.as_u16(), "could not determine valid times");
        }
        Ok(times)
    }

    pub async fn fetch_chart(
        &self,
        product: ProductId,
        base_time: &str,
        valid_time: &str,
    ) -> ChartResult<ChartImage> {
        let request = query::build_request(&self.api_base, product, base_time, valid_time);
        let (status, body) = self.get(&request, self.timeouts.fetch).await?;

        if status != StatusCode::OK {
            let err = response::upstream_failure(&body);
            tracing::warn!(%product, status = status.as_u16(), "chart request rejected: {}", err);
            return Err(err);
        }

        let url = response::image_link(&body)?;
        let raw = self.download(&url).await?;
        let original_size = raw.len();

        let chart = match self.image_mode {
            ImageMode::PassThrough => ChartImage {
                mime_type: sniff_mime(&raw),
                dimensions: read_dimensions(&raw),
                url,
                data: raw,
                original_size,
            },
            ImageMode::Fitted(config) => {
                let fitted = tokio::task::spawn_blocking(move || fit::fit(&raw, &config))
                    .await
                    .map_err(|e| ChartError::Other(format!("image task failed: {}", e)))??;
                ChartImage {
                    url,
                    mime_type: "image/jpeg",
                    dimensions: Some((fitted.width, fitted.height)),
                    data: fitted.data,
                    original_size,
                }
            }
        };

        tracing::info!(
            %product,
            original = chart.original_size,
            final_size = chart.final_size(),
            "fetched chart"
        );
        Ok(chart)
    }

    async fn download(&self, url: &str) -> ChartResult<Vec<u8>> {
        tracing::debug!(url, "downloading chart image");

        let response = self
            .http
            .get(url)
            .header("User-Agent", USER_AGENT)
            .timeout(self.timeouts.fetch)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(ChartError::ImageDownload(response.status().as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

fn sniff_mime(data: &[u8]) -> &'static str {
    match image::guess_format(data) {
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        Ok(image::ImageFormat::Gif) => "image/gif",
        Ok(image::ImageFormat::WebP) => "image/webp",
        _ => "image/png",
    }
}

fn read_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_defaults_to_png() {
        assert_eq!(sniff_mime(b"\x89PNG\r\n\x1a\n...."), "image/png");
        assert_eq!(sniff_mime(b"\xff\xd8\xff\xe0...."), "image/jpeg");
        assert_eq!(sniff_mime(b"GIF89a...."), "image/gif");
        assert_eq!(sniff_mime(b"???"), "image/png");
    }

    #[test]
    fn unreadable_bytes_have_no_dimensions() {
        assert_eq!(read_dimensions(b"not an image"), None);
    }

    #[test]
    fn defaults_point_at_opencharts() {
        let client = OpenChartsClient::new();
        assert_eq!(client.api_base, OPENCHARTS_API);
        assert_eq!(client.timeouts.times, Duration::from_secs(10));
        assert_eq!(client.timeouts.fetch, Duration::from_secs(30));
        assert_eq!(client.image_mode(), ImageMode::Fitted(FitConfig::default()));
    }
}
