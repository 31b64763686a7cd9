//! Re-encodes chart images so they fit an MCP client's payload limit.
//!
//! Quality is lowered first and pixels are only dropped once the quality
//! floor is reached, since chart legibility suffers more from lost resolution
//! than from JPEG artifacts in this range.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, DynamicImage, RgbImage};
use thiserror::Error;

/// 700 KiB leaves headroom for base64 inflation under a 1 MB client limit.
pub const DEFAULT_MAX_BYTES: usize = 700 * 1024;
pub const DEFAULT_MAX_DIMENSION: u32 = 1400;

const START_QUALITY: u8 = 85;
const QUALITY_STEP: u8 = 10;
const MIN_QUALITY: u8 = 30;

const SHRINK_FACTOR: f64 = 0.7;
const SHRINK_QUALITY: u8 = 60;
const MIN_SHRINK_SIDE: u32 = 400;

#[derive(Debug, Error)]
pub enum FitError {
    #[error("could not decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("could not encode image: {0}")]
    Encode(#[source] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitConfig {
    pub max_bytes: usize,
    pub max_dimension: u32,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FittedImage {
    /// JPEG bytes of the smallest accepted encoding attempt.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

impl FittedImage {
    pub fn within(&self, config: &FitConfig) -> bool {
        self.data.len() <= config.max_bytes
    }
}

/// Decodes `raw` and re-encodes it as JPEG, shrinking until it fits
/// `config.max_bytes` or the smaller side reaches the 400 px floor.
///
/// Running out of budget is not an error: the smallest attempt is returned.
pub fn fit(raw: &[u8], config: &FitConfig) -> Result<FittedImage, FitError> {
    fit_observed(raw, config, |_| {})
}

/// Like [`fit`], calling `observe` with every accepted attempt. An attempt is
/// only accepted if it is no larger than the one before it.
fn fit_observed(
    raw: &[u8],
    config: &FitConfig,
    mut observe: impl FnMut(&FittedImage),
) -> Result<FittedImage, FitError> {
    let decoded = image::load_from_memory(raw).map_err(FitError::Decode)?;
    let decoded = clamp_dimension(decoded, config.max_dimension);
    let mut rgb = flatten(decoded);

    let mut best = encode_jpeg(&rgb, START_QUALITY)?;
    observe(&best);

    let mut quality = START_QUALITY;
    while best.data.len() > config.max_bytes && quality >= MIN_QUALITY + QUALITY_STEP {
        quality -= QUALITY_STEP;
        let attempt = encode_jpeg(&rgb, quality)?;
        tracing::debug!(quality, size = attempt.data.len(), "re-encoded chart");
        if attempt.data.len() <= best.data.len() {
            best = attempt;
            observe(&best);
        }
    }

    while best.data.len() > config.max_bytes && rgb.width().min(rgb.height()) > MIN_SHRINK_SIDE {
        let width = scale(rgb.width(), SHRINK_FACTOR);
        let height = scale(rgb.height(), SHRINK_FACTOR);
        rgb = imageops::resize(&rgb, width, height, FilterType::Lanczos3);

        let mut attempt = encode_jpeg(&rgb, SHRINK_QUALITY)?;
        // quality 60 can outgrow a floor-quality encode of the larger image
        if attempt.data.len() > best.data.len() && best.quality < SHRINK_QUALITY {
            attempt = encode_jpeg(&rgb, best.quality)?;
        }
        tracing::debug!(width, height, size = attempt.data.len(), "shrunk chart");
        if attempt.data.len() > best.data.len() {
            break;
        }
        best = attempt;
        observe(&best);
    }

    if best.data.len() > config.max_bytes {
        tracing::warn!(
            size = best.data.len(),
            max = config.max_bytes,
            "chart still over budget at minimum size"
        );
    }

    Ok(best)
}

/// Scales the image down so its longer side is exactly `max_dimension`.
fn clamp_dimension(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    let longer = width.max(height);
    if longer <= max_dimension {
        return img;
    }

    let ratio = max_dimension as f64 / longer as f64;
    let (width, height) = if width >= height {
        (max_dimension, scale(height, ratio))
    } else {
        (scale(width, ratio), max_dimension)
    };
    tracing::debug!(width, height, "downscaling chart");
    img.resize_exact(width, height, FilterType::Lanczos3)
}

/// JPEG has no alpha or palette, so everything is encoded from RGB.
fn flatten(img: DynamicImage) -> RgbImage {
    if img.color().has_alpha() {
        tracing::debug!(color = ?img.color(), "dropping alpha channel");
    }
    img.into_rgb8()
}

fn scale(side: u32, factor: f64) -> u32 {
    ((side as f64 * factor) as u32).max(1)
}

fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<FittedImage, FitError> {
    let mut data = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut data, quality);
    encoder
        .encode(img.as_raw(), img.width(), img.height(), ColorType::Rgb8)
        .map_err(FitError::Encode)?;
    Ok(FittedImage {
        data,
        width: img.width(),
        height: img.height(),
        quality,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::png::PngEncoder;
    use image::{ImageEncoder, Rgba, RgbaImage};

    fn png(img: &RgbaImage) -> Vec<u8> {
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(img.as_raw(), img.width(), img.height(), ColorType::Rgba8)
            .unwrap();
        out
    }

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        })
    }

    fn noise(width: u32, height: u32) -> RgbaImage {
        let mut state: u32 = 0x9e37_79b9;
        RgbaImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgba([r, g, b, 200])
        })
    }

    #[test]
    fn small_chart_is_encoded_at_start_quality() {
        let raw = png(&gradient(300, 200));
        let config = FitConfig::default();
        let fitted = fit(&raw, &config).unwrap();

        assert_eq!((fitted.width, fitted.height), (300, 200));
        assert_eq!(fitted.quality, START_QUALITY);
        assert!(fitted.within(&config));
        assert_eq!(image::guess_format(&fitted.data).unwrap(), image::ImageFormat::Jpeg);
    }

    #[test]
    fn longer_side_is_clamped_preserving_aspect() {
        let raw = png(&gradient(1000, 500));
        let config = FitConfig {
            max_bytes: DEFAULT_MAX_BYTES,
            max_dimension: 400,
        };
        let fitted = fit(&raw, &config).unwrap();
        assert_eq!((fitted.width, fitted.height), (400, 200));

        let raw = png(&gradient(300, 900));
        let fitted = fit(&raw, &config).unwrap();
        assert_eq!((fitted.width, fitted.height), (133, 400));
    }

    #[test]
    fn alpha_input_is_flattened() {
        let raw = png(&noise(64, 64));
        let fitted = fit(&raw, &FitConfig::default()).unwrap();
        let decoded = image::load_from_memory(&fitted.data).unwrap();
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn quality_drops_before_dimensions() {
        let raw = png(&noise(500, 500));
        let at_start = fit(
            &raw,
            &FitConfig {
                max_bytes: usize::MAX,
                max_dimension: 1400,
            },
        )
        .unwrap();

        let config = FitConfig {
            max_bytes: at_start.data.len() - 1,
            max_dimension: 1400,
        };
        let fitted = fit(&raw, &config).unwrap();
        assert!(fitted.quality < START_QUALITY);
        assert_eq!((fitted.width, fitted.height), (500, 500));
        assert!(fitted.within(&config));
    }

    #[test]
    fn impossible_budget_returns_best_effort() {
        let raw = png(&noise(900, 700));
        let config = FitConfig {
            max_bytes: 1,
            max_dimension: 800,
        };
        let fitted = fit(&raw, &config).unwrap();

        assert!(!fitted.within(&config));
        assert!(fitted.width.max(fitted.height) <= 800);
        assert!(fitted.width.min(fitted.height) <= MIN_SHRINK_SIDE);
        assert!(fitted.quality <= SHRINK_QUALITY);
        let decoded = image::load_from_memory(&fitted.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (fitted.width, fitted.height));
    }

    #[test]
    fn attempt_sizes_never_increase() {
        let config = FitConfig {
            max_bytes: 1,
            max_dimension: 800,
        };
        for raw in [png(&noise(900, 700)), png(&gradient(1000, 900))] {
            let mut attempts = Vec::new();
            let fitted = fit_observed(&raw, &config, |a| {
                attempts.push((a.data.len(), a.quality, a.width, a.height))
            })
            .unwrap();

            assert!(attempts.len() >= 2, "{:?}", attempts);
            for pair in attempts.windows(2) {
                assert!(pair[1].0 <= pair[0].0, "size grew: {:?}", attempts);
            }
            let last = attempts.last().unwrap();
            assert_eq!(
                *last,
                (fitted.data.len(), fitted.quality, fitted.width, fitted.height)
            );
        }
    }

    #[test]
    fn garbage_input_is_a_decode_error() {
        assert!(matches!(
            fit(b"definitely not an image", &FitConfig::default()),
            Err(FitError::Decode(_))
        ));
    }
}
