//! WebP output encoder.
//!
//! Decoded images are re-encoded as lossy WebP at the configured quality.
//!
//! # Design Decisions
//!
//! - **Lossy only**: Output is always lossy WebP. Pixel-exact round trips are
//!   not expected, only perceptual equivalence at the configured quality.
//!
//! - **Alpha preserved**: Sources with an alpha channel are encoded from RGBA,
//!   everything else from RGB.
//!
//! - **Deterministic**: The same pixels at the same quality always encode to
//!   the same bytes, so a cleared cache rebuilds identical artifacts.

use bytes::Bytes;
use image::DynamicImage;

use crate::error::CodecError;

/// Default WebP quality (0-100).
pub const DEFAULT_QUALITY: u8 = 80;

/// Minimum allowed WebP quality.
pub const MIN_QUALITY: u8 = 0;

/// Maximum allowed WebP quality.
pub const MAX_QUALITY: u8 = 100;

// =============================================================================
// WebP Encoder
// =============================================================================

/// Lossy WebP encoder bound to a single quality level.
///
/// # Example
///
/// ```ignore
/// use nimage::codec::{decode, SourceFormat, WebpEncoder};
///
/// let encoder = WebpEncoder::new(80);
/// let img = decode(SourceFormat::Jpeg, &jpeg_bytes)?;
/// let webp = encoder.encode(&img)?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct WebpEncoder {
    quality: u8,
}

impl Default for WebpEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY)
    }
}

impl WebpEncoder {
    /// Create an encoder. Out-of-range quality is clamped to 0-100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: clamp_quality(quality),
        }
    }

    /// Quality this encoder was configured with.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode a decoded image as lossy WebP.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if libwebp rejects the image (for
    /// example, dimensions beyond the WebP limit of 16383 pixels).
    pub fn encode(&self, img: &DynamicImage) -> Result<Bytes, CodecError> {
        let (width, height) = (img.width(), img.height());
        let quality = f32::from(self.quality);

        let encoded = if img.color().has_alpha() {
            let rgba = img.to_rgba8();
            webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_simple(false, quality)
        } else {
            let rgb = img.to_rgb8();
            webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_simple(false, quality)
        };

        let encoded = encoded.map_err(|e| CodecError::Encode {
            message: format!("{:?} ({}x{})", e, width, height),
        })?;

        Ok(Bytes::copy_from_slice(&encoded))
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Validate WebP quality parameter.
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    quality <= MAX_QUALITY
}

/// Clamp quality to the valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_QUALITY, MAX_QUALITY)
}
