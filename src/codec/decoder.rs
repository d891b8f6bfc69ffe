//! Source image decoding.
//!
//! Supported source encodings form a closed set ([`SourceFormat`]). Each one
//! has exactly one entry in the decoder table; dispatch goes through
//! [`dispatch`] on the sniffed [`ContentType`] and never falls through to a
//! default decoder.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, ImageReader, ImageResult};

use crate::error::CodecError;
use crate::format::ContentType;

/// Decoder entry point shared by every table entry.
pub type DecodeFn = fn(&[u8]) -> ImageResult<DynamicImage>;

// =============================================================================
// SourceFormat
// =============================================================================

/// Encodings that are decoded and re-encoded to WebP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Jpeg,
    Png,
}

impl SourceFormat {
    /// Every supported source format.
    pub const ALL: [SourceFormat; 2] = [SourceFormat::Jpeg, SourceFormat::Png];

    /// Map a sniffed content type to a source format.
    pub const fn from_content_type(content_type: ContentType) -> Option<Self> {
        match content_type {
            ContentType::Jpeg => Some(SourceFormat::Jpeg),
            ContentType::Png => Some(SourceFormat::Png),
            _ => None,
        }
    }

    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "JPEG",
            SourceFormat::Png => "PNG",
        }
    }
}

/// Decoder table: one entry per [`SourceFormat`].
const DECODERS: &[(SourceFormat, DecodeFn)] = &[
    (SourceFormat::Jpeg, decode_jpeg),
    (SourceFormat::Png, decode_png),
];

fn decode_jpeg(data: &[u8]) -> ImageResult<DynamicImage> {
    ImageReader::with_format(Cursor::new(data), ImageFormat::Jpeg).decode()
}

fn decode_png(data: &[u8]) -> ImageResult<DynamicImage> {
    ImageReader::with_format(Cursor::new(data), ImageFormat::Png).decode()
}

/// Look up the registered decoder for a format.
pub fn decoder_for(format: SourceFormat) -> Option<DecodeFn> {
    DECODERS
        .iter()
        .find(|(registered, _)| *registered == format)
        .map(|(_, decode)| *decode)
}

// =============================================================================
// Dispatch
// =============================================================================

/// What the pipeline should do with an original of a given content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Decode with the given format's decoder, then encode to WebP
    Convert(SourceFormat),

    /// Original is already WebP; serve it unchanged
    PassThrough,
}

/// Decide how to handle an original based on its sniffed content type.
///
/// # Errors
///
/// Returns [`CodecError::UnsupportedFormat`] for anything that is neither a
/// supported source format nor WebP.
pub fn dispatch(content_type: ContentType) -> Result<Dispatch, CodecError> {
    if content_type == ContentType::Webp {
        return Ok(Dispatch::PassThrough);
    }

    SourceFormat::from_content_type(content_type)
        .map(Dispatch::Convert)
        .ok_or_else(|| CodecError::UnsupportedFormat {
            content_type: content_type.mime().to_string(),
        })
}

/// Decode an original with the registered decoder for `format`.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if the stream is malformed or truncated.
pub fn decode(format: SourceFormat, data: &[u8]) -> Result<DynamicImage, CodecError> {
    let decoder = decoder_for(format).ok_or_else(|| CodecError::UnsupportedFormat {
        content_type: format.name().to_string(),
    })?;

    decoder(data).map_err(|e| CodecError::Decode {
        message: e.to_string(),
    })
}
