//! Image codecs.
//!
//! ```text
//!   original bytes ──► dispatch(ContentType)
//!                          │
//!            ┌─────────────┴──────────────┐
//!            ▼                            ▼
//!   Convert(SourceFormat)            PassThrough
//!   decode ──► WebpEncoder            (WebP original,
//!                                      served as is)
//! ```
//!
//! - [`decode`] / [`dispatch`]: closed set of source formats with a decoder table
//! - [`WebpEncoder`]: quality-controlled lossy WebP output

mod decoder;
mod encoder;

pub use decoder::{decode, decoder_for, dispatch, DecodeFn, Dispatch, SourceFormat};
pub use encoder::{
    clamp_quality, is_valid_quality, WebpEncoder, DEFAULT_QUALITY, MAX_QUALITY, MIN_QUALITY,
};
