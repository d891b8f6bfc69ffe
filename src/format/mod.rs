//! Content detection for original images.
//!
//! Detection is by magic bytes only; file extensions are never consulted.

mod detect;

pub use detect::{is_webp_header, sniff, ContentType, SNIFF_LEN};
