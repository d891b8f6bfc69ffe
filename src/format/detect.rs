//! Content sniffing for original images.
//!
//! Classification only looks at the leading bytes of a file (at most
//! [`SNIFF_LEN`]), never at the file name. A file called `photo.jpg` that
//! holds plain text is classified as text and is rejected further down the
//! pipeline.
//!
//! Unrecognised content is not an error: it comes back as
//! [`ContentType::Unknown`] and the caller decides what to do with it.

/// Number of leading bytes inspected by [`sniff`].
pub const SNIFF_LEN: usize = 512;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const GIF87_MAGIC: &[u8] = b"GIF87a";
const GIF89_MAGIC: &[u8] = b"GIF89a";
const BMP_MAGIC: &[u8] = b"BM";
const TIFF_LE_MAGIC: &[u8] = b"II*\x00";
const TIFF_BE_MAGIC: &[u8] = b"MM\x00*";
const ICO_MAGIC: &[u8] = &[0x00, 0x00, 0x01, 0x00];
const PDF_MAGIC: &[u8] = b"%PDF-";
const RIFF_MAGIC: &[u8] = b"RIFF";
const WEBP_FOURCC: &[u8] = b"WEBPVP";

// =============================================================================
// ContentType
// =============================================================================

/// Sniffed classification of a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Jpeg,
    Png,
    /// Already the target encoding
    Webp,
    Gif,
    Bmp,
    Tiff,
    Icon,
    Pdf,
    /// No binary control bytes in the sniffed prefix
    Text,
    Unknown,
}

impl ContentType {
    /// MIME type string for this classification.
    pub const fn mime(&self) -> &'static str {
        match self {
            ContentType::Jpeg => "image/jpeg",
            ContentType::Png => "image/png",
            ContentType::Webp => "image/webp",
            ContentType::Gif => "image/gif",
            ContentType::Bmp => "image/bmp",
            ContentType::Tiff => "image/tiff",
            ContentType::Icon => "image/x-icon",
            ContentType::Pdf => "application/pdf",
            ContentType::Text => "text/plain; charset=utf-8",
            ContentType::Unknown => "application/octet-stream",
        }
    }

    /// Whether this classification is an image encoding.
    pub const fn is_image(&self) -> bool {
        matches!(
            self,
            ContentType::Jpeg
                | ContentType::Png
                | ContentType::Webp
                | ContentType::Gif
                | ContentType::Bmp
                | ContentType::Tiff
                | ContentType::Icon
        )
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime())
    }
}

// =============================================================================
// Sniffing
// =============================================================================

/// Classify a byte stream by its leading bytes.
///
/// Only the first [`SNIFF_LEN`] bytes are considered. An empty input is
/// [`ContentType::Unknown`].
pub fn sniff(data: &[u8]) -> ContentType {
    let data = &data[..data.len().min(SNIFF_LEN)];

    if data.is_empty() {
        return ContentType::Unknown;
    }

    if data.starts_with(JPEG_MAGIC) {
        ContentType::Jpeg
    } else if data.starts_with(PNG_MAGIC) {
        ContentType::Png
    } else if is_webp_header(data) {
        ContentType::Webp
    } else if data.starts_with(GIF87_MAGIC) || data.starts_with(GIF89_MAGIC) {
        ContentType::Gif
    } else if data.starts_with(TIFF_LE_MAGIC) || data.starts_with(TIFF_BE_MAGIC) {
        ContentType::Tiff
    } else if data.starts_with(ICO_MAGIC) {
        ContentType::Icon
    } else if data.starts_with(PDF_MAGIC) {
        ContentType::Pdf
    } else if data.starts_with(BMP_MAGIC) {
        ContentType::Bmp
    } else if !data.iter().any(|&b| is_binary_byte(b)) {
        ContentType::Text
    } else {
        ContentType::Unknown
    }
}

/// Check for a RIFF container holding a VP8/VP8L/VP8X WebP bitstream.
///
/// Bytes 4..8 are the RIFF chunk size and are ignored.
pub fn is_webp_header(bytes: &[u8]) -> bool {
    bytes.len() >= 14 && bytes.starts_with(RIFF_MAGIC) && &bytes[8..14] == WEBP_FOURCC
}

/// Control bytes that never appear in text.
fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
