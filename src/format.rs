//! Image container format detection from byte signatures.
//!
//! Contract payloads carry no trusted out-of-band type tag, so the container
//! format is inferred purely from the leading bytes. Detection is total:
//! every buffer maps to some [`FormatTag`], with AVIF as the default when no
//! signature matches, because the renderer always needs a MIME hint.
//!
//! The rule order and the 0xFF-density threshold are compatibility-critical
//! for content resolved and stored by earlier versions; do not reorder.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How many leading bytes the ISO-BMFF box scan and the JPEG heuristic look at.
const SNIFF_WINDOW: usize = 50;

/// Minimum count of `0xFF` bytes in the sniff window for the truncated-JPEG
/// heuristic to fire.
const JPEG_FF_THRESHOLD: usize = 6;

/// Closed set of image container formats the pipeline can tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    Jpeg,
    Png,
    Gif,
    Webp,
    Avif,
    Heic,
    Bmp,
}

impl FormatTag {
    /// MIME subtype, e.g. `"png"` for `image/png`.
    pub fn mime_subtype(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Heic => "heic",
            Self::Bmp => "bmp",
        }
    }

    /// Full MIME type, e.g. `"image/png"`.
    pub fn mime(self) -> String {
        format!("image/{}", self.mime_subtype())
    }

    /// Parse a MIME subtype as it appears in a `data:image/...` URL.
    ///
    /// `jpg` is accepted as an alias for `jpeg`.
    pub fn from_mime_subtype(subtype: &str) -> Option<Self> {
        match subtype {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            "avif" => Some(Self::Avif),
            "heic" => Some(Self::Heic),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }
}

impl Default for FormatTag {
    fn default() -> Self {
        Self::Avif
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mime_subtype())
    }
}

/// Classify a byte buffer by its container signature. Never fails.
///
/// Priority order, first match wins:
/// 1. fixed prefixes: JPEG, PNG, GIF, BMP;
/// 2. RIFF container with a `WEBP` fourcc at bytes 8..12;
/// 3. ISO-BMFF `ftyp` box scan over the first 50 bytes (AVIF/HEIC brands);
/// 4. `0xFF`-density heuristic for truncated JPEG captures;
/// 5. AVIF default.
///
/// Buffers shorter than 4 bytes go straight to the default.
pub fn sniff_format(bytes: &[u8]) -> FormatTag {
    if bytes.len() < 4 {
        return FormatTag::Avif;
    }

    // 1. Exact fixed-prefix signatures.
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return FormatTag::Jpeg;
    }
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return FormatTag::Png;
    }
    if bytes.starts_with(b"GIF8") {
        return FormatTag::Gif;
    }
    if bytes.starts_with(b"BM") {
        return FormatTag::Bmp;
    }

    // 2. RIFF container: the fourcc at offset 8 distinguishes WEBP from
    // other RIFF media. Requires the full 12-byte header to be present.
    if bytes.starts_with(b"RIFF") && bytes.len() >= 12 && &bytes[8..12] == b"WEBP" {
        return FormatTag::Webp;
    }

    let window = &bytes[..bytes.len().min(SNIFF_WINDOW)];

    // 3. ISO-BMFF: find the `ftyp` box marker and read the 4-byte brand
    // that follows it.
    if let Some(pos) = window.windows(4).position(|w| w == b"ftyp") {
        if let Some(brand) = bytes.get(pos + 4..pos + 8) {
            match brand {
                b"avif" => return FormatTag::Avif,
                b"heic" | b"heix" | b"mif1" => return FormatTag::Heic,
                _ => {}
            }
        }
    }

    // 4. Truncated JPEG captures often keep their 0xFF marker density even
    // when the SOI prefix is damaged.
    if window.iter().filter(|&&b| b == 0xFF).count() >= JPEG_FF_THRESHOLD {
        return FormatTag::Jpeg;
    }

    // 5. Default.
    FormatTag::Avif
}
