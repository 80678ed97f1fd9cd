//! Normalization of raw contract payloads.
//!
//! Contract getters are heterogeneous: legacy getters return raw binary,
//! newer ones return strings that may be hex-encoded bytes, a direct
//! `data:image/...` URL, or an inline JSON metadata envelope. Classification
//! routes each shape to the right decoding stage and reduces everything else
//! to a byte buffer.

use crate::envelope;
use crate::error::{Error, Result};

/// Prefix of a directly renderable image data URL.
pub const IMAGE_DATA_URL_PREFIX: &str = "data:image/";

/// The opaque value handed over by the chain-data collaborator.
#[derive(Debug, Clone)]
pub enum ArtworkPayload {
    /// Result of a legacy raw-binary getter.
    Bytes(Vec<u8>),
    /// Result of a string-returning getter.
    Text(String),
}

impl From<Vec<u8>> for ArtworkPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<String> for ArtworkPayload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ArtworkPayload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// A payload classified by shape. Produced fresh per resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtworkSource {
    /// Bytes ready for signature sniffing.
    RawBytes(Vec<u8>),
    /// A `0x`-prefixed hex string (already validated; decode with
    /// [`decode_hex_payload`]).
    HexString(String),
    /// A `data:image/...` URL, renderable as-is: sniffing is bypassed and
    /// the format is read from the URL's MIME segment.
    PlainDataUrl(String),
    /// A string carrying an inline JSON envelope prefix.
    EnvelopeCandidate(String),
}

/// Classify a payload into an [`ArtworkSource`].
///
/// Empty input (zero-length bytes or empty string) fails with
/// [`Error::EmptyPayload`]. A `0x` string with an odd-length or non-hex
/// remainder fails with [`Error::MalformedHexPayload`]. Strings with no
/// recognized prefix are kept as raw UTF-8 bytes for signature sniffing.
pub fn classify(payload: &ArtworkPayload) -> Result<ArtworkSource> {
    match payload {
        ArtworkPayload::Bytes(bytes) => {
            if bytes.is_empty() {
                return Err(Error::EmptyPayload);
            }
            Ok(ArtworkSource::RawBytes(bytes.clone()))
        }
        ArtworkPayload::Text(text) => {
            if text.is_empty() {
                return Err(Error::EmptyPayload);
            }
            if text.starts_with(IMAGE_DATA_URL_PREFIX) {
                return Ok(ArtworkSource::PlainDataUrl(text.clone()));
            }
            if let Some(digits) = text.strip_prefix("0x") {
                validate_hex(digits)?;
                return Ok(ArtworkSource::HexString(text.clone()));
            }
            if envelope::is_envelope_candidate(text) {
                return Ok(ArtworkSource::EnvelopeCandidate(text.clone()));
            }
            // No recognized prefix: fall back to the string's UTF-8 bytes.
            Ok(ArtworkSource::RawBytes(text.as_bytes().to_vec()))
        }
    }
}

/// Decode the digits of a validated `0x` hex string into bytes.
pub fn decode_hex_payload(text: &str) -> Result<Vec<u8>> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    validate_hex(digits)?;
    hex::decode(digits).map_err(|e| Error::MalformedHexPayload(e.to_string()))
}

fn validate_hex(digits: &str) -> Result<()> {
    if digits.len() % 2 != 0 {
        return Err(Error::MalformedHexPayload(format!(
            "odd number of hex digits ({})",
            digits.len()
        )));
    }
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(Error::MalformedHexPayload(format!(
            "invalid hex digit {bad:?}"
        )));
    }
    Ok(())
}

/// Extract the MIME subtype from a `data:image/...` URL, e.g. `"png"` from
/// `data:image/png;base64,...`.
pub fn data_url_mime_subtype(url: &str) -> Option<&str> {
    let rest = url.strip_prefix(IMAGE_DATA_URL_PREFIX)?;
    let end = rest.find([';', ','])?;
    Some(&rest[..end])
}
