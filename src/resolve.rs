//! Pure pipeline assembly: payload in, materialization-ready artwork out.
//!
//! [`prepare`] runs the synchronous stages (classification, envelope
//! decoding, hex decoding, signature sniffing) and produces either a
//! ready-to-render data URL or a byte buffer tagged with its container
//! format. Turning the result into an owned display resource is the
//! `tessera-display` crate's job; nothing here allocates host handles.

use serde::Serialize;

use crate::envelope::{self, DecodedEnvelope};
use crate::error::Result;
use crate::format::{sniff_format, FormatTag};
use crate::source::{self, ArtworkPayload, ArtworkSource};

/// Name/description pair surfaced to the rendering collaborator when the
/// payload carried a metadata envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtworkMetadata {
    pub name: String,
    pub description: String,
}

impl From<&DecodedEnvelope> for ArtworkMetadata {
    fn from(envelope: &DecodedEnvelope) -> Self {
        Self {
            name: envelope.name.clone(),
            description: envelope.description.clone(),
        }
    }
}

/// The outward contract to the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedArtwork {
    /// Renderable resource: a data URL or a host-allocated handle reference.
    pub resource_url: String,
    pub display_format: FormatTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ArtworkMetadata>,
    pub is_envelope_format: bool,
}

/// Output of the pure stages, ready for materialization.
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedArtwork {
    /// Already a renderable URL string; no allocation obligation.
    DataUrl {
        url: String,
        format: FormatTag,
        metadata: Option<ArtworkMetadata>,
        from_envelope: bool,
    },
    /// Raw bytes that still need encoding into a display resource.
    Bytes { bytes: Vec<u8>, format: FormatTag },
}

impl PreparedArtwork {
    pub fn format(&self) -> FormatTag {
        match self {
            Self::DataUrl { format, .. } | Self::Bytes { format, .. } => *format,
        }
    }
}

/// Run the synchronous resolution stages over a raw contract payload.
///
/// Fails with [`EmptyPayload`](crate::Error::EmptyPayload) or
/// [`MalformedHexPayload`](crate::Error::MalformedHexPayload); envelope
/// rejections are recovered here by falling back to raw-image handling, per
/// the normalizer's contract.
pub fn prepare(payload: &ArtworkPayload) -> Result<PreparedArtwork> {
    match source::classify(payload)? {
        ArtworkSource::PlainDataUrl(url) => {
            let format = format_from_data_url(&url);
            Ok(PreparedArtwork::DataUrl {
                url,
                format,
                metadata: None,
                from_envelope: false,
            })
        }
        ArtworkSource::HexString(text) => {
            let bytes = source::decode_hex_payload(&text)?;
            let format = sniff_format(&bytes);
            Ok(PreparedArtwork::Bytes { bytes, format })
        }
        ArtworkSource::EnvelopeCandidate(text) => match envelope::decode_envelope(&text) {
            Ok(decoded) => Ok(prepared_from_envelope(&decoded)),
            Err(e) if e.is_recoverable() => {
                tracing::debug!(
                    target: "tessera::resolve",
                    error = %e,
                    "envelope rejected, falling back to raw bytes"
                );
                Ok(prepared_from_bytes(text.into_bytes()))
            }
            Err(e) => Err(e),
        },
        ArtworkSource::RawBytes(bytes) => {
            // Unprefixed strings cannot be envelopes (both inline JSON
            // prefixes classify as EnvelopeCandidate); their UTF-8 bytes go
            // straight to sniffing, same as binary payloads.
            if matches!(payload, ArtworkPayload::Text(_)) {
                tracing::debug!(
                    target: "tessera::resolve",
                    "string payload has no recognized prefix, treating as raw bytes"
                );
            }
            Ok(prepared_from_bytes(bytes))
        }
    }
}

fn prepared_from_bytes(bytes: Vec<u8>) -> PreparedArtwork {
    let format = sniff_format(&bytes);
    PreparedArtwork::Bytes { bytes, format }
}

fn prepared_from_envelope(decoded: &DecodedEnvelope) -> PreparedArtwork {
    let format = if decoded.image.starts_with(source::IMAGE_DATA_URL_PREFIX) {
        format_from_data_url(&decoded.image)
    } else {
        // Envelopes are expected to nest a data:image URL, but some carry
        // remote URLs instead. Pass those through untagged beyond the default.
        tracing::warn!(
            target: "tessera::resolve",
            name = %decoded.name,
            "envelope image is not a data URL"
        );
        FormatTag::default()
    };

    PreparedArtwork::DataUrl {
        url: decoded.image.clone(),
        format,
        metadata: Some(ArtworkMetadata::from(decoded)),
        from_envelope: true,
    }
}

/// Read the format tag out of a `data:image/...` URL's MIME segment, keeping
/// the AVIF default when the subtype is outside the closed tag set.
fn format_from_data_url(url: &str) -> FormatTag {
    match source::data_url_mime_subtype(url).and_then(FormatTag::from_mime_subtype) {
        Some(format) => format,
        None => {
            tracing::debug!(
                target: "tessera::resolve",
                "unrecognized MIME subtype in data URL, defaulting"
            );
            FormatTag::default()
        }
    }
}
