//! Token metadata envelope decoding.
//!
//! Newer contract getters return the artwork wrapped in a standard NFT
//! metadata envelope: a JSON object (`name`/`description`/`image`) inlined
//! into a `data:application/json` URI. Two inline forms are accepted:
//!
//! - `data:application/json;base64,<encoded>`
//! - `data:application/json,<url-encoded>`
//!
//! Anything else is rejected with [`Error::UnrecognizedEnvelope`], which is a
//! fall-back signal, not a failure; the caller then treats the input as a
//! raw image payload.
//!
//! Real-world envelopes are sometimes broken (control characters, unescaped
//! quotes inside string values), so the JSON is sanitized before parsing.

use base64::Engine;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Prefix of a base64-encoded inline JSON envelope.
pub const JSON_BASE64_PREFIX: &str = "data:application/json;base64,";

/// Prefix of a URL-encoded inline JSON envelope.
pub const JSON_PLAIN_PREFIX: &str = "data:application/json,";

/// A decoded metadata envelope. Immutable; decoding byte-identical input
/// twice yields field-wise equal values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEnvelope {
    /// Artwork name. Required, non-empty.
    pub name: String,
    /// Artwork description. Defaults to `""` when absent.
    pub description: String,
    /// The nested image string, expected to be a `data:image/...` URL.
    /// Not recursively decoded.
    pub image: String,
    /// The full envelope string as received, retained for hashing and audit.
    pub original_envelope: String,
}

/// Wire shape of the envelope JSON.
#[derive(Debug, Deserialize)]
struct EnvelopeFields {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image: String,
}

/// Whether a string carries one of the inline JSON envelope prefixes.
pub fn is_envelope_candidate(input: &str) -> bool {
    input.starts_with(JSON_BASE64_PREFIX) || input.starts_with(JSON_PLAIN_PREFIX)
}

/// Decode an inline JSON metadata envelope.
///
/// Returns [`Error::UnrecognizedEnvelope`] when the prefix is absent and
/// [`Error::MissingRequiredEnvelopeField`] when the prefix is present but the
/// content cannot be decoded into a usable envelope. Both are recovered by
/// the caller falling back to raw-image handling.
pub fn decode_envelope(input: &str) -> Result<DecodedEnvelope> {
    let json = if let Some(encoded) = input.strip_prefix(JSON_BASE64_PREFIX) {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| Error::MissingRequiredEnvelopeField(format!("invalid base64: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| Error::MissingRequiredEnvelopeField(format!("invalid utf-8: {e}")))?
    } else if let Some(encoded) = input.strip_prefix(JSON_PLAIN_PREFIX) {
        urlencoding::decode(encoded)
            .unwrap_or_else(|_| encoded.into())
            .into_owned()
    } else {
        return Err(Error::UnrecognizedEnvelope);
    };

    let fields: EnvelopeFields = serde_json::from_str(&sanitize_json(&json))
        .map_err(|e| Error::MissingRequiredEnvelopeField(format!("invalid json: {e}")))?;

    if fields.name.is_empty() {
        return Err(Error::MissingRequiredEnvelopeField("name".to_string()));
    }
    if fields.image.is_empty() {
        return Err(Error::MissingRequiredEnvelopeField("image".to_string()));
    }

    Ok(DecodedEnvelope {
        name: fields.name,
        description: fields.description,
        image: fields.image,
        original_envelope: input.to_string(),
    })
}

/// Repair common breakage in contract-stored metadata JSON: strips ASCII
/// control characters (standard whitespace excepted) and escapes unescaped
/// double quotes that appear inside string values.
fn sanitize_json(s: &str) -> String {
    let filtered: String = s
        .chars()
        .filter(|c| !c.is_ascii_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect();

    let mut out = String::with_capacity(filtered.len());
    let mut chars = filtered.chars().peekable();
    let mut in_string = false;
    let mut backslashes: usize = 0;

    while let Some(c) = chars.next() {
        if !in_string {
            if c == '"' {
                in_string = true;
                backslashes = 0;
            }
            out.push(c);
            continue;
        }

        if c == '\\' {
            backslashes += 1;
            out.push('\\');
            continue;
        }

        if c == '"' && backslashes % 2 == 0 {
            // Unescaped quote inside a string: it terminates the value only
            // if the next non-whitespace character is a JSON delimiter.
            if closes_string_value(&mut chars.clone()) {
                out.push('"');
                in_string = false;
            } else {
                out.push_str("\\\"");
            }
            backslashes = 0;
            continue;
        }

        out.push(c);
        backslashes = 0;
    }

    out
}

fn closes_string_value(rest: &mut std::iter::Peekable<std::str::Chars<'_>>) -> bool {
    while let Some(&next) = rest.peek() {
        if next.is_whitespace() {
            rest.next();
        } else {
            return matches!(next, ':' | ',' | '}' | ']');
        }
    }
    // End of input also terminates the string.
    true
}
