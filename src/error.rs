//! Error taxonomy for the resolution pipeline.
//!
//! Two of the variants are non-fatal signals rather than failures:
//! [`Error::UnrecognizedEnvelope`] and [`Error::MissingRequiredEnvelopeField`]
//! tell the caller to fall back to raw-image handling instead of aborting.
//! The format sniffer has no error path at all; it always produces a tag.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Zero-length payload, either an empty byte buffer or an empty string.
    #[error("empty artwork payload")]
    EmptyPayload,

    /// A `0x`-prefixed string whose remainder is not even-length pure hex.
    /// No partial decode is performed.
    #[error("malformed hex payload: {0}")]
    MalformedHexPayload(String),

    /// The string does not carry a known JSON-envelope prefix. This is a
    /// signal, not a failure: the caller treats the input as a raw image.
    #[error("not a recognized metadata envelope")]
    UnrecognizedEnvelope,

    /// The string looked like a JSON envelope but could not be decoded into
    /// one: bad base64, invalid UTF-8 or JSON, or an empty/absent `name` or
    /// `image` field. Recovered locally by falling back to raw mode.
    #[error("unusable metadata envelope: {0}")]
    MissingRequiredEnvelopeField(String),

    /// The host refused to allocate a display handle. Terminal for this
    /// resolution attempt; retry policy belongs to the UI layer.
    #[error("failed to allocate display resource: {0}")]
    ResourceAllocationFailure(String),

    /// A render was attempted through a handle that has already been released
    /// or superseded. A contract violation in the caller, not a runtime
    /// condition to recover from.
    #[error("display resource used after release: {0}")]
    DanglingResourceUse(String),
}

impl Error {
    /// Whether this error is a recoverable fall-back signal rather than a
    /// terminal failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedEnvelope | Self::MissingRequiredEnvelopeField(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
