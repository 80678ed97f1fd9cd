//! Contract getter shapes, documented for the chain-data collaborator.
//!
//! Which getter actually exists on a given contract is a dynamic-dispatch
//! concern owned entirely by the chain-data layer; this core stays
//! shape-agnostic and consumes a single [`ArtworkPayload`]. What lives here
//! is only the preferred discovery order and what each getter returns, so
//! every caller probes contracts the same way.
//!
//! [`ArtworkPayload`]: crate::source::ArtworkPayload

use std::fmt;

/// A known artwork getter shape, newest convention first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtworkGetter {
    /// Standard NFT metadata getter; returns an inline JSON envelope string.
    TokenUri,
    /// Variant that returns the envelope payload without the data-URI wrapper
    /// on some deployments.
    TokenUriData,
    /// Older explicit-name variant of the same envelope getter.
    GetTokenUriData,
    /// Legacy getter; returns raw image bytes (usually hex-encoded when read
    /// over JSON-RPC).
    GetImageData,
}

/// The order in which the chain-data collaborator should probe getters.
/// First hit wins.
pub const GETTER_PREFERENCE: [ArtworkGetter; 4] = [
    ArtworkGetter::TokenUri,
    ArtworkGetter::TokenUriData,
    ArtworkGetter::GetTokenUriData,
    ArtworkGetter::GetImageData,
];

impl ArtworkGetter {
    /// Method name as it appears in the contract ABI.
    pub fn method_name(self) -> &'static str {
        match self {
            Self::TokenUri => "tokenURI",
            Self::TokenUriData => "tokenURI_data",
            Self::GetTokenUriData => "getTokenURIData",
            Self::GetImageData => "getImageData",
        }
    }

    /// Whether this getter returns a metadata envelope string (as opposed to
    /// legacy raw binary).
    pub fn returns_envelope(self) -> bool {
        !matches!(self, Self::GetImageData)
    }
}

impl fmt::Display for ArtworkGetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.method_name())
    }
}
