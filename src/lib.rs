//! Tessera - on-chain artwork payload resolution.
//!
//! Contracts hand back artwork in whatever shape their era dictated: raw
//! bytes from legacy getters, hex strings, direct `data:image/...` URLs, or
//! base64 JSON metadata envelopes per the tokenURI convention. This crate
//! normalizes those shapes, classifies the underlying image container by its
//! byte signature, decodes nested envelopes, and checks registration-time
//! integrity, all as pure, synchronous transformations. No pixel decoding
//! and no on-chain I/O happen here.
//!
//! The side-effectful half, turning prepared artwork into owned display
//! resources with explicit lifecycles, lives in the `tessera-display` crate.

pub mod contract;
pub mod envelope;
pub mod error;
pub mod format;
pub mod integrity;
pub mod resolve;
pub mod source;

pub use contract::{ArtworkGetter, GETTER_PREFERENCE};
pub use envelope::{decode_envelope, DecodedEnvelope};
pub use error::{Error, Result};
pub use format::{sniff_format, FormatTag};
pub use integrity::{content_hash, IntegrityRecord, MAX_ARTWORK_SIZE_KB};
pub use resolve::{prepare, ArtworkMetadata, PreparedArtwork, ResolvedArtwork};
pub use source::{classify, ArtworkPayload, ArtworkSource};
