//! Display-side half of the Tessera pipeline.
//!
//! The `tessera` crate does the pure work (classification, envelope
//! decoding, signature sniffing); this crate owns everything with a
//! lifecycle: materializing prepared artwork into renderable resources,
//! keeping at most one Active resource per artwork identity in the
//! [`ResourceRegistry`], and re-resolving artwork in the background through
//! the [`service::ArtworkService`] when contract state changes.

pub mod resource;
pub mod service;

use std::sync::Arc;

use tessera::error::Result;
use tessera::resolve::{self, PreparedArtwork, ResolvedArtwork};
use tessera::source::ArtworkPayload;

pub use resource::{
    DataUrlAllocator, DisplayableResource, HandleAllocator, ResourceGuard, ResourceRegistry,
    ResourceState,
};
pub use service::{ArtworkSender, ArtworkService, PayloadProvider, ResolvedStore};

/// Resolve a raw contract payload all the way to the rendering contract.
///
/// Runs the pure stages, then materializes through `registry` under
/// `identity` so the one-Active-resource invariant holds across repeated
/// loads. The returned [`ResolvedArtwork`] is what the rendering
/// collaborator consumes.
pub fn resolve_artwork(
    registry: &ResourceRegistry,
    identity: &str,
    payload: &ArtworkPayload,
) -> Result<ResolvedArtwork> {
    let prepared = resolve::prepare(payload)?;
    let resource = registry.materialize(identity, &prepared)?;
    let resolved = assemble(&prepared, resource.handle());

    tracing::debug!(
        target: "tessera_display",
        identity,
        format = %resolved.display_format,
        is_envelope_format = resolved.is_envelope_format,
        "resolved artwork"
    );

    Ok(resolved)
}

/// Guard-returning variant of [`resolve_artwork`] for owners that want
/// drop-based teardown instead of explicit release calls.
pub fn resolve_artwork_scoped(
    registry: Arc<ResourceRegistry>,
    identity: &str,
    payload: &ArtworkPayload,
) -> Result<(ResolvedArtwork, ResourceGuard)> {
    let prepared = resolve::prepare(payload)?;
    let guard = ResourceGuard::acquire(registry, identity, &prepared)?;
    let resolved = assemble(&prepared, guard.resource().handle());
    Ok((resolved, guard))
}

fn assemble(prepared: &PreparedArtwork, handle: &str) -> ResolvedArtwork {
    let (metadata, is_envelope_format) = match prepared {
        PreparedArtwork::DataUrl {
            metadata,
            from_envelope,
            ..
        } => (metadata.clone(), *from_envelope),
        PreparedArtwork::Bytes { .. } => (None, false),
    };

    ResolvedArtwork {
        resource_url: handle.to_string(),
        display_format: prepared.format(),
        metadata,
        is_envelope_format,
    }
}
