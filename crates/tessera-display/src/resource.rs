//! Display resource materialization and the per-identity registry.
//!
//! A resolved artwork becomes a renderable resource in one of two ways: a
//! data URL composed in-process (plain string, nothing to release), or an
//! ephemeral binary handle allocated by the host through [`HandleAllocator`].
//! Allocated handles are not reclaimed by any garbage collector; whoever
//! materialized one must release it exactly once.
//!
//! The registry holds at most one Active entry per logical artwork identity
//! (contract address). Materializing again for the same identity releases
//! the prior handle, so repeated loads of the same artwork can never leak.
//! Double release is a logged no-op; rendering through a released or
//! superseded resource is a [`DanglingResourceUse`] contract violation.
//!
//! [`DanglingResourceUse`]: tessera::Error::DanglingResourceUse

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use base64::Engine;
use tessera::error::{Error, Result};
use tessera::format::FormatTag;
use tessera::resolve::PreparedArtwork;

/// Host hook for ephemeral binary display handles.
///
/// Implementations are expected to be cheap, non-blocking calls into the
/// host environment. `release` must tolerate repeated calls for the same
/// handle.
pub trait HandleAllocator: Send + Sync + 'static {
    /// Allocate a renderable handle for `bytes`, tagged with `mime`.
    fn allocate(&self, bytes: &[u8], mime: &str) -> Result<String>;

    /// Release a previously allocated handle.
    fn release(&self, handle: &str);
}

/// Default allocator: composes a `data:<mime>;base64,<payload>` URL.
///
/// The resulting resource is a plain string, so `release` has nothing to do;
/// the registry still tracks the entry for lifecycle bookkeeping.
#[derive(Debug, Default)]
pub struct DataUrlAllocator;

impl HandleAllocator for DataUrlAllocator {
    fn allocate(&self, bytes: &[u8], mime: &str) -> Result<String> {
        Ok(format!(
            "data:{mime};base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        ))
    }

    fn release(&self, _handle: &str) {}
}

/// Lifecycle state of a display resource, as seen by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Active,
    Released,
}

/// A snapshot of a materialized resource, owned by the caller that
/// materialized it. Validity is checked against the registry at render time,
/// so a superseded or released snapshot cannot be rendered, even when the
/// successor happens to carry a byte-identical handle string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayableResource {
    identity: String,
    handle: String,
    format: FormatTag,
    generation: u64,
}

impl DisplayableResource {
    /// The logical artwork identity this resource belongs to.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The renderable handle (data URL or host handle reference).
    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn format(&self) -> FormatTag {
        self.format
    }
}

struct ActiveEntry {
    handle: String,
    /// Whether the handle came from the allocator (and so must be released)
    /// as opposed to a passed-through data URL string.
    allocated: bool,
    /// Distinguishes successive materializations for the same identity.
    generation: u64,
}

/// Arena of display resources keyed by logical artwork identity.
///
/// Replaces scattered per-caller release calls: every materialization goes
/// through here, and the registry enforces the one-Active-per-identity
/// invariant by releasing whatever it supersedes.
pub struct ResourceRegistry {
    allocator: Box<dyn HandleAllocator>,
    active: Mutex<HashMap<String, ActiveEntry>>,
    generations: AtomicU64,
}

impl ResourceRegistry {
    pub fn new(allocator: impl HandleAllocator) -> Self {
        Self {
            allocator: Box::new(allocator),
            active: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    /// Registry backed by the in-process data URL allocator.
    pub fn with_data_urls() -> Self {
        Self::new(DataUrlAllocator)
    }

    /// Materialize prepared artwork into an Active resource for `identity`.
    ///
    /// Data-URL input passes through unchanged; byte input goes through the
    /// allocator. The previous Active resource for the identity, if any, is
    /// released once the new one exists, so an allocation failure leaves the
    /// prior resource in place.
    pub fn materialize(&self, identity: &str, prepared: &PreparedArtwork) -> Result<DisplayableResource> {
        let (handle, format, allocated) = match prepared {
            PreparedArtwork::DataUrl { url, format, .. } => (url.clone(), *format, false),
            PreparedArtwork::Bytes { bytes, format } => {
                let handle = self
                    .allocator
                    .allocate(bytes, &format.mime())
                    .map_err(|e| match e {
                        Error::ResourceAllocationFailure(_) => e,
                        other => Error::ResourceAllocationFailure(other.to_string()),
                    })?;
                (handle, *format, true)
            }
        };

        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let previous = self.lock().insert(
            identity.to_string(),
            ActiveEntry {
                handle: handle.clone(),
                allocated,
                generation,
            },
        );
        if let Some(entry) = previous {
            self.drop_entry(identity, &entry);
            tracing::debug!(
                target: "tessera_display::registry",
                identity,
                "superseded previous display resource"
            );
        }

        Ok(DisplayableResource {
            identity: identity.to_string(),
            handle,
            format,
            generation,
        })
    }

    /// The renderable URL for a resource, verified against the registry.
    ///
    /// Fails with [`Error::DanglingResourceUse`] when the resource has been
    /// released or superseded since it was materialized.
    pub fn render_url(&self, resource: &DisplayableResource) -> Result<String> {
        match self.state_of(resource) {
            ResourceState::Active => Ok(resource.handle.clone()),
            ResourceState::Released => {
                Err(Error::DanglingResourceUse(resource.identity.clone()))
            }
        }
    }

    /// Whether a materialized snapshot is still the Active resource for its
    /// identity.
    pub fn state_of(&self, resource: &DisplayableResource) -> ResourceState {
        let active = self.lock();
        match active.get(&resource.identity) {
            Some(entry) if entry.generation == resource.generation => ResourceState::Active,
            _ => ResourceState::Released,
        }
    }

    /// Release the Active resource for `identity`. Releasing an identity with
    /// nothing active is a logged no-op, so double release is harmless.
    pub fn release(&self, identity: &str) {
        let removed = self.lock().remove(identity);
        match removed {
            Some(entry) => self.drop_entry(identity, &entry),
            None => {
                tracing::debug!(
                    target: "tessera_display::registry",
                    identity,
                    "release with no active resource (ignored)"
                );
            }
        }
    }

    /// Release only if `resource` is still the Active entry. Used by the
    /// teardown path so that dropping a superseded owner cannot release its
    /// successor's handle.
    pub(crate) fn release_if_current(&self, resource: &DisplayableResource) {
        let removed = {
            let mut active = self.lock();
            match active.get(&resource.identity) {
                Some(entry) if entry.generation == resource.generation => {
                    active.remove(&resource.identity)
                }
                _ => None,
            }
        };
        if let Some(entry) = removed {
            self.drop_entry(&resource.identity, &entry);
        }
    }

    /// Number of currently Active resources across all identities.
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn drop_entry(&self, identity: &str, entry: &ActiveEntry) {
        if entry.allocated {
            self.allocator.release(&entry.handle);
        }
        tracing::debug!(
            target: "tessera_display::registry",
            identity,
            allocated = entry.allocated,
            "released display resource"
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ActiveEntry>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::with_data_urls()
    }
}

/// Owned lease on a display resource that releases it on drop.
///
/// Covers the teardown path: if the owner is dismantled before it gets to an
/// explicit release, the handle still goes back to the host. Dropping a
/// guard whose resource has already been superseded does nothing, so the
/// successor's handle is never touched.
pub struct ResourceGuard {
    registry: std::sync::Arc<ResourceRegistry>,
    resource: DisplayableResource,
}

impl std::fmt::Debug for ResourceGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceGuard")
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

impl ResourceGuard {
    /// Materialize into a drop-released lease.
    pub fn acquire(
        registry: std::sync::Arc<ResourceRegistry>,
        identity: &str,
        prepared: &PreparedArtwork,
    ) -> Result<Self> {
        let resource = registry.materialize(identity, prepared)?;
        Ok(Self { registry, resource })
    }

    pub fn resource(&self) -> &DisplayableResource {
        &self.resource
    }

    /// Renderable URL, failing if the lease is no longer current.
    pub fn render_url(&self) -> Result<String> {
        self.registry.render_url(&self.resource)
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        self.registry.release_if_current(&self.resource);
    }
}
