//! Background artwork re-resolution service.
//!
//! Processes per-contract refresh requests via a tokio channel. Deduplicates
//! in-flight work: if a new request arrives for a contract that is already
//! being resolved, the previous task is aborted so the latest on-chain value
//! always wins. Combined with the registry's one-Active-per-identity rule,
//! this keeps rapid re-loads of the same artwork from ever leaking a handle
//! or rendering a stale one.
//!
//! The service performs no chain I/O itself: fetching the raw payload is the
//! [`PayloadProvider`]'s job (the chain-data collaborator), and the resolved
//! output goes out through the [`ResolvedStore`] callback.

use std::collections::HashMap;
use std::sync::Arc;

use tessera::resolve::ResolvedArtwork;
use tessera::source::ArtworkPayload;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinHandle;

use crate::resource::ResourceRegistry;
use crate::resolve_artwork;

/// Supplies the raw contract payload for an artwork identity.
#[async_trait::async_trait]
pub trait PayloadProvider: Send + Sync + 'static {
    async fn fetch_payload(&self, contract: &str) -> anyhow::Result<ArtworkPayload>;
}

/// Callback for delivering resolved artwork to its consumer.
#[async_trait::async_trait]
pub trait ResolvedStore: Send + Sync + 'static {
    async fn store_resolved(&self, contract: &str, artwork: &ResolvedArtwork) -> anyhow::Result<()>;
}

/// Handle to send refresh requests to the artwork service.
#[derive(Clone)]
pub struct ArtworkSender {
    tx: mpsc::Sender<String>,
}

impl ArtworkSender {
    /// Queue a re-resolution of the artwork at `contract`.
    pub async fn request_update(&self, contract: impl Into<String>) {
        if let Err(e) = self.tx.send(contract.into()).await {
            tracing::warn!(
                target: "tessera_display::service",
                error = %e,
                "failed to send artwork request (channel closed)"
            );
        }
    }
}

/// The background task that processes artwork refresh requests.
pub struct ArtworkService {
    handle: JoinHandle<()>,
}

impl ArtworkService {
    /// Spawn the service.
    ///
    /// Returns an `(ArtworkSender, ArtworkService)` pair. The sender is cheap
    /// to clone and can be shared across callers.
    pub fn spawn<P: PayloadProvider, S: ResolvedStore>(
        provider: Arc<P>,
        store: Arc<S>,
        registry: Arc<ResourceRegistry>,
        buffer_size: usize,
        max_concurrent: usize,
    ) -> (ArtworkSender, Self) {
        let (tx, rx) = mpsc::channel(buffer_size);
        let handle = tokio::spawn(Self::run(rx, provider, store, registry, max_concurrent));
        (ArtworkSender { tx }, Self { handle })
    }

    async fn run<P: PayloadProvider, S: ResolvedStore>(
        mut rx: mpsc::Receiver<String>,
        provider: Arc<P>,
        store: Arc<S>,
        registry: Arc<ResourceRegistry>,
        max_concurrent: usize,
    ) {
        let in_flight: Arc<Mutex<HashMap<String, JoinHandle<()>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        while let Some(contract) = rx.recv().await {
            let mut tasks = in_flight.lock().await;

            // Cancel the previous task for the same contract. An aborted
            // task may have already materialized a resource; the registry
            // releases it when the superseding task materializes its own.
            if let Some(old) = tasks.remove(&contract) {
                old.abort();
                tracing::debug!(
                    target: "tessera_display::service",
                    contract = %contract,
                    "cancelled previous resolution (superseded)"
                );
            }

            let provider = provider.clone();
            let store = store.clone();
            let registry = registry.clone();
            let in_flight = in_flight.clone();
            let sem = semaphore.clone();
            let key = contract.clone();

            let handle = tokio::spawn(async move {
                let _permit = match sem.acquire().await {
                    Ok(p) => p,
                    Err(_) => return,
                };

                match Self::refresh(&*provider, &registry, &contract).await {
                    Ok(resolved) => {
                        if let Err(e) = store.store_resolved(&contract, &resolved).await {
                            tracing::warn!(
                                target: "tessera_display::service",
                                contract = %contract,
                                error = %e,
                                "failed to store resolved artwork"
                            );
                        } else {
                            tracing::debug!(
                                target: "tessera_display::service",
                                contract = %contract,
                                format = %resolved.display_format,
                                "stored resolved artwork"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            target: "tessera_display::service",
                            contract = %contract,
                            error = %e,
                            "artwork resolution failed"
                        );
                    }
                }

                in_flight.lock().await.remove(&contract);
            });

            tasks.insert(key, handle);
        }

        tracing::info!(
            target: "tessera_display::service",
            "artwork service shutting down"
        );
    }

    async fn refresh<P: PayloadProvider>(
        provider: &P,
        registry: &ResourceRegistry,
        contract: &str,
    ) -> anyhow::Result<ResolvedArtwork> {
        let payload = provider.fetch_payload(contract).await?;
        Ok(resolve_artwork(registry, contract, &payload)?)
    }

    /// Wait for the service to finish (the sender side must be dropped).
    pub async fn join(self) {
        let _ = self.handle.await;
    }

    /// Abort the background task.
    pub fn abort(self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use tessera::format::FormatTag;

    struct StaticProvider {
        payload: ArtworkPayload,
    }

    #[async_trait::async_trait]
    impl PayloadProvider for StaticProvider {
        async fn fetch_payload(&self, _contract: &str) -> anyhow::Result<ArtworkPayload> {
            Ok(self.payload.clone())
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        resolved: StdMutex<Vec<(String, ResolvedArtwork)>>,
        notify: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl ResolvedStore for RecordingStore {
        async fn store_resolved(
            &self,
            contract: &str,
            artwork: &ResolvedArtwork,
        ) -> anyhow::Result<()> {
            self.resolved
                .lock()
                .unwrap()
                .push((contract.to_string(), artwork.clone()));
            self.notify.notify_one();
            Ok(())
        }
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    #[tokio::test]
    async fn test_service_resolves_and_stores() {
        init_tracing();
        let provider = Arc::new(StaticProvider {
            payload: ArtworkPayload::Bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]),
        });
        let store = Arc::new(RecordingStore::default());
        let registry = Arc::new(ResourceRegistry::with_data_urls());

        let (sender, service) =
            ArtworkService::spawn(provider, store.clone(), registry.clone(), 8, 4);

        sender.request_update("0xabc").await;
        store.notify.notified().await;

        let resolved = store.resolved.lock().unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, "0xabc");
        assert_eq!(resolved[0].1.display_format, FormatTag::Jpeg);
        assert_eq!(registry.active_count(), 1);
        drop(resolved);

        drop(sender);
        service.join().await;
    }

    #[tokio::test]
    async fn test_distinct_contracts_resolve_independently() {
        init_tracing();
        let provider = Arc::new(StaticProvider {
            payload: ArtworkPayload::Bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]),
        });
        let store = Arc::new(RecordingStore::default());
        let registry = Arc::new(ResourceRegistry::with_data_urls());

        let (sender, service) =
            ArtworkService::spawn(provider, store.clone(), registry.clone(), 8, 4);

        sender.request_update("0xaaa").await;
        sender.request_update("0xbbb").await;
        while store.resolved.lock().unwrap().len() < 2 {
            store.notify.notified().await;
        }
        drop(sender);
        service.join().await;

        let resolved = store.resolved.lock().unwrap();
        let mut contracts: Vec<_> = resolved.iter().map(|(c, _)| c.clone()).collect();
        contracts.sort();
        assert_eq!(contracts, vec!["0xaaa", "0xbbb"]);
        // One resource per identity, neither superseding the other.
        assert_eq!(registry.active_count(), 2);
    }

    #[tokio::test]
    async fn test_repeated_requests_keep_one_active_resource() {
        init_tracing();
        let provider = Arc::new(StaticProvider {
            payload: ArtworkPayload::from("0x89504e470d0a1a0a"),
        });
        let store = Arc::new(RecordingStore::default());
        let registry = Arc::new(ResourceRegistry::with_data_urls());

        let (sender, service) =
            ArtworkService::spawn(provider, store.clone(), registry.clone(), 8, 1);

        for _ in 0..5 {
            sender.request_update("0xabc").await;
        }

        // Wait until at least one resolution landed, then quiesce.
        store.notify.notified().await;
        drop(sender);
        service.join().await;

        assert_eq!(registry.active_count(), 1);
        let resolved = store.resolved.lock().unwrap();
        assert!(!resolved.is_empty());
        assert!(resolved.iter().all(|(c, _)| c == "0xabc"));
        assert!(resolved
            .iter()
            .all(|(_, a)| a.display_format == FormatTag::Png));
    }
}
