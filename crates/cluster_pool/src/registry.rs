use std::sync::Arc;

use fleet_core::managed_cluster::ManagedCluster;
use futures::StreamExt;
use kube::api::{Api, ListParams};
use kube::runtime::watcher;
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::pool::ClientPool;

/// Drives [`ClientPool::sync`] from the `ManagedCluster` registry: a watch
/// stream for near-real-time membership change, plus a periodic full list as
/// a backstop against missed watch events (§4.1 "Membership sync").
pub struct RegistryWatcher {
    api: Api<ManagedCluster>,
    pool: Arc<ClientPool>,
    secret_client: Client,
    namespace: String,
}

impl RegistryWatcher {
    pub fn new(client: Client, pool: Arc<ClientPool>, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            api: Api::namespaced(client.clone(), &namespace),
            pool,
            secret_client: client,
            namespace,
        }
    }

    /// Runs until `cancel` is cancelled, interleaving watch-driven syncs with
    /// a periodic full-list sync every `full_sync_interval`.
    pub async fn run(&self, cancel: CancellationToken, full_sync_interval: std::time::Duration) {
        self.sync_once().await;

        let mut ticker = tokio::time::interval(full_sync_interval);
        let mut watch = watcher(self.api.clone(), watcher::Config::default()).boxed();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("registry watcher shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    self.sync_once().await;
                }
                event = watch.next() => {
                    match event {
                        Some(Ok(_)) => self.sync_once().await,
                        Some(Err(e)) => warn!(error = %e, "registry watch stream error; relying on next periodic sync"),
                        None => {
                            warn!("registry watch stream ended; relying on periodic sync");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn sync_once(&self) {
        match self.api.list(&ListParams::default()).await {
            Ok(list) => {
                let report = self.pool.sync(&list.items, &self.namespace, &self.secret_client).await;
                if !report.added.is_empty() || !report.removed.is_empty() || !report.build_failures.is_empty() {
                    info!(
                        added = ?report.added,
                        removed = ?report.removed,
                        failures = report.build_failures.len(),
                        "pool membership synced"
                    );
                }
            }
            Err(e) => warn!(error = %e, "failed to list managed clusters; will retry"),
        }
    }
}
