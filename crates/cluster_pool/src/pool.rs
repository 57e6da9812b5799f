use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use fleet_core::managed_cluster::ManagedCluster;
use fleet_core::validation::is_valid_cluster_name;
use fleet_core::BreakerState;
use kube::ResourceExt;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, warn};

use crate::build::build_client;
use crate::client::ClusterClient;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PoolError {
    #[error("cluster '{0}' is not registered")]
    NotFound(String),
    #[error("cluster '{0}' circuit is open")]
    CircuitOpen(String),
    #[error("no default cluster is configured")]
    NoDefault,
}

/// Outcome of one [`ClientPool::sync`] pass, useful for logging/metrics.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub build_failures: Vec<(String, String)>,
}

/// Holds the set of live [`ClusterClient`]s. Exclusively owns them; callers
/// only ever borrow an `Arc` (§3, §5 "Shared-resource policy").
pub struct ClientPool {
    clients: RwLock<HashMap<String, Arc<ClusterClient>>>,
    default_name: Option<String>,
    /// Serializes membership mutation only, never held across client
    /// construction (§4.1 "Concurrent sync invocations").
    sync_lock: AsyncMutex<()>,
}

impl ClientPool {
    pub fn new(default_name: Option<String>) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            default_name,
            sync_lock: AsyncMutex::new(()),
        }
    }

    /// Reconciles pool membership against the registry snapshot `managed`.
    /// `secret_reader` is the local client used to read kubeconfig secrets.
    pub async fn sync(&self, managed: &[ManagedCluster], secret_namespace: &str, secret_reader: &kube::Client) -> SyncReport {
        let _guard = self.sync_lock.lock().await;
        let mut report = SyncReport::default();

        let existing_names: Vec<String> = {
            let clients = self.clients.read().expect("pool lock poisoned");
            clients.keys().cloned().collect()
        };

        let registry_names: Vec<String> = managed
            .iter()
            .map(|m| m.name_any())
            .filter(|name| {
                if is_valid_cluster_name(name) {
                    true
                } else {
                    warn!(cluster = %name, "skipping managed cluster with invalid name");
                    false
                }
            })
            .collect();

        for removed in existing_names.iter().filter(|n| !registry_names.contains(n)) {
            self.clients.write().expect("pool lock poisoned").remove(removed);
            report.removed.push(removed.clone());
        }

        for m in managed {
            let name = m.name_any();
            if !is_valid_cluster_name(&name) {
                continue;
            }
            let already_present = self.clients.read().expect("pool lock poisoned").contains_key(&name);
            if already_present {
                continue;
            }

            match build_client(m, secret_namespace, secret_reader).await {
                Ok(client) => {
                    let cluster_client = Arc::new(ClusterClient::new(name.clone(), Some(client)));
                    self.clients
                        .write()
                        .expect("pool lock poisoned")
                        .insert(name.clone(), cluster_client);
                    report.added.push(name);
                }
                Err(e) => {
                    error!(cluster = %name, error = %e, "failed to build client; will retry next sync");
                    report.build_failures.push((name, e.to_string()));
                }
            }
        }

        report
    }

    /// Fails with `NotFound` if unknown, `CircuitOpen` if the breaker is open.
    /// Half-open clusters are returned; the caller's attempt is the probe (§4.1).
    pub fn get(&self, name: &str) -> Result<Arc<ClusterClient>, PoolError> {
        let clients = self.clients.read().expect("pool lock poisoned");
        let client = clients.get(name).cloned().ok_or_else(|| PoolError::NotFound(name.to_string()))?;
        drop(clients);

        if client.breaker().state() == BreakerState::Open {
            return Err(PoolError::CircuitOpen(name.to_string()));
        }
        Ok(client)
    }

    pub fn default(&self) -> Result<Arc<ClusterClient>, PoolError> {
        let name = self.default_name.as_ref().ok_or(PoolError::NoDefault)?;
        self.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.read().expect("pool lock poisoned").keys().cloned().collect();
        names.sort();
        names
    }

    pub fn list(&self) -> Vec<Arc<ClusterClient>> {
        self.clients.read().expect("pool lock poisoned").values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::managed_cluster::ManagedClusterSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn local_cluster(name: &str) -> ManagedCluster {
        ManagedCluster {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: ManagedClusterSpec {
                is_local: true,
                display_name: name.to_string(),
                region: "local".to_string(),
                environment: "dev".to_string(),
                ..Default::default()
            },
            status: None,
        }
    }

    #[test]
    fn get_unknown_cluster_is_not_found() {
        let pool = ClientPool::new(None);
        assert_eq!(pool.get("nope"), Err(PoolError::NotFound("nope".to_string())));
    }

    #[test]
    fn default_without_configuration_errors() {
        let pool = ClientPool::new(None);
        assert_eq!(pool.default(), Err(PoolError::NoDefault));
    }

    #[test]
    fn names_reflects_inserted_clients() {
        let pool = ClientPool::new(None);
        pool.clients
            .write()
            .unwrap()
            .insert("b".to_string(), Arc::new(ClusterClient::new("b", None)));
        pool.clients
            .write()
            .unwrap()
            .insert("a".to_string(), Arc::new(ClusterClient::new("a", None)));
        assert_eq!(pool.names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn invalid_name_is_rejected_at_filter() {
        let invalid = local_cluster("Not_Valid");
        assert!(!is_valid_cluster_name(&invalid.name_any()));
    }
}
