use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleet_core::managed_cluster::{
    ClusterRegistryPhase, GpuCapacity, ManagedCluster, ManagedClusterStatus, ResourceCounts,
};
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::discovery::Discovery;
use kube::Client;
use serde_json::json;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::{ClusterClient, ClusterFacts};
use crate::edition::{Edition, EditionCache};
use crate::pool::ClientPool;

const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);
const PER_CHECK_DEADLINE: Duration = Duration::from_secs(5);
const MAX_IN_FLIGHT: usize = 10;

/// CRD kinds that only ship with the enterprise edition of the gateway
/// software; their presence in cluster discovery is the sole edition signal
/// (§4.1 "Edition cache").
const ENTERPRISE_ONLY_KINDS: &[&str] = &["NginxProxy", "WAFPolicy"];

#[derive(Error, Debug)]
enum ProbeError {
    #[error("cluster has no live client")]
    NoClient,
    #[error("kube api error: {0}")]
    Kube(#[from] kube::Error),
}

/// Runs the periodic health-check fan-out over a [`ClientPool`] (§4.1).
pub struct HealthSupervisor {
    pool: Arc<ClientPool>,
    local_client: Client,
    namespace: String,
    interval: Duration,
    semaphore: Arc<Semaphore>,
    editions: Arc<EditionCache>,
}

impl HealthSupervisor {
    pub fn new(pool: Arc<ClientPool>, local_client: Client, namespace: impl Into<String>) -> Self {
        Self::with_interval(
            pool,
            local_client,
            namespace,
            DEFAULT_CHECK_INTERVAL,
            MAX_IN_FLIGHT,
            Arc::new(EditionCache::new()),
        )
    }

    pub fn with_interval(
        pool: Arc<ClientPool>,
        local_client: Client,
        namespace: impl Into<String>,
        interval: Duration,
        concurrency: usize,
        editions: Arc<EditionCache>,
    ) -> Self {
        Self {
            pool,
            local_client,
            namespace: namespace.into(),
            interval,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            editions,
        }
    }

    pub fn editions(&self) -> Arc<EditionCache> {
        self.editions.clone()
    }

    /// Runs until `cancel` is cancelled. Each tick fans a check out per
    /// registered client, bounded by the semaphore (§4.1).
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("health supervisor shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    self.check_all(&self.editions).await;
                }
            }
        }
    }

    pub async fn check_all(&self, editions: &Arc<EditionCache>) {
        let clients = self.pool.list();
        let mut handles = Vec::with_capacity(clients.len());

        for client in clients {
            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let local_client = self.local_client.clone();
            let namespace = self.namespace.clone();
            let editions = editions.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                check_one(&client, &local_client, &namespace, &editions).await;
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Runs a single out-of-band probe for one named cluster, bypassing the
    /// ticker; used by the manual "test connection" endpoint (§6).
    pub async fn check_now(&self, name: &str) -> Result<(), crate::pool::PoolError> {
        let client = self.pool.get(name)?;
        let _permit = self.semaphore.clone().acquire_owned().await.ok();
        check_one(&client, &self.local_client, &self.namespace, &self.editions).await;
        Ok(())
    }
}

fn classify_edition(discovery: &Discovery) -> Edition {
    let found = discovery.groups().any(|group| {
        group
            .recommended_resources()
            .iter()
            .any(|(resource, _)| ENTERPRISE_ONLY_KINDS.contains(&resource.kind.as_str()))
    });
    if found {
        Edition::Enterprise
    } else {
        Edition::Community
    }
}

async fn check_one(client: &Arc<ClusterClient>, local_client: &Client, namespace: &str, editions: &EditionCache) {
    match tokio::time::timeout(PER_CHECK_DEADLINE, probe(client)).await {
        Ok(Ok((facts, discovery))) => {
            client.apply_facts(facts.clone());
            client.breaker().record_success();
            if let Some(discovery) = discovery.as_ref() {
                editions.set(client.name(), classify_edition(discovery));
            }
            publish_status(local_client, namespace, client.name(), ClusterRegistryPhase::Ready, Some(&facts)).await;
        }
        Ok(Err(e)) => {
            warn!(cluster = client.name(), error = %e, "health check failed");
            client.mark_unhealthy();
            client.breaker().record_failure();
            publish_status(local_client, namespace, client.name(), ClusterRegistryPhase::Unreachable, None).await;
        }
        Err(_) => {
            warn!(cluster = client.name(), "health check timed out");
            client.mark_unhealthy();
            client.breaker().record_failure();
            publish_status(local_client, namespace, client.name(), ClusterRegistryPhase::Unreachable, None).await;
        }
    }
}

/// Steps (a)-(d) of §4.1: reachability, server version, resource counts,
/// gateway-class controller scan. Also returns the discovery document used
/// for (c), so the caller can classify the cluster's edition from the same
/// probe instead of running discovery twice.
async fn probe(client: &Arc<ClusterClient>) -> Result<(ClusterFacts, Option<Discovery>), ProbeError> {
    let remote = client.client().ok_or(ProbeError::NoClient)?;

    // (a) lightweight reachability probe.
    let namespaces: Api<Namespace> = Api::all(remote.clone());
    namespaces.list(&ListParams::default().limit(1)).await?;

    // (b) discovery-style server version query.
    let version = remote.apiserver_version().await.ok();

    // (c) counts of observed kinds via API discovery; a cluster with no
    // matching CRDs installed simply reports zero counts.
    let discovery = Discovery::new(remote.clone()).run().await.ok();
    let resource_counts = discovery.as_ref().map(count_resources).unwrap_or_default();

    // (d) gateway-class controller scan needs the Gateway API installed;
    // its absence degrades to `None`, never an error.
    let ngf_version = None;

    let facts = ClusterFacts {
        kubernetes_version: version.map(|v| v.git_version),
        ngf_version,
        resource_counts,
        gpu_capacity: GpuCapacity::default(),
    };
    Ok((facts, discovery))
}

fn count_resources(discovery: &Discovery) -> ResourceCounts {
    let mut counts = ResourceCounts::default();
    for group in discovery.groups() {
        for (resource, _caps) in group.recommended_resources() {
            match resource.kind.as_str() {
                "Gateway" => counts.gateways += 1,
                "HTTPRoute" => counts.http_routes += 1,
                "InferencePool" => counts.inference_pools += 1,
                _ => {}
            }
        }
    }
    counts
}

async fn publish_status(
    local_client: &Client,
    namespace: &str,
    cluster_name: &str,
    phase: ClusterRegistryPhase,
    facts: Option<&ClusterFacts>,
) {
    let api: Api<ManagedCluster> = Api::namespaced(local_client.clone(), namespace);

    let mut status = ManagedClusterStatus {
        phase: Some(phase.to_string()),
        last_heartbeat: Some(Utc::now()),
        ..Default::default()
    };
    if let Some(facts) = facts {
        status.kubernetes_version = facts.kubernetes_version.clone();
        status.ngf_version = facts.ngf_version.clone();
        status.resource_counts = facts.resource_counts.clone();
        status.gpu_capacity = facts.gpu_capacity.clone();
    }

    let patch = Patch::Merge(json!({ "status": status }));
    if let Err(e) = api.patch_status(cluster_name, &PatchParams::default(), &patch).await {
        warn!(cluster = cluster_name, error = %e, "failed to publish health status; will retry next tick");
    }
}
