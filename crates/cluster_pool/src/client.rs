use std::sync::RwLock;

use chrono::{DateTime, Utc};
use fleet_core::managed_cluster::{GpuCapacity, ResourceCounts};
use fleet_core::CircuitBreaker;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Measured facts about a cluster, refreshed by the health supervisor or a
/// heartbeat POST (SPEC_FULL §3, §10 "heartbeat ingestion").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterFacts {
    pub kubernetes_version: Option<String>,
    pub ngf_version: Option<String>,
    pub resource_counts: ResourceCounts,
    pub gpu_capacity: GpuCapacity,
}

const DEFAULT_BREAKER_THRESHOLD: u32 = 3;
const DEFAULT_BREAKER_RESET: Duration = Duration::from_secs(30);

/// One per registered cluster. Exclusively owned by [`crate::ClientPool`];
/// callers only ever see a borrowed `Arc<ClusterClient>` (§3).
pub struct ClusterClient {
    name: String,
    client: Option<kube::Client>,
    facts: RwLock<ClusterFacts>,
    healthy: RwLock<bool>,
    last_check: RwLock<Option<DateTime<Utc>>>,
    breaker: CircuitBreaker,
}

impl std::fmt::Debug for ClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterClient")
            .field("name", &self.name)
            .field("healthy", &self.healthy)
            .field("last_check", &self.last_check)
            .finish()
    }
}

impl PartialEq for ClusterClient {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl ClusterClient {
    pub fn new(name: impl Into<String>, client: Option<kube::Client>) -> Self {
        Self::with_breaker(name, client, DEFAULT_BREAKER_THRESHOLD, DEFAULT_BREAKER_RESET)
    }

    pub fn with_breaker(
        name: impl Into<String>,
        client: Option<kube::Client>,
        breaker_threshold: u32,
        breaker_reset: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            facts: RwLock::new(ClusterFacts::default()),
            healthy: RwLock::new(false),
            last_check: RwLock::new(None),
            breaker: CircuitBreaker::new(breaker_threshold, breaker_reset),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> Option<&kube::Client> {
        self.client.as_ref()
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn facts(&self) -> ClusterFacts {
        self.facts.read().expect("facts lock poisoned").clone()
    }

    pub fn is_healthy(&self) -> bool {
        *self.healthy.read().expect("healthy lock poisoned")
    }

    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        *self.last_check.read().expect("last_check lock poisoned")
    }

    /// Applies freshly-measured facts, marks the client healthy, and stamps
    /// `last_check`. Used by both the health supervisor's success path and
    /// heartbeat ingestion (§10).
    pub fn apply_facts(&self, facts: ClusterFacts) {
        *self.facts.write().expect("facts lock poisoned") = facts;
        *self.healthy.write().expect("healthy lock poisoned") = true;
        *self.last_check.write().expect("last_check lock poisoned") = Some(Utc::now());
    }

    /// Marks the client unhealthy without discarding previously measured
    /// facts, and stamps `last_check` so staleness is still observable.
    pub fn mark_unhealthy(&self) {
        *self.healthy.write().expect("healthy lock poisoned") = false;
        *self.last_check.write().expect("last_check lock poisoned") = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unhealthy_with_empty_facts() {
        let client = ClusterClient::new("prod-a", None);
        assert!(!client.is_healthy());
        assert!(client.last_check().is_none());
        assert_eq!(client.facts().kubernetes_version, None);
    }

    #[test]
    fn apply_facts_marks_healthy_and_stamps_last_check() {
        let client = ClusterClient::new("prod-a", None);
        let mut facts = ClusterFacts::default();
        facts.kubernetes_version = Some("v1.30.0".to_string());
        client.apply_facts(facts);

        assert!(client.is_healthy());
        assert!(client.last_check().is_some());
        assert_eq!(client.facts().kubernetes_version, Some("v1.30.0".to_string()));
    }

    #[test]
    fn mark_unhealthy_preserves_facts() {
        let client = ClusterClient::new("prod-a", None);
        let mut facts = ClusterFacts::default();
        facts.kubernetes_version = Some("v1.30.0".to_string());
        client.apply_facts(facts);

        client.mark_unhealthy();
        assert!(!client.is_healthy());
        assert_eq!(client.facts().kubernetes_version, Some("v1.30.0".to_string()));
    }
}
