use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::API_GROUP;

pub static MANAGED_CLUSTER_FINALIZER: &str = "gwfabric.dev/managed-cluster-finalizer";

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct SecretRef {
    pub name: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct AgentConfig {
    #[serde(default = "default_heartbeat_interval_seconds")]
    pub heartbeat_interval_seconds: u32,
    pub otel_endpoint: Option<String>,
}

fn default_heartbeat_interval_seconds() -> u32 {
    30
}

/// Generates the Kubernetes wrapper struct `ManagedCluster` from our Spec and Status
/// struct; this is the hook `crdgen` uses to emit the CRD YAML.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    kind = "ManagedCluster",
    group = "gwfabric.dev",
    version = "v1alpha1",
    shortname = "mcluster",
    namespaced
)]
#[kube(status = "ManagedClusterStatus")]
pub struct ManagedClusterSpec {
    pub display_name: String,
    pub region: String,
    pub environment: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Mandatory when `is_local = false`.
    pub kubeconfig_secret_ref: Option<SecretRef>,
    pub prometheus_secret_ref: Option<SecretRef>,
    #[serde(default)]
    pub is_local: bool,
    /// Manual edition override; absent means "detect via the edition cache".
    pub ngf_edition: Option<String>,
    #[serde(default)]
    pub agent_config: AgentConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum ClusterRegistryPhase {
    Pending,
    Connecting,
    Ready,
    Degraded,
    Unreachable,
    Terminating,
}

impl std::fmt::Display for ClusterRegistryPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
pub struct ResourceCounts {
    #[serde(default)]
    pub gateways: i32,
    #[serde(default)]
    pub http_routes: i32,
    #[serde(default)]
    pub inference_pools: i32,
    #[serde(default)]
    pub inference_stacks: i32,
    #[serde(default)]
    pub gateway_bundles: i32,
    #[serde(default)]
    pub services: i32,
    #[serde(default)]
    pub namespaces: i32,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
pub struct GpuCapacity {
    #[serde(default)]
    pub total_gpus: i64,
    #[serde(default)]
    pub allocated_gpus: i64,
    #[serde(default)]
    pub gpu_types: BTreeMap<String, i64>,
}

impl GpuCapacity {
    pub fn merge(&mut self, other: &GpuCapacity) {
        self.total_gpus += other.total_gpus;
        self.allocated_gpus += other.allocated_gpus;
        for (kind, count) in &other.gpu_types {
            *self.gpu_types.entry(kind.clone()).or_insert(0) += count;
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
pub struct ManagedClusterStatus {
    #[schemars(schema_with = "conditions_schema")]
    pub conditions: Vec<Condition>,
    pub phase: Option<String>,
    pub kubernetes_version: Option<String>,
    pub ngf_version: Option<String>,
    #[serde(default)]
    pub agent_installed: bool,
    pub last_heartbeat: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub resource_counts: ResourceCounts,
    #[serde(default)]
    pub gpu_capacity: GpuCapacity,
}

pub fn api_group_version() -> String {
    format!("{API_GROUP}/v1alpha1")
}

fn conditions_schema(_: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
    serde_json::from_value(serde_json::json!({
        "type": "array",
        "x-kubernetes-list-type": "map",
        "x-kubernetes-list-map-keys": ["type"],
        "items": {
            "type": "object",
            "properties": {
                "lastTransitionTime": { "format": "date-time", "type": "string" },
                "message": { "type": "string" },
                "observedGeneration": { "type": "integer", "format": "int64", "default": 0 },
                "reason": { "type": "string" },
                "status": { "type": "string" },
                "type": { "type": "string" }
            },
            "required": ["lastTransitionTime", "message", "reason", "status", "type"],
        },
    }))
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_capacity_merges_per_type_counts() {
        let mut total = GpuCapacity::default();
        let mut a = GpuCapacity::default();
        a.total_gpus = 4;
        a.allocated_gpus = 2;
        a.gpu_types.insert("a100".to_string(), 4);

        let mut b = GpuCapacity::default();
        b.total_gpus = 8;
        b.allocated_gpus = 8;
        b.gpu_types.insert("a100".to_string(), 4);
        b.gpu_types.insert("h100".to_string(), 4);

        total.merge(&a);
        total.merge(&b);

        assert_eq!(total.total_gpus, 12);
        assert_eq!(total.allocated_gpus, 10);
        assert_eq!(total.gpu_types.get("a100"), Some(&8));
        assert_eq!(total.gpu_types.get("h100"), Some(&4));
    }
}
