use fleet_core::ChildStatus;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub static INFERENCE_STACK_FINALIZER: &str = "gwfabric.dev/inference-stack-finalizer";

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[cfg_attr(test, derive(Default))]
#[serde(rename_all = "lowercase")]
pub enum ServingBackend {
    #[cfg_attr(test, default)]
    Vllm,
    Triton,
    Tgi,
    Ollama,
}

impl ServingBackend {
    /// Default target port for the backend's serving protocol. Total over
    /// the enumerated set; an unrecognized variant cannot occur because the
    /// enum itself is the closed set (§4.3).
    pub fn default_port(self) -> i32 {
        match self {
            ServingBackend::Vllm => 8000,
            ServingBackend::Triton => 8001,
            ServingBackend::Tgi => 80,
            ServingBackend::Ollama => 11434,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct PoolSpec {
    pub gpu_type: String,
    #[serde(default = "default_gpus_per_replica")]
    pub gpus_per_replica: i32,
    #[serde(default = "default_replicas")]
    pub replicas: i32,
    #[serde(default = "default_replicas")]
    pub min_replicas: i32,
    #[serde(default = "default_max_replicas")]
    pub max_replicas: i32,
    #[serde(default)]
    pub selector_labels: std::collections::BTreeMap<String, String>,
}

fn default_gpus_per_replica() -> i32 {
    1
}
fn default_replicas() -> i32 {
    1
}
fn default_max_replicas() -> i32 {
    1
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EndpointPickerStrategy {
    LeastQueue,
    KvCache,
    PrefixAffinity,
    Composite,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct EndpointPickerSpec {
    pub strategy: Option<EndpointPickerStrategy>,
    /// Non-negative weight tuple, meaning depends on `strategy`.
    #[serde(default)]
    pub weights: Vec<u32>,
    pub model_name: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema)]
pub struct AutoscalingTrigger {
    pub metric_name: String,
    pub threshold: String,
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u32,
}

fn default_cooldown_seconds() -> u32 {
    300
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct AutoscalingSpec {
    #[serde(default)]
    pub triggers: Vec<AutoscalingTrigger>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct RouteSpec {
    pub gateway_name: String,
    pub gateway_namespace: Option<String>,
    #[serde(default)]
    pub hostnames: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct DcgmSpec {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[cfg_attr(test, derive(Default))]
#[kube(
    kind = "InferenceStack",
    group = "gwfabric.dev",
    version = "v1alpha1",
    shortname = "infstack",
    namespaced
)]
#[kube(status = "InferenceStackStatus")]
pub struct InferenceStackSpec {
    pub model: String,
    pub serving_backend: ServingBackend,
    pub pool: PoolSpec,
    #[serde(default)]
    pub endpoint_picker: EndpointPickerSpec,
    pub autoscaling: Option<AutoscalingSpec>,
    pub route: Option<RouteSpec>,
    pub dcgm: Option<DcgmSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct InferenceStackStatus {
    #[schemars(schema_with = "crate::api::v1alpha1::conditions_schema")]
    pub conditions: Vec<Condition>,
    pub phase: Option<String>,
    #[serde(default)]
    pub children: Vec<ChildStatus>,
    pub observed_spec_hash: Option<String>,
    pub last_reconciled: Option<chrono::DateTime<chrono::Utc>>,
}
