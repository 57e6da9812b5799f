use fleet_core::ChildStatus;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub static GATEWAY_BUNDLE_FINALIZER: &str = "gwfabric.dev/gateway-bundle-finalizer";

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListenerProtocol {
    Http,
    Https,
    Tls,
    Tcp,
    Udp,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum TlsMode {
    Terminate,
    Passthrough,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct CertificateRef {
    pub name: String,
    pub namespace: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema)]
pub struct TlsConfig {
    pub mode: TlsMode,
    #[serde(default)]
    pub certificate_refs: Vec<CertificateRef>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct AllowedRoutesPolicy {
    #[serde(default)]
    pub namespaces_from: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema)]
pub struct Listener {
    pub name: String,
    pub port: i32,
    pub protocol: ListenerProtocol,
    pub hostname: Option<String>,
    pub tls: Option<TlsConfig>,
    pub allowed_routes: Option<AllowedRoutesPolicy>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct EnterpriseAddons {
    #[serde(default)]
    pub waf_enabled: bool,
    #[serde(default)]
    pub advanced_metrics_enabled: bool,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[cfg_attr(test, derive(Default))]
#[kube(
    kind = "GatewayBundle",
    group = "gwfabric.dev",
    version = "v1alpha1",
    shortname = "gwbundle",
    namespaced
)]
#[kube(status = "GatewayBundleStatus")]
pub struct GatewayBundleSpec {
    pub gateway_class_name: String,
    pub listeners: Vec<Listener>,
    pub enterprise: Option<EnterpriseAddons>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct GatewayBundleStatus {
    #[schemars(schema_with = "crate::api::v1alpha1::conditions_schema")]
    pub conditions: Vec<Condition>,
    pub phase: Option<String>,
    #[serde(default)]
    pub children: Vec<ChildStatus>,
    pub observed_spec_hash: Option<String>,
    pub last_reconciled: Option<chrono::DateTime<chrono::Utc>>,
    pub gateway_address: Option<String>,
}
