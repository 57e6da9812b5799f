use std::collections::BTreeMap;

use fleet_core::ChildStatus;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Client;
use serde_json::json;

use crate::api::v1alpha1::inference_stack::InferenceStackSpec;
use crate::discovery::{CrdAvailability, OptionalKind};
use crate::materializers::common::{child_name, ensure_unstructured};

/// `<stack>-pool`: the extension-group InferencePool fronting the stack's
/// replicas, with the EPP ConfigMap's owning service as its endpoint picker
/// reference (§4.3).
pub async fn materialize(
    client: &Client,
    namespace: &str,
    stack_name: &str,
    spec: &InferenceStackSpec,
    owner: &OwnerReference,
    availability: &CrdAvailability,
) -> ChildStatus {
    let name = child_name(stack_name, "pool");

    let Some((ar, caps)) = availability.resource(OptionalKind::InferencePool) else {
        return ChildStatus::not_configured("InferencePool", &name);
    };

    let selector = if spec.pool.selector_labels.is_empty() {
        serde_json::Map::from_iter([("app".to_string(), json!(stack_name))])
    } else {
        spec.pool
            .selector_labels
            .iter()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect()
    };

    let desired_spec = json!({
        "selector": selector,
        "targetPort": spec.serving_backend.default_port(),
        "endpointPickerRef": { "name": child_name(stack_name, "epp-config") },
        "failureMode": "FailClose",
    });

    ensure_unstructured(
        client,
        ar,
        caps,
        namespace,
        "InferencePool",
        &name,
        desired_spec,
        owner,
        BTreeMap::new(),
    )
    .await
}
