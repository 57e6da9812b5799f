use std::collections::BTreeMap;

use fleet_core::ChildStatus;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Client;
use serde_json::json;

use crate::api::v1alpha1::inference_stack::InferenceStackSpec;
use crate::discovery::{CrdAvailability, OptionalKind};
use crate::materializers::common::{child_name, ensure_unstructured};

/// `<stack>-scaler`: one trigger per threshold entry, only when the stack
/// declares an autoscaling spec (§4.3).
pub async fn materialize(
    client: &Client,
    namespace: &str,
    stack_name: &str,
    spec: &InferenceStackSpec,
    owner: &OwnerReference,
    availability: &CrdAvailability,
) -> ChildStatus {
    let name = child_name(stack_name, "scaler");

    let Some(autoscaling) = spec.autoscaling.as_ref() else {
        return ChildStatus::not_configured("Autoscaler", &name);
    };

    let Some((ar, caps)) = availability.resource(OptionalKind::Autoscaler) else {
        return ChildStatus::not_configured("Autoscaler", &name);
    };

    let triggers: Vec<_> = autoscaling
        .triggers
        .iter()
        .map(|t| {
            json!({
                "metricName": t.metric_name,
                "threshold": t.threshold,
                "cooldownSeconds": t.cooldown_seconds,
            })
        })
        .collect();

    let desired_spec = json!({
        "scaleTargetRef": { "name": child_name(stack_name, "pool") },
        "minReplicaCount": spec.pool.min_replicas,
        "maxReplicaCount": spec.pool.max_replicas,
        "triggers": triggers,
    });

    ensure_unstructured(
        client,
        ar,
        caps,
        namespace,
        "Autoscaler",
        &name,
        desired_spec,
        owner,
        BTreeMap::new(),
    )
    .await
}
