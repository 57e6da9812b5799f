use std::collections::BTreeMap;

use fleet_core::ChildStatus;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Client;
use serde_json::json;

use crate::api::v1alpha1::inference_stack::InferenceStackSpec;
use crate::discovery::{CrdAvailability, OptionalKind};
use crate::materializers::common::{child_name, ensure_unstructured};

/// `<stack>-route`: a single-rule HTTPRoute pointing to the stack's pool
/// through the extension group+kind reference (§4.3).
pub async fn materialize(
    client: &Client,
    namespace: &str,
    stack_name: &str,
    spec: &InferenceStackSpec,
    owner: &OwnerReference,
    availability: &CrdAvailability,
) -> ChildStatus {
    let name = child_name(stack_name, "route");

    let Some(route) = spec.route.as_ref() else {
        return ChildStatus::not_configured("Route", &name);
    };

    let Some((ar, caps)) = availability.resource(OptionalKind::HttpRoute) else {
        return ChildStatus::not_configured("Route", &name);
    };

    let desired_spec = json!({
        "parentRefs": [{
            "name": route.gateway_name,
            "namespace": route.gateway_namespace,
        }],
        "hostnames": route.hostnames,
        "rules": [{
            "backendRefs": [{
                "group": "inference.networking.k8s.io",
                "kind": "InferencePool",
                "name": child_name(stack_name, "pool"),
            }]
        }],
    });

    ensure_unstructured(
        client,
        ar,
        caps,
        namespace,
        "Route",
        &name,
        desired_spec,
        owner,
        BTreeMap::new(),
    )
    .await
}
