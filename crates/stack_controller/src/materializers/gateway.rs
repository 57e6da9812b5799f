use fleet_core::ChildStatus;
use kube::api::{Api, DynamicObject};
use kube::{Client, ResourceExt};
use serde_json::json;

use crate::api::v1alpha1::gateway_bundle::GatewayBundleSpec;
use crate::discovery::{CrdAvailability, OptionalKind};
use crate::materializers::common::ensure_unstructured;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

/// `<bundle>`: the Gateway API Gateway, listeners translated field-for-field
/// (§4.3). Readiness requires both `Accepted` and `Programmed` True.
pub async fn materialize(
    client: &Client,
    namespace: &str,
    bundle_name: &str,
    spec: &GatewayBundleSpec,
    owner: &OwnerReference,
    availability: &CrdAvailability,
) -> ChildStatus {
    let Some((ar, caps)) = availability.resource(OptionalKind::Gateway) else {
        return ChildStatus::not_configured("Gateway", bundle_name);
    };

    let listeners: Vec<_> = spec
        .listeners
        .iter()
        .map(|l| {
            json!({
                "name": l.name,
                "port": l.port,
                "protocol": format!("{:?}", l.protocol).to_uppercase(),
                "hostname": l.hostname,
                "tls": l.tls.as_ref().map(|t| json!({
                    "mode": format!("{:?}", t.mode),
                    "certificateRefs": t.certificate_refs.iter().map(|c| json!({
                        "name": c.name,
                        "namespace": c.namespace,
                    })).collect::<Vec<_>>(),
                })),
                "allowedRoutes": l.allowed_routes.as_ref().map(|a| json!({
                    "namespaces": { "from": a.namespaces_from },
                })),
            })
        })
        .collect();

    let mut labels = std::collections::BTreeMap::new();
    labels.insert("managed-by".to_string(), "gwfabric-stack-controller".to_string());
    labels.insert("bundle".to_string(), bundle_name.to_string());

    let desired_spec = json!({
        "gatewayClassName": spec.gateway_class_name,
        "listeners": listeners,
    });

    let status = ensure_unstructured(
        client,
        ar,
        caps,
        namespace,
        "Gateway",
        bundle_name,
        desired_spec,
        owner,
        labels,
    )
    .await;

    if !status.ready {
        return status;
    }

    let api: Api<DynamicObject> = Api::namespaced_with(client.clone(), namespace, ar);
    match api.get(bundle_name).await {
        Ok(obj) => {
            if gateway_conditions_ready(&obj) {
                status
            } else {
                ChildStatus::new("Gateway", obj.name_any(), false, "waiting for gateway controller")
            }
        }
        Err(_) => status,
    }
}

fn gateway_conditions_ready(obj: &DynamicObject) -> bool {
    let conditions = obj
        .data
        .get("status")
        .and_then(|s| s.get("conditions"))
        .and_then(|c| c.as_array());

    let Some(conditions) = conditions else {
        return false;
    };

    ["Accepted", "Programmed"].iter().all(|needed| {
        conditions.iter().any(|c| {
            c.get("type").and_then(|t| t.as_str()) == Some(needed)
                && c.get("status").and_then(|s| s.as_str()) == Some("True")
        })
    })
}

/// Learned listener address, if the Gateway controller has published one;
/// copied into `status.gatewayAddress` by the reconciler (§4.2 step 7).
pub fn first_advertised_address(obj: &DynamicObject) -> Option<String> {
    obj.data
        .get("status")
        .and_then(|s| s.get("addresses"))
        .and_then(|a| a.as_array())
        .and_then(|a| a.first())
        .and_then(|a| a.get("value"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
