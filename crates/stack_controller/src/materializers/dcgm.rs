use std::collections::BTreeMap;

use fleet_core::{hash_spec, ChildStatus};
use k8s_openapi::api::apps::v1::{DaemonSet, DaemonSetSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, OwnerReference};
use kube::api::{Api, ObjectMeta};
use kube::{Client, ResourceExt};
use serde::Serialize;

use crate::api::v1alpha1::inference_stack::InferenceStackSpec;
use crate::materializers::common::{child_name, ensure_typed};

const DEFAULT_DCGM_IMAGE: &str = "nvcr.io/nvidia/k8s/dcgm-exporter:3.3.5-3.4.1-ubuntu22.04";

#[derive(Serialize)]
struct DcgmDesired {
    image: &'static str,
    selector_labels: BTreeMap<String, String>,
}

/// `<stack>-dcgm`: one DaemonSet per stack, only when `dcgm.enabled` (§4.3).
/// Readiness is `ready=true` iff at least one replica is ready.
pub async fn materialize(
    client: &Client,
    namespace: &str,
    stack_name: &str,
    spec: &InferenceStackSpec,
    owner: &OwnerReference,
) -> ChildStatus {
    let name = child_name(stack_name, "dcgm");

    let enabled = spec.dcgm.as_ref().map(|d| d.enabled).unwrap_or(false);
    if !enabled {
        return ChildStatus::not_configured("Dcgm", &name);
    }

    let mut labels = BTreeMap::new();
    labels.insert("app.kubernetes.io/name".to_string(), name.clone());
    labels.insert("app.kubernetes.io/component".to_string(), "dcgm-exporter".to_string());

    let desired_value = DcgmDesired {
        image: DEFAULT_DCGM_IMAGE,
        selector_labels: labels.clone(),
    };
    let hash = hash_spec(&desired_value).unwrap_or_default();

    let desired = DaemonSet {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: Some(namespace.to_string()),
            owner_references: Some(vec![owner.clone()]),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DaemonSetSpec {
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: "dcgm-exporter".to_string(),
                        image: Some(DEFAULT_DCGM_IMAGE.to_string()),
                        resources: Some(ResourceRequirements {
                            requests: Some(BTreeMap::from([
                                ("cpu".to_string(), Quantity("100m".to_string())),
                                ("memory".to_string(), Quantity("128Mi".to_string())),
                            ])),
                            limits: Some(BTreeMap::from([
                                ("cpu".to_string(), Quantity("250m".to_string())),
                                ("memory".to_string(), Quantity("256Mi".to_string())),
                            ])),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    };

    let api: Api<DaemonSet> = Api::namespaced(client.clone(), namespace);
    let status = ensure_typed(&api, "Dcgm", &name, desired, &hash).await;
    if !status.ready {
        return status;
    }

    match api.get(&name).await {
        Ok(existing) => {
            let ready_replicas = existing.status.as_ref().map(|s| s.number_ready).unwrap_or(0);
            if ready_replicas >= 1 {
                status
            } else {
                ChildStatus::new("Dcgm", existing.name_any(), false, "waiting for pods (0 ready)")
            }
        }
        Err(_) => status,
    }
}
