use std::collections::BTreeMap;

use fleet_core::{hash_value, ChildStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Api, ApiResource, DynamicObject, Patch, PatchParams, PostParams};
use kube::core::ObjectMeta;
use kube::discovery::ApiCapabilities;
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

pub const FIELD_MANAGER: &str = "stack-controller";
pub const SPEC_HASH_ANNOTATION: &str = "gwfabric.dev/spec-hash";

/// Create-or-patch for a typed k8s-openapi resource, with drift detected via
/// a `spec-hash` annotation rather than a full field diff (§4.3).
pub async fn ensure_typed<K>(
    api: &Api<K>,
    kind_label: &str,
    name: &str,
    mut desired: K,
    spec_hash: &str,
) -> ChildStatus
where
    K: Resource + Clone + std::fmt::Debug + DeserializeOwned + Serialize,
    K::DynamicType: Default,
{
    stamp_hash_annotation(desired.meta_mut(), spec_hash);

    match api.get(name).await {
        Ok(existing) => {
            let existing_hash = existing
                .meta()
                .annotations
                .as_ref()
                .and_then(|a| a.get(SPEC_HASH_ANNOTATION));
            if existing_hash.map(|h| h.as_str()) == Some(spec_hash) {
                ChildStatus::new(kind_label, name, true, "in sync")
            } else {
                match api
                    .patch(name, &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(&desired))
                    .await
                {
                    Ok(_) => {
                        info!(kind = kind_label, name, "updated");
                        ChildStatus::new(kind_label, name, true, "updated")
                    }
                    Err(e) => ChildStatus::failed(kind_label, name, "update", e),
                }
            }
        }
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => match api.create(&PostParams::default(), &desired).await {
            Ok(_) => {
                info!(kind = kind_label, name, "created");
                ChildStatus::new(kind_label, name, true, "created")
            }
            Err(e) => ChildStatus::failed(kind_label, name, "create", e),
        },
        Err(e) => ChildStatus::failed(kind_label, name, "get", e),
    }
}

fn stamp_hash_annotation(meta: &mut ObjectMeta, spec_hash: &str) {
    meta.annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(SPEC_HASH_ANNOTATION.to_string(), spec_hash.to_string());
}

/// Create-or-patch for an extension-group CRD we have no generated type for.
/// Desired is a full object JSON value (apiVersion/kind/metadata/spec); drift
/// is detected by hashing the `spec` sub-tree of the live object (§4.3).
#[allow(clippy::too_many_arguments)]
pub async fn ensure_unstructured(
    client: &Client,
    api_resource: &ApiResource,
    capabilities: &ApiCapabilities,
    namespace: &str,
    kind_label: &str,
    name: &str,
    desired_spec: Value,
    owner: &OwnerReference,
    extra_annotations: BTreeMap<String, String>,
) -> ChildStatus {
    let api: Api<DynamicObject> = Api::namespaced_with(client.clone(), namespace, api_resource);
    let spec_hash = hash_value(&desired_spec);

    let mut desired = DynamicObject::new(name, api_resource).data(desired_spec.clone());
    desired.metadata.namespace = Some(namespace.to_string());
    desired.metadata.annotations = Some(extra_annotations);
    desired.metadata.owner_references = Some(vec![owner.clone()]);
    let _ = capabilities;

    match api.get(name).await {
        Ok(existing) => {
            let existing_hash = existing
                .data
                .get("spec")
                .map(hash_value)
                .unwrap_or_default();
            if existing_hash == spec_hash {
                ChildStatus::new(kind_label, name, true, "in sync")
            } else {
                match api
                    .patch(name, &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(&desired))
                    .await
                {
                    Ok(_) => {
                        info!(kind = kind_label, name, "updated");
                        ChildStatus::new(kind_label, name, true, "updated")
                    }
                    Err(e) => ChildStatus::failed(kind_label, name, "update", e),
                }
            }
        }
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => match api.create(&PostParams::default(), &desired).await {
            Ok(_) => {
                info!(kind = kind_label, name, "created");
                ChildStatus::new(kind_label, name, true, "created")
            }
            Err(e) => ChildStatus::failed(kind_label, name, "create", e),
        },
        Err(e) => ChildStatus::failed(kind_label, name, "get", e),
    }
}

pub fn child_name(parent: &str, suffix: &str) -> String {
    format!("{parent}-{suffix}")
}
