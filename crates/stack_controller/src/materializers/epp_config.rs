use std::collections::BTreeMap;

use fleet_core::{hash_spec, ChildStatus};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Api, ObjectMeta};
use kube::Client;
use serde::Serialize;
use serde_json::json;

use crate::api::v1alpha1::inference_stack::{EndpointPickerStrategy, InferenceStackSpec};
use crate::materializers::common::{child_name, ensure_typed};

#[derive(Serialize)]
struct EppConfigBody {
    strategy: EndpointPickerStrategy,
    pool_name: String,
    model_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    weights: Vec<u32>,
}

/// `<stack>-epp-config`: the endpoint picker's JSON configuration (§4.3).
pub async fn materialize(
    client: &Client,
    namespace: &str,
    stack_name: &str,
    spec: &InferenceStackSpec,
    owner: &OwnerReference,
) -> ChildStatus {
    let name = child_name(stack_name, "epp-config");
    let body = EppConfigBody {
        strategy: spec.endpoint_picker.strategy.unwrap_or(EndpointPickerStrategy::LeastQueue),
        pool_name: child_name(stack_name, "pool"),
        model_name: spec.endpoint_picker.model_name.clone().unwrap_or_else(|| spec.model.clone()),
        weights: spec.endpoint_picker.weights.clone(),
    };

    let mut data = BTreeMap::new();
    data.insert("config.json".to_string(), serde_json::to_string(&json!(body)).unwrap_or_default());

    let desired = ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: Some(namespace.to_string()),
            owner_references: Some(vec![owner.clone()]),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    };

    let hash = hash_spec(&body).unwrap_or_default();
    let api: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    ensure_typed(&api, "EppConfig", &name, desired, &hash).await
}
