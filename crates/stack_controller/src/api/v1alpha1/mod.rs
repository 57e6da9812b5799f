pub mod gateway_bundle;
pub mod inference_stack;

pub use gateway_bundle::{GatewayBundle, GatewayBundleSpec, GatewayBundleStatus, GATEWAY_BUNDLE_FINALIZER};
pub use inference_stack::{InferenceStack, InferenceStackSpec, InferenceStackStatus, INFERENCE_STACK_FINALIZER};

pub(crate) fn conditions_schema(_: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
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
