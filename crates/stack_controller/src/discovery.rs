use std::collections::HashMap;

use kube::api::ApiResource;
use kube::discovery::{ApiCapabilities, Discovery};
use kube::Client;
use tracing::{info, warn};

/// Optional child kinds whose absence degrades materialization to a no-op
/// `not configured` ChildStatus instead of an error (§4.2 "Setup-time CRD
/// gating"). Keyed by the name used in materializer lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionalKind {
    InferencePool,
    Autoscaler,
    HttpRoute,
    Gateway,
}

impl OptionalKind {
    fn group_kind(self) -> (&'static str, &'static str) {
        match self {
            OptionalKind::InferencePool => ("inference.networking.k8s.io", "InferencePool"),
            OptionalKind::Autoscaler => ("keda.sh", "ScaledObject"),
            OptionalKind::HttpRoute => ("gateway.networking.k8s.io", "HTTPRoute"),
            OptionalKind::Gateway => ("gateway.networking.k8s.io", "Gateway"),
        }
    }
}

/// Result of the one-time discovery pass at manager startup. Reconcilers
/// consult this before attempting to materialize an optional child kind.
#[derive(Debug, Clone, Default)]
pub struct CrdAvailability {
    available: HashMap<&'static str, (ApiResource, ApiCapabilities)>,
}

impl CrdAvailability {
    pub async fn discover(client: &Client) -> Self {
        let discovery = match Discovery::new(client.clone()).run().await {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "API discovery failed; all optional child kinds degrade to not-configured");
                return Self::default();
            }
        };

        let mut available = HashMap::new();
        for kind in [
            OptionalKind::InferencePool,
            OptionalKind::Autoscaler,
            OptionalKind::HttpRoute,
            OptionalKind::Gateway,
        ] {
            let (group, resource_kind) = kind.group_kind();
            if let Some((ar, caps)) = find_resource(&discovery, group, resource_kind) {
                info!(kind = resource_kind, group, "optional CRD is installed; enabling materializer");
                available.insert(resource_kind, (ar, caps));
            } else {
                info!(kind = resource_kind, group, "optional CRD not found; materializer will report not-configured");
            }
        }

        Self { available }
    }

    pub fn is_available(&self, kind: OptionalKind) -> bool {
        self.available.contains_key(kind.group_kind().1)
    }

    pub fn resource(&self, kind: OptionalKind) -> Option<&(ApiResource, ApiCapabilities)> {
        self.available.get(kind.group_kind().1)
    }
}

fn find_resource(discovery: &Discovery, group: &str, kind: &str) -> Option<(ApiResource, ApiCapabilities)> {
    discovery
        .groups()
        .filter(|g| g.name() == group)
        .find_map(|g| g.recommended_kind(kind))
}
