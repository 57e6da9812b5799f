use std::collections::BTreeMap;

use fleet_core::managed_cluster::ManagedCluster;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::Api;
use kube::config::{Kubeconfig, KubeConfigOptions};
use thiserror::Error;
use tracing::{info, warn};

/// Secret data keys tried in order when reading a kubeconfig (SPEC_FULL §6).
const KUBECONFIG_KEYS: &[&str] = &["kubeconfig", "value"];

/// Picks the first key present, in `KUBECONFIG_KEYS` order. Pulled out of
/// `build_client` so the precedence rule is testable without a live client.
fn find_kubeconfig_bytes(data: &BTreeMap<String, ByteString>) -> Option<&ByteString> {
    KUBECONFIG_KEYS.iter().find_map(|key| data.get(*key))
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("secret '{0}' has no kubeconfig data")]
    NoKubeconfigKey(String),
    #[error("secret read failed: {0}")]
    SecretRead(#[source] kube::Error),
    #[error("kubeconfig bytes are not valid UTF-8: {0}")]
    InvalidUtf8(#[source] std::string::FromUtf8Error),
    #[error("kubeconfig parse failed: {0}")]
    KubeconfigParse(#[source] kube::config::KubeconfigError),
    #[error("in-cluster config failed: {0}")]
    InClusterConfig(#[source] kube::config::InClusterError),
    #[error("client construction failed: {0}")]
    ClientConstruction(#[source] kube::Error),
    #[error("managed cluster is not local and has no kubeconfigSecretRef")]
    MissingSecretRef,
}

/// Builds an API client for a `ManagedCluster`. Never caches failures: the
/// caller (the pool's sync loop) simply retries on the next tick (§4.1).
///
/// `secret_reader` is the client used to read the kubeconfig secret itself:
/// always the local/management cluster's own client, never the remote one
/// being built.
pub async fn build_client(
    managed: &ManagedCluster,
    namespace: &str,
    secret_reader: &kube::Client,
) -> Result<kube::Client, BuildError> {
    let name = managed.metadata.name.clone().unwrap_or_default();

    if managed.spec.is_local {
        info!(cluster = %name, "building client from ambient in-cluster credentials");
        let config = kube::Config::incluster().map_err(BuildError::InClusterConfig)?;
        return kube::Client::try_from(config).map_err(BuildError::ClientConstruction);
    }

    let secret_ref = managed
        .spec
        .kubeconfig_secret_ref
        .as_ref()
        .ok_or(BuildError::MissingSecretRef)?;

    let secrets: Api<Secret> = Api::namespaced(secret_reader.clone(), namespace);
    let secret = secrets.get(&secret_ref.name).await.map_err(BuildError::SecretRead)?;

    let data = secret.data.unwrap_or_default();
    let raw = find_kubeconfig_bytes(&data).ok_or_else(|| BuildError::NoKubeconfigKey(secret_ref.name.clone()))?;

    let yaml = String::from_utf8(raw.0.clone()).map_err(BuildError::InvalidUtf8)?;
    let kubeconfig = Kubeconfig::from_yaml(&yaml).map_err(BuildError::KubeconfigParse)?;

    let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(BuildError::KubeconfigParse)?;

    match kube::Client::try_from(config) {
        Ok(client) => {
            info!(cluster = %name, secret = %secret_ref.name, "built client from kubeconfig secret");
            Ok(client)
        }
        Err(e) => {
            warn!(cluster = %name, error = %e, "client construction failed");
            Err(BuildError::ClientConstruction(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> BTreeMap<String, ByteString> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
            .collect()
    }

    #[test]
    fn prefers_kubeconfig_key_over_value() {
        let d = data(&[("kubeconfig", "first"), ("value", "second")]);
        assert_eq!(find_kubeconfig_bytes(&d).unwrap().0, b"first");
    }

    #[test]
    fn falls_back_to_value_key() {
        let d = data(&[("value", "second")]);
        assert_eq!(find_kubeconfig_bytes(&d).unwrap().0, b"second");
    }

    #[test]
    fn missing_both_keys_returns_none() {
        let d = data(&[("other", "x")]);
        assert!(find_kubeconfig_bytes(&d).is_none());
    }
}
