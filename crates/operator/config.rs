use std::env;
use std::time::Duration;

/// The manager's own tunables, loaded once from the environment at process
/// start and threaded explicitly from then on (SPEC_FULL §10 "Configuration").
/// Distinct from the outer HTTP layer's CORS/JWT settings, which stay out of
/// scope for this system.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub health_check_interval: Duration,
    pub health_check_concurrency: usize,
    pub default_cluster_name: Option<String>,
    pub reconcile_requeue: Duration,
    pub secret_namespace: String,
    pub local_cluster_name: String,
    pub registry_full_sync_interval: Duration,
    pub shutdown_drain: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("HTTP_BIND_ADDR", "0.0.0.0:8080"),
            health_check_interval: Duration::from_secs(env_parse_or("HEALTH_CHECK_INTERVAL_SECONDS", 30)),
            health_check_concurrency: env_parse_or("HEALTH_CHECK_CONCURRENCY", 10),
            default_cluster_name: env::var("DEFAULT_CLUSTER_NAME").ok(),
            reconcile_requeue: Duration::from_secs(env_parse_or("RECONCILE_REQUEUE_SECONDS", 60)),
            secret_namespace: env_or("SECRET_NAMESPACE", "default"),
            local_cluster_name: env_or("LOCAL_CLUSTER_NAME", "local"),
            registry_full_sync_interval: Duration::from_secs(env_parse_or("REGISTRY_FULL_SYNC_SECONDS", 300)),
            shutdown_drain: Duration::from_secs(env_parse_or("SHUTDOWN_DRAIN_SECONDS", 15)),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
