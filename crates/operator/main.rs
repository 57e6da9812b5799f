mod config;
mod handlers;
mod server;
mod state;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use cluster_pool::{ClientPool, EditionCache, HealthSupervisor, RegistryWatcher};
use kube::Client;
use stack_controller::discovery::CrdAvailability;
use telemetry_hub::{Hub, Producer, Tick};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init().await;

    let config = Config::from_env();
    let client = Client::try_default().await?;

    let pool = Arc::new(ClientPool::new(config.default_cluster_name.clone()));
    let editions = Arc::new(EditionCache::new());
    let health = Arc::new(HealthSupervisor::with_interval(
        pool.clone(),
        client.clone(),
        config.secret_namespace.clone(),
        config.health_check_interval,
        config.health_check_concurrency,
        editions.clone(),
    ));
    let registry_watcher = RegistryWatcher::new(client.clone(), pool.clone(), config.secret_namespace.clone());

    let availability = Arc::new(CrdAvailability::discover(&client).await);
    let stack_state = stack_controller::context::State::default();
    let stack_ctx = stack_state.to_context(
        client.clone(),
        availability,
        editions.clone(),
        config.local_cluster_name.clone(),
        config.reconcile_requeue,
    );

    let hub = Hub::new();

    let app_state = AppState {
        client: client.clone(),
        pool: pool.clone(),
        health: health.clone(),
        hub: hub.clone(),
        namespace: config.secret_namespace.clone(),
        stack_state,
    };

    let cancel = CancellationToken::new();

    let health_task = tokio::spawn({
        let health = health.clone();
        let cancel = cancel.clone();
        async move { health.run(cancel).await }
    });

    let registry_task = tokio::spawn({
        let cancel = cancel.clone();
        let full_sync_interval = config.registry_full_sync_interval;
        async move { registry_watcher.run(cancel, full_sync_interval).await }
    });

    let inference_stack_task = tokio::spawn({
        let client = client.clone();
        let ctx = stack_ctx.clone();
        async move { stack_controller::reconcilers::inference_stack::run(client, ctx).await }
    });

    let gateway_bundle_task = tokio::spawn({
        let client = client.clone();
        let ctx = stack_ctx.clone();
        async move { stack_controller::reconcilers::gateway_bundle::run(client, ctx).await }
    });

    let gpu_metrics_producer = Producer::new("gpu-metrics", Duration::from_secs(15), {
        let pool = pool.clone();
        move || {
            let pool = pool.clone();
            async move {
                let mut total = fleet_core::GpuCapacity::default();
                for client in pool.list() {
                    total.merge(&client.facts().gpu_capacity);
                }
                serde_json::to_value(total).map(Tick::Emit).map_err(|e| e.to_string())
            }
        }
    });
    let gpu_metrics_task = tokio::spawn({
        let hub = hub.clone();
        let cancel = cancel.clone();
        async move { gpu_metrics_producer.run(hub, cancel).await }
    });

    let scaling_events_producer = Producer::new("scaling-events", Duration::from_secs(30), {
        let pool = pool.clone();
        move || {
            let pool = pool.clone();
            async move {
                let counts: Vec<_> = pool
                    .list()
                    .into_iter()
                    .map(|c| serde_json::json!({"cluster": c.name(), "resourceCounts": c.facts().resource_counts}))
                    .collect();
                Ok(Tick::Emit(serde_json::json!({ "clusters": counts })))
            }
        }
    });
    let scaling_events_task = tokio::spawn({
        let hub = hub.clone();
        let cancel = cancel.clone();
        async move { scaling_events_producer.run(hub, cancel).await }
    });

    let bind_addr = config.bind_addr.clone();
    let shutdown_drain = config.shutdown_drain;
    let server_task = tokio::spawn(async move { server::start_server(&bind_addr, shutdown_drain, app_state).await });

    wait_for_shutdown_signal().await;
    info!("shutdown signal received; draining");
    cancel.cancel();

    let _ = tokio::join!(
        health_task,
        registry_task,
        inference_stack_task,
        gateway_bundle_task,
        gpu_metrics_task,
        scaling_events_task,
    );

    if let Ok(Err(e)) = server_task.await {
        warn!(error = %e, "http server exited with error");
    }

    Ok(())
}

/// Installs both SIGINT and SIGTERM handlers and returns once either fires,
/// tripping the shared cancellation token the reconcilers and producers
/// observe (SPEC_FULL §5 "Cancellation").
async fn wait_for_shutdown_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}
