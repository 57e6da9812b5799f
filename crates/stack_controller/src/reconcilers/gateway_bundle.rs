use std::sync::Arc;

use chrono::Utc;
use cluster_pool::Edition;
use fleet_core::Result;
use fleet_core::{aggregate_phase, conditions::standard_conditions, hash_spec, ChildStatus, Error, Phase, StdError};
use futures::StreamExt;
use kube::api::{Api, DynamicObject, ListParams, Patch, PatchParams};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::finalizer::{finalizer, Event as FinalizerEvent};
use kube::runtime::watcher;
use kube::{Client, Resource, ResourceExt};
use serde_json::json;
use tracing::{error, info, warn};

use crate::api::v1alpha1::gateway_bundle::{GatewayBundle, GATEWAY_BUNDLE_FINALIZER};
use crate::context::Context;
use crate::discovery::OptionalKind;
use crate::materializers::{addons, gateway};
use crate::reconcilers::inference_stack::FIELD_MANAGER;

pub async fn reconcile(bundle: Arc<GatewayBundle>, ctx: Arc<Context>) -> Result<Action> {
    let _timer = ctx.metrics.count_and_measure("GatewayBundle");
    ctx.diagnostics.write().await.last_event = Utc::now();

    let ns = bundle.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<GatewayBundle> = Api::namespaced(ctx.client.clone(), &ns);

    info!(bundle = bundle.name_any(), namespace = ns, "reconciling GatewayBundle");

    let result = finalizer(&api, GATEWAY_BUNDLE_FINALIZER, bundle.clone(), |event| async {
        match event {
            FinalizerEvent::Apply(bundle) => apply(&bundle, ctx.clone()).await,
            FinalizerEvent::Cleanup(bundle) => cleanup(&bundle).await,
        }
    })
    .await;

    result.map_err(|e| {
        let error = Error::StdError(StdError::FinalizerError(Box::new(e)));
        ctx.metrics.reconcile_failure("GatewayBundle", &error);
        error
    })
}

async fn cleanup(_bundle: &GatewayBundle) -> Result<Action> {
    Ok(Action::await_change())
}

async fn apply(bundle: &GatewayBundle, ctx: Arc<Context>) -> Result<Action> {
    let ns = bundle.namespace().unwrap_or_else(|| "default".to_string());
    let name = bundle.name_any();
    let api: Api<GatewayBundle> = Api::namespaced(ctx.client.clone(), &ns);

    let spec_hash = hash_spec(&bundle.spec).unwrap_or_else(|_| "unhashable".to_string());
    if let Some(previous) = bundle.status.as_ref().and_then(|s| s.observed_spec_hash.as_ref()) {
        if previous != &spec_hash {
            info!(bundle = name, "spec changed since last reconcile");
        }
    }

    let owner = bundle.controller_owner_ref(&()).ok_or_else(|| {
        Error::StdError(StdError::MetadataMissing("GatewayBundle is missing uid/name for owner ref".to_string()))
    })?;

    let edition = ctx.editions.get(&ctx.local_cluster_name).unwrap_or(Edition::Unknown);

    let gateway_status = gateway::materialize(&ctx.client, &ns, &name, &bundle.spec, &owner, &ctx.availability).await;
    let gateway_address = gateway_address(&ctx, &ns, &name).await;

    let mut children = vec![gateway_status];
    children.extend(addons::materialize(&name, &bundle.spec, edition));

    let phase = aggregate_phase(&children);

    publish_status(&api, &name, phase, &children, &spec_hash, bundle.metadata.generation, gateway_address).await?;

    Ok(Action::requeue(ctx.requeue_after))
}

async fn gateway_address(ctx: &Context, namespace: &str, bundle_name: &str) -> Option<String> {
    let (ar, _caps) = ctx.availability.resource(OptionalKind::Gateway)?;
    let api: Api<DynamicObject> = Api::namespaced_with(ctx.client.clone(), namespace, ar);
    let obj = api.get(bundle_name).await.ok()?;
    gateway::first_advertised_address(&obj)
}

#[allow(clippy::too_many_arguments)]
async fn publish_status(
    api: &Api<GatewayBundle>,
    name: &str,
    phase: Phase,
    children: &[ChildStatus],
    spec_hash: &str,
    generation: Option<i64>,
    gateway_address: Option<String>,
) -> Result<()> {
    let existing_conditions = api
        .get(name)
        .await
        .ok()
        .and_then(|b| b.status.map(|s| s.conditions))
        .unwrap_or_default();
    let (conditions, _changed) = standard_conditions(&existing_conditions, phase == Phase::Ready, generation);

    let status = json!({
        "status": {
            "phase": phase.to_string(),
            "children": children,
            "observedSpecHash": spec_hash,
            "lastReconciled": Utc::now(),
            "conditions": conditions,
            "gatewayAddress": gateway_address,
        }
    });

    api.patch_status(name, &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(&status))
        .await
        .map_err(|e| {
            warn!(bundle = name, error = %e, "failed to publish status");
            Error::from(e)
        })?;
    Ok(())
}

pub fn error_policy(bundle: Arc<GatewayBundle>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!(bundle = bundle.name_any(), error = %error, "reconcile failed");
    ctx.metrics.reconcile_failure("GatewayBundle", error);
    Action::requeue(ctx.requeue_after)
}

/// Starts the GatewayBundle controller loop. All owned children are
/// extension-group kinds with no generated type to `.owns()`, so drift
/// detection relies entirely on the 60s self-requeue (§4.2).
pub async fn run(client: Client, ctx: Arc<Context>) {
    let bundles = Api::<GatewayBundle>::all(client.clone());
    if let Err(e) = bundles.list(&ListParams::default().limit(1)).await {
        error!(error = %e, "GatewayBundle is not queryable; is the CRD installed?");
        std::process::exit(1);
    }

    Controller::new(bundles, watcher::Config::default().any_semantic())
        .run(reconcile, error_policy, ctx)
        .filter_map(|x| async move { std::result::Result::ok(x) })
        .for_each(|_| futures::future::ready(()))
        .await;
}
