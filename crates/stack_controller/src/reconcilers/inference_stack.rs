use std::sync::Arc;

use chrono::Utc;
use fleet_core::{aggregate_phase, conditions::standard_conditions, hash_spec, Error, Phase, Result, StdError};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::finalizer::{finalizer, Event as FinalizerEvent};
use kube::runtime::watcher;
use kube::{Client, Resource, ResourceExt};
use serde_json::json;
use tracing::{error, info, warn};

use crate::api::v1alpha1::inference_stack::{InferenceStack, InferenceStackSpec, INFERENCE_STACK_FINALIZER};
use crate::context::Context;
use crate::materializers::{autoscaler, dcgm, epp_config, inference_pool, route};

pub const FIELD_MANAGER: &str = "stack-controller";

pub async fn reconcile(stack: Arc<InferenceStack>, ctx: Arc<Context>) -> Result<Action> {
    let _timer = ctx.metrics.count_and_measure("InferenceStack");
    ctx.diagnostics.write().await.last_event = Utc::now();

    let ns = stack.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<InferenceStack> = Api::namespaced(ctx.client.clone(), &ns);

    info!(stack = stack.name_any(), namespace = ns, "reconciling InferenceStack");

    let result = finalizer(&api, INFERENCE_STACK_FINALIZER, stack.clone(), |event| async {
        match event {
            FinalizerEvent::Apply(stack) => apply(&stack, ctx.clone()).await,
            FinalizerEvent::Cleanup(stack) => cleanup(&stack).await,
        }
    })
    .await;

    result.map_err(|e| {
        let error = Error::StdError(StdError::FinalizerError(Box::new(e)));
        ctx.metrics.reconcile_failure("InferenceStack", &error);
        error
    })
}

async fn cleanup(_stack: &InferenceStack) -> Result<Action> {
    // Children are garbage-collected via owner references; no extra cleanup needed (§4.2 step 2).
    Ok(Action::await_change())
}

async fn apply(stack: &InferenceStack, ctx: Arc<Context>) -> Result<Action> {
    let ns = stack.namespace().unwrap_or_else(|| "default".to_string());
    let name = stack.name_any();
    let api: Api<InferenceStack> = Api::namespaced(ctx.client.clone(), &ns);

    let spec_hash = hash_spec(&stack.spec).unwrap_or_else(|_| "unhashable".to_string());
    if let Some(previous) = stack.status.as_ref().and_then(|s| s.observed_spec_hash.as_ref()) {
        if previous != &spec_hash {
            info!(stack = name, "spec changed since last reconcile");
        }
    }

    let owner = stack.controller_owner_ref(&()).ok_or_else(|| {
        Error::StdError(StdError::MetadataMissing("InferenceStack is missing uid/name for owner ref".to_string()))
    })?;

    let children = materialize_children(&ctx, &ns, &name, &stack.spec, &owner).await;
    let phase = aggregate_phase(&children);

    publish_status(&api, &name, phase, &children, &spec_hash, stack.metadata.generation).await?;

    Ok(Action::requeue(ctx.requeue_after))
}

async fn materialize_children(
    ctx: &Context,
    ns: &str,
    name: &str,
    spec: &InferenceStackSpec,
    owner: &k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference,
) -> Vec<fleet_core::ChildStatus> {
    vec![
        inference_pool::materialize(&ctx.client, ns, name, spec, owner, &ctx.availability).await,
        epp_config::materialize(&ctx.client, ns, name, spec, owner).await,
        autoscaler::materialize(&ctx.client, ns, name, spec, owner, &ctx.availability).await,
        route::materialize(&ctx.client, ns, name, spec, owner, &ctx.availability).await,
        dcgm::materialize(&ctx.client, ns, name, spec, owner).await,
    ]
}

async fn publish_status(
    api: &Api<InferenceStack>,
    name: &str,
    phase: Phase,
    children: &[fleet_core::ChildStatus],
    spec_hash: &str,
    generation: Option<i64>,
) -> Result<()> {
    let existing_conditions = api
        .get(name)
        .await
        .ok()
        .and_then(|s| s.status.map(|s| s.conditions))
        .unwrap_or_default();
    let (conditions, _changed) = standard_conditions(&existing_conditions, phase == Phase::Ready, generation);

    let status = json!({
        "status": {
            "phase": phase.to_string(),
            "children": children,
            "observedSpecHash": spec_hash,
            "lastReconciled": Utc::now(),
            "conditions": conditions,
        }
    });

    api.patch_status(name, &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(&status))
        .await
        .map_err(|e| {
            warn!(stack = name, error = %e, "failed to publish status");
            Error::from(e)
        })?;
    Ok(())
}

pub fn error_policy(stack: Arc<InferenceStack>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!(stack = stack.name_any(), error = %error, "reconcile failed");
    ctx.metrics.reconcile_failure("InferenceStack", error);
    Action::requeue(ctx.requeue_after)
}

/// Starts the InferenceStack controller loop. Owns the typed children
/// (EPP ConfigMap, DCGM DaemonSet) so their mutation or deletion also
/// triggers a reconcile; the extension-group children are unstructured and
/// rely on the 60s self-requeue for drift detection instead (§4.2).
pub async fn run(client: Client, ctx: Arc<Context>) {
    let stacks = Api::<InferenceStack>::all(client.clone());
    if let Err(e) = stacks.list(&ListParams::default().limit(1)).await {
        error!(error = %e, "InferenceStack is not queryable; is the CRD installed?");
        std::process::exit(1);
    }

    Controller::new(stacks, watcher::Config::default().any_semantic())
        .owns(Api::<ConfigMap>::all(client.clone()), watcher::Config::default())
        .owns(Api::<DaemonSet>::all(client.clone()), watcher::Config::default())
        .run(reconcile, error_policy, ctx)
        .filter_map(|x| async move { std::result::Result::ok(x) })
        .for_each(|_| futures::future::ready(()))
        .await;
}
