use actix_web::{delete, get, post, web, web::Data, HttpResponse, Responder};
use fleet_core::managed_cluster::{GpuCapacity, ManagedCluster, ManagedClusterSpec};
use fleet_core::validation::is_valid_cluster_name;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;

const FIELD_MANAGER: &str = "gwfabric-operator";

#[derive(Serialize)]
struct ClusterSummary {
    name: String,
    region: String,
    environment: String,
    is_local: bool,
    healthy: bool,
    breaker: String,
    last_check: Option<chrono::DateTime<chrono::Utc>>,
}

#[get("/clusters")]
pub async fn list(state: Data<AppState>) -> impl Responder {
    let api: Api<ManagedCluster> = Api::namespaced(state.client.clone(), &state.namespace);
    let clusters = match api.list(&Default::default()).await {
        Ok(list) => list,
        Err(e) => return HttpResponse::InternalServerError().json(format!("failed to list clusters: {e}")),
    };

    let summaries: Vec<ClusterSummary> = clusters
        .into_iter()
        .map(|c| {
            let name = c.metadata.name.clone().unwrap_or_default();
            let client = state.pool.get(&name).ok();
            ClusterSummary {
                name,
                region: c.spec.region,
                environment: c.spec.environment,
                is_local: c.spec.is_local,
                healthy: client.as_ref().is_some_and(|c| c.is_healthy()),
                breaker: client.as_ref().map(|c| format!("{:?}", c.breaker().state())).unwrap_or_else(|| "unknown".into()),
                last_check: client.as_ref().and_then(|c| c.last_check()),
            }
        })
        .collect();

    HttpResponse::Ok().json(summaries)
}

#[post("/clusters")]
pub async fn register(state: Data<AppState>, body: web::Json<ManagedClusterSpec>) -> impl Responder {
    let spec = body.into_inner();
    let name = spec.display_name.to_lowercase().replace(' ', "-");
    if !is_valid_cluster_name(&name) {
        return HttpResponse::BadRequest().json(format!("derived cluster name '{name}' is not a valid DNS label"));
    }

    let api: Api<ManagedCluster> = Api::namespaced(state.client.clone(), &state.namespace);
    let cluster = ManagedCluster::new(&name, spec);

    match api.create(&PostParams::default(), &cluster).await {
        Ok(created) => HttpResponse::Created().json(created),
        Err(e) => HttpResponse::InternalServerError().json(format!("failed to register cluster: {e}")),
    }
}

#[get("/clusters/{name}/detail")]
pub async fn detail(state: Data<AppState>, path: web::Path<String>) -> impl Responder {
    let name = path.into_inner();
    let api: Api<ManagedCluster> = Api::namespaced(state.client.clone(), &state.namespace);

    let cluster = match api.get(&name).await {
        Ok(c) => c,
        Err(kube::Error::Api(e)) if e.code == 404 => return HttpResponse::NotFound().json(format!("cluster '{name}' not found")),
        Err(e) => return HttpResponse::InternalServerError().json(format!("failed to read cluster: {e}")),
    };

    let facts = state.pool.get(&name).ok().map(|c| c.facts());
    HttpResponse::Ok().json(json!({
        "spec": cluster.spec,
        "status": cluster.status,
        "facts": facts,
    }))
}

#[delete("/clusters/{name}")]
pub async fn remove(state: Data<AppState>, path: web::Path<String>) -> impl Responder {
    let name = path.into_inner();
    let api: Api<ManagedCluster> = Api::namespaced(state.client.clone(), &state.namespace);
    match api.delete(&name, &DeleteParams::default()).await {
        Ok(_) => HttpResponse::Ok().json(format!("cluster '{name}' deleted")),
        Err(kube::Error::Api(e)) if e.code == 404 => HttpResponse::NotFound().json(format!("cluster '{name}' not found")),
        Err(e) => HttpResponse::InternalServerError().json(format!("failed to delete cluster: {e}")),
    }
}

#[post("/clusters/{name}/test")]
pub async fn test(state: Data<AppState>, path: web::Path<String>) -> impl Responder {
    let name = path.into_inner();
    match state.health.check_now(&name).await {
        Ok(()) => {
            let client = state.pool.get(&name).ok();
            HttpResponse::Ok().json(json!({
                "healthy": client.as_ref().is_some_and(|c| c.is_healthy()),
                "breaker": client.as_ref().map(|c| format!("{:?}", c.breaker().state())),
            }))
        }
        Err(e) => HttpResponse::Conflict().json(format!("cannot test cluster '{name}': {e}")),
    }
}

/// No agent-installer binary lives in this system; installing the remote
/// heartbeat/metrics agent is an operator-triggered, fire-and-forget step
/// recorded on the resource so the fleet UI can reflect it (§6).
#[post("/clusters/{name}/install-agent")]
pub async fn install_agent(state: Data<AppState>, path: web::Path<String>) -> impl Responder {
    let name = path.into_inner();
    let api: Api<ManagedCluster> = Api::namespaced(state.client.clone(), &state.namespace);

    let patch = Patch::Merge(json!({ "status": { "agentInstalled": true } }));
    match api.patch_status(&name, &PatchParams::apply(FIELD_MANAGER), &patch).await {
        Ok(_) => HttpResponse::Accepted().json(format!("agent install recorded for cluster '{name}'")),
        Err(kube::Error::Api(e)) if e.code == 404 => HttpResponse::NotFound().json(format!("cluster '{name}' not found")),
        Err(e) => HttpResponse::InternalServerError().json(format!("failed to record agent install: {e}")),
    }
}

/// Fleet-wide GPU capacity, aggregated from the pool's own cached facts
/// rather than a separately tracked total (§9 Open Questions, §10 supplemented feature).
#[get("/clusters/summary")]
pub async fn summary(state: Data<AppState>) -> impl Responder {
    let clients = state.pool.list();
    let mut total = GpuCapacity::default();
    for client in &clients {
        total.merge(&client.facts().gpu_capacity);
    }

    HttpResponse::Ok().json(json!({
        "clusterCount": clients.len(),
        "healthyCount": clients.iter().filter(|c| c.is_healthy()).count(),
        "gpuCapacity": total,
    }))
}
