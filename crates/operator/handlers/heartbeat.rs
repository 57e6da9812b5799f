use actix_web::{post, web, web::Data, HttpResponse, Responder};
use cluster_pool::ClusterFacts;
use cluster_pool::PoolError;

use crate::state::AppState;

/// Agent-posted facts, applied exactly the way a successful health-check
/// probe would be (write-locked facts update, breaker success) so a
/// heartbeat and the supervisor's own probe can never disagree about what
/// "healthy" means (SPEC_FULL §10 "Supplemented feature: heartbeat ingestion").
#[post("/api/v1/clusters/{name}/heartbeat")]
pub async fn heartbeat(state: Data<AppState>, path: web::Path<String>, body: web::Json<ClusterFacts>) -> impl Responder {
    let name = path.into_inner();
    match state.pool.get(&name) {
        Ok(client) => {
            client.apply_facts(body.into_inner());
            client.breaker().record_success();
            HttpResponse::Ok().json(format!("heartbeat recorded for cluster '{name}'"))
        }
        Err(PoolError::NotFound(_)) => HttpResponse::NotFound().json(format!("cluster '{name}' not found")),
        Err(e) => HttpResponse::Conflict().json(format!("cannot accept heartbeat for cluster '{name}': {e}")),
    }
}
