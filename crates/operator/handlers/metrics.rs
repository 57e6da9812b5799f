use actix_web::{get, web::Data, HttpRequest, HttpResponse, Responder};
use fleet_core::BreakerState;
use prometheus::core::Collector;
use prometheus::{opts, Encoder, IntGauge, IntGaugeVec, TextEncoder};

use crate::state::AppState;

#[get("/metrics")]
pub async fn metrics(state: Data<AppState>, _req: HttpRequest) -> impl Responder {
    let mut families = state.stack_state.metrics();
    families.extend(pool_metric_families(&state));

    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    encoder.encode(&families, &mut buffer).unwrap();
    HttpResponse::Ok().body(buffer)
}

/// Pool/health gauges computed fresh on every scrape rather than maintained
/// as long-lived counters; cheap since they're read-only snapshots over the
/// already-held client list (SPEC_FULL §10 "Metrics").
fn pool_metric_families(state: &AppState) -> Vec<prometheus::proto::MetricFamily> {
    let clients = state.pool.list();

    let known = IntGauge::new("cluster_pool_clients_known", "number of clusters currently registered in the pool")
        .expect("static gauge config is valid");
    known.set(clients.len() as i64);

    let healthy = IntGauge::new("cluster_pool_clients_healthy", "number of clusters whose last check succeeded")
        .expect("static gauge config is valid");
    healthy.set(clients.iter().filter(|c| c.is_healthy()).count() as i64);

    let breaker_state = IntGaugeVec::new(
        opts!("cluster_pool_breaker_state", "0=closed, 1=open, 2=half-open"),
        &["cluster"],
    )
    .expect("static gauge config is valid");
    for client in &clients {
        let value = match client.breaker().state() {
            BreakerState::Closed => 0,
            BreakerState::Open => 1,
            BreakerState::HalfOpen => 2,
        };
        breaker_state.with_label_values(&[client.name()]).set(value);
    }

    let mut out = known.collect();
    out.extend(healthy.collect());
    out.extend(breaker_state.collect());
    out
}
