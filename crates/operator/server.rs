use std::time::Duration;

use actix_web::{middleware, web::Data, App, HttpServer};
use anyhow::Result;

use crate::handlers::{clusters, health, heartbeat, metrics, ws};
use crate::state::AppState;

/// Configure and start the HTTP server: health, metrics, cluster-management
/// read/write endpoints, and the WebSocket upgrade, all side by side on one
/// runtime with the reconcilers and telemetry producers (SPEC_FULL §10).
pub async fn start_server(bind_addr: &str, shutdown_drain: Duration, state: AppState) -> Result<()> {
    let hub = state.hub.clone();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(Data::new(state.clone()))
            .app_data(Data::new(hub.clone()))
            .wrap(middleware::Logger::default().exclude("/health"))
            .service(health::index)
            .service(health::health)
            .service(metrics::metrics)
            .service(clusters::list)
            .service(clusters::register)
            .service(clusters::detail)
            .service(clusters::remove)
            .service(clusters::test)
            .service(clusters::install_agent)
            .service(clusters::summary)
            .service(heartbeat::heartbeat)
            .route("/ws", actix_web::web::get().to(ws::ws_index))
            .route("/ws/inference/{topic}", actix_web::web::get().to(ws::ws_named_topic))
    })
    .bind(bind_addr)?
    .shutdown_timeout(shutdown_drain.as_secs());

    server.run().await?;
    Ok(())
}
