use std::sync::Arc;

use cluster_pool::{ClientPool, HealthSupervisor};
use kube::Client;
use telemetry_hub::Hub;

/// Everything the HTTP surface needs, threaded explicitly through
/// `actix_web::web::Data` rather than reached for as a global (SPEC_FULL §9
/// "Global mutable state").
#[derive(Clone)]
pub struct AppState {
    pub client: Client,
    pub pool: Arc<ClientPool>,
    pub health: Arc<HealthSupervisor>,
    pub hub: Hub,
    pub namespace: String,
    pub stack_state: stack_controller::context::State,
}
