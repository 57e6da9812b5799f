use actix_web::{get, web::Data, HttpRequest, HttpResponse, Responder};

use crate::state::AppState;

#[get("/health")]
pub async fn health(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json("healthy")
}

#[get("/")]
pub async fn index(state: Data<AppState>, _req: HttpRequest) -> impl Responder {
    let diagnostics = state.stack_state.diagnostics().await;
    HttpResponse::Ok().json(&diagnostics)
}
