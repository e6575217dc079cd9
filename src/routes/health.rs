use actix_web::{get, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use crate::app::API_VERSION;

/// Liveness endpoint, reachable without a token.
#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": API_VERSION,
        "timestamp": Utc::now()
    }))
}
