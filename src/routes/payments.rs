use axum::{
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use crate::handlers::payment_handlers;
use crate::state::AppState;

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(payments_health))
        .route("/init", post(payment_handlers::initialize_payment))
        // PayU redirects the browser here with the signed outcome
        .route("/success-callback", post(payment_handlers::payment_success_callback))
        .route("/failure-callback", post(payment_handlers::payment_failure_callback))
        .route("/:txnid", get(payment_handlers::get_payment))
}

async fn payments_health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "payu",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
