mod records;
mod sessions;
mod webhook;

pub use records::*;
pub use sessions::*;
pub use webhook::*;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::config::RateLimitConfig;
use crate::rate_limit;
use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Public API: session creation and record proxies.
///
/// Session creation gets the strict tier (it fans out to Airtable and
/// Frisbii); the read proxies and health check share the relaxed tier.
pub fn public_router(limits: RateLimitConfig) -> Router<AppState> {
    let strict = Router::new()
        .route("/create-donation-session", post(create_donation_session))
        .layer(rate_limit::strict_layer(limits.strict_rpm));

    let relaxed = Router::new()
        .route("/health", get(health))
        .route("/get-records", get(get_records))
        .route("/get-foreninger", get(get_foreninger))
        .layer(rate_limit::relaxed_layer(limits.relaxed_rpm));

    strict.merge(relaxed)
}

/// Webhook endpoints. POST only; other methods fall through to 405.
pub fn webhook_router() -> Router<AppState> {
    Router::new().route("/webhook/frisbii", post(handle_frisbii_webhook))
}
