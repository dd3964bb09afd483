use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::billing::{self, FrisbiiWebhookEvent};
use crate::id::is_session_id;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookResponse {
    success: bool,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_type: Option<String>,
}

/// POST /webhook/frisbii
///
/// Log-only: activation is delegated entirely to the reconciliation poller,
/// so the webhook and poller never race on the same record. Always answers
/// 200, including on parse failure, so Frisbii does not retry.
pub async fn handle_frisbii_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> impl IntoResponse {
    let event: FrisbiiWebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!("Failed to parse Frisbii webhook payload: {}", e);
            return (
                StatusCode::OK,
                Json(WebhookResponse {
                    success: false,
                    message: "Invalid JSON payload",
                    event_type: None,
                }),
            );
        }
    };

    verify_signature(&state, &event);

    let event_type = event.event_type.as_deref().unwrap_or("unknown");
    tracing::info!("Frisbii webhook received: {}", event_type);

    if billing::is_lifecycle_event(event_type) {
        let handle = event.subscription.as_deref().unwrap_or("<none>");
        let email = event
            .customer
            .as_ref()
            .and_then(|c| c.email.as_deref())
            .unwrap_or("<none>");

        if is_session_id(handle) {
            tracing::info!(
                "Subscription lifecycle progress for session {} (customer {}); reconciliation left to the poller",
                handle,
                email
            );
        } else {
            tracing::warn!(
                "Lifecycle event for non-session subscription handle {} (customer {})",
                handle,
                email
            );
        }

        (
            StatusCode::OK,
            Json(WebhookResponse {
                success: true,
                message: "Webhook received",
                event_type: event.event_type,
            }),
        )
    } else {
        tracing::info!("Unhandled Frisbii event type: {}", event_type);
        (
            StatusCode::OK,
            Json(WebhookResponse {
                success: true,
                message: "Event received but not processed",
                event_type: event.event_type,
            }),
        )
    }
}

/// Signature verification is log-only: the handler never acts on webhook
/// content, and a non-200 response would start Frisbii's retry storm.
fn verify_signature(state: &AppState, event: &FrisbiiWebhookEvent) {
    let Some(ref secret) = state.webhook_secret else {
        return;
    };

    let (Some(timestamp), Some(id), Some(signature)) =
        (&event.timestamp, &event.id, &event.signature)
    else {
        tracing::debug!("Frisbii webhook missing signature fields, skipping verification");
        return;
    };

    match billing::verify_webhook_signature(secret, timestamp, id, signature) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("Frisbii webhook signature mismatch for event {}", id);
        }
        Err(e) => {
            tracing::warn!("Frisbii webhook signature verification failed: {}", e);
        }
    }
}
