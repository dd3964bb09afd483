//! Reconciliation poller.
//!
//! Frisbii's webhook delivery is best-effort and the webhook handler is
//! log-only, so this poller is the single writer of session activation.
//! Each run scans pending sessions (bounded to 100) and promotes the ones
//! whose subscription Frisbii reports as active. Per-record failures are
//! logged and skipped; the record is retried on the next scheduled run.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::error::Result;
use crate::models::{SessionActivation, SessionStatus};
use crate::state::AppState;
use crate::store::SelectOptions;

/// Cap per run. A backlog above this is drained across subsequent runs.
const MAX_PENDING_PER_RUN: usize = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedSession {
    pub record_id: String,
    pub session_id: String,
    pub subscription_state: String,
    pub forening: String,
}

#[derive(Debug, Serialize)]
pub struct PollSummary {
    pub success: bool,
    pub message: &'static str,
    pub checked: usize,
    pub updated: usize,
    pub updates: Vec<UpdatedSession>,
}

/// Run one reconciliation pass over pending sessions.
pub async fn reconcile_pending(state: &AppState) -> Result<PollSummary> {
    let pending = state
        .airtable
        .list_records(
            &state.sessions_table,
            &SelectOptions {
                filter_by_formula: Some("{status} = 'pending'".to_string()),
                max_records: Some(MAX_PENDING_PER_RUN),
                ..Default::default()
            },
        )
        .await?;

    tracing::info!("Found {} pending donations", pending.len());

    if pending.is_empty() {
        return Ok(PollSummary {
            success: true,
            message: "No pending donations to check",
            checked: 0,
            updated: 0,
            updates: Vec::new(),
        });
    }

    let checked = pending.len();
    let mut updates = Vec::new();

    for record in pending {
        let Some(session_id) = record.str_field("sessionId").map(String::from) else {
            tracing::warn!("Pending record {} has no sessionId, skipping", record.id);
            continue;
        };
        let forening = record
            .str_field("foreningNavn")
            .unwrap_or_default()
            .to_string();

        tracing::debug!("Checking {} ({})", session_id, forening);

        let subscription = match state.frisbii.get_subscription(&session_id).await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::error!("Failed to fetch subscription {}: {}", session_id, e);
                continue;
            }
        };

        let subscription_state = subscription
            .state
            .clone()
            .unwrap_or_else(|| "unknown".to_string());

        if !subscription.is_active() {
            tracing::debug!(
                "Waiting for activation of {}. Current state: {}",
                session_id,
                subscription_state
            );
            continue;
        }

        match activate_if_pending(state, &record.id, &session_id).await {
            Ok(true) => {
                tracing::info!(
                    "Updated {} to active (subscription {}, forening {})",
                    record.id,
                    session_id,
                    forening
                );
                updates.push(UpdatedSession {
                    record_id: record.id.clone(),
                    session_id,
                    subscription_state,
                    forening,
                });
            }
            Ok(false) => {
                tracing::info!("Session {} is no longer pending, skipping", session_id);
            }
            Err(e) => {
                tracing::error!("Failed to activate session {}: {}", session_id, e);
            }
        }
    }

    let updated = updates.len();
    tracing::info!("Polling complete. Checked: {}, updated: {}", checked, updated);

    Ok(PollSummary {
        success: true,
        message: "Polling completed successfully",
        checked,
        updated,
        updates,
    })
}

/// Conditionally promote a session to active.
///
/// Re-fetches the record and only writes while the stored status is still
/// `pending`, so activation is applied at most once even if two runs overlap.
/// Returns whether the update was written.
async fn activate_if_pending(
    state: &AppState,
    record_id: &str,
    session_id: &str,
) -> Result<bool> {
    let current = state
        .airtable
        .get_record(&state.sessions_table, record_id)
        .await?;

    if current.str_field("status") != Some(SessionStatus::Pending.as_str()) {
        return Ok(false);
    }

    let activation = SessionActivation {
        status: SessionStatus::Active,
        activated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        frisbii_subscription_handle: session_id.to_string(),
    };

    state
        .airtable
        .update_record(&state.sessions_table, record_id, &activation)
        .await?;

    Ok(true)
}

/// Spawn the background reconciliation loop.
pub fn spawn_poller_task(state: AppState, interval_secs: u64) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(interval_secs);

        loop {
            tokio::time::sleep(interval).await;

            match reconcile_pending(&state).await {
                Ok(summary) => {
                    if summary.updated > 0 {
                        tracing::info!(
                            "Reconciliation run: checked {}, updated {}",
                            summary.checked,
                            summary.updated
                        );
                    }
                }
                Err(e) => {
                    tracing::error!("Reconciliation run failed: {}", e);
                }
            }
        }
    });

    tracing::info!(
        "Reconciliation poller started (runs every {} seconds)",
        interval_secs
    );
}
