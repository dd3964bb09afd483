use axum::extract::State;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::id::generate_session_id;
use crate::models::{CreateDonationSession, DonationSessionFields, SessionStatus};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub success: bool,
    pub session_id: String,
    pub checkout_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airtable_record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airtable_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frisbii_error: Option<String>,
}

/// POST /create-donation-session
///
/// Persisting the pending record is non-fatal: a record-store outage must
/// not block the donor from reaching checkout. Both failure modes are
/// surfaced as diagnostic fields on a still-200 response so the frontend
/// can report them.
pub async fn create_donation_session(
    State(state): State<AppState>,
    Json(request): Json<CreateDonationSession>,
) -> Result<Json<CreateSessionResponse>> {
    let missing = request.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::MissingFields(
            missing.into_iter().map(String::from).collect(),
        ));
    }

    // Validation guarantees these are present
    let forening_id = request.forening_id.unwrap_or_default();
    let forening_navn = request.forening_navn.clone().unwrap_or_default();
    let tier_id = request.tier_id.clone().unwrap_or_default();
    let tier_price = request.tier_price.unwrap_or_default();
    let customer = request.customer.clone().unwrap_or_default();

    let session_id = generate_session_id();
    tracing::info!(
        "Creating donation session {} for forening {} ({}), tier {} at {} DKK",
        session_id,
        forening_navn,
        forening_id,
        tier_id,
        tier_price
    );

    let fields = DonationSessionFields {
        session_id: session_id.clone(),
        forening_id,
        forening_navn: forening_navn.clone(),
        tier_id: tier_id.clone(),
        tier_price,
        customer_email: customer.email.clone().unwrap_or_default(),
        customer_first_name: customer.first_name.clone().unwrap_or_default(),
        customer_last_name: customer.last_name.clone().unwrap_or_default(),
        customer_phone: customer.phone.clone().unwrap_or_default(),
        customer_address: customer.address.clone().unwrap_or_default(),
        customer_city: customer.city.clone().unwrap_or_default(),
        customer_postal_code: customer.postal_code.clone().unwrap_or_default(),
        customer_country: customer.country.clone().unwrap_or_else(|| "DK".to_string()),
        customer_company_name: customer.company_name.clone(),
        customer_cvr: customer.cvr.clone(),
        status: SessionStatus::Pending,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        activated_at: None,
        frisbii_subscription_handle: None,
    };

    let (airtable_record_id, airtable_error) = match state
        .airtable
        .create_record(&state.sessions_table, &fields)
        .await
    {
        Ok(record) => (Some(record.id), None),
        Err(e) => {
            tracing::error!("Failed to persist session {}: {}", session_id, e);
            (None, Some(e.to_string()))
        }
    };

    let (checkout_url, frisbii_error) = match state
        .frisbii
        .create_checkout_session(
            &session_id,
            &tier_id,
            Some(tier_price),
            &customer,
            &state.accept_url,
            &state.cancel_url,
        )
        .await
    {
        Ok((_, url)) => (url, None),
        Err(e) => {
            tracing::error!(
                "Frisbii checkout creation failed for {}, falling back to static URL: {}",
                session_id,
                e
            );
            (state.fallback_checkout_url.clone(), Some(e.to_string()))
        }
    };

    Ok(Json(CreateSessionResponse {
        success: true,
        session_id,
        checkout_url,
        airtable_record_id,
        airtable_error,
        frisbii_error,
    }))
}
