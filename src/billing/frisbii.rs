use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::models::CustomerInfo;

type HmacSha256 = Hmac<Sha256>;

const CHECKOUT_API_BASE: &str = "https://checkout-api.frisbii.com";
const API_BASE: &str = "https://api.frisbii.com";

// Note: the subscription handle IS our session ID. The checkout session is
// created against a pre-configured plan (tierId), so the donation products
// stay organized in the Frisbii dashboard; tierPrice only overrides the
// amount in øre.

#[derive(Debug, Serialize)]
struct CreateSubscriptionSessionRequest<'a> {
    subscription: SubscriptionParams<'a>,
    accept_url: &'a str,
    cancel_url: &'a str,
}

#[derive(Debug, Serialize)]
struct SubscriptionParams<'a> {
    handle: &'a str,
    plan: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<i64>,
    customer: SessionCustomer<'a>,
}

#[derive(Debug, Serialize)]
struct SessionCustomer<'a> {
    generate_handle: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    postal_code: Option<&'a str>,
    country: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    company: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vat: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CreateSubscriptionSessionResponse {
    id: String,
    url: String,
}

/// Subscription state as reported by GET /v1/subscription/{handle}.
#[derive(Debug, Clone, Deserialize)]
pub struct FrisbiiSubscription {
    #[serde(default)]
    pub handle: Option<String>,
    /// "pending", "active", "expired", "on_hold", ...
    #[serde(default)]
    pub state: Option<String>,
}

impl FrisbiiSubscription {
    /// Only an exact "active" state counts as a collected payment.
    pub fn is_active(&self) -> bool {
        self.state.as_deref() == Some("active")
    }
}

/// Client for the Frisbii subscription billing API.
#[derive(Debug, Clone)]
pub struct FrisbiiClient {
    client: Client,
    private_key: String,
    checkout_base_url: String,
    api_base_url: String,
}

impl FrisbiiClient {
    pub fn new(private_key: &str) -> Self {
        Self {
            client: Client::new(),
            private_key: private_key.to_string(),
            checkout_base_url: CHECKOUT_API_BASE.to_string(),
            api_base_url: API_BASE.to_string(),
        }
    }

    /// Point both API hosts at a different base URL. Used by tests to target
    /// an in-process stand-in server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        self.checkout_base_url = base.clone();
        self.api_base_url = base;
        self
    }

    /// Create a subscription checkout session keyed by our session ID.
    ///
    /// `plan` is the Frisbii plan handle configured per donation tier.
    /// `amount_dkk` overrides the plan amount (whole kroner, converted to
    /// øre on the wire). Returns `(checkout_session_id, checkout_url)`.
    pub async fn create_checkout_session(
        &self,
        session_id: &str,
        plan: &str,
        amount_dkk: Option<i64>,
        customer: &CustomerInfo,
        accept_url: &str,
        cancel_url: &str,
    ) -> Result<(String, String)> {
        let request = CreateSubscriptionSessionRequest {
            subscription: SubscriptionParams {
                handle: session_id,
                plan,
                amount: amount_dkk.map(|kroner| kroner * 100),
                customer: SessionCustomer {
                    generate_handle: true,
                    email: customer.email.as_deref(),
                    first_name: customer.first_name.as_deref(),
                    last_name: customer.last_name.as_deref(),
                    phone: customer.phone.as_deref(),
                    address: customer.address.as_deref(),
                    city: customer.city.as_deref(),
                    postal_code: customer.postal_code.as_deref(),
                    country: customer.country.as_deref().unwrap_or("DK"),
                    company: customer.company_name.as_deref(),
                    vat: customer.cvr.as_deref(),
                },
            },
            accept_url,
            cancel_url,
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/session/subscription",
                self.checkout_base_url
            ))
            .basic_auth(&self.private_key, None::<&str>)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Frisbii API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Frisbii API error: {}",
                error_text
            )));
        }

        let session: CreateSubscriptionSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Frisbii response: {}", e)))?;

        Ok((session.id, session.url))
    }

    /// Fetch subscription state by handle (our session ID).
    pub async fn get_subscription(&self, handle: &str) -> Result<FrisbiiSubscription> {
        let response = self
            .client
            .get(format!("{}/v1/subscription/{}", self.api_base_url, handle))
            .basic_auth(&self.private_key, None::<&str>)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Frisbii API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Frisbii API error: {} - {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Frisbii response: {}", e)))
    }
}

/// Verify a Frisbii webhook signature.
///
/// The signature is `hex(hmac_sha256(secret, timestamp + id))` over the
/// event's `timestamp` and `id` fields. Uses constant-time comparison to
/// prevent timing attacks.
pub fn verify_webhook_signature(
    secret: &str,
    timestamp: &str,
    event_id: &str,
    signature: &str,
) -> Result<bool> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("Invalid webhook secret".into()))?;
    mac.update(timestamp.as_bytes());
    mac.update(event_id.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    let expected_bytes = expected.as_bytes();
    let provided_bytes = signature.as_bytes();

    // Length check is not constant-time, but signature length is not secret
    // (always 64 hex chars for SHA-256)
    if expected_bytes.len() != provided_bytes.len() {
        return Ok(false);
    }

    Ok(expected_bytes.ct_eq(provided_bytes).into())
}

/// Webhook event envelope. Frisbii sends `subscription` as a STRING (the
/// handle), not an object, so it is modelled as such.
#[derive(Debug, Deserialize)]
pub struct FrisbiiWebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub customer: Option<FrisbiiWebhookCustomer>,
}

#[derive(Debug, Deserialize)]
pub struct FrisbiiWebhookCustomer {
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Event kinds that indicate subscription lifecycle progress.
pub const SUBSCRIPTION_LIFECYCLE_EVENTS: [&str; 3] =
    ["subscription_created", "invoice_authorized", "invoice_settled"];

pub fn is_lifecycle_event(event_type: &str) -> bool {
    SUBSCRIPTION_LIFECYCLE_EVENTS.contains(&event_type)
}
