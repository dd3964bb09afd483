use serde::{Deserialize, Serialize};

/// Donation session lifecycle status.
///
/// A session is created `pending` and moves to `active` exactly once, when
/// the reconciliation poller confirms the Frisbii subscription. There is no
/// terminal failure state; a session that never activates stays pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Active,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Active => "active",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Donor contact block as sent by the frontend.
///
/// Every field is `Option` so validation can enumerate all missing fields in
/// one pass instead of failing at deserialization on the first absent one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub company_name: Option<String>,
    pub cvr: Option<String>,
}

impl CustomerInfo {
    /// Required customer fields with their wire names (dotted for the
    /// validation error response).
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let required: [(&'static str, &Option<String>); 7] = [
            ("customer.email", &self.email),
            ("customer.firstName", &self.first_name),
            ("customer.lastName", &self.last_name),
            ("customer.phone", &self.phone),
            ("customer.address", &self.address),
            ("customer.city", &self.city),
            ("customer.postalCode", &self.postal_code),
        ];
        for (name, value) in required {
            if value.as_deref().map(str::trim).filter(|v| !v.is_empty()).is_none() {
                missing.push(name);
            }
        }
        missing
    }
}

/// Request body for POST /create-donation-session.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDonationSession {
    pub forening_id: Option<i64>,
    pub forening_navn: Option<String>,
    pub tier_id: Option<String>,
    /// Donation amount in whole DKK
    pub tier_price: Option<i64>,
    pub customer: Option<CustomerInfo>,
}

impl CreateDonationSession {
    /// Enumerate every absent required field, top-level and customer block.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.forening_id.is_none() {
            missing.push("foreningId");
        }
        if self.forening_navn.as_deref().map(str::trim).filter(|v| !v.is_empty()).is_none() {
            missing.push("foreningNavn");
        }
        if self.tier_id.as_deref().map(str::trim).filter(|v| !v.is_empty()).is_none() {
            missing.push("tierId");
        }
        if self.tier_price.is_none() {
            missing.push("tierPrice");
        }
        match &self.customer {
            Some(customer) => missing.extend(customer.missing_fields()),
            None => missing.push("customer"),
        }
        missing
    }
}

/// Airtable field layout of a donation session record.
///
/// Field names match the `donationsessions` table columns, so this serializes
/// directly into the record store's `fields` object.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationSessionFields {
    pub session_id: String,
    pub forening_id: i64,
    pub forening_navn: String,
    pub tier_id: String,
    pub tier_price: i64,
    pub customer_email: String,
    pub customer_first_name: String,
    pub customer_last_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub customer_city: String,
    pub customer_postal_code: String,
    pub customer_country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_cvr: Option<String>,
    pub status: SessionStatus,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frisbii_subscription_handle: Option<String>,
}

/// Partial update written when the poller confirms activation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionActivation {
    pub status: SessionStatus,
    pub activated_at: String,
    pub frisbii_subscription_handle: String,
}
