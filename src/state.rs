use crate::billing::FrisbiiClient;
use crate::config::Config;
use crate::store::AirtableClient;

/// Application state shared by handlers and the poller.
#[derive(Clone)]
pub struct AppState {
    pub airtable: AirtableClient,
    pub frisbii: FrisbiiClient,
    /// Table served by /get-records
    pub records_table: String,
    /// Table holding donation sessions
    pub sessions_table: String,
    pub accept_url: String,
    pub cancel_url: String,
    /// Static checkout URL returned when Frisbii session creation fails
    pub fallback_checkout_url: String,
    /// Webhook signing secret; verification is log-only when set
    pub webhook_secret: Option<String>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            airtable: AirtableClient::new(&config.airtable_api_key, &config.airtable_base_id),
            frisbii: FrisbiiClient::new(&config.frisbii_private_key),
            records_table: config.records_table.clone(),
            sessions_table: config.sessions_table.clone(),
            accept_url: config.accept_url.clone(),
            cancel_url: config.cancel_url.clone(),
            fallback_checkout_url: config.fallback_checkout_url.clone(),
            webhook_secret: config.frisbii_webhook_secret.clone(),
        }
    }
}
