use std::env;

/// Rate limit tiers in requests per minute, applied per client IP.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Endpoints that call out to Airtable/Frisbii (session creation)
    pub strict_rpm: u32,
    /// Lightweight endpoints (health, record proxies)
    pub relaxed_rpm: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub airtable_api_key: String,
    pub airtable_base_id: String,
    /// Table served by /get-records (the "Hjertesager" table)
    pub records_table: String,
    /// Table holding donation sessions
    pub sessions_table: String,
    pub frisbii_private_key: String,
    /// Optional webhook signing secret. Verification is log-only.
    pub frisbii_webhook_secret: Option<String>,
    pub accept_url: String,
    pub cancel_url: String,
    /// Static checkout URL used when Frisbii session creation fails
    pub fallback_checkout_url: String,
    /// CORS allow-list of caller origins
    pub allowed_origins: Vec<String>,
    /// Seconds between reconciliation runs; 0 disables the background poller
    pub poll_interval_secs: u64,
    pub rate_limit: RateLimitConfig,
}

const DEFAULT_ALLOWED_ORIGINS: &str =
    "https://stotmedhjerte.dk,http://localhost:5173,http://127.0.0.1:5173";

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Self {
            host,
            port,
            airtable_api_key: env::var("AIRTABLE_API_KEY").unwrap_or_default(),
            airtable_base_id: env::var("AIRTABLE_BASE_ID").unwrap_or_default(),
            records_table: env::var("AIRTABLE_TABLE_NAME")
                .unwrap_or_else(|_| "Hjertesager".to_string()),
            sessions_table: env::var("AIRTABLE_SESSIONS_TABLE")
                .unwrap_or_else(|_| "donationsessions".to_string()),
            frisbii_private_key: env::var("FRISBII_PRIVATE_KEY").unwrap_or_default(),
            frisbii_webhook_secret: env::var("FRISBII_WEBHOOK_SECRET").ok(),
            accept_url: env::var("CHECKOUT_ACCEPT_URL")
                .unwrap_or_else(|_| "https://stotmedhjerte.dk/tak".to_string()),
            cancel_url: env::var("CHECKOUT_CANCEL_URL")
                .unwrap_or_else(|_| "https://stotmedhjerte.dk/afbrudt".to_string()),
            fallback_checkout_url: env::var("CHECKOUT_FALLBACK_URL")
                .unwrap_or_else(|_| "https://checkout.frisbii.com/stotmedhjerte".to_string()),
            allowed_origins,
            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            rate_limit: RateLimitConfig {
                strict_rpm: env::var("RATE_LIMIT_STRICT_RPM")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
                relaxed_rpm: env::var("RATE_LIMIT_RELAXED_RPM")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            },
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
