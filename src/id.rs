//! Donation session ID generation.
//!
//! Session IDs use a `di-` prefix so they double as Frisbii subscription
//! handles without colliding with Frisbii's own `sub-`/`cust-` handles.
//!
//! Format: `di-{unix_millis}-{8_hex_chars}`

use chrono::Utc;
use uuid::Uuid;

const SESSION_PREFIX: &str = "di-";

/// Generates a new donation session ID.
pub fn generate_session_id() -> String {
    let random = Uuid::new_v4().as_simple().to_string();
    format!(
        "{}{}-{}",
        SESSION_PREFIX,
        Utc::now().timestamp_millis(),
        &random[..8]
    )
}

/// Validate that a string is a well-formed session ID.
///
/// Cheap check used to tell our own subscription handles apart from
/// handles created directly in the Frisbii dashboard.
pub fn is_session_id(s: &str) -> bool {
    let Some(rest) = s.strip_prefix(SESSION_PREFIX) else {
        return false;
    };

    let Some((millis, suffix)) = rest.split_once('-') else {
        return false;
    };

    !millis.is_empty()
        && millis.chars().all(|c| c.is_ascii_digit())
        && !suffix.is_empty()
        && suffix.chars().all(|c| c.is_ascii_alphanumeric())
}
