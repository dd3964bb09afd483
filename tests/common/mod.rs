//! Test utilities and fixtures for hjertebro integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{body::Body, Json, Router};
use serde_json::{json, Value};

pub use hjertebro::billing::FrisbiiClient;
pub use hjertebro::handlers::{
    create_donation_session, get_foreninger, get_records, handle_frisbii_webhook,
};
pub use hjertebro::state::AppState;
pub use hjertebro::store::AirtableClient;

// ============ In-process stand-in for the Airtable and Frisbii APIs ============

#[derive(Debug, Clone)]
pub struct MockRecord {
    pub id: String,
    pub fields: Value,
}

#[derive(Debug, Default)]
pub struct MockState {
    next_record_id: usize,
    /// table name -> records
    pub tables: HashMap<String, Vec<MockRecord>>,
    /// subscription handle -> reported state ("active", "pending", ...)
    pub subscriptions: HashMap<String, String>,
    /// When set, every Airtable route answers 500
    pub fail_airtable: bool,
    /// When set, checkout session creation answers 500
    pub fail_frisbii_checkout: bool,
    /// When set, fetching a subscription flips its session record to active
    /// first, simulating a concurrent writer racing the poller between its
    /// pending scan and its update
    pub activate_on_subscription_fetch: bool,
}

impl MockState {
    pub fn insert_record(&mut self, table: &str, fields: Value) -> String {
        self.next_record_id += 1;
        let id = format!("rec{:06}", self.next_record_id);
        self.tables
            .entry(table.to_string())
            .or_default()
            .push(MockRecord {
                id: id.clone(),
                fields,
            });
        id
    }

    pub fn record(&self, table: &str, record_id: &str) -> Option<&MockRecord> {
        self.tables
            .get(table)?
            .iter()
            .find(|r| r.id == record_id)
    }

    pub fn records(&self, table: &str) -> &[MockRecord] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub type SharedMockState = Arc<Mutex<MockState>>;

/// A running mock upstream bound to an ephemeral port.
pub struct MockUpstream {
    pub base_url: String,
    pub state: SharedMockState,
}

impl MockUpstream {
    pub fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

/// Start the stand-in server for both upstream APIs.
pub async fn spawn_mock_upstream() -> MockUpstream {
    let state: SharedMockState = Arc::new(Mutex::new(MockState::default()));

    let app = Router::new()
        // Frisbii (static segments win over the Airtable catch-alls)
        .route("/v1/session/subscription", post(frisbii_create_session))
        .route("/v1/subscription/{handle}", get(frisbii_get_subscription))
        // Airtable
        .route("/{base}/{table}", get(airtable_list).post(airtable_create))
        .route(
            "/{base}/{table}/{record}",
            get(airtable_get).patch(airtable_update),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock upstream");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockUpstream {
        base_url: format!("http://{}", addr),
        state,
    }
}

/// Supports the one formula shape the gateway issues: `{field} = 'value'`.
fn matches_formula(fields: &Value, formula: &str) -> bool {
    let Some((field, value)) = formula.split_once('=') else {
        return true;
    };
    let field = field.trim().trim_start_matches('{').trim_end_matches('}');
    let field = field.trim();
    let value = value.trim().trim_matches('\'');
    fields.get(field).and_then(Value::as_str) == Some(value)
}

async fn airtable_list(
    State(state): State<SharedMockState>,
    Path((_base, table)): Path<(String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let state = state.lock().unwrap();
    if state.fail_airtable {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "mock airtable outage"})),
        );
    }

    let formula = params
        .iter()
        .find(|(k, _)| k == "filterByFormula")
        .map(|(_, v)| v.clone());
    let max_records: Option<usize> = params
        .iter()
        .find(|(k, _)| k == "maxRecords")
        .and_then(|(_, v)| v.parse().ok());
    let projection: Vec<&String> = params
        .iter()
        .filter(|(k, _)| k == "fields[]")
        .map(|(_, v)| v)
        .collect();

    let mut records: Vec<Value> = state
        .records(&table)
        .iter()
        .filter(|r| {
            formula
                .as_deref()
                .map(|f| matches_formula(&r.fields, f))
                .unwrap_or(true)
        })
        .map(|r| {
            let fields = if projection.is_empty() {
                r.fields.clone()
            } else {
                let mut projected = serde_json::Map::new();
                if let Some(obj) = r.fields.as_object() {
                    for (k, v) in obj {
                        if projection.iter().any(|p| *p == k) {
                            projected.insert(k.clone(), v.clone());
                        }
                    }
                }
                Value::Object(projected)
            };
            json!({"id": r.id, "fields": fields})
        })
        .collect();

    if let Some(max) = max_records {
        records.truncate(max);
    }

    (StatusCode::OK, Json(json!({"records": records})))
}

async fn airtable_create(
    State(state): State<SharedMockState>,
    Path((_base, table)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let mut state = state.lock().unwrap();
    if state.fail_airtable {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "mock airtable outage"})),
        );
    }

    let fields = body.get("fields").cloned().unwrap_or(json!({}));
    let id = state.insert_record(&table, fields.clone());
    (StatusCode::OK, Json(json!({"id": id, "fields": fields})))
}

async fn airtable_get(
    State(state): State<SharedMockState>,
    Path((_base, table, record_id)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let state = state.lock().unwrap();
    if state.fail_airtable {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "mock airtable outage"})),
        );
    }

    match state.record(&table, &record_id) {
        Some(record) => (
            StatusCode::OK,
            Json(json!({"id": record.id, "fields": record.fields})),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"type": "MODEL_ID_NOT_FOUND"}})),
        ),
    }
}

async fn airtable_update(
    State(state): State<SharedMockState>,
    Path((_base, table, record_id)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let mut state = state.lock().unwrap();
    if state.fail_airtable {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "mock airtable outage"})),
        );
    }

    let patch = body.get("fields").cloned().unwrap_or(json!({}));
    let records = state.tables.entry(table).or_default();
    let Some(record) = records.iter_mut().find(|r| r.id == record_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"type": "MODEL_ID_NOT_FOUND"}})),
        );
    };

    if let (Some(existing), Some(incoming)) = (record.fields.as_object_mut(), patch.as_object()) {
        for (k, v) in incoming {
            existing.insert(k.clone(), v.clone());
        }
    }

    (
        StatusCode::OK,
        Json(json!({"id": record.id, "fields": record.fields})),
    )
}

async fn frisbii_create_session(
    State(state): State<SharedMockState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let state = state.lock().unwrap();
    if state.fail_frisbii_checkout {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "mock frisbii outage"})),
        );
    }

    let handle = body
        .pointer("/subscription/handle")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    (
        StatusCode::OK,
        Json(json!({
            "id": format!("cs_{}", handle),
            "url": format!("https://checkout.frisbii.com/#/cs_{}", handle),
        })),
    )
}

async fn frisbii_get_subscription(
    State(state): State<SharedMockState>,
    Path(handle): Path<String>,
) -> impl IntoResponse {
    let mut state = state.lock().unwrap();
    if state.activate_on_subscription_fetch {
        if let Some(records) = state.tables.get_mut("donationsessions") {
            for record in records.iter_mut() {
                if record.fields.get("sessionId").and_then(Value::as_str) == Some(handle.as_str()) {
                    record.fields["status"] = json!("active");
                    record.fields["activatedAt"] = json!("2026-01-15T09:59:00.000Z");
                }
            }
        }
    }
    match state.subscriptions.get(&handle) {
        Some(sub_state) => (
            StatusCode::OK,
            Json(json!({"handle": handle, "state": sub_state})),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Subscription not found", "code": 40})),
        ),
    }
}

// ============ Gateway fixtures ============

/// App state wired to the mock upstream.
pub fn test_state(upstream: &MockUpstream) -> AppState {
    AppState {
        airtable: AirtableClient::new("key_test", "appTEST").with_base_url(&upstream.base_url),
        frisbii: FrisbiiClient::new("priv_test").with_base_url(&upstream.base_url),
        records_table: "Hjertesager".to_string(),
        sessions_table: "donationsessions".to_string(),
        accept_url: "https://stotmedhjerte.dk/tak".to_string(),
        cancel_url: "https://stotmedhjerte.dk/afbrudt".to_string(),
        fallback_checkout_url: "https://checkout.frisbii.com/stotmedhjerte".to_string(),
        webhook_secret: None,
    }
}

/// Router with the public routes, without the per-IP rate limiter (oneshot
/// requests carry no peer address).
pub fn test_app(state: AppState) -> Router {
    Router::new()
        .route("/create-donation-session", post(create_donation_session))
        .route("/get-records", get(get_records))
        .route("/get-foreninger", get(get_foreninger))
        .route("/webhook/frisbii", post(handle_frisbii_webhook))
        .with_state(state)
}

/// A fully populated session-creation body.
pub fn valid_session_body() -> Value {
    json!({
        "foreningId": 42,
        "foreningNavn": "Hjerteforeningen Aarhus",
        "tierId": "plan-guld",
        "tierPrice": 99,
        "customer": {
            "email": "donor@example.dk",
            "firstName": "Mette",
            "lastName": "Jensen",
            "phone": "+4512345678",
            "address": "Nørregade 1",
            "city": "København",
            "postalCode": "1165"
        }
    })
}

/// Seed a pending donation session record; returns the record ID.
pub fn seed_pending_session(upstream: &MockUpstream, session_id: &str, forening: &str) -> String {
    upstream.lock().insert_record(
        "donationsessions",
        json!({
            "sessionId": session_id,
            "foreningId": 42,
            "foreningNavn": forening,
            "tierId": "plan-guld",
            "tierPrice": 99,
            "status": "pending",
            "createdAt": "2026-01-15T10:00:00.000Z",
        }),
    )
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&body).expect("Response body should be JSON")
}
