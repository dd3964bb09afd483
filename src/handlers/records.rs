use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::store::SelectOptions;

/// Field projection for the Forening table. The frontend only renders these.
const FORENING_FIELDS: [&str; 8] = [
    "Forening - By",
    "creditro_verified",
    "Forening - Logo",
    "Forening - Postnummer",
    "Foreningskategori",
    "Foreningsnavn",
    "Foreningstype",
    "Samarbejdsaftale underskrevet",
];

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub data: Vec<Value>,
}

/// GET /get-records - passthrough of the Hjertesager table.
pub async fn get_records(State(state): State<AppState>) -> Result<Json<RecordsResponse>> {
    let records = state
        .airtable
        .list_records(
            &state.records_table,
            &SelectOptions {
                max_records: Some(10),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| {
            tracing::error!("get-records: {}", e);
            AppError::Upstream("Failed to fetch Airtable records".into())
        })?;

    Ok(Json(RecordsResponse {
        data: records.into_iter().map(|r| r.fields).collect(),
    }))
}

/// GET /get-foreninger - association list, projected to the frontend fields.
pub async fn get_foreninger(State(state): State<AppState>) -> Result<Json<RecordsResponse>> {
    let records = state
        .airtable
        .list_records(
            "Forening",
            &SelectOptions {
                max_records: Some(100),
                fields: FORENING_FIELDS.iter().map(|f| f.to_string()).collect(),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| {
            tracing::error!("get-foreninger: {}", e);
            AppError::Upstream("Failed to fetch Forening records".into())
        })?;

    Ok(Json(RecordsResponse {
        data: records.into_iter().map(|r| r.fields).collect(),
    }))
}
