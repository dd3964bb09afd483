use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};

const AIRTABLE_API_BASE: &str = "https://api.airtable.com/v0";

/// One record as returned by the Airtable REST API.
///
/// `fields` stays an untyped JSON object because the record proxies pass it
/// through verbatim; use [`AirtableRecord::decode_fields`] where a typed view
/// is needed.
#[derive(Debug, Clone, Deserialize)]
pub struct AirtableRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Value,
}

impl AirtableRecord {
    /// String field accessor for ad-hoc reads (logging, status checks).
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// Query options for listing records, mirroring the Airtable select params.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub filter_by_formula: Option<String>,
    pub max_records: Option<usize>,
    /// Restrict the returned field set (Airtable `fields[]` param)
    pub fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ListRecordsResponse {
    records: Vec<AirtableRecord>,
    offset: Option<String>,
}

#[derive(Debug, Serialize)]
struct WriteRecordRequest<T: Serialize> {
    fields: T,
}

/// Thin client for the Airtable REST API (the hosted record store).
#[derive(Debug, Clone)]
pub struct AirtableClient {
    client: Client,
    api_key: String,
    base_id: String,
    base_url: String,
}

impl AirtableClient {
    pub fn new(api_key: &str, base_id: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_id: base_id.to_string(),
            base_url: AIRTABLE_API_BASE.to_string(),
        }
    }

    /// Point the client at a different API host. Used by tests to target an
    /// in-process stand-in server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.base_id, table)
    }

    /// List records, following Airtable's offset pagination until the
    /// requested `max_records` cap (or the end of the table) is reached.
    pub async fn list_records(
        &self,
        table: &str,
        options: &SelectOptions,
    ) -> Result<Vec<AirtableRecord>> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut query: Vec<(String, String)> = Vec::new();
            if let Some(ref formula) = options.filter_by_formula {
                query.push(("filterByFormula".to_string(), formula.clone()));
            }
            if let Some(max) = options.max_records {
                query.push(("maxRecords".to_string(), max.to_string()));
            }
            for field in &options.fields {
                query.push(("fields[]".to_string(), field.clone()));
            }
            if let Some(ref o) = offset {
                query.push(("offset".to_string(), o.clone()));
            }

            let response = self
                .client
                .get(self.table_url(table))
                .bearer_auth(&self.api_key)
                .query(&query)
                .send()
                .await
                .map_err(|e| AppError::Internal(format!("Airtable API error: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                return Err(AppError::Internal(format!(
                    "Airtable API error: {} - {}",
                    status, error_text
                )));
            }

            let page: ListRecordsResponse = response.json().await.map_err(|e| {
                AppError::Internal(format!("Failed to parse Airtable response: {}", e))
            })?;

            records.extend(page.records);

            if let Some(max) = options.max_records {
                if records.len() >= max {
                    records.truncate(max);
                    break;
                }
            }

            match page.offset {
                Some(o) => offset = Some(o),
                None => break,
            }
        }

        Ok(records)
    }

    /// Fetch a single record by its Airtable record ID.
    pub async fn get_record(&self, table: &str, record_id: &str) -> Result<AirtableRecord> {
        let response = self
            .client
            .get(format!("{}/{}", self.table_url(table), record_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Airtable API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Airtable API error: {} - {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Airtable response: {}", e)))
    }

    /// Create a record from a serializable fields struct.
    pub async fn create_record<T: Serialize>(
        &self,
        table: &str,
        fields: &T,
    ) -> Result<AirtableRecord> {
        let response = self
            .client
            .post(self.table_url(table))
            .bearer_auth(&self.api_key)
            .json(&WriteRecordRequest { fields })
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Airtable API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Airtable API error: {} - {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Airtable response: {}", e)))
    }

    /// Patch a record's fields. Fields not present in `fields` are left
    /// untouched by Airtable.
    pub async fn update_record<T: Serialize>(
        &self,
        table: &str,
        record_id: &str,
        fields: &T,
    ) -> Result<AirtableRecord> {
        let response = self
            .client
            .patch(format!("{}/{}", self.table_url(table), record_id))
            .bearer_auth(&self.api_key)
            .json(&WriteRecordRequest { fields })
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Airtable API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Airtable API error: {} - {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Airtable response: {}", e)))
    }
}
