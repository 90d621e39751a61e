use adlib_core::CanonicalAdRecord;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct IngestResponse {
    success: bool,
    message: String,
    inserted_count: u64,
}

/// Stores externally scraped records, one insert per record.
///
/// The whole payload is validated before the first insert.
pub(super) async fn scrape_ads(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let Json(body) = payload.map_err(|rejection| reject_body(&req_id.0, &rejection))?;
    let records = parse_records(&body)
        .map_err(|message| ApiError::new(req_id.0.clone(), "bad_request", message))?;

    tracing::info!(records = records.len(), "ingest request");

    let now = Utc::now();
    let mut inserted_count = 0;
    for record in &records {
        inserted_count += adlib_db::insert_ad(&state.pool, record, now)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    }

    Ok(Json(IngestResponse {
        success: true,
        message: format!("processed {} records", records.len()),
        inserted_count,
    }))
}

fn reject_body(request_id: &str, rejection: &JsonRejection) -> ApiError {
    let code = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        "payload_too_large"
    } else {
        "bad_request"
    };
    ApiError::new(request_id, code, rejection.body_text())
}

/// `data` must be an array; every element must decode as a record.
fn parse_records(body: &Value) -> Result<Vec<CanonicalAdRecord>, String> {
    let items = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| "`data` must be an array of ad records".to_owned())?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            CanonicalAdRecord::deserialize(item).map_err(|e| format!("data[{i}]: {e}"))
        })
        .collect()
}
