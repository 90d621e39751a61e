//! Batched upload of scraped records to a server's ingest endpoint.

use std::time::Duration;

use adlib_core::CanonicalAdRecord;
use reqwest::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ingest endpoint returned {status}: {message}")]
    Status { status: StatusCode, message: String },
}

impl UploadError {
    fn is_too_large(&self) -> bool {
        matches!(self, UploadError::Status { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE)
    }
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub ingest_url: String,
    pub batch_size: usize,
    pub batch_sleep: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Requests sent, including ones resent after a 413.
    pub requests: usize,
    /// Rows the server reports as inserted.
    pub inserted: u64,
    pub accepted_records: usize,
    pub failed_records: usize,
}

/// Uploads `records` in batches of `options.batch_size`.
///
/// A 413 halves the batch size (never below 1) and resends the same records.
/// Any other failure is logged, counted in `failed_records` and skipped.
pub async fn upload_records(
    client: &reqwest::Client,
    records: &[CanonicalAdRecord],
    options: &UploadOptions,
) -> UploadReport {
    let mut report = UploadReport::default();
    let mut size = options.batch_size.max(1);
    let mut offset = 0;

    while offset < records.len() {
        let end = (offset + size).min(records.len());
        let batch = &records[offset..end];
        report.requests += 1;
        tracing::info!(offset, records = batch.len(), "uploading batch");

        match post_batch(client, &options.ingest_url, batch).await {
            Ok(inserted) => {
                report.inserted += inserted;
                report.accepted_records += batch.len();
                offset = end;
            }
            Err(e) if e.is_too_large() && batch.len() > 1 => {
                size = (batch.len() / 2).max(1);
                tracing::warn!(batch_size = size, "payload too large, shrinking batch");
            }
            Err(e) => {
                tracing::warn!(offset, records = batch.len(), error = %e, "batch upload failed");
                report.failed_records += batch.len();
                offset = end;
            }
        }

        if offset < records.len() {
            tokio::time::sleep(options.batch_sleep).await;
        }
    }

    report
}

/// Sends one `{"data": [...]}` request and returns the server's insert count.
///
/// # Errors
///
/// Returns [`UploadError::Http`] on transport failure and
/// [`UploadError::Status`] on a non-2xx response.
pub async fn post_batch(
    client: &reqwest::Client,
    ingest_url: &str,
    batch: &[CanonicalAdRecord],
) -> Result<u64, UploadError> {
    let response = client
        .post(ingest_url)
        .json(&json!({ "data": batch }))
        .send()
        .await?;
    let (status, body) = read_json_body(response).await?;

    if !status.is_success() {
        return Err(UploadError::Status {
            status,
            message: error_message(&body, status),
        });
    }

    Ok(body
        .get("insertedCount")
        .and_then(Value::as_u64)
        .unwrap_or(batch.len() as u64))
}

/// Reads a response body as JSON, wrapping non-JSON text as `{"raw": text}`.
pub(crate) async fn read_json_body(
    response: reqwest::Response,
) -> Result<(StatusCode, Value), reqwest::Error> {
    let status = response.status();
    let text = response.text().await?;
    let body = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text }));
    Ok((status, body))
}

/// Best human-readable error from a server response body.
pub(crate) fn error_message(body: &Value, status: StatusCode) -> String {
    body.pointer("/error/message")
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .map_or_else(
            || status.canonical_reason().unwrap_or("request failed").to_owned(),
            ToOwned::to_owned,
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    fn records(n: usize) -> Vec<CanonicalAdRecord> {
        (0..n)
            .map(|i| CanonicalAdRecord {
                ad_id: Some(format!("ad-{i}")),
                caption: Some(format!("caption {i}")),
                ..CanonicalAdRecord::default()
            })
            .collect()
    }

    fn options(server: &MockServer, batch_size: usize) -> UploadOptions {
        UploadOptions {
            ingest_url: format!("{}/scrape_ads", server.uri()),
            batch_size,
            batch_sleep: Duration::from_millis(1),
        }
    }

    fn batch_len(request: &Request) -> usize {
        let body: Value = serde_json::from_slice(&request.body).expect("json body");
        body["data"].as_array().map_or(0, Vec::len)
    }

    /// Echoes the batch length as `insertedCount`.
    struct EchoCount;

    impl Respond for EchoCount {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "insertedCount": batch_len(request)
            }))
        }
    }

    /// Rejects any batch larger than `max` with 413.
    struct SizeLimited {
        max: usize,
    }

    impl Respond for SizeLimited {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let n = batch_len(request);
            if n > self.max {
                ResponseTemplate::new(413).set_body_json(json!({
                    "error": {"code": "payload_too_large", "message": "length limit exceeded"}
                }))
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"insertedCount": n}))
            }
        }
    }

    #[tokio::test]
    async fn splits_records_into_batches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scrape_ads"))
            .respond_with(EchoCount)
            .expect(3)
            .mount(&server)
            .await;

        let report =
            upload_records(&reqwest::Client::new(), &records(60), &options(&server, 25)).await;

        assert_eq!(report.requests, 3);
        assert_eq!(report.inserted, 60);
        assert_eq!(report.accepted_records, 60);
        assert_eq!(report.failed_records, 0);
    }

    #[tokio::test]
    async fn payload_too_large_halves_batch_and_resends() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scrape_ads"))
            .respond_with(SizeLimited { max: 7 })
            .mount(&server)
            .await;

        let report =
            upload_records(&reqwest::Client::new(), &records(20), &options(&server, 25)).await;

        // 20 -> 413, 10 -> 413, then batches of 5
        assert_eq!(report.inserted, 20);
        assert_eq!(report.accepted_records, 20);
        assert_eq!(report.failed_records, 0);
        assert_eq!(report.requests, 2 + 4);
    }

    #[tokio::test]
    async fn single_record_still_too_large_is_counted_as_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scrape_ads"))
            .respond_with(SizeLimited { max: 0 })
            .mount(&server)
            .await;

        let report =
            upload_records(&reqwest::Client::new(), &records(2), &options(&server, 2)).await;

        assert_eq!(report.inserted, 0);
        assert_eq!(report.failed_records, 2);
    }

    #[tokio::test]
    async fn server_error_is_counted_and_upload_continues() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scrape_ads"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({"error": {"message": "database query failed"}})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/scrape_ads"))
            .respond_with(EchoCount)
            .mount(&server)
            .await;

        let report =
            upload_records(&reqwest::Client::new(), &records(4), &options(&server, 2)).await;

        assert_eq!(report.failed_records, 2);
        assert_eq!(report.accepted_records, 2);
        assert_eq!(report.inserted, 2);
    }

    #[tokio::test]
    async fn post_batch_surfaces_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scrape_ads"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error": {"code": "bad_request", "message": "`data` must be an array"}})),
            )
            .mount(&server)
            .await;

        let err = post_batch(
            &reqwest::Client::new(),
            &format!("{}/scrape_ads", server.uri()),
            &records(1),
        )
        .await
        .unwrap_err();

        match err {
            UploadError::Status { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(message.contains("must be an array"));
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_insert_count_assumes_whole_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let inserted = post_batch(
            &reqwest::Client::new(),
            &format!("{}/scrape_ads", server.uri()),
            &records(3),
        )
        .await
        .unwrap();
        assert_eq!(inserted, 3);
    }

    #[test]
    fn error_message_prefers_structured_message() {
        let body = json!({"error": {"message": "boom"}});
        assert_eq!(error_message(&body, StatusCode::INTERNAL_SERVER_ERROR), "boom");
        let body = json!({"error": "plain"});
        assert_eq!(error_message(&body, StatusCode::BAD_REQUEST), "plain");
        assert_eq!(
            error_message(&json!({"raw": "<html>"}), StatusCode::BAD_GATEWAY),
            "Bad Gateway"
        );
    }
}
