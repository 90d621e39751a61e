use adlib_core::CanonicalAdRecord;
use adlib_scraper::{
    AdSink, ChromiumOptions, ChromiumSession, DriverSettings, ScrapeDriver, SinkError,
};
use async_trait::async_trait;
use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, AppState};

const NO_LINKS_MESSAGE: &str = "no valid URLs in the links table";

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(super) struct ScrapeSummary {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    total_urls: usize,
    total_ads: usize,
    inserted_count: u64,
}

/// Writes each record straight to Postgres, committing per row.
struct PgSink {
    pool: PgPool,
    now: DateTime<Utc>,
}

#[async_trait]
impl AdSink for PgSink {
    async fn persist(&mut self, records: &[CanonicalAdRecord]) -> Result<u64, SinkError> {
        let mut inserted = 0;
        for record in records {
            inserted += adlib_db::insert_ad(&self.pool, record, self.now).await?;
        }
        Ok(inserted)
    }
}

/// Scrapes every stored link in one browser session and stores the ads.
pub(super) async fn scrape_from_links(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ScrapeSummary>, ApiError> {
    let urls = adlib_db::list_link_urls(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if urls.is_empty() {
        tracing::info!("no links to scrape");
        return Ok(Json(ScrapeSummary {
            success: true,
            message: Some(NO_LINKS_MESSAGE),
            total_urls: 0,
            total_ads: 0,
            inserted_count: 0,
        }));
    }

    tracing::info!(urls = urls.len(), "starting scrape batch");

    let settings = &state.config.scrape;
    let session = ChromiumSession::launch(&ChromiumOptions::from_scrape_settings(settings))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "browser launch failed");
            ApiError::new(req_id.0.clone(), "internal_error", e.to_string())
        })?;

    let driver = ScrapeDriver::new(DriverSettings::from_scrape_settings(settings));
    let mut sink = PgSink {
        pool: state.pool.clone(),
        now: Utc::now(),
    };

    let summary = driver
        .run_batch(session, &urls, &mut sink)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "scrape batch aborted");
            ApiError::new(req_id.0.clone(), "internal_error", e.to_string())
        })?;

    Ok(Json(ScrapeSummary {
        success: true,
        message: None,
        total_urls: summary.total_urls,
        total_ads: summary.total_ads,
        inserted_count: summary.inserted_count,
    }))
}
