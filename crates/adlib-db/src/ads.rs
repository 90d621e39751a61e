//! Database operations for the `ads` table.

use adlib_core::{CanonicalAdRecord, AD_SOURCE_PLATFORM};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::brands::get_or_create_brand;
use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `ads` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdRow {
    pub id: i64,
    pub ad_id: Option<String>,
    pub brand_id: Option<i64>,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub time_running: Option<i32>,
    pub ads_format: String,
    pub ads_platforms: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub caption: Option<String>,
    pub brand_logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Persists one normalized ad.
///
/// Records without content (see [`CanonicalAdRecord::has_content`]) are
/// skipped. The brand is resolved with [`get_or_create_brand`] when the
/// record names one. `time_running` is recomputed against `now` before
/// insert. Conflicts on `ad_id` are a no-op; records without an `ad_id`
/// always insert.
///
/// Returns the number of rows inserted (0 or 1).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either the brand upsert or the ad insert fails.
pub async fn insert_ad(
    pool: &PgPool,
    record: &CanonicalAdRecord,
    now: DateTime<Utc>,
) -> Result<u64, DbError> {
    if !record.has_content() {
        return Ok(0);
    }

    let brand_id = match record.brand.as_deref() {
        Some(name) => Some(
            get_or_create_brand(
                pool,
                name,
                AD_SOURCE_PLATFORM,
                record.brand_logo_url.as_deref(),
            )
            .await?,
        ),
        None => None,
    };

    let time_running = record.time_running_at(now);

    let result = sqlx::query(
        "INSERT INTO ads \
             (ad_id, brand_id, status, start_date, time_running, ads_format, ads_platforms, \
              image_url, video_url, caption, brand_logo_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT (ad_id) DO NOTHING",
    )
    .bind(record.ad_id.as_deref())
    .bind(brand_id)
    .bind(record.status.as_str())
    .bind(record.start_date)
    .bind(time_running)
    .bind(record.ads_format.as_str())
    .bind(record.ads_platforms.as_deref())
    .bind(record.image_url.as_deref())
    .bind(record.video_url.as_deref())
    .bind(record.caption.as_deref())
    .bind(record.brand_logo_url.as_deref())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns the ad with the given provider identifier.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_ad_by_ad_id(pool: &PgPool, ad_id: &str) -> Result<AdRow, DbError> {
    sqlx::query_as::<_, AdRow>(
        "SELECT id, ad_id, brand_id, status, start_date, time_running, ads_format, \
                ads_platforms, image_url, video_url, caption, brand_logo_url, created_at \
         FROM ads \
         WHERE ad_id = $1",
    )
    .bind(ad_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Total number of stored ads.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_ads(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ads")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
