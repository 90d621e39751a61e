//! Database operations for the `brands` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `brands` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandRow {
    pub id: i64,
    pub name: String,
    pub logo_url: Option<String>,
    pub platform: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns the id of the brand identified by `(name, platform)`, creating the
/// row on first sighting.
///
/// An existing row keeps its `logo_url` unless it is `NULL`, in which case
/// the supplied logo fills it in.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn get_or_create_brand(
    pool: &PgPool,
    name: &str,
    platform: &str,
    logo_url: Option<&str>,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO brands (name, platform, logo_url) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (name, platform) DO UPDATE SET \
             logo_url = COALESCE(brands.logo_url, EXCLUDED.logo_url) \
         RETURNING id",
    )
    .bind(name)
    .bind(platform)
    .bind(logo_url)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Returns a brand by `(name, platform)`, or `None` if it has never been seen.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_brand(
    pool: &PgPool,
    name: &str,
    platform: &str,
) -> Result<Option<BrandRow>, DbError> {
    let row = sqlx::query_as::<_, BrandRow>(
        "SELECT id, name, logo_url, platform, created_at \
         FROM brands \
         WHERE name = $1 AND platform = $2",
    )
    .bind(name)
    .bind(platform)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
