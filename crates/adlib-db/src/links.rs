//! Database operations for the `links` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `links` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LinkRow {
    pub id: i64,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Returns every usable target URL in insertion order.
///
/// Rows whose `url` is `NULL` or empty are skipped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_link_urls(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let urls = sqlx::query_scalar::<_, String>(
        "SELECT url FROM links \
         WHERE url IS NOT NULL AND url <> '' \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(urls)
}

/// Returns every row in the `links` table, including unusable ones.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_links(pool: &PgPool) -> Result<Vec<LinkRow>, DbError> {
    let rows = sqlx::query_as::<_, LinkRow>("SELECT id, url, created_at FROM links ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Adds a target URL. Returns `true` if a new row was created, `false` if the
/// URL was already present.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn add_link(pool: &PgPool, url: &str) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO links (url) VALUES ($1) \
         ON CONFLICT (url) WHERE url IS NOT NULL DO NOTHING",
    )
    .bind(url)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
