//! Canonical, storage-ready advertisement record.
//!
//! Everything the scraper extracts is funnelled into [`CanonicalAdRecord`]
//! before it reaches the database or the ingest endpoint. The JSON shape of
//! this struct is also the wire format of `POST /scrape_ads`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Platform label written to `brands.platform` for every brand this pipeline creates.
pub const AD_SOURCE_PLATFORM: &str = "facebook";

/// Delivery status of an ad at scrape time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdStatus {
    Active,
    #[default]
    Inactive,
}

impl AdStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AdStatus::Active => "Active",
            AdStatus::Inactive => "Inactive",
        }
    }
}

impl std::fmt::Display for AdStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Creative format, derived from which media collection the ad carries.
///
/// Priority when several are present: video, then image, then carousel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdFormat {
    Video,
    Image,
    Carousel,
    #[default]
    Unknown,
}

impl AdFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AdFormat::Video => "video",
            AdFormat::Image => "image",
            AdFormat::Carousel => "carousel",
            AdFormat::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AdFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized advertisement.
///
/// `time_running` is never derived by the normalizer. The stored value comes
/// from [`CanonicalAdRecord::time_running_at`] on the day the row is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalAdRecord {
    /// Provider identifier; the storage-level conflict key. May be absent.
    #[serde(default)]
    pub ad_id: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub status: AdStatus,
    /// Serialized as `YYYY-MM-DD`.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Whole days the ad has been running, minimum 1.
    #[serde(default)]
    pub time_running: Option<i32>,
    #[serde(default)]
    pub ads_format: AdFormat,
    /// Comma-joined platform list, e.g. `"facebook, instagram"`.
    #[serde(default)]
    pub ads_platforms: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub brand_logo_url: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

impl CanonicalAdRecord {
    /// Returns `true` when the record carries at least one of brand, caption,
    /// image URL or video URL. Records failing this check are never stored.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.brand.is_some()
            || self.caption.is_some()
            || self.image_url.is_some()
            || self.video_url.is_some()
    }

    /// `time_running` as of `now`, ignoring any value carried by the record.
    #[must_use]
    pub fn time_running_at(&self, now: DateTime<Utc>) -> Option<i32> {
        self.start_date.map(|start| time_running_days(start, now))
    }
}

/// Whole days elapsed from `start` (taken as UTC midnight) to `now`, floored,
/// never less than 1.
#[must_use]
pub fn time_running_days(start: NaiveDate, now: DateTime<Utc>) -> i32 {
    let start_midnight = start.and_time(chrono::NaiveTime::MIN).and_utc();
    let elapsed_days = (now - start_midnight).num_days();
    i32::try_from(elapsed_days.max(1)).unwrap_or(i32::MAX)
}

#[cfg(test)]
#[path = "ads_test.rs"]
mod tests;
