//! Maps a [`RawAdNode`] into a [`CanonicalAdRecord`].

use adlib_core::{AdFormat, AdStatus, CanonicalAdRecord};
use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use crate::json_path::{self, Index, Key, Seg};
use crate::node::RawAdNode;

const AD_ID_PATHS: &[&[Seg]] = &[
    &[Key("ad_archive_id")],
    &[Key("id")],
    &[Key("adid")],
];

/// Profile-picture locations seen across upstream schema revisions, tried at
/// snapshot level first and then at ad level.
const LOGO_PATHS: &[&[Seg]] = &[
    &[Key("page_profile_picture_url")],
    &[Key("page_profile_image_url")],
    &[Key("page"), Key("profile_picture_url")],
    &[Key("page"), Key("profile_picture"), Key("uri")],
    &[Key("page"), Key("profile_picture"), Key("url")],
];

/// Normalizes one node. Pure: the same node always yields the same record.
///
/// `time_running` is left unset; it is computed when the record is stored.
#[must_use]
pub fn normalize_node(node: &RawAdNode) -> CanonicalAdRecord {
    CanonicalAdRecord {
        ad_id: ad_id(node),
        brand: brand(node),
        status: status(node),
        start_date: start_date(node),
        time_running: None,
        ads_format: ads_format(node),
        ads_platforms: ads_platforms(node),
        image_url: node.snapshot_string(&[
            Key("images"),
            Index(0),
            Key("original_image_url"),
        ]),
        video_url: node
            .snapshot_string(&[Key("videos"), Index(0), Key("video_hd_url")])
            .or_else(|| node.snapshot_string(&[Key("videos"), Index(0), Key("video_sd_url")])),
        brand_logo_url: brand_logo_url(node),
        caption: caption(node),
    }
}

/// Normalizes every node and drops records without content.
#[must_use]
pub fn normalize_nodes(nodes: &[RawAdNode]) -> Vec<CanonicalAdRecord> {
    nodes
        .iter()
        .map(normalize_node)
        .filter(CanonicalAdRecord::has_content)
        .collect()
}

fn ad_id(node: &RawAdNode) -> Option<String> {
    AD_ID_PATHS
        .iter()
        .find_map(|path| node.ad_string(path))
        .or_else(|| node.snapshot_string(&[Key("id")]))
        .or_else(|| node.snapshot_string(&[Key("adid")]))
}

fn brand(node: &RawAdNode) -> Option<String> {
    node.snapshot_string(&[Key("page_name")])
        .or_else(|| node.ad_string(&[Key("page"), Key("name")]))
        .or_else(|| node.ad_string(&[Key("page_name")]))
}

fn status(node: &RawAdNode) -> AdStatus {
    if json_path::present(node.ad(&[Key("is_active")])).is_some() {
        AdStatus::Active
    } else {
        AdStatus::Inactive
    }
}

fn start_date(node: &RawAdNode) -> Option<NaiveDate> {
    let raw = json_path::present(node.ad(&[Key("start_date")]))
        .or_else(|| json_path::present(node.snapshot(&[Key("start_date")])))?;
    unix_seconds_to_date(raw)
}

/// Unix seconds (number or numeric string) to a UTC calendar date.
fn unix_seconds_to_date(raw: &Value) -> Option<NaiveDate> {
    let seconds = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !seconds.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let whole = seconds.floor() as i64;
    DateTime::from_timestamp(whole, 0).map(|dt| dt.date_naive())
}

fn ads_format(node: &RawAdNode) -> AdFormat {
    let has = |key: &'static str| json_path::non_empty_array(node.snapshot(&[Key(key)])).is_some();
    if has("videos") {
        AdFormat::Video
    } else if has("images") {
        AdFormat::Image
    } else if has("cards") {
        AdFormat::Carousel
    } else {
        AdFormat::Unknown
    }
}

/// First array among the ad-level and snapshot-level platform lists, joined.
fn ads_platforms(node: &RawAdNode) -> Option<String> {
    let platforms = node
        .ad(&[Key("publisher_platform")])
        .and_then(Value::as_array)
        .or_else(|| {
            node.snapshot(&[Key("publisher_platform")])
                .and_then(Value::as_array)
        })?;
    let joined = platforms
        .iter()
        .filter_map(|p| match p {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(", ");
    (!joined.is_empty()).then_some(joined)
}

fn caption(node: &RawAdNode) -> Option<String> {
    node.snapshot_string(&[Key("body"), Key("text")])
        .or_else(|| node.snapshot_string(&[Key("caption"), Key("text")]))
        .or_else(|| node.ad_string(&[Key("best_description"), Key("text")]))
        .or_else(|| node.ad_string(&[Key("ad_creative_bodies"), Index(0), Key("text")]))
}

fn brand_logo_url(node: &RawAdNode) -> Option<String> {
    LOGO_PATHS
        .iter()
        .find_map(|path| node.snapshot_string(path))
        .or_else(|| LOGO_PATHS.iter().find_map(|path| node.ad_string(path)))
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
