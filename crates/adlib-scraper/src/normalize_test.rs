use super::*;
use serde_json::json;

fn normalize(v: Value) -> CanonicalAdRecord {
    normalize_node(&RawAdNode::from_value(v))
}

// -----------------------------------------------------------------------
// end-to-end scenario
// -----------------------------------------------------------------------

#[test]
fn snapshot_node_normalizes_to_canonical_record() {
    let record = normalize(json!({
        "ad_archive_id": "123",
        "snapshot": {
            "page_name": "Acme",
            "body": {"text": "Buy now"},
            "images": [{"original_image_url": "http://x/img.png"}]
        },
        "is_active": true,
        "start_date": 1_700_000_000
    }));

    assert_eq!(record.ad_id.as_deref(), Some("123"));
    assert_eq!(record.brand.as_deref(), Some("Acme"));
    assert_eq!(record.status, AdStatus::Active);
    assert_eq!(record.caption.as_deref(), Some("Buy now"));
    assert_eq!(record.image_url.as_deref(), Some("http://x/img.png"));
    assert_eq!(record.ads_format, AdFormat::Image);
    assert_eq!(record.start_date, NaiveDate::from_ymd_opt(2023, 11, 14));
    assert!(record.time_running.is_none());
    assert!(record.video_url.is_none());
}

#[test]
fn normalization_is_deterministic() {
    let node = RawAdNode::from_value(json!({
        "id": 42,
        "snapshot": {"page_name": "Acme", "videos": [{"video_sd_url": "http://x/v.mp4"}]}
    }));
    assert_eq!(normalize_node(&node), normalize_node(&node));
}

// -----------------------------------------------------------------------
// empty / opaque nodes
// -----------------------------------------------------------------------

#[test]
fn all_null_node_is_discarded() {
    let nodes = vec![
        RawAdNode::from_value(json!({"ad_archive_id": null, "snapshot": null})),
        RawAdNode::from_value(json!(17)),
    ];
    let record = normalize_node(&nodes[0]);
    assert!(record.ad_id.is_none());
    assert!(record.brand.is_none());
    assert!(record.caption.is_none());
    assert!(record.ads_platforms.is_none());
    assert!(record.brand_logo_url.is_none());
    assert_eq!(record.status, AdStatus::Inactive);
    assert_eq!(record.ads_format, AdFormat::Unknown);
    assert!(normalize_nodes(&nodes).is_empty());
}

#[test]
fn record_with_only_id_and_logo_is_discarded() {
    let nodes = vec![RawAdNode::from_value(json!({
        "id": "1",
        "snapshot": {"page_profile_picture_url": "http://x/logo.png"}
    }))];
    assert!(normalize_nodes(&nodes).is_empty());
}

// -----------------------------------------------------------------------
// ad_id / brand
// -----------------------------------------------------------------------

#[test]
fn ad_id_fallback_chain() {
    assert_eq!(normalize(json!({"adid": "a"})).ad_id.as_deref(), Some("a"));
    assert_eq!(
        normalize(json!({"id": "", "snapshot": {"id": 77}})).ad_id.as_deref(),
        Some("77")
    );
    assert_eq!(
        normalize(json!({"snapshot": {"adid": "s-adid"}})).ad_id.as_deref(),
        Some("s-adid")
    );
}

#[test]
fn brand_fallback_chain() {
    assert_eq!(
        normalize(json!({"snapshot": {"caption": {"text": "c"}}, "page": {"name": "Page Obj"}}))
            .brand
            .as_deref(),
        Some("Page Obj")
    );
    assert_eq!(
        normalize(json!({"snapshot": {"x": 1}, "page_name": "Flat Name"}))
            .brand
            .as_deref(),
        Some("Flat Name")
    );
}

#[test]
fn flat_node_reads_snapshot_fields_from_itself() {
    let record = normalize(json!({
        "page_name": "Flat Co",
        "images": [{"original_image_url": "http://x/flat.png"}],
        "body": {"text": "flat body"}
    }));
    assert_eq!(record.brand.as_deref(), Some("Flat Co"));
    assert_eq!(record.image_url.as_deref(), Some("http://x/flat.png"));
    assert_eq!(record.caption.as_deref(), Some("flat body"));
    assert_eq!(record.ads_format, AdFormat::Image);
}

// -----------------------------------------------------------------------
// status / start_date
// -----------------------------------------------------------------------

#[test]
fn status_follows_truthiness_of_is_active() {
    assert_eq!(normalize(json!({"is_active": 1})).status, AdStatus::Active);
    assert_eq!(normalize(json!({"is_active": false})).status, AdStatus::Inactive);
    assert_eq!(normalize(json!({"is_active": 0})).status, AdStatus::Inactive);
    assert_eq!(normalize(json!({})).status, AdStatus::Inactive);
}

#[test]
fn start_date_accepts_numeric_strings_and_snapshot_level() {
    assert_eq!(
        normalize(json!({"start_date": "1700000000"})).start_date,
        NaiveDate::from_ymd_opt(2023, 11, 14)
    );
    assert_eq!(
        normalize(json!({"snapshot": {"start_date": 1_704_067_200}})).start_date,
        NaiveDate::from_ymd_opt(2024, 1, 1)
    );
}

#[test]
fn zero_or_garbage_start_date_is_absent() {
    assert!(normalize(json!({"start_date": 0})).start_date.is_none());
    assert!(normalize(json!({"start_date": "yesterday"})).start_date.is_none());
}

// -----------------------------------------------------------------------
// ads_format
// -----------------------------------------------------------------------

#[test]
fn video_wins_over_image() {
    let record = normalize(json!({"snapshot": {
        "images": [{"original_image_url": "http://x/i.png"}],
        "videos": [{"video_hd_url": "http://x/hd.mp4", "video_sd_url": "http://x/sd.mp4"}]
    }}));
    assert_eq!(record.ads_format, AdFormat::Video);
    assert_eq!(record.video_url.as_deref(), Some("http://x/hd.mp4"));
    assert_eq!(record.image_url.as_deref(), Some("http://x/i.png"));
}

#[test]
fn only_cards_is_carousel() {
    let record = normalize(json!({"snapshot": {"cards": [{"title": "1"}], "images": []}}));
    assert_eq!(record.ads_format, AdFormat::Carousel);
}

#[test]
fn no_media_is_unknown() {
    assert_eq!(
        normalize(json!({"snapshot": {"page_name": "Acme"}})).ads_format,
        AdFormat::Unknown
    );
}

#[test]
fn video_falls_back_to_sd_url() {
    let record = normalize(json!({"snapshot": {"videos": [{"video_hd_url": null, "video_sd_url": "http://x/sd.mp4"}]}}));
    assert_eq!(record.video_url.as_deref(), Some("http://x/sd.mp4"));
}

// -----------------------------------------------------------------------
// ads_platforms
// -----------------------------------------------------------------------

#[test]
fn platforms_are_joined() {
    let record = normalize(json!({"publisher_platform": ["facebook", "instagram"]}));
    assert_eq!(record.ads_platforms.as_deref(), Some("facebook, instagram"));
}

#[test]
fn snapshot_platforms_used_when_ad_level_missing() {
    let record = normalize(json!({"snapshot": {"publisher_platform": ["messenger"]}}));
    assert_eq!(record.ads_platforms.as_deref(), Some("messenger"));
}

#[test]
fn first_array_wins_even_if_empty() {
    let record = normalize(json!({
        "publisher_platform": [],
        "snapshot": {"publisher_platform": ["instagram"]}
    }));
    assert!(record.ads_platforms.is_none());
}

#[test]
fn non_array_platforms_are_ignored() {
    let record = normalize(json!({"publisher_platform": "facebook"}));
    assert!(record.ads_platforms.is_none());
}

// -----------------------------------------------------------------------
// caption
// -----------------------------------------------------------------------

#[test]
fn caption_fallback_chain() {
    assert_eq!(
        normalize(json!({"snapshot": {"body": {"text": ""}, "caption": {"text": "cap"}}}))
            .caption
            .as_deref(),
        Some("cap")
    );
    assert_eq!(
        normalize(json!({"snapshot": {}, "best_description": {"text": "best"}}))
            .caption
            .as_deref(),
        Some("best")
    );
    assert_eq!(
        normalize(json!({"snapshot": {}, "ad_creative_bodies": [{"text": "creative"}]}))
            .caption
            .as_deref(),
        Some("creative")
    );
}

// -----------------------------------------------------------------------
// brand_logo_url
// -----------------------------------------------------------------------

#[test]
fn logo_prefers_snapshot_level_shapes_in_order() {
    let record = normalize(json!({
        "page_profile_picture_url": "http://x/ad-level.png",
        "snapshot": {
            "page": {"profile_picture": {"uri": "http://x/uri.png", "url": "http://x/url.png"}}
        }
    }));
    assert_eq!(record.brand_logo_url.as_deref(), Some("http://x/uri.png"));
}

#[test]
fn logo_falls_back_to_ad_level() {
    let record = normalize(json!({
        "snapshot": {"page_name": "Acme"},
        "page": {"profile_picture": {"url": "http://x/ad-url.png"}}
    }));
    assert_eq!(record.brand_logo_url.as_deref(), Some("http://x/ad-url.png"));
}

#[test]
fn logo_image_url_variant_is_recognised() {
    let record = normalize(json!({"snapshot": {"page_profile_image_url": "http://x/img-url.png"}}));
    assert_eq!(record.brand_logo_url.as_deref(), Some("http://x/img-url.png"));
}
