//! Capture-to-record pipeline over realistic payload shapes, without a
//! browser: responses and script texts are pushed into a `ScrapeContext`
//! exactly as the driver does after pagination.

use serde_json::{json, Value};

use adlib_core::{AdFormat, AdStatus};
use adlib_scraper::{
    dedup_nodes, extract_nodes, normalize_nodes, RawResponse, ResourceKind, ScrapeContext,
    SkipReason,
};

fn xhr(body: &Value) -> RawResponse {
    RawResponse {
        url: "https://www.facebook.com/api/graphql/".to_owned(),
        kind: ResourceKind::Xhr,
        body: body.to_string(),
    }
}

/// Search page bootstrap with the given edges at the usual depth.
fn bootstrap(edges: &Value) -> String {
    json!({"require": [["ScheduledServerJS", "handle", null, [{
        "__bbox": {"require": [["RelayPrefetchedStreamCache", "next", [], [
            "adp_AdLibrarySearchResultsQueryRelayPreloader",
            {"__bbox": {"result": {"data": {"ad_library_main": {
                "search_results_connection": {"edges": edges}
            }}}}}
        ]]]}
    }]]]})
    .to_string()
}

fn run(ctx: &ScrapeContext) -> Vec<adlib_core::CanonicalAdRecord> {
    normalize_nodes(&dedup_nodes(extract_nodes(ctx)))
}

// ---------------------------------------------------------------------------
// Embedded channel
// ---------------------------------------------------------------------------

#[test]
fn collated_results_are_flattened() {
    let mut ctx = ScrapeContext::new();
    ctx.push_embedded_scripts([bootstrap(&json!([{
        "cursor": "c1",
        "node": {"collated_results": [
            {"ad_archive_id": "10", "snapshot": {"page_name": "Acme", "videos": [{"video_hd_url": "http://v/10.mp4"}]}},
            {"ad_archive_id": "11", "snapshot": {"page_name": "Acme", "cards": [{"title": "a"}]}}
        ]}
    }]))]);

    let records = run(&ctx);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].ads_format, AdFormat::Video);
    assert_eq!(records[0].video_url.as_deref(), Some("http://v/10.mp4"));
    assert_eq!(records[1].ads_format, AdFormat::Carousel);
}

#[test]
fn embedded_nodes_without_snapshot_are_dropped() {
    let mut ctx = ScrapeContext::new();
    ctx.push_embedded_scripts([bootstrap(&json!([
        {"node": {"ad_archive_id": "20", "page_name": "No Snapshot"}},
        {"node": {"ad_archive_id": "21", "snapshot": {"page_name": "Kept"}}}
    ]))]);

    let records = run(&ctx);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].ad_id.as_deref(), Some("21"));
}

#[test]
fn unrelated_and_broken_scripts_are_counted_not_fatal() {
    let mut ctx = ScrapeContext::new();
    ctx.push_embedded_scripts(["{\"config\": true}", "{not json", "null"]);

    assert!(run(&ctx).is_empty());
    assert_eq!(ctx.skips.get(SkipReason::MalformedJson), 1);
    assert_eq!(ctx.skips.get(SkipReason::UnexpectedShape), 2);
}

// ---------------------------------------------------------------------------
// Network channel
// ---------------------------------------------------------------------------

#[test]
fn batched_array_body_is_searched_per_element() {
    let mut ctx = ScrapeContext::new();
    ctx.push_response(xhr(&json!([
        {"data": {"ad_library_main": {"search_results_connection": {"edges": [
            {"node": {"ad_archive_id": "30", "publisher_platform": ["facebook", "instagram"],
                      "snapshot": {"page_name": "Acme", "body": {"text": "hello"}}}}
        ]}}}},
        {"data": {"viewer": {"ad_archive_search": {"search_results_connection": {"edges": [
            {"node": {"ad_archive_id": "31", "snapshot": {"page_name": "Globex", "caption": {"text": "hi"}}}}
        ]}}}}}
    ])));

    let records = run(&ctx);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].ads_platforms.as_deref(), Some("facebook, instagram"));
    assert_eq!(records[1].brand.as_deref(), Some("Globex"));
}

#[test]
fn network_nodes_are_kept_without_snapshot() {
    let mut ctx = ScrapeContext::new();
    ctx.push_response(xhr(&json!({"data": {"ad_archive": {"search_results_connection": {
        "edges": [{"node": {"adid": "40", "page_name": "Flat Co", "is_active": true}}]
    }}}})));

    let records = run(&ctx);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].brand.as_deref(), Some("Flat Co"));
    assert_eq!(records[0].status, AdStatus::Active);
}

// ---------------------------------------------------------------------------
// Both channels
// ---------------------------------------------------------------------------

#[test]
fn same_ad_on_both_channels_is_emitted_once_from_embedded_copy() {
    let mut ctx = ScrapeContext::new();
    ctx.push_embedded_scripts([bootstrap(&json!([
        {"node": {"ad_archive_id": "50", "snapshot": {"page_name": "Acme", "body": {"text": "embedded"}}}}
    ]))]);
    ctx.push_response(xhr(&json!({"data": {"ad_library_main": {"search_results_connection": {
        "edges": [
            {"node": {"ad_archive_id": "50", "snapshot": {"page_name": "Acme", "body": {"text": "network"}}}},
            {"node": {"ad_archive_id": "51", "snapshot": {"page_name": "Acme", "body": {"text": "only here"}}}}
        ]
    }}}})));

    let records = run(&ctx);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].caption.as_deref(), Some("embedded"));
    assert_eq!(records[1].ad_id.as_deref(), Some("51"));
}

#[test]
fn id_less_ads_dedup_on_page_and_text() {
    let node = json!({"page_id": "p1", "snapshot": {"page_name": "Acme", "body": {"text": "same copy"}}});
    let mut ctx = ScrapeContext::new();
    ctx.push_response(xhr(&json!({"data": {"ad_library_main": {"search_results_connection": {
        "edges": [{"node": node}, {"node": node}]
    }}}})));

    assert_eq!(run(&ctx).len(), 1);
}
