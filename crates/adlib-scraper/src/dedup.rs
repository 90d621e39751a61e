//! In-scrape deduplication of raw nodes.

use std::collections::HashSet;

use crate::json_path::{Key, Seg};
use crate::node::RawAdNode;

/// Characters of text used in the composite `{page_id}:{text}` key.
const COMPOSITE_TEXT_CHARS: usize = 120;

const ID_PATHS: &[&[Seg]] = &[
    &[Key("ad_archive_id")],
    &[Key("id")],
    &[Key("adid")],
];

const SNAPSHOT_ID_PATHS: &[&[Seg]] = &[&[Key("id")], &[Key("adid")]];

/// Identity key for a node, or `None` when no stable identity can be derived.
///
/// Snapshot ids are read from the real `snapshot` member only.
#[must_use]
pub fn dedup_key(node: &RawAdNode) -> Option<String> {
    ID_PATHS
        .iter()
        .find_map(|path| node.ad_string(path))
        .or_else(|| {
            SNAPSHOT_ID_PATHS
                .iter()
                .find_map(|path| crate::json_path::present_string(node.own_snapshot(path)))
        })
        .or_else(|| composite_key(node))
}

fn composite_key(node: &RawAdNode) -> Option<String> {
    let page_id = node.ad_string(&[Key("page_id")])?;
    let text = crate::json_path::present_string(node.own_snapshot(&[Key("body"), Key("text")]))
        .or_else(|| node.ad_string(&[Key("best_description"), Key("text")]))?;
    let prefix: String = text.chars().take(COMPOSITE_TEXT_CHARS).collect();
    Some(format!("{page_id}:{prefix}"))
}

/// Keeps the first node for each key, in encounter order. Keyless nodes are
/// always kept.
#[must_use]
pub fn dedup_nodes(nodes: Vec<RawAdNode>) -> Vec<RawAdNode> {
    let mut seen = HashSet::new();
    nodes
        .into_iter()
        .filter(|node| match dedup_key(node) {
            Some(key) => seen.insert(key),
            None => true,
        })
        .collect()
}
