//! Deep node extraction over both capture channels.
//!
//! The same logical connection shows up at several nesting points in network
//! bodies, so those are searched structurally instead of by a fixed path.

use serde_json::Value;

use crate::capture::ScrapeContext;
use crate::json_path::{self, get_keys};
use crate::node::{Edge, RawAdNode};

/// Known locations of a `search_results_connection`, tested in order at every
/// object.
const CONNECTION_PATHS: &[&[&str]] = &[
    &["ad_library_main", "search_results_connection"],
    &[
        "ad_library_main",
        "ad_search",
        "results",
        "search_results_connection",
    ],
    &["ad_archive", "search_results_connection"],
    &["viewer", "ad_archive_search", "search_results_connection"],
];

/// Recovers every raw ad node captured for one URL: embedded-channel nodes
/// first, then network-channel nodes in capture order.
#[must_use]
pub fn extract_nodes(ctx: &ScrapeContext) -> Vec<RawAdNode> {
    let mut nodes = flatten_embedded(&ctx.embedded_edges);
    for response in &ctx.responses {
        nodes.extend(search_body(&response.body));
    }
    nodes.into_iter().map(RawAdNode::from_value).collect()
}

/// Embedded edges: collation wrappers become their children; other nodes are
/// kept only when they carry a `snapshot`.
fn flatten_embedded(edges: &[Edge]) -> Vec<Value> {
    let mut out = Vec::new();
    for edge in edges {
        if let Some(children) = collated_children(&edge.node) {
            out.extend(children.iter().cloned());
        } else if json_path::present(edge.node.get("snapshot")).is_some() {
            out.push(edge.node.clone());
        }
    }
    out
}

/// Searches one network body. Arrays are searched element-wise; each root is
/// its `data` member when present, else itself.
pub(crate) fn search_body(body: &Value) -> Vec<Value> {
    let mut out = Vec::new();
    match body {
        Value::Array(items) => {
            for item in items {
                dig(data_or_self(item), &mut out);
            }
        }
        other => dig(data_or_self(other), &mut out),
    }
    out
}

fn data_or_self(value: &Value) -> &Value {
    match value.get("data") {
        Some(data) if !data.is_null() => data,
        _ => value,
    }
}

fn dig(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Object(map) => {
            collect_connection(value, out);
            for child in map.values() {
                if child.is_object() || child.is_array() {
                    dig(child, out);
                }
            }
        }
        Value::Array(items) => {
            for child in items {
                if child.is_object() || child.is_array() {
                    dig(child, out);
                }
            }
        }
        _ => {}
    }
}

/// Only the first present connection at an object is considered.
fn collect_connection(object: &Value, out: &mut Vec<Value>) {
    let Some(connection) = CONNECTION_PATHS
        .iter()
        .find_map(|path| json_path::present(get_keys(object, path)))
    else {
        return;
    };
    let Some(edges) = json_path::non_empty_array(connection.get("edges")) else {
        return;
    };
    for edge in edges {
        let Some(node) = json_path::present(edge.get("node")) else {
            continue;
        };
        match collated_children(node) {
            Some(children) => out.extend(children.iter().cloned()),
            None => out.push(node.clone()),
        }
    }
}

fn collated_children(node: &Value) -> Option<&Vec<Value>> {
    json_path::non_empty_array(node.get("collated_results"))
}
