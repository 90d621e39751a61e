//! Raw ad nodes as they arrive from upstream.

use serde_json::Value;

use crate::json_path::{self, Seg};

/// One ad as emitted upstream, classified by shape.
///
/// Lookups never fail: a path that does not fit the document simply yields
/// `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAdNode {
    /// An object whose creative fields live under a present `snapshot` member.
    Snapshot(Value),
    /// An object carrying its fields at the top level. Snapshot-level lookups
    /// resolve against the node itself.
    Flat(Value),
    /// Anything that is not a JSON object. Kept for diagnostics; every lookup
    /// is absent.
    Opaque(Value),
}

impl RawAdNode {
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        if !value.is_object() {
            return RawAdNode::Opaque(value);
        }
        if json_path::present(value.get("snapshot")).is_some() {
            RawAdNode::Snapshot(value)
        } else {
            RawAdNode::Flat(value)
        }
    }

    /// The original document.
    #[must_use]
    pub fn value(&self) -> &Value {
        match self {
            RawAdNode::Snapshot(v) | RawAdNode::Flat(v) | RawAdNode::Opaque(v) => v,
        }
    }

    /// Ad-level lookup.
    pub(crate) fn ad(&self, path: &[Seg]) -> Option<&Value> {
        match self {
            RawAdNode::Snapshot(v) | RawAdNode::Flat(v) => json_path::get(v, path),
            RawAdNode::Opaque(_) => None,
        }
    }

    /// Snapshot-level lookup; for a flat node the snapshot is the node.
    pub(crate) fn snapshot(&self, path: &[Seg]) -> Option<&Value> {
        match self {
            RawAdNode::Snapshot(v) => v.get("snapshot").and_then(|s| json_path::get(s, path)),
            RawAdNode::Flat(v) => json_path::get(v, path),
            RawAdNode::Opaque(_) => None,
        }
    }

    /// Lookup under the real `snapshot` member only, with no flat fallback.
    pub(crate) fn own_snapshot(&self, path: &[Seg]) -> Option<&Value> {
        match self {
            RawAdNode::Snapshot(v) => v.get("snapshot").and_then(|s| json_path::get(s, path)),
            RawAdNode::Flat(_) | RawAdNode::Opaque(_) => None,
        }
    }

    pub(crate) fn ad_string(&self, path: &[Seg]) -> Option<String> {
        json_path::present_string(self.ad(path))
    }

    pub(crate) fn snapshot_string(&self, path: &[Seg]) -> Option<String> {
        json_path::present_string(self.snapshot(path))
    }
}

/// A `{node, cursor}` pair taken from a connection-shaped structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub node: Value,
    pub cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_path::Key;
    use serde_json::json;

    #[test]
    fn classifies_snapshot_flat_and_opaque() {
        assert!(matches!(
            RawAdNode::from_value(json!({"snapshot": {"page_name": "Acme"}})),
            RawAdNode::Snapshot(_)
        ));
        assert!(matches!(
            RawAdNode::from_value(json!({"page_name": "Acme"})),
            RawAdNode::Flat(_)
        ));
        assert!(matches!(
            RawAdNode::from_value(json!({"snapshot": null})),
            RawAdNode::Flat(_)
        ));
        assert!(matches!(
            RawAdNode::from_value(json!("just a string")),
            RawAdNode::Opaque(_)
        ));
    }

    #[test]
    fn flat_node_snapshot_lookup_falls_back_to_self() {
        let node = RawAdNode::from_value(json!({"page_name": "Acme"}));
        assert_eq!(node.snapshot_string(&[Key("page_name")]), Some("Acme".into()));
        assert!(node.own_snapshot(&[Key("page_name")]).is_none());
    }

    #[test]
    fn snapshot_node_does_not_read_top_level_for_snapshot_paths() {
        let node = RawAdNode::from_value(json!({
            "page_name": "Top",
            "snapshot": {"caption": {"text": "hi"}}
        }));
        assert!(node.snapshot_string(&[Key("page_name")]).is_none());
        assert_eq!(node.ad_string(&[Key("page_name")]), Some("Top".into()));
    }

    #[test]
    fn opaque_node_answers_absent() {
        let node = RawAdNode::from_value(json!([1, 2, 3]));
        assert!(node.ad(&[Key("id")]).is_none());
        assert!(node.snapshot(&[Key("id")]).is_none());
        assert_eq!(node.value(), &json!([1, 2, 3]));
    }
}
