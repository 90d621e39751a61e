//! Dual-source capture: intercepted network responses and JSON embedded in
//! the rendered markup, accumulated per scrape in a [`ScrapeContext`].

use std::sync::Arc;

use serde_json::Value;

use crate::browser::{RawResponse, ResourceKind, ResponsePredicate};
use crate::json_path::{self, Index, Key};
use crate::node::Edge;

/// Page script returning the text of every `script[type="application/json"]`.
pub(crate) const EMBEDDED_JSON_SCRIPT: &str = r#"Array.from(document.querySelectorAll('script[type="application/json"]')).map(s => s.textContent || "")"#;

/// Why a captured fragment contributed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// A response body or script text that is not valid JSON.
    MalformedJson,
    /// Valid JSON whose structure does not match the expected layout.
    UnexpectedShape,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipCounts {
    pub malformed_json: usize,
    pub unexpected_shape: usize,
}

impl SkipCounts {
    pub fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::MalformedJson => self.malformed_json += 1,
            SkipReason::UnexpectedShape => self.unexpected_shape += 1,
        }
    }

    #[must_use]
    pub fn get(&self, reason: SkipReason) -> usize {
        match reason {
            SkipReason::MalformedJson => self.malformed_json,
            SkipReason::UnexpectedShape => self.unexpected_shape,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.malformed_json + self.unexpected_shape
    }
}

/// A parsed network response from the ad search API.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedResponse {
    pub url: String,
    pub body: Value,
}

/// Everything captured while scraping one URL. Created fresh per attempt.
#[derive(Debug, Default)]
pub struct ScrapeContext {
    pub responses: Vec<CapturedResponse>,
    pub embedded_edges: Vec<Edge>,
    pub skips: SkipCounts,
}

impl ScrapeContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and stores one intercepted response.
    pub fn push_response(&mut self, raw: RawResponse) {
        match serde_json::from_str::<Value>(&raw.body) {
            Ok(body) => self.responses.push(CapturedResponse { url: raw.url, body }),
            Err(e) => {
                tracing::debug!(url = %raw.url, error = %e, "skipping non-JSON response");
                self.skips.record(SkipReason::MalformedJson);
            }
        }
    }

    /// Parses each embedded script text and collects the edges it carries.
    pub fn push_embedded_scripts<I, S>(&mut self, scripts: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for text in scripts {
            let Ok(doc) = serde_json::from_str::<Value>(text.as_ref()) else {
                self.skips.record(SkipReason::MalformedJson);
                continue;
            };
            match embedded_edges(&doc) {
                Some(edges) => self.embedded_edges.extend(edges),
                None => self.skips.record(SkipReason::UnexpectedShape),
            }
        }
    }
}

/// Builds the network-channel filter: URL contains `api_url_pattern` and the
/// response is XHR.
#[must_use]
pub fn api_response_filter(api_url_pattern: &str) -> ResponsePredicate {
    let pattern = api_url_pattern.to_owned();
    Arc::new(move |url: &str, kind: ResourceKind| kind == ResourceKind::Xhr && url.contains(&pattern))
}

/// Walks the server-rendered bootstrap payload:
/// `require[*][3][*].__bbox.require[*][3](.[1])?.__bbox.result.data
///  .ad_library_main.search_results_connection.edges[*]`.
///
/// Returns `None` when the document has no `require` array. Any other shape
/// mismatch only drops the branch it occurs in.
pub(crate) fn embedded_edges(doc: &Value) -> Option<Vec<Edge>> {
    let require = doc.get("require")?.as_array()?;
    let mut edges = Vec::new();

    for item in require {
        let Some(payloads) = json_path::get(item, &[Index(3)]).and_then(Value::as_array) else {
            continue;
        };
        for block in payloads {
            let Some(inner_require) =
                json_path::get(block, &[Key("__bbox"), Key("require")]).and_then(Value::as_array)
            else {
                continue;
            };
            for inner in inner_require {
                let Some(mut data_block) = json_path::get(inner, &[Index(3)]) else {
                    continue;
                };
                if let Some(items) = data_block.as_array() {
                    if items.len() > 1 {
                        data_block = &items[1];
                    }
                }
                let conn_edges = json_path::get(
                    data_block,
                    &[
                        Key("__bbox"),
                        Key("result"),
                        Key("data"),
                        Key("ad_library_main"),
                        Key("search_results_connection"),
                        Key("edges"),
                    ],
                )
                .and_then(Value::as_array);
                let Some(conn_edges) = conn_edges else {
                    continue;
                };
                edges.extend(conn_edges.iter().filter_map(|edge| {
                    let node = json_path::present(edge.get("node"))?;
                    Some(Edge {
                        node: node.clone(),
                        cursor: json_path::present_string(edge.get("cursor")),
                    })
                }));
            }
        }
    }

    Some(edges)
}
