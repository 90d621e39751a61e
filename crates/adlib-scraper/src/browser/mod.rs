//! Browser capability boundary.
//!
//! The pipeline only talks to a browser through [`BrowserSession`] and
//! [`BrowserPage`]. The chromiumoxide-backed implementation lives in
//! [`chromium`] behind the `browser` feature; tests drive the pipeline with
//! scripted fakes.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;

use crate::error::ScraperError;

#[cfg(feature = "browser")]
pub mod chromium;

/// Resource type reported by the browser for a network response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// `XMLHttpRequest` traffic; the asynchronous-data kind the ad search API uses.
    Xhr,
    Fetch,
    Document,
    Script,
    Image,
    Other,
}

/// One network response observed on a page, body still unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub url: String,
    pub kind: ResourceKind,
    pub body: String,
}

/// When [`BrowserPage::navigate`] considers the page loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    Load,
    NetworkIdle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigateOptions {
    pub wait: WaitCondition,
    pub timeout: Duration,
}

impl NavigateOptions {
    #[must_use]
    pub fn network_idle(timeout: Duration) -> Self {
        Self {
            wait: WaitCondition::NetworkIdle,
            timeout,
        }
    }
}

/// Filter applied to `(url, kind)` before a response body is fetched.
pub type ResponsePredicate = Arc<dyn Fn(&str, ResourceKind) -> bool + Send + Sync>;

/// Responses matching a [`ResponsePredicate`], in arrival order.
pub type ResponseStream = Pin<Box<dyn Stream<Item = RawResponse> + Send>>;

/// A single browser tab.
#[async_trait]
pub trait BrowserPage: Send {
    /// Starts recording responses that satisfy `predicate`. Must be called
    /// before [`BrowserPage::navigate`] to see the initial traffic.
    async fn on_response(
        &mut self,
        predicate: ResponsePredicate,
    ) -> Result<ResponseStream, ScraperError>;

    async fn navigate(&mut self, url: &str, options: NavigateOptions) -> Result<(), ScraperError>;

    /// Evaluates a script expression and returns its JSON value
    /// (`Value::Null` for `undefined`).
    async fn evaluate(&mut self, script: &str) -> Result<Value, ScraperError>;

    async fn scroll_by(&mut self, delta_px: i64) -> Result<(), ScraperError>;

    /// Closes the tab. Calling it twice is a no-op.
    async fn close(&mut self) -> Result<(), ScraperError>;
}

/// An exclusively owned browser process that hands out pages.
#[async_trait]
pub trait BrowserSession: Send {
    type Page: BrowserPage;

    async fn open_page(&mut self) -> Result<Self::Page, ScraperError>;

    async fn close(&mut self) -> Result<(), ScraperError>;
}
