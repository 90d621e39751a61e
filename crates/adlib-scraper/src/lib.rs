pub mod browser;
pub mod capture;
pub mod dedup;
pub mod driver;
pub mod error;
pub mod extract;
pub(crate) mod json_path;
pub mod node;
pub mod normalize;
pub mod paginator;
pub mod retry;

pub use browser::{BrowserPage, BrowserSession, NavigateOptions, RawResponse, ResourceKind};
pub use capture::{api_response_filter, ScrapeContext, SkipCounts, SkipReason};
pub use dedup::{dedup_key, dedup_nodes};
pub use driver::{AdSink, BatchSummary, DriverSettings, ScrapeDriver, ScrapedUrl, UrlOutcome};
pub use error::{ScraperError, SinkError};
pub use extract::extract_nodes;
pub use node::RawAdNode;
pub use normalize::{normalize_node, normalize_nodes};
pub use paginator::{paginate, PaginationOutcome, PaginatorSettings};
pub use retry::{RetryPolicy, UrlState};

#[cfg(feature = "browser")]
pub use browser::chromium::{ChromiumOptions, ChromiumSession};
