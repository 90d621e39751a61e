//! Batch scrape driver: one browser session, URLs strictly in sequence, each
//! wrapped in the retry state machine from [`crate::retry`].

use std::time::Duration;

use adlib_core::{CanonicalAdRecord, ScrapeSettings};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::browser::{BrowserPage, BrowserSession, NavigateOptions, ResponseStream};
use crate::capture::{
    api_response_filter, ScrapeContext, SkipCounts, SkipReason, EMBEDDED_JSON_SCRIPT,
};
use crate::dedup::dedup_nodes;
use crate::error::{ScraperError, SinkError};
use crate::extract::extract_nodes;
use crate::normalize::normalize_nodes;
use crate::paginator::{paginate, uniform_between, PaginationOutcome, PaginatorSettings};
use crate::retry::{RetryPolicy, UrlState};

/// Destination for the records scraped from one URL.
#[async_trait]
pub trait AdSink: Send {
    /// Stores `records` and returns how many rows were actually inserted.
    async fn persist(&mut self, records: &[CanonicalAdRecord]) -> Result<u64, SinkError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSettings {
    pub api_url_pattern: String,
    pub nav_timeout: Duration,
    pub paginator: PaginatorSettings,
    pub retry: RetryPolicy,
    pub inter_url_delay_min: Duration,
    pub inter_url_delay_max: Duration,
}

impl DriverSettings {
    #[must_use]
    pub fn from_scrape_settings(settings: &ScrapeSettings) -> Self {
        Self {
            api_url_pattern: settings.api_url_pattern.clone(),
            nav_timeout: Duration::from_secs(settings.nav_timeout_secs),
            paginator: PaginatorSettings::from_scrape_settings(settings),
            retry: RetryPolicy::from_scrape_settings(settings),
            inter_url_delay_min: Duration::from_millis(settings.inter_url_delay_min_ms),
            inter_url_delay_max: Duration::from_millis(settings.inter_url_delay_max_ms),
        }
    }
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self::from_scrape_settings(&ScrapeSettings::default())
    }
}

/// Result of one successful attempt against one URL.
#[derive(Debug, Clone)]
pub struct ScrapedUrl {
    pub records: Vec<CanonicalAdRecord>,
    /// Raw nodes recovered before deduplication.
    pub nodes_found: usize,
    pub skips: SkipCounts,
    pub pagination: PaginationOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOutcome {
    pub url: String,
    /// Always [`UrlState::Done`] or [`UrlState::Exhausted`].
    pub state: UrlState,
    pub ads_extracted: usize,
    pub inserted: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total_urls: usize,
    pub total_ads: usize,
    pub inserted_count: u64,
    pub outcomes: Vec<UrlOutcome>,
}

impl BatchSummary {
    #[must_use]
    pub fn exhausted_urls(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.state, UrlState::Exhausted { .. }))
            .count()
    }
}

pub struct ScrapeDriver {
    settings: DriverSettings,
}

impl ScrapeDriver {
    #[must_use]
    pub fn new(settings: DriverSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// Scrapes every URL in order with one session, persisting each URL's
    /// records before moving on. The session is closed on every path.
    ///
    /// A URL that exhausts its attempts is logged and skipped. Every URL is
    /// followed by a jittered pause.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Persist`] if the sink fails; URLs after the
    /// failing one are not scraped.
    pub async fn run_batch<S, K>(
        &self,
        mut session: S,
        urls: &[String],
        sink: &mut K,
    ) -> Result<BatchSummary, ScraperError>
    where
        S: BrowserSession,
        K: AdSink,
    {
        let result = self.run_urls(&mut session, urls, sink).await;
        if let Err(e) = session.close().await {
            warn!(error = %e, "failed to close browser session");
        }
        result
    }

    async fn run_urls<S, K>(
        &self,
        session: &mut S,
        urls: &[String],
        sink: &mut K,
    ) -> Result<BatchSummary, ScraperError>
    where
        S: BrowserSession,
        K: AdSink,
    {
        let mut summary = BatchSummary {
            total_urls: urls.len(),
            ..BatchSummary::default()
        };

        for (index, url) in urls.iter().enumerate() {
            info!(url = %url, position = index + 1, total = urls.len(), "processing url");

            let (state, result) = self.scrape_url_with_retry(session, url).await;
            let outcome = match result {
                Ok(scraped) => {
                    let ads_extracted = scraped.records.len();
                    let inserted = sink.persist(&scraped.records).await.map_err(|source| {
                        ScraperError::Persist {
                            url: url.clone(),
                            source,
                        }
                    })?;
                    info!(url = %url, ads_extracted, inserted, "url done");
                    summary.total_ads += ads_extracted;
                    summary.inserted_count += inserted;
                    UrlOutcome {
                        url: url.clone(),
                        state,
                        ads_extracted,
                        inserted,
                        last_error: None,
                    }
                }
                Err(err) => {
                    error!(url = %url, error = %err, "giving up on url");
                    UrlOutcome {
                        url: url.clone(),
                        state,
                        ads_extracted: 0,
                        inserted: 0,
                        last_error: Some(err.to_string()),
                    }
                }
            };
            summary.outcomes.push(outcome);

            let delay = uniform_between(
                self.settings.inter_url_delay_min,
                self.settings.inter_url_delay_max,
            );
            #[allow(clippy::cast_possible_truncation)]
            let delay_ms = delay.as_millis() as u64;
            info!(delay_ms, "pausing after url");
            tokio::time::sleep(delay).await;
        }

        info!(
            total_urls = summary.total_urls,
            total_ads = summary.total_ads,
            inserted_count = summary.inserted_count,
            exhausted = summary.exhausted_urls(),
            "batch complete"
        );
        Ok(summary)
    }

    /// Runs the per-URL state machine until it reaches `Done` or `Exhausted`.
    ///
    /// Returns the terminal state with either the scraped records or the last
    /// error.
    pub async fn scrape_url_with_retry<S: BrowserSession>(
        &self,
        session: &mut S,
        url: &str,
    ) -> (UrlState, Result<ScrapedUrl, ScraperError>) {
        let policy = self.settings.retry;
        let mut state = UrlState::Pending;
        let mut last: Option<Result<ScrapedUrl, ScraperError>> = None;

        loop {
            state = match state {
                UrlState::Pending => UrlState::Attempting { attempt: 1 },
                UrlState::Attempting { attempt } => match self.scrape_url(session, url).await {
                    Ok(scraped) => {
                        last = Some(Ok(scraped));
                        UrlState::Done { attempts: attempt }
                    }
                    Err(err) => {
                        warn!(
                            url,
                            attempt,
                            max_attempts = policy.max_attempts,
                            error = %err,
                            "scrape attempt failed"
                        );
                        let next = policy.on_failure(attempt, &err);
                        last = Some(Err(err));
                        next
                    }
                },
                UrlState::Retrying {
                    failed_attempt,
                    delay,
                } => {
                    #[allow(clippy::cast_possible_truncation)]
                    let delay_ms = delay.as_millis() as u64;
                    info!(url, delay_ms, "backing off before retry");
                    tokio::time::sleep(delay).await;
                    UrlState::Attempting {
                        attempt: failed_attempt + 1,
                    }
                }
                UrlState::Done { .. } | UrlState::Exhausted { .. } => break,
            };
        }

        let result =
            last.unwrap_or_else(|| Err(ScraperError::browser("scrape", "no attempt was made")));
        (state, result)
    }

    /// One attempt: opens a page, runs the pipeline and closes the page on
    /// every path.
    ///
    /// # Errors
    ///
    /// Returns the first browser failure encountered.
    pub async fn scrape_url<S: BrowserSession>(
        &self,
        session: &mut S,
        url: &str,
    ) -> Result<ScrapedUrl, ScraperError> {
        let mut page = session.open_page().await?;
        let result = self.scrape_page(&mut page, url).await;
        if let Err(e) = page.close().await {
            warn!(url, error = %e, "failed to close page");
        }
        result
    }

    async fn scrape_page<P: BrowserPage>(
        &self,
        page: &mut P,
        url: &str,
    ) -> Result<ScrapedUrl, ScraperError> {
        let mut ctx = ScrapeContext::new();

        let mut responses = page
            .on_response(api_response_filter(&self.settings.api_url_pattern))
            .await?;
        page.navigate(url, NavigateOptions::network_idle(self.settings.nav_timeout))
            .await?;

        let pagination = paginate(page, &self.settings.paginator).await?;

        let scripts = page.evaluate(EMBEDDED_JSON_SCRIPT).await?;
        push_script_texts(&mut ctx, &scripts);

        drain_responses(&mut responses, &mut ctx).await;

        let nodes = extract_nodes(&ctx);
        let nodes_found = nodes.len();
        let unique = dedup_nodes(nodes);
        let records = normalize_nodes(&unique);

        info!(
            url,
            scrolls = pagination.scrolls,
            responses = ctx.responses.len(),
            embedded_edges = ctx.embedded_edges.len(),
            nodes_found,
            unique = unique.len(),
            records = records.len(),
            skipped_malformed = ctx.skips.get(SkipReason::MalformedJson),
            skipped_shape = ctx.skips.get(SkipReason::UnexpectedShape),
            "extracted ads"
        );

        Ok(ScrapedUrl {
            records,
            nodes_found,
            skips: ctx.skips,
            pagination,
        })
    }
}

/// Quiet period after which the response stream counts as drained.
const RESPONSE_IDLE: Duration = Duration::from_millis(500);
/// Upper bound on the whole drain.
const RESPONSE_DRAIN_LIMIT: Duration = Duration::from_secs(5);

/// Collects captured responses until none arrives for [`RESPONSE_IDLE`], the
/// stream ends, or [`RESPONSE_DRAIN_LIMIT`] passes. Bodies still in flight
/// after that are dropped.
async fn drain_responses(responses: &mut ResponseStream, ctx: &mut ScrapeContext) {
    let deadline = tokio::time::Instant::now() + RESPONSE_DRAIN_LIMIT;
    loop {
        let idle_until = (tokio::time::Instant::now() + RESPONSE_IDLE).min(deadline);
        match tokio::time::timeout_at(idle_until, responses.next()).await {
            Ok(Some(raw)) => ctx.push_response(raw),
            Ok(None) | Err(_) => break,
        }
    }
}

fn push_script_texts(ctx: &mut ScrapeContext, scripts: &Value) {
    match scripts.as_array() {
        Some(items) => ctx.push_embedded_scripts(items.iter().filter_map(Value::as_str)),
        None => ctx.skips.record(SkipReason::UnexpectedShape),
    }
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod tests;
