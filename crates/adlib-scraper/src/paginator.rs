//! Scroll-driven pagination until the page height stops growing.

use std::time::Duration;

use rand::Rng;

use crate::browser::BrowserPage;
use crate::error::ScraperError;

const SCROLL_HEIGHT_SCRIPT: &str = "document.body.scrollHeight";

/// Scrolls between progress log lines.
const LOG_EVERY: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatorSettings {
    pub scroll_delta_px: i64,
    pub wait_min: Duration,
    pub wait_max: Duration,
    /// Unbounded when `None`: a page whose height never settles keeps scrolling.
    pub max_scrolls: Option<u32>,
}

impl PaginatorSettings {
    #[must_use]
    pub fn from_scrape_settings(settings: &adlib_core::ScrapeSettings) -> Self {
        Self {
            scroll_delta_px: settings.scroll_delta_px,
            wait_min: Duration::from_millis(settings.scroll_wait_min_ms),
            wait_max: Duration::from_millis(settings.scroll_wait_max_ms),
            max_scrolls: settings.max_scrolls,
        }
    }

    fn jittered_wait(&self) -> Duration {
        uniform_between(self.wait_min, self.wait_max)
    }
}

/// Uniform duration in `[min, max]`; `min` when the range is empty.
pub(crate) fn uniform_between(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    #[allow(clippy::cast_possible_truncation)]
    let span_ms = (max - min).as_millis() as u64;
    min + Duration::from_millis(rand::rng().random_range(0..=span_ms))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationOutcome {
    /// Scrolls that grew the page.
    pub scrolls: u32,
    pub final_height: i64,
    /// `true` when the optional scroll cap ended the loop.
    pub capped: bool,
}

#[allow(clippy::cast_possible_truncation)]
async fn scroll_height<P: BrowserPage>(page: &mut P) -> Result<i64, ScraperError> {
    let value = page.evaluate(SCROLL_HEIGHT_SCRIPT).await?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .ok_or_else(|| ScraperError::Evaluation {
            context: "scroll height",
            value: value.to_string(),
        })
}

/// Scrolls `page` until two consecutive height measurements agree.
///
/// # Errors
///
/// Returns a [`ScraperError`] if a scroll or measurement fails.
pub async fn paginate<P: BrowserPage>(
    page: &mut P,
    settings: &PaginatorSettings,
) -> Result<PaginationOutcome, ScraperError> {
    let mut previous = scroll_height(page).await?;
    let mut scrolls = 0u32;

    loop {
        if settings.max_scrolls.is_some_and(|cap| scrolls >= cap) {
            tracing::warn!(
                scrolls,
                height = previous,
                "scroll cap reached before page height settled"
            );
            return Ok(PaginationOutcome {
                scrolls,
                final_height: previous,
                capped: true,
            });
        }

        page.scroll_by(settings.scroll_delta_px).await?;
        tokio::time::sleep(settings.jittered_wait()).await;

        let height = scroll_height(page).await?;
        if height == previous {
            tracing::debug!(scrolls, height, "page height settled");
            return Ok(PaginationOutcome {
                scrolls,
                final_height: height,
                capped: false,
            });
        }
        previous = height;
        scrolls += 1;
        if scrolls % LOG_EVERY == 0 {
            tracing::info!(scrolls, height, "scrolling");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{NavigateOptions, ResponsePredicate, ResponseStream};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;

    /// Page whose scroll height follows a script; repeats the last value.
    struct HeightPage {
        heights: VecDeque<Value>,
        last: Value,
        scrolled: u32,
    }

    impl HeightPage {
        fn new(heights: &[Value]) -> Self {
            Self {
                heights: heights.iter().cloned().collect(),
                last: json!(0),
                scrolled: 0,
            }
        }
    }

    #[async_trait]
    impl BrowserPage for HeightPage {
        async fn on_response(
            &mut self,
            _predicate: ResponsePredicate,
        ) -> Result<ResponseStream, ScraperError> {
            Ok(Box::pin(futures::stream::empty()))
        }
        async fn navigate(&mut self, _url: &str, _o: NavigateOptions) -> Result<(), ScraperError> {
            Ok(())
        }
        async fn evaluate(&mut self, _script: &str) -> Result<Value, ScraperError> {
            if let Some(next) = self.heights.pop_front() {
                self.last = next;
            }
            Ok(self.last.clone())
        }
        async fn scroll_by(&mut self, _delta_px: i64) -> Result<(), ScraperError> {
            self.scrolled += 1;
            Ok(())
        }
        async fn close(&mut self) -> Result<(), ScraperError> {
            Ok(())
        }
    }

    fn settings(max_scrolls: Option<u32>) -> PaginatorSettings {
        PaginatorSettings {
            scroll_delta_px: 10_000,
            wait_min: Duration::from_millis(2_000),
            wait_max: Duration::from_millis(4_000),
            max_scrolls,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_height_is_unchanged() {
        let mut page = HeightPage::new(&[json!(1000), json!(2000), json!(3000), json!(3000)]);
        let outcome = paginate(&mut page, &settings(None)).await.unwrap();
        assert_eq!(outcome.scrolls, 2);
        assert_eq!(outcome.final_height, 3000);
        assert!(!outcome.capped);
        assert_eq!(page.scrolled, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn static_page_converges_after_one_scroll() {
        let mut page = HeightPage::new(&[json!(800)]);
        let outcome = paginate(&mut page, &settings(None)).await.unwrap();
        assert_eq!(outcome.scrolls, 0);
        assert_eq!(page.scrolled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn optional_cap_stops_growing_page() {
        let heights: Vec<Value> = (1..=50).map(|h| json!(h * 1000)).collect();
        let mut page = HeightPage::new(&heights);
        let outcome = paginate(&mut page, &settings(Some(3))).await.unwrap();
        assert!(outcome.capped);
        assert_eq!(outcome.scrolls, 3);
        assert_eq!(page.scrolled, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn each_scroll_waits_within_jitter_range() {
        let mut page = HeightPage::new(&[json!(1), json!(2), json!(2)]);
        let start = tokio::time::Instant::now();
        paginate(&mut page, &settings(None)).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(4_000), "{elapsed:?}");
        assert!(elapsed <= Duration::from_millis(8_000), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn non_numeric_height_is_an_evaluation_error() {
        let mut page = HeightPage::new(&[json!("tall")]);
        let err = paginate(&mut page, &settings(None)).await.unwrap_err();
        assert!(matches!(err, ScraperError::Evaluation { .. }));
    }

    #[test]
    fn uniform_between_respects_bounds() {
        let min = Duration::from_millis(3_000);
        let max = Duration::from_millis(7_000);
        for _ in 0..100 {
            let d = uniform_between(min, max);
            assert!(d >= min && d <= max);
        }
        assert_eq!(uniform_between(max, min), max);
    }
}
