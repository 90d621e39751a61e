//! chromiumoxide-backed [`BrowserSession`] / [`BrowserPage`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventResponseReceived,
    GetResponseBodyParams, RequestId, ResourceType, SetUserAgentOverrideParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use rand::seq::IndexedRandom;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    BrowserPage, BrowserSession, NavigateOptions, RawResponse, ResourceKind, ResponsePredicate,
    ResponseStream, WaitCondition,
};
use crate::error::ScraperError;

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,vi;q=0.8";

/// Pause after the load event standing in for "network idle".
const NETWORK_IDLE_SETTLE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Default)]
pub struct ChromiumOptions {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
}

impl ChromiumOptions {
    #[must_use]
    pub fn from_scrape_settings(settings: &adlib_core::ScrapeSettings) -> Self {
        Self {
            headless: settings.browser_headless,
            chrome_executable: settings.chrome_executable.as_ref().map(PathBuf::from),
        }
    }
}

fn find_chrome() -> Result<PathBuf, ScraperError> {
    for path in CHROME_PATHS {
        let p = std::path::Path::new(path);
        if p.exists() {
            info!(path, "found Chrome");
            return Ok(p.to_path_buf());
        }
    }

    for cmd in &[
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ] {
        if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    info!(path = %path, "found Chrome in PATH");
                    return Ok(PathBuf::from(path));
                }
            }
        }
    }

    Err(ScraperError::ChromeNotFound)
}

fn resource_kind(resource_type: &ResourceType) -> ResourceKind {
    match resource_type {
        ResourceType::Xhr => ResourceKind::Xhr,
        ResourceType::Fetch => ResourceKind::Fetch,
        ResourceType::Document => ResourceKind::Document,
        ResourceType::Script => ResourceKind::Script,
        ResourceType::Image => ResourceKind::Image,
        _ => ResourceKind::Other,
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct ChromiumSession {
    browser: Option<Browser>,
    handler_task: JoinHandle<()>,
}

impl ChromiumSession {
    /// Launches a browser process.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::ChromeNotFound`] when no executable is
    /// configured or discoverable, or [`ScraperError::Launch`] if the
    /// process fails to start.
    pub async fn launch(options: &ChromiumOptions) -> Result<Self, ScraperError> {
        let chrome_path = match &options.chrome_executable {
            Some(path) => path.clone(),
            None => find_chrome()?,
        };

        info!(headless = options.headless, "launching browser");

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless
        if !options.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-gpu");

        let config = builder.build().map_err(ScraperError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: Some(browser),
            handler_task,
        })
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    type Page = ChromiumPage;

    async fn open_page(&mut self) -> Result<ChromiumPage, ScraperError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| ScraperError::browser("open page", "session already closed"))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::browser("open page", e))?;

        let user_agent = USER_AGENTS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        let ua_override = SetUserAgentOverrideParams::builder()
            .user_agent(user_agent)
            .accept_language(ACCEPT_LANGUAGE)
            .build()
            .map_err(|e| ScraperError::browser("user agent override", e))?;
        page.execute(ua_override)
            .await
            .map_err(|e| ScraperError::browser("user agent override", e))?;

        Ok(ChromiumPage {
            page: Some(page),
            capture_task: None,
        })
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };
        let closed = browser
            .close()
            .await
            .map_err(|e| ScraperError::browser("close session", e));
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "browser process did not exit cleanly");
        }
        self.handler_task.abort();
        closed.map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

pub struct ChromiumPage {
    page: Option<Page>,
    capture_task: Option<JoinHandle<()>>,
}

impl ChromiumPage {
    fn page(&self) -> Result<&Page, ScraperError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::browser("page", "page already closed"))
    }
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn on_response(
        &mut self,
        predicate: ResponsePredicate,
    ) -> Result<ResponseStream, ScraperError> {
        let page = self.page()?.clone();

        page.execute(EnableParams::default())
            .await
            .map_err(|e| ScraperError::browser("enable network domain", e))?;
        let mut received = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| ScraperError::browser("subscribe responses", e))?;
        let mut finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(|e| ScraperError::browser("subscribe responses", e))?;
        let mut failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(|e| ScraperError::browser("subscribe responses", e))?;

        let (tx, rx) = futures::channel::mpsc::unbounded::<RawResponse>();

        let task = tokio::spawn(async move {
            // Bodies are only retrievable once loading has finished.
            let mut pending: HashMap<RequestId, (String, ResourceKind)> = HashMap::new();
            loop {
                tokio::select! {
                    Some(event) = received.next() => {
                        let kind = resource_kind(&event.r#type);
                        let url = event.response.url.clone();
                        if predicate(&url, kind) {
                            pending.insert(event.request_id.clone(), (url, kind));
                        }
                    }
                    Some(event) = finished.next() => {
                        let Some((url, kind)) = pending.remove(&event.request_id) else {
                            continue;
                        };
                        match page.execute(GetResponseBodyParams::new(event.request_id.clone())).await {
                            Ok(reply) if reply.result.base64_encoded => {
                                debug!(url = %url, "skipping base64-encoded response body");
                            }
                            Ok(reply) => {
                                let body = reply.result.body.clone();
                                if tx.unbounded_send(RawResponse { url, kind, body }).is_err() {
                                    break;
                                }
                            }
                            Err(e) => debug!(url = %url, error = %e, "response body unavailable"),
                        }
                    }
                    Some(event) = failed.next() => {
                        pending.remove(&event.request_id);
                    }
                    else => break,
                }
            }
        });
        self.capture_task = Some(task);

        Ok(Box::pin(rx))
    }

    async fn navigate(&mut self, url: &str, options: NavigateOptions) -> Result<(), ScraperError> {
        let page = self.page()?;
        info!(url, "navigating");

        tokio::time::timeout(options.timeout, page.goto(url))
            .await
            .map_err(|_| ScraperError::NavigationTimeout {
                url: url.to_owned(),
                timeout_secs: options.timeout.as_secs(),
            })?
            .map_err(|e| ScraperError::browser("navigate", e))?;

        if options.wait == WaitCondition::NetworkIdle {
            tokio::time::sleep(NETWORK_IDLE_SETTLE).await;
        }
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value, ScraperError> {
        let result = self
            .page()?
            .evaluate(script.to_string())
            .await
            .map_err(|e| ScraperError::browser("evaluate", e))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn scroll_by(&mut self, delta_px: i64) -> Result<(), ScraperError> {
        self.page()?
            .evaluate(format!("window.scrollBy(0, {delta_px})"))
            .await
            .map_err(|e| ScraperError::browser("scroll", e))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        if let Some(task) = self.capture_task.take() {
            task.abort();
        }
        match self.page.take() {
            Some(page) => page
                .close()
                .await
                .map_err(|e| ScraperError::browser("close page", e)),
            None => Ok(()),
        }
    }
}
