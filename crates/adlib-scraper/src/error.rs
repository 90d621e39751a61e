use thiserror::Error;

/// Boxed error returned by an [`crate::AdSink`] implementation.
pub type SinkError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("browser {context} failed: {message}")]
    Browser {
        context: &'static str,
        message: String,
    },

    #[error("navigation to {url} timed out after {timeout_secs}s")]
    NavigationTimeout { url: String, timeout_secs: u64 },

    #[error("unexpected result from page script ({context}): {value}")]
    Evaluation {
        context: &'static str,
        value: String,
    },

    #[error("no Chrome/Chromium executable found; set ADLIB_CHROME_EXECUTABLE")]
    ChromeNotFound,

    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("failed to persist ads scraped from {url}: {source}")]
    Persist {
        url: String,
        #[source]
        source: SinkError,
    },
}

impl ScraperError {
    pub(crate) fn browser(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Browser {
            context,
            message: err.to_string(),
        }
    }

    /// Returns `true` for per-URL failures worth another attempt.
    ///
    /// Page crashes, CDP failures, navigation timeouts and odd script results
    /// are transient. Launch failures and persistence faults are not; the
    /// latter abort the whole batch.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            ScraperError::Browser { .. }
            | ScraperError::NavigationTimeout { .. }
            | ScraperError::Evaluation { .. } => true,
            ScraperError::ChromeNotFound
            | ScraperError::Launch(_)
            | ScraperError::Persist { .. } => false,
        }
    }
}
