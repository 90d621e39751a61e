use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Tunables for the browser-driven scrape pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeSettings {
    /// Substring a network response URL must contain to be captured.
    pub api_url_pattern: String,
    pub nav_timeout_secs: u64,
    pub scroll_delta_px: i64,
    pub scroll_wait_min_ms: u64,
    pub scroll_wait_max_ms: u64,
    /// `None` keeps scrolling until the page height stops growing.
    pub max_scrolls: Option<u32>,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub inter_url_delay_min_ms: u64,
    pub inter_url_delay_max_ms: u64,
    pub browser_headless: bool,
    pub chrome_executable: Option<String>,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            api_url_pattern: "https://www.facebook.com/api/graphql/".to_owned(),
            nav_timeout_secs: 60,
            scroll_delta_px: 10_000,
            scroll_wait_min_ms: 2_000,
            scroll_wait_max_ms: 4_000,
            max_scrolls: None,
            max_attempts: 3,
            retry_base_delay_ms: 2_000,
            inter_url_delay_min_ms: 3_000,
            inter_url_delay_max_ms: 7_000,
            browser_headless: true,
            chrome_executable: None,
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub ingest_body_limit_bytes: usize,
    pub scrape: ScrapeSettings,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("ingest_body_limit_bytes", &self.ingest_body_limit_bytes)
            .field("scrape", &self.scrape)
            .finish()
    }
}
