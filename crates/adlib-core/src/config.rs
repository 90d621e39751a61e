use crate::app_config::{AppConfig, Environment, ScrapeSettings};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Load only the scrape settings, for commands that never touch the database.
///
/// # Errors
///
/// Returns `ConfigError` if a scrape variable is present but invalid.
pub fn load_scrape_settings() -> Result<ScrapeSettings, ConfigError> {
    dotenvy::dotenv().ok();
    build_scrape_settings(&|key: &str| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a
/// plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let database_url =
        lookup("DATABASE_URL").map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL".into()))?;
    let env = parse_environment(&lookup("ADLIB_ENV").unwrap_or_else(|_| "development".into()));
    let bind_addr = parse_or(&lookup, "ADLIB_BIND_ADDR", "0.0.0.0:5000")?;
    let log_level = lookup("ADLIB_LOG_LEVEL").unwrap_or_else(|_| "info".into());

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections: parse_or(&lookup, "ADLIB_DB_MAX_CONNECTIONS", "10")?,
        db_min_connections: parse_or(&lookup, "ADLIB_DB_MIN_CONNECTIONS", "1")?,
        db_acquire_timeout_secs: parse_or(&lookup, "ADLIB_DB_ACQUIRE_TIMEOUT_SECS", "10")?,
        ingest_body_limit_bytes: parse_or(&lookup, "ADLIB_INGEST_BODY_LIMIT_BYTES", "2097152")?,
        scrape: build_scrape_settings(&lookup)?,
    })
}

fn build_scrape_settings<F>(lookup: &F) -> Result<ScrapeSettings, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Err(_) => Ok(default),
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                other => Err(invalid(var, format!("expected a boolean, got {other:?}"))),
            },
        }
    };

    let defaults = ScrapeSettings::default();

    let api_url_pattern =
        lookup("ADLIB_API_URL_PATTERN").unwrap_or_else(|_| defaults.api_url_pattern.clone());
    let nav_timeout_secs = parse_or(lookup, "ADLIB_NAV_TIMEOUT_SECS", "60")?;
    let scroll_delta_px = parse_or(lookup, "ADLIB_SCROLL_DELTA_PX", "10000")?;
    let scroll_wait_min_ms: u64 = parse_or(lookup, "ADLIB_SCROLL_WAIT_MIN_MS", "2000")?;
    let scroll_wait_max_ms: u64 = parse_or(lookup, "ADLIB_SCROLL_WAIT_MAX_MS", "4000")?;
    let max_scrolls = match lookup("ADLIB_MAX_SCROLLS") {
        Ok(raw) => Some(
            raw.parse::<u32>()
                .map_err(|e| invalid("ADLIB_MAX_SCROLLS", e.to_string()))?,
        ),
        Err(_) => None,
    };
    let max_attempts: u32 = parse_or(lookup, "ADLIB_MAX_ATTEMPTS", "3")?;
    let retry_base_delay_ms = parse_or(lookup, "ADLIB_RETRY_BASE_DELAY_MS", "2000")?;
    let inter_url_delay_min_ms: u64 = parse_or(lookup, "ADLIB_INTER_URL_DELAY_MIN_MS", "3000")?;
    let inter_url_delay_max_ms: u64 = parse_or(lookup, "ADLIB_INTER_URL_DELAY_MAX_MS", "7000")?;
    let browser_headless = parse_bool("ADLIB_BROWSER_HEADLESS", true)?;
    let chrome_executable = lookup("ADLIB_CHROME_EXECUTABLE")
        .ok()
        .filter(|s| !s.is_empty());

    if max_attempts == 0 {
        return Err(invalid("ADLIB_MAX_ATTEMPTS", "must be at least 1".to_string()));
    }
    if scroll_wait_min_ms > scroll_wait_max_ms {
        return Err(invalid(
            "ADLIB_SCROLL_WAIT_MIN_MS",
            format!("{scroll_wait_min_ms} exceeds ADLIB_SCROLL_WAIT_MAX_MS ({scroll_wait_max_ms})"),
        ));
    }
    if inter_url_delay_min_ms > inter_url_delay_max_ms {
        return Err(invalid(
            "ADLIB_INTER_URL_DELAY_MIN_MS",
            format!(
                "{inter_url_delay_min_ms} exceeds ADLIB_INTER_URL_DELAY_MAX_MS ({inter_url_delay_max_ms})"
            ),
        ));
    }

    Ok(ScrapeSettings {
        api_url_pattern,
        nav_timeout_secs,
        scroll_delta_px,
        scroll_wait_min_ms,
        scroll_wait_max_ms,
        max_scrolls,
        max_attempts,
        retry_base_delay_ms,
        inter_url_delay_min_ms,
        inter_url_delay_max_ms,
        browser_headless,
        chrome_executable,
    })
}

/// Parses `var` (or `default` when unset) with [`std::str::FromStr`].
fn parse_or<F, T>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
