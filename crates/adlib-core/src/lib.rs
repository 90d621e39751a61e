mod ads;
mod app_config;
mod config;

use thiserror::Error;

pub use ads::{time_running_days, AdFormat, AdStatus, CanonicalAdRecord, AD_SOURCE_PLATFORM};
pub use app_config::{AppConfig, Environment, ScrapeSettings};
pub use config::{load_app_config, load_app_config_from_env, load_scrape_settings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
