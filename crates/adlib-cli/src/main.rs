mod links;
mod scrape;
mod trigger;
mod upload;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::links::LinksCommands;

#[derive(Debug, Parser)]
#[command(name = "adlib-cli")]
#[command(about = "Ad library scraper command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ask a running server to scrape every stored link
    Trigger {
        /// Server base URL
        #[arg(env = "API_BASE_URL", default_value = "http://localhost:5000")]
        base_url: String,
    },
    /// Scrape one ad library URL locally and upload the ads to a server
    Scrape {
        /// Ad library search URL; prompted for when omitted
        url: Option<String>,
        /// Full URL of the ingest endpoint
        #[arg(
            long,
            env = "ADLIB_INGEST_URL",
            default_value = "http://localhost:5000/scrape_ads"
        )]
        ingest_url: String,
        /// Records per upload request
        #[arg(long, env = "BATCH_SIZE", default_value_t = 25)]
        batch_size: usize,
        /// Pause between upload requests, in milliseconds
        #[arg(long, env = "BATCH_SLEEP", default_value_t = 300)]
        batch_sleep_ms: u64,
    },
    /// Manage the URLs the server scrapes
    Links {
        #[command(subcommand)]
        command: LinksCommands,
    },
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let fallback = std::env::var("ADLIB_LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Trigger { base_url } => trigger::run_trigger(&base_url).await,
        Commands::Scrape {
            url,
            ingest_url,
            batch_size,
            batch_sleep_ms,
        } => {
            let options = upload::UploadOptions {
                ingest_url,
                batch_size,
                batch_sleep: std::time::Duration::from_millis(batch_sleep_ms),
            };
            scrape::run_scrape(url, &options).await
        }
        Commands::Links { command } => {
            let pool = connect().await?;
            match command {
                LinksCommands::Add { urls } => links::run_links_add(&pool, &urls).await,
                LinksCommands::List => links::run_links_list(&pool).await,
            }
        }
        Commands::Migrate => {
            let pool = connect().await?;
            let applied = adlib_db::run_migrations(&pool).await?;
            println!("migrations up to date ({applied} applied)");
            Ok(())
        }
    }
}

async fn connect() -> anyhow::Result<sqlx::PgPool> {
    let config = adlib_core::load_app_config()?;
    let pool_config = adlib_db::PoolConfig::from_app_config(&config);
    Ok(adlib_db::connect_pool(&config.database_url, pool_config).await?)
}
