use anyhow::Context;
use serde_json::Value;

use crate::upload::{error_message, read_json_body};

/// `{base}/scrape_from_links`, tolerating a trailing slash on `base`.
fn trigger_endpoint(base_url: &str) -> String {
    format!("{}/scrape_from_links", base_url.trim_end_matches('/'))
}

/// Asks the server to scrape every stored link and returns its summary.
///
/// # Errors
///
/// Returns an error on transport failure or a non-2xx status.
pub(crate) async fn trigger_scrape(
    client: &reqwest::Client,
    base_url: &str,
) -> anyhow::Result<Value> {
    let endpoint = trigger_endpoint(base_url);
    tracing::info!(endpoint = %endpoint, "triggering scrape");

    let response = client
        .post(&endpoint)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .send()
        .await
        .with_context(|| format!("failed to reach {endpoint}; is the server running?"))?;
    let (status, body) = read_json_body(response).await?;

    if !status.is_success() {
        anyhow::bail!(
            "server returned {status}: {}",
            error_message(&body, status)
        );
    }
    Ok(body)
}

pub(crate) async fn run_trigger(base_url: &str) -> anyhow::Result<()> {
    let summary = trigger_scrape(&reqwest::Client::new(), base_url).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
