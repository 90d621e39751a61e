use std::io::{BufRead, Write};

use adlib_scraper::{
    BrowserSession, ChromiumOptions, ChromiumSession, DriverSettings, ScrapeDriver,
};
use anyhow::Context;

use crate::upload::{upload_records, UploadOptions};

/// Scrapes a single URL in a local browser, then uploads the records.
pub(crate) async fn run_scrape(url: Option<String>, options: &UploadOptions) -> anyhow::Result<()> {
    let url = match url {
        Some(url) => url.trim().to_owned(),
        None => prompt_for_url(std::io::stdin().lock(), std::io::stdout())?,
    };
    if url.is_empty() {
        anyhow::bail!("no URL given");
    }

    let settings = adlib_core::load_scrape_settings()?;
    let mut session = ChromiumSession::launch(&ChromiumOptions::from_scrape_settings(&settings))
        .await
        .context("failed to start browser")?;

    let driver = ScrapeDriver::new(DriverSettings::from_scrape_settings(&settings));
    let (state, result) = driver.scrape_url_with_retry(&mut session, &url).await;
    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "failed to close browser session");
    }
    let scraped = result.with_context(|| format!("giving up on {url} ({state:?})"))?;

    let records = scraped.records;
    println!(
        "extracted {} ads from {url} ({} raw nodes, {} skipped fragments)",
        records.len(),
        scraped.nodes_found,
        scraped.skips.total()
    );
    if records.is_empty() {
        println!("nothing to upload");
        return Ok(());
    }

    let client = reqwest::Client::new();
    let report = upload_records(&client, &records, options).await;
    println!(
        "upload finished: {} inserted, {} records accepted, {} failed ({} requests)",
        report.inserted, report.accepted_records, report.failed_records, report.requests
    );
    Ok(())
}

fn prompt_for_url(mut input: impl BufRead, mut output: impl Write) -> anyhow::Result<String> {
    write!(output, "Ad library URL: ")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::prompt_for_url;

    #[test]
    fn prompt_reads_and_trims_one_line() {
        let mut out = Vec::new();
        let url = prompt_for_url(&b"  https://example.com/ads \nignored\n"[..], &mut out).unwrap();
        assert_eq!(url, "https://example.com/ads");
        assert_eq!(String::from_utf8(out).unwrap(), "Ad library URL: ");
    }

    #[test]
    fn prompt_on_closed_stdin_is_empty() {
        let url = prompt_for_url(&b""[..], Vec::new()).unwrap();
        assert!(url.is_empty());
    }
}
