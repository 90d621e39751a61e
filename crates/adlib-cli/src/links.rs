use clap::Subcommand;

/// Sub-commands available under `links`.
#[derive(Debug, Subcommand)]
pub enum LinksCommands {
    /// Add one or more URLs to scrape; duplicates are ignored
    Add {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// List stored URLs
    List,
}

/// Returns the trimmed URL if it parses as absolute http(s).
fn validate_url(raw: &str) -> anyhow::Result<&str> {
    let trimmed = raw.trim();
    let parsed = reqwest::Url::parse(trimmed)
        .map_err(|e| anyhow::anyhow!("invalid URL {trimmed:?}: {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("invalid URL {trimmed:?}: only http and https are supported");
    }
    Ok(trimmed)
}

pub(crate) async fn run_links_add(pool: &sqlx::PgPool, urls: &[String]) -> anyhow::Result<()> {
    let validated = urls
        .iter()
        .map(|u| validate_url(u))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut added = 0usize;
    for url in validated {
        if adlib_db::add_link(pool, url).await? {
            added += 1;
        } else {
            tracing::info!(url, "link already stored");
        }
    }
    println!("added {added} of {} links", urls.len());
    Ok(())
}

pub(crate) async fn run_links_list(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let links = adlib_db::list_links(pool).await?;
    if links.is_empty() {
        println!("no links stored");
        return Ok(());
    }
    for link in links {
        println!(
            "{:>6}  {}  {}",
            link.id,
            link.created_at.format("%Y-%m-%d"),
            link.url.as_deref().unwrap_or("\u{2014}")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_url;

    #[test]
    fn accepts_http_urls_and_trims() {
        assert_eq!(
            validate_url("  https://www.facebook.com/ads/library/?q=acme ").unwrap(),
            "https://www.facebook.com/ads/library/?q=acme"
        );
    }

    #[test]
    fn rejects_relative_and_non_http_urls() {
        assert!(validate_url("ads/library").is_err());
        assert!(validate_url("ftp://example.com/file").is_err());
    }
}
