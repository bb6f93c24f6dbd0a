//! Fetch command implementation

use std::path::Path;

use anyhow::{Context, Result};

use ns_core::config::SessionConfig;
use ns_session::FetchOutcome;

use super::{load_catalog, start_session};
use crate::output::{format_fetched, print_info, print_success};

/// Fetch one random catalog entry, optionally saving the payload
pub async fn fetch_command(config: &SessionConfig, output: Option<&Path>) -> Result<()> {
    let catalog = load_catalog(config)?;
    let session = start_session(config, catalog).await?;

    let ticket = session.fetcher().trigger_fetch()?;
    let title = ticket.request().entry.title();
    print_info(&format!("Fetching {}...", title));

    match ticket.outcome().await {
        FetchOutcome::Success(content) => {
            println!("{}", format_fetched(&content));

            if let Some(path) = output {
                tokio::fs::write(path, &content.payload)
                    .await
                    .with_context(|| format!("Failed to write {:?}", path))?;
                print_success(&format!("Saved to {:?}", path));
            }
            Ok(())
        }
        FetchOutcome::Failure(err) => {
            Err(anyhow::Error::new(err).context(format!("Failed to fetch {}", title)))
        }
    }
}
