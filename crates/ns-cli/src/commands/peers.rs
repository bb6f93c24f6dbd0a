//! Peers command implementation

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;

use ns_core::config::SessionConfig;
use ns_core::Catalog;

use super::start_session;
use crate::output::format_peers;

/// Start the node and print `updates` peer counts as the poller publishes them
pub async fn peers_command(config: &SessionConfig, updates: usize) -> Result<()> {
    let session = start_session(config, Catalog::default()).await?;

    let mut rx = session.peers().subscribe();
    session.peers().start()?;

    let mut printed = 0;
    while printed < updates {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = rx.recv() => match update {
                Ok(count) => {
                    println!("{}", format_peers(count));
                    printed += 1;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Skipped {} peer count updates", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    session.peers().stop();
    Ok(())
}
