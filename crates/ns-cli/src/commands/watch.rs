//! Watch command implementation
//!
//! The interactive consumer: this task is the single place where peer
//! updates and fetch outcomes are received and printed.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;

use ns_core::config::SessionConfig;
use ns_core::{FetchError, PeerCount};
use ns_session::{FetchOutcome, NodeSession};

use super::{load_catalog, start_session};
use crate::output::{
    format_fetched, format_peers, print_error, print_info, print_success, print_warning,
};

/// Start the node, report peer changes, and fetch an entry per line of stdin
pub async fn watch_command(config: &SessionConfig) -> Result<()> {
    let catalog = load_catalog(config)?;
    let session = start_session(config, catalog).await?;

    let identity = session.controller().identity()?;
    print_success(&format!("Node ready: {}", identity.peer_id));
    print_info("Press Enter to fetch a random entry, Ctrl-C to quit");

    let mut peers = session.peers().subscribe();
    session.peers().start()?;

    let (outcome_tx, mut outcome_rx) = mpsc::channel::<(String, FetchOutcome)>(4);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut pending = false;
    let mut last_count: Option<PeerCount> = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                print_info("Interrupted");
                break;
            }

            update = peers.recv() => match update {
                Ok(count) => {
                    // Only report changes
                    if last_count != Some(count) {
                        print_info(&format!("Connected to {}", format_peers(count)));
                        last_count = Some(count);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Skipped {} peer count updates", skipped);
                }
                Err(RecvError::Closed) => break,
            },

            line = lines.next_line(), if stdin_open => match line.context("Failed to read stdin")? {
                Some(_) => {
                    if trigger_fetch(&session, &outcome_tx) {
                        pending = true;
                    }
                }
                None => {
                    stdin_open = false;
                    if !pending {
                        break;
                    }
                }
            },

            Some((title, outcome)) = outcome_rx.recv() => {
                pending = false;
                report_outcome(&title, outcome);
                if !stdin_open {
                    break;
                }
            }
        }
    }

    session.peers().stop();
    Ok(())
}

/// Returns whether a fetch was started
fn trigger_fetch(session: &NodeSession, outcomes: &mpsc::Sender<(String, FetchOutcome)>) -> bool {
    match session.fetcher().trigger_fetch() {
        Ok(ticket) => {
            let title = ticket.request().entry.title();
            print_info(&format!("Fetching {}...", title));

            let outcomes = outcomes.clone();
            tokio::spawn(async move {
                let outcome = ticket.outcome().await;
                let _ = outcomes.send((title, outcome)).await;
            });
            true
        }
        Err(FetchError::Busy) => {
            print_warning("A fetch is already in progress");
            false
        }
        Err(e) => {
            print_error(&format!("Cannot fetch: {}", e));
            false
        }
    }
}

fn report_outcome(title: &str, outcome: FetchOutcome) {
    match outcome {
        FetchOutcome::Success(content) => {
            print_success(&format!("Fetched {}", title));
            println!("{}", format_fetched(&content));
        }
        FetchOutcome::Failure(err) => {
            print_error(&format!("Failed to fetch {}: {}", title, err));
        }
    }
}
