//! CLI command implementations

mod catalog;
mod config;
mod fetch;
mod id;
mod peers;
mod watch;

pub use catalog::catalog_command;
pub use config::{config_init, config_path, config_show};
pub use fetch::fetch_command;
pub use id::id_command;
pub use peers::peers_command;
pub use watch::watch_command;

use std::sync::Arc;

use anyhow::{Context, Result};

use ns_core::config::SessionConfig;
use ns_core::Catalog;
use ns_session::NodeSession;
use ns_transport::HttpTransport;

/// Start the node behind `config.api_address` and wait until it is Ready
pub(crate) async fn start_session(
    config: &SessionConfig,
    catalog: Catalog,
) -> Result<NodeSession> {
    let transport = HttpTransport::from_config(config)
        .with_context(|| format!("Failed to create transport for {}", config.api_address))?;
    let session = NodeSession::new(config.clone(), Arc::new(transport), catalog);

    let identity = session
        .controller()
        .start()?
        .wait()
        .await
        .with_context(|| format!("Node at {} failed to start", config.api_address))?;
    tracing::debug!("Session ready as {}", identity.peer_id);

    Ok(session)
}

/// Load the configured catalog
pub(crate) fn load_catalog(config: &SessionConfig) -> Result<Catalog> {
    let path = config.catalog_path();
    let catalog =
        Catalog::load(&path).with_context(|| format!("Failed to load catalog from {:?}", path))?;
    tracing::debug!("Loaded {} catalog entries from {:?}", catalog.len(), path);
    Ok(catalog)
}
