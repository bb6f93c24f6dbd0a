//! Id command implementation

use anyhow::Result;

use ns_core::config::SessionConfig;
use ns_core::Catalog;

use super::start_session;

/// Start the node and print its peer ID
pub async fn id_command(config: &SessionConfig, json: bool) -> Result<()> {
    let session = start_session(config, Catalog::default()).await?;
    let identity = session.controller().identity()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&identity)?);
    } else {
        println!("{}", identity.peer_id);
    }

    Ok(())
}
