//! Catalog command implementation

use anyhow::Result;

use ns_core::config::SessionConfig;

use super::load_catalog;
use crate::output::{format_catalog, print_info};

/// Print the configured catalog. Does not contact the node.
pub fn catalog_command(config: &SessionConfig, long: bool) -> Result<()> {
    let catalog = load_catalog(config)?;

    println!("{}", format_catalog(&catalog, long));
    print_info(&format!("{} entries", catalog.len()));

    Ok(())
}
