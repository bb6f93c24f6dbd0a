//! Config command implementations

use std::path::Path;

use anyhow::{Context, Result};

use ns_core::config::{self, SessionConfig};

use crate::output::{print_error, print_info, print_success};

/// Show the effective configuration (file values plus command-line overrides)
pub fn config_show(path: &Path, effective: &SessionConfig) -> Result<()> {
    if path.exists() {
        print_info(&format!("Configuration file: {:?}", path));
    } else {
        print_info(&format!("No configuration file at {:?}, using defaults", path));
    }
    println!();

    let content =
        toml::to_string_pretty(effective).context("Failed to serialize configuration")?;
    println!("{}", content);
    println!("# catalog: {:?}", effective.catalog_path());

    Ok(())
}

/// Print the configuration file path
pub fn config_path(path: &Path) -> Result<()> {
    println!("{}", path.display());
    Ok(())
}

/// Write a default configuration file
pub fn config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    config::save_config(path, &SessionConfig::default())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    print_success(&format!("Created configuration file: {:?}", path));
    Ok(())
}
