//! node-session CLI
//!
//! Starts a storage node through its HTTP RPC API, reports its identity and
//! peer count, and fetches random entries from a content catalog.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use node_session::commands;
use node_session::output::{print_error, print_warning};
use ns_core::config::{self, SessionConfig};
use ns_core::ConfigError;

#[derive(Parser)]
#[command(name = "node-session")]
#[command(
    author,
    version,
    about = "Start a storage node, watch its peers, and fetch catalog content"
)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "NODE_SESSION_CONFIG")]
    config: Option<PathBuf>,

    /// Node RPC API address (overrides config)
    #[arg(long, global = true, env = "NODE_SESSION_API")]
    api: Option<String>,

    /// Catalog file (overrides config)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log filter, e.g. `debug` or `ns_session=trace` (overrides RUST_LOG and -v)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Suppress all log output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the node and print its peer ID
    Id {
        /// Print the identity as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the node and print peer counts
    Peers {
        /// Number of updates to print before exiting
        #[arg(short = 'n', long, default_value_t = 1)]
        updates: usize,
    },

    /// Fetch one random catalog entry
    Fetch {
        /// Write the fetched payload to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the catalog entries
    Catalog {
        /// Show full content IDs
        #[arg(short, long)]
        long: bool,
    },

    /// Interactive session: peer updates, and a fetch on every Enter
    Watch,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Create a default configuration file
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        print_error(&format!("{:#}", e));
        std::process::exit(2);
    }

    if let Err(e) = run(cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let filter = match &cli.log_level {
        Some(level) => {
            EnvFilter::try_new(level).with_context(|| format!("Invalid log level: {}", level))?
        }
        None => {
            let default_level = match (cli.quiet, cli.verbose) {
                (true, _) => "error",
                (false, 0) => "warn",
                (false, 1) => "info",
                (false, 2) => "debug",
                (false, _) => "trace",
            };
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
        }
    };

    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    // Config management works on the file itself
    if let Commands::Config { action } = &cli.command {
        match action {
            ConfigAction::Path => return commands::config_path(&config_path),
            ConfigAction::Init { force } => return commands::config_init(&config_path, *force),
            ConfigAction::Show => {}
        }
    }

    let session_config = load_settings(&cli, &config_path)?;
    tracing::debug!("Using node API at {}", session_config.api_address);

    match cli.command {
        Commands::Id { json } => commands::id_command(&session_config, json).await,
        Commands::Peers { updates } => commands::peers_command(&session_config, updates).await,
        Commands::Fetch { output } => {
            commands::fetch_command(&session_config, output.as_deref()).await
        }
        Commands::Catalog { long } => commands::catalog_command(&session_config, long),
        Commands::Watch => commands::watch_command(&session_config).await,
        Commands::Config { .. } => commands::config_show(&config_path, &session_config),
    }
}

/// Load the config file, falling back to defaults, and apply command-line overrides
fn load_settings(cli: &Cli, path: &std::path::Path) -> Result<SessionConfig> {
    let mut session_config = match config::load_config::<SessionConfig>(path) {
        Ok(loaded) => loaded,
        Err(ConfigError::NotFound(_)) => {
            if cli.config.is_some() {
                print_warning(&format!("Config file not found: {:?}, using defaults", path));
            } else {
                tracing::debug!("No config file at {:?}, using defaults", path);
            }
            SessionConfig::default()
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to load config from {:?}", path));
        }
    };

    if let Some(api) = &cli.api {
        session_config.api_address = api.clone();
    }
    if let Some(catalog) = &cli.catalog {
        session_config.catalog_path = Some(catalog.clone());
    }

    Ok(session_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_apply_over_defaults() {
        let cli = Cli::parse_from([
            "node-session",
            "--api",
            "http://10.0.0.5:5001",
            "--catalog",
            "/tmp/list.json",
            "catalog",
        ]);
        let dir = tempfile::tempdir().unwrap();

        let settings = load_settings(&cli, &dir.path().join("missing.toml")).unwrap();
        assert_eq!(settings.api_address, "http://10.0.0.5:5001");
        assert_eq!(settings.catalog_path, Some(PathBuf::from("/tmp/list.json")));
    }

    #[test]
    fn test_overrides_apply_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "api_address = \"http://file:5001\"\npoll_interval = 4\n",
        )
        .unwrap();

        let cli = Cli::parse_from(["node-session", "id"]);
        let settings = load_settings(&cli, &path).unwrap();
        assert_eq!(settings.api_address, "http://file:5001");
        assert_eq!(settings.poll_interval, std::time::Duration::from_secs(4));

        let cli = Cli::parse_from(["node-session", "--api", "http://flag:5001", "id"]);
        let settings = load_settings(&cli, &path).unwrap();
        assert_eq!(settings.api_address, "http://flag:5001");
    }
}
