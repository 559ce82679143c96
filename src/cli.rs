use clap::{Parser, Subcommand};
use std::path::PathBuf;

fn get_version() -> &'static str {
    const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");

    // A git tag at HEAD means a release build
    if let Some(tag) = option_env!("PKG_UPDATER_GIT_TAG") {
        return tag;
    }

    let commit = option_env!("PKG_UPDATER_GIT_COMMIT").unwrap_or("unknown");

    // Computed once at startup
    let version = format!("v{}-{}", BASE_VERSION, commit);
    Box::leak(version.into_boxed_str())
}

#[derive(Parser)]
#[command(name = "pkg-updater")]
#[command(about = "Keeps a package up to date with its GitHub Releases")]
#[command(version = get_version(), propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Package manifest (JSON or YAML)
    #[arg(short, long, global = true)]
    pub manifest: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check whether a newer release is available
    Check {
        /// Output format (plain, json)
        #[arg(long, default_value = "plain")]
        format: String,
    },

    /// Download and install the latest release
    Update {
        /// Install without asking for confirmation
        #[arg(short, long)]
        yes: bool,
        /// Command to run once the update has been installed
        #[arg(long)]
        exec: Option<String>,
    },

    /// Manage pkg-updater's configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show the current version
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a configuration setting
    Get {
        /// Key to get (if omitted, shows all settings)
        key: Option<String>,
    },
    /// Set a configuration setting
    Set {
        /// Key and value (e.g., 'staging-dir=/tmp/updates')
        key_value: String,
    },
    /// Reset a configuration setting to its default
    Unset {
        /// Key to unset (e.g., 'show-progress')
        key: String,
    },
    /// Show full configuration
    Show {
        /// Output format (json, yaml)
        #[arg(long, default_value = "json")]
        format: String,
    },
}
