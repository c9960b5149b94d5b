//! CLI command definitions.

use clap::Subcommand;
use std::path::PathBuf;

const DEFAULT_MANIFEST: &str = ".keel.yaml";

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a manifest
    Validate {
        /// Path to manifest file
        #[arg(default_value = DEFAULT_MANIFEST)]
        path: PathBuf,
    },

    /// List every trigger the manifest declares, with self resolved
    Triggers {
        /// Path to manifest file
        #[arg(default_value = DEFAULT_MANIFEST)]
        path: PathBuf,

        /// Repository host, i.e. github.com
        #[arg(long)]
        source: String,

        /// Repository owner
        #[arg(long)]
        owner: String,

        /// Repository name
        #[arg(long)]
        repo: String,
    },

    /// Render the version for a build
    Version {
        /// Path to manifest file
        #[arg(default_value = DEFAULT_MANIFEST)]
        path: PathBuf,

        /// Branch being built
        #[arg(short, long, default_value = "master")]
        branch: String,

        /// Commit being built
        #[arg(short, long, default_value = "")]
        revision: String,

        /// Auto-increment build counter
        #[arg(short, long, default_value_t = 0)]
        auto: u64,
    },

    /// Print the fully defaulted manifest
    Render {
        /// Path to manifest file
        #[arg(default_value = DEFAULT_MANIFEST)]
        path: PathBuf,
    },

    /// Print the JSON schema of the preferences file
    Schema,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set configuration value
    Set {
        /// Key
        key: String,

        /// Value
        value: String,
    },
}
