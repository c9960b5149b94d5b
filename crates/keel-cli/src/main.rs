//! Keel CLI entrypoint.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod handlers;

use commands::{Commands, ConfigCommands};
use config::CliConfig;

#[derive(Parser)]
#[command(name = "keel")]
#[command(author, version, about = "Keel pipeline manifest tooling", long_about = None)]
struct Cli {
    /// Preferences file bounding what manifests may declare
    #[arg(long, global = true)]
    preferences: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

fn init_logging(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(fmt_layer.json()).init();
    } else {
        registry.with(fmt_layer).init();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = CliConfig::load().unwrap_or_default();

    match cli.command {
        Commands::Validate { path } => {
            let preferences = handlers::load_preferences(&config, cli.preferences.as_deref())?;
            handlers::validate(&preferences, &path)?
        }
        Commands::Triggers {
            path,
            source,
            owner,
            repo,
        } => {
            let preferences = handlers::load_preferences(&config, cli.preferences.as_deref())?;
            handlers::triggers(&config, &preferences, &path, &source, &owner, &repo)?
        }
        Commands::Version {
            path,
            branch,
            revision,
            auto,
        } => {
            let preferences = handlers::load_preferences(&config, cli.preferences.as_deref())?;
            handlers::version(&preferences, &path, branch, revision, auto)?
        }
        Commands::Render { path } => {
            let preferences = handlers::load_preferences(&config, cli.preferences.as_deref())?;
            handlers::render(&config, &preferences, &path)?
        }
        Commands::Schema => handlers::schema()?,
        Commands::Config { command } => match command {
            ConfigCommands::Show => handlers::show_config(&config)?,
            ConfigCommands::Set { key, value } => handlers::set_config(&key, &value)?,
        },
    }

    Ok(())
}
