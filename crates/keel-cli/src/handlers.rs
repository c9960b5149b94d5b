//! Command handlers.

use crate::config::{CliConfig, OutputFormat};
use console::style;
use keel_manifest::{Preferences, VersionParams, read_manifest_from_file};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Preferences from `--preferences`, else from the configured file, else the
/// built-in defaults.
pub fn load_preferences(
    config: &CliConfig,
    flag: Option<&Path>,
) -> Result<Preferences, Box<dyn std::error::Error>> {
    match flag.or(config.preferences_path.as_deref()) {
        Some(path) => {
            debug!(path = %path.display(), "Loading preferences");
            Ok(Preferences::from_file(path)?)
        }
        None => Ok(Preferences::default()),
    }
}

fn print_value<T: Serialize>(
    format: OutputFormat,
    value: &T,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

/// Validate a manifest.
pub fn validate(preferences: &Preferences, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = match read_manifest_from_file(Some(preferences), path, true) {
        Ok(manifest) => manifest,
        Err(e) => {
            println!("{} {} is invalid", style("✗").red(), path.display());
            return Err(e.into());
        }
    };

    println!("{} {} is valid", style("✓").green(), path.display());
    println!("  Stages: {}", manifest.stages.len());
    for stage in &manifest.stages {
        if stage.is_parallel() {
            println!("    - {} ({} in parallel)", stage.name, stage.parallel_stages.len());
        } else {
            println!("    - {} ({})", stage.name, style(&stage.container_image).dim());
        }
    }
    if !manifest.releases.is_empty() {
        println!("  Releases: {}", manifest.releases.len());
        for release in &manifest.releases {
            println!("    - {} ({} stages)", release.name, release.stages.len());
        }
    }
    if !manifest.bots.is_empty() {
        println!("  Bots: {}", manifest.bots.len());
        for bot in &manifest.bots {
            println!("    - {} ({} stages)", bot.name, bot.stages.len());
        }
    }

    Ok(())
}

/// Print every trigger with `self` resolved.
pub fn triggers(
    config: &CliConfig,
    preferences: &Preferences,
    path: &Path,
    source: &str,
    owner: &str,
    repo: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = read_manifest_from_file(Some(preferences), path, true)?;
    let triggers = manifest.get_all_triggers(source, owner, repo);
    print_value(config.output_format, &triggers)
}

/// Print the version for a build.
pub fn version(
    preferences: &Preferences,
    path: &Path,
    branch: String,
    revision: String,
    auto_increment: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = read_manifest_from_file(Some(preferences), path, true)?;
    let params = VersionParams {
        auto_increment,
        branch,
        revision,
    };
    println!("{}", manifest.version.version(&params));
    Ok(())
}

/// Print the defaulted manifest.
pub fn render(
    config: &CliConfig,
    preferences: &Preferences,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = read_manifest_from_file(Some(preferences), path, false)?;
    let output = match config.output_format {
        OutputFormat::Yaml => manifest.to_yaml_string()?,
        OutputFormat::Json => manifest.to_json_string()?,
    };
    println!("{}", output.trim_end());
    Ok(())
}

/// Print the preferences JSON schema.
pub fn schema() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schemars::schema_for!(Preferences);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// Show configuration.
pub fn show_config(config: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Current configuration:");
    println!(
        "  preferencesPath: {}",
        config
            .preferences_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!("  outputFormat: {:?}", config.output_format);

    if let Ok(path) = CliConfig::config_path() {
        println!("\nConfig file: {}", path.display());
    }

    Ok(())
}

/// Set configuration.
pub fn set_config(key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CliConfig::load().unwrap_or_default();
    config.set(key, value)?;
    config.save()?;

    println!("{} Set {} = {}", style("✓").green(), key, value);
    Ok(())
}
