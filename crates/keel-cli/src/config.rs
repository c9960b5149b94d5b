//! CLI configuration management.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    /// Preferences file used when `--preferences` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences_path: Option<PathBuf>,
    /// Output format.
    #[serde(default)]
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl CliConfig {
    /// Load configuration from file.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::config_path()?;
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let dirs = directories::ProjectDirs::from("dev", "keel", "keel-cli")
            .ok_or("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.yaml"))
    }

    /// Set a configuration value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "preferencesPath" => {
                self.preferences_path = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "outputFormat" => {
                self.output_format = match value {
                    "yaml" => OutputFormat::Yaml,
                    "json" => OutputFormat::Json,
                    _ => return Err(format!("Invalid output format: {}", value)),
                };
            }
            _ => return Err(format!("Unknown config key: {}", key)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_known_keys() {
        let mut config = CliConfig::default();
        config.set("outputFormat", "json").unwrap();
        config.set("preferencesPath", "/etc/keel/preferences.yaml").unwrap();

        assert_eq!(config.output_format, OutputFormat::Json);
        assert_eq!(
            config.preferences_path,
            Some(PathBuf::from("/etc/keel/preferences.yaml"))
        );

        config.set("preferencesPath", "").unwrap();
        assert_eq!(config.preferences_path, None);
    }

    #[test]
    fn test_set_rejects_unknown_values() {
        let mut config = CliConfig::default();
        assert!(config.set("outputFormat", "table").is_err());
        assert!(config.set("apiUrl", "http://localhost").is_err());
    }

    #[test]
    fn test_yaml_keys() {
        let config: CliConfig =
            serde_yaml::from_str("preferencesPath: prefs.yaml\noutputFormat: json\n").unwrap();
        assert_eq!(config.output_format, OutputFormat::Json);
        assert_eq!(serde_yaml::to_string(&config).unwrap(), "preferencesPath: prefs.yaml\noutputFormat: json\n");
    }
}
