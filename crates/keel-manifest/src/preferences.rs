//! Caller-supplied rules bounding what a manifest may declare.

use crate::builder::OperatingSystem;
use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Label key to the regex its value must fully match.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub label_regexes: BTreeMap<String, String>,
    /// Allowed operating systems; the first one is the default.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub builder_operating_systems: Vec<OperatingSystem>,
    /// Allowed tracks per operating system; the first one is the default.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub builder_tracks_per_operating_system: BTreeMap<OperatingSystem, Vec<String>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_branch: String,
    /// JSON schema the manifest's metadata section must conform to.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metadata_validation_schema: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            label_regexes: BTreeMap::new(),
            builder_operating_systems: vec![OperatingSystem::Linux, OperatingSystem::Windows],
            builder_tracks_per_operating_system: BTreeMap::from([
                (
                    OperatingSystem::Linux,
                    vec!["stable".to_string(), "beta".to_string(), "dev".to_string()],
                ),
                (
                    OperatingSystem::Windows,
                    vec![
                        "windowsservercore-1809".to_string(),
                        "windowsservercore-1909".to_string(),
                        "windowsservercore-ltsc2019".to_string(),
                    ],
                ),
            ]),
            default_branch: "master".to_string(),
            metadata_validation_schema: String::new(),
        }
    }
}

impl Preferences {
    /// Fills every empty field from the built-in defaults.
    pub fn set_defaults(&mut self) {
        let defaults = Self::default();
        if self.builder_operating_systems.is_empty() {
            self.builder_operating_systems = defaults.builder_operating_systems;
        }
        if self.builder_tracks_per_operating_system.is_empty() {
            self.builder_tracks_per_operating_system = defaults.builder_tracks_per_operating_system;
        }
        if self.default_branch.is_empty() {
            self.default_branch = defaults.default_branch;
        }
    }

    /// Load preferences from a YAML string, filling gaps with defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut preferences: Self = serde_yaml::from_str(content)
            .map_err(|e| Error::Decode(format!("preferences: {e}")))?;
        preferences.set_defaults();
        Ok(preferences)
    }

    /// Load preferences from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_is_defaulted() {
        let preferences = Preferences::from_yaml_str(
            r#"
labelRegexes:
  type: api|web|library|container
defaultBranch: main
"#,
        )
        .unwrap();

        assert_eq!(preferences.default_branch, "main");
        assert_eq!(
            preferences.label_regexes.get("type").map(String::as_str),
            Some("api|web|library|container")
        );
        assert_eq!(preferences.builder_operating_systems.len(), 2);
        assert_eq!(
            preferences.builder_tracks_per_operating_system[&OperatingSystem::Linux],
            vec!["stable", "beta", "dev"]
        );
    }

    #[test]
    fn test_camel_case_keys_round_trip() {
        let yaml = serde_yaml::to_string(&Preferences::default()).unwrap();
        assert!(yaml.contains("builderTracksPerOperatingSystem:"));
        assert!(yaml.contains("defaultBranch: master"));

        let parsed = Preferences::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed, Preferences::default());
    }
}
