//! Builder selection: the execution environment a pipeline runs on.

use crate::error::{Error, Result};
use crate::preferences::Preferences;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Builder {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub track: String,
    #[serde(rename = "os", default, skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<OperatingSystem>,
    #[serde(rename = "medium", default, skip_serializing_if = "Option::is_none")]
    pub storage_medium: Option<StorageMedium>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub builder_type: Option<BuilderType>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Linux,
    Windows,
}

impl OperatingSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingSystem::Linux => "linux",
            OperatingSystem::Windows => "windows",
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backing storage for the build workspace; absent means the node default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StorageMedium {
    Memory,
    HugePages,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BuilderType {
    #[default]
    Docker,
    Kubernetes,
}

impl Builder {
    /// The operating system stages run on, linux unless set otherwise.
    pub fn os(&self) -> OperatingSystem {
        self.operating_system.unwrap_or(OperatingSystem::Linux)
    }

    pub fn set_defaults(&mut self, preferences: &Preferences) {
        if self.operating_system.is_none() {
            self.operating_system = preferences.builder_operating_systems.first().copied();
        }

        if self.track.is_empty()
            && let Some(track) = self
                .operating_system
                .and_then(|os| preferences.builder_tracks_per_operating_system.get(&os))
                .and_then(|tracks| tracks.first())
        {
            self.track = track.clone();
        }

        if self.builder_type.is_none() {
            self.builder_type = Some(BuilderType::default());
        }
    }

    pub fn validate(&self, preferences: &Preferences) -> Result<()> {
        let Some(os) = self.operating_system else {
            return Err(Error::validation("builder.os is not set"));
        };

        if !preferences.builder_operating_systems.contains(&os) {
            return Err(Error::validation(format!(
                "builder.os {} is not allowed; use one of: {}",
                os,
                join(preferences.builder_operating_systems.iter())
            )));
        }

        let Some(tracks) = preferences.builder_tracks_per_operating_system.get(&os) else {
            return Err(Error::validation(format!(
                "no builder tracks are configured for operating system {os}"
            )));
        };

        if !tracks.contains(&self.track) {
            return Err(Error::validation(format!(
                "builder.track {:?} is not allowed for {}; use one of: {}",
                self.track,
                os,
                join(tracks.iter())
            )));
        }

        Ok(())
    }
}

fn join<T: fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}
