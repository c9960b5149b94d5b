//! What a fired trigger does, one action type per owning context.

use crate::error::{Error, Result};
use crate::preferences::Preferences;
use serde::{Deserialize, Serialize};

const VERSION_SAME: &str = "same";
const VERSION_LATEST: &str = "latest";

/// Starts a build of the owning pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerBuildAction {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
}

impl TriggerBuildAction {
    pub fn set_defaults(&mut self, preferences: &Preferences) {
        if self.branch.is_empty() {
            self.branch = preferences.default_branch.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.branch.is_empty() {
            return Err(Error::validation("Set builds.branch in your trigger"));
        }
        Ok(())
    }
}

/// Releases a version of the owning pipeline to one of its targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerReleaseAction {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action: String,
    /// `same` releases the version that fired the trigger, `latest` the most
    /// recent successful build, anything else a literal version.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl TriggerReleaseAction {
    /// The target is always the owning release, whatever was declared.
    pub fn set_defaults(&mut self, target_name: &str, source_is_self: bool) {
        self.target = target_name.to_string();
        if self.version.is_empty() {
            self.version = if source_is_self { VERSION_SAME } else { VERSION_LATEST }.to_string();
        }
    }

    pub fn validate(&self, target_name: &str) -> Result<()> {
        if self.target.is_empty() {
            return Err(Error::validation(format!(
                "Set releases.target in trigger for release {target_name}"
            )));
        }
        Ok(())
    }
}

/// Runs the owning bot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerBotAction {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bot: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
}

impl TriggerBotAction {
    pub fn set_defaults(&mut self, preferences: &Preferences, bot_name: &str) {
        self.bot = bot_name.to_string();
        if self.branch.is_empty() {
            self.branch = preferences.default_branch.clone();
        }
    }

    pub fn validate(&self, bot_name: &str) -> Result<()> {
        if self.bot.is_empty() {
            return Err(Error::validation(format!(
                "Set runs.bot in trigger for bot {bot_name}"
            )));
        }
        Ok(())
    }
}
