//! Bots: pipeline variants that respond to events from integrations.

use crate::builder::Builder;
use crate::error::Result;
use crate::helpers;
use crate::preferences::Preferences;
use crate::section::{self, Named};
use crate::stage::{self, Stage};
use crate::trigger::{Trigger, TriggerContext};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Mapping;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Bot {
    #[serde(skip)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builder: Option<Builder>,
    #[serde(rename = "clone", skip_serializing_if = "Option::is_none")]
    pub clone_repository: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<Trigger>,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "section::serialize_section"
    )]
    pub stages: Vec<Stage>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BotFields {
    #[serde(default)]
    name: String,
    #[serde(default)]
    builder: Option<Builder>,
    #[serde(rename = "clone", default)]
    clone_repository: Option<bool>,
    #[serde(default)]
    triggers: Vec<Trigger>,
    #[serde(default, deserialize_with = "helpers::deserialize_body")]
    stages: Mapping,
}

impl<'de> Deserialize<'de> for Bot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let body = helpers::deserialize_body(deserializer)?;
        let fields: BotFields = helpers::decode_reserved(body).map_err(D::Error::custom)?;
        let stages = section::decode_section("stages", fields.stages).map_err(D::Error::custom)?;

        Ok(Bot {
            name: fields.name,
            builder: fields.builder,
            clone_repository: fields.clone_repository,
            triggers: fields.triggers,
            stages,
        })
    }
}

impl Named for Bot {
    const KEEPS_DECLARED_NAME: bool = true;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

impl Bot {
    /// Fills unset fields; a bot without its own builder gets a copy of
    /// `manifest_builder`.
    pub fn set_defaults(&mut self, preferences: &Preferences, manifest_builder: &Builder) {
        if self.clone_repository.is_none() {
            self.clone_repository = Some(false);
        }

        match &mut self.builder {
            Some(builder) => builder.set_defaults(preferences),
            None => self.builder = Some(manifest_builder.clone()),
        }
        let builder = self.builder.as_ref().unwrap_or(manifest_builder);

        for trigger in &mut self.triggers {
            trigger.set_defaults(preferences, TriggerContext::Bot, &self.name);
        }
        for stage in &mut self.stages {
            stage.set_defaults(builder);
        }
    }

    pub fn validate(&self, preferences: &Preferences) -> Result<()> {
        if let Some(builder) = &self.builder {
            builder.validate(preferences)?;
        }
        for trigger in &self.triggers {
            trigger.validate(TriggerContext::Bot, &self.name)?;
        }
        stage::validate_stages(&format!("bots.{}.stages", self.name), &self.stages)
    }
}
