//! Release targets: named pipeline variants that ship a built version.

use crate::builder::Builder;
use crate::error::{Error, Result};
use crate::helpers;
use crate::preferences::Preferences;
use crate::release_template::ReleaseTemplate;
use crate::section::{self, Named};
use crate::stage::{self, Stage};
use crate::trigger::{Trigger, TriggerContext};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Mapping;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Release {
    #[serde(skip)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builder: Option<Builder>,
    #[serde(rename = "clone", skip_serializing_if = "Option::is_none")]
    pub clone_repository: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ReleaseAction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<Trigger>,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "section::serialize_section"
    )]
    pub stages: Vec<Stage>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub template: String,
}

/// A named variant of a release, e.g. `deploy` versus `rollback`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReleaseAction {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hide_badge: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ReleaseFields {
    #[serde(default)]
    name: String,
    #[serde(default)]
    builder: Option<Builder>,
    #[serde(rename = "clone", default)]
    clone_repository: Option<bool>,
    #[serde(default)]
    actions: Vec<ReleaseAction>,
    #[serde(default)]
    triggers: Vec<Trigger>,
    #[serde(default, deserialize_with = "helpers::deserialize_body")]
    stages: Mapping,
    #[serde(default)]
    template: String,
}

impl<'de> Deserialize<'de> for Release {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let body = helpers::deserialize_body(deserializer)?;
        let fields: ReleaseFields = helpers::decode_reserved(body).map_err(D::Error::custom)?;
        let stages = section::decode_section("stages", fields.stages).map_err(D::Error::custom)?;

        Ok(Release {
            name: fields.name,
            builder: fields.builder,
            clone_repository: fields.clone_repository,
            actions: fields.actions,
            triggers: fields.triggers,
            stages,
            template: fields.template,
        })
    }
}

impl Named for Release {
    const KEEPS_DECLARED_NAME: bool = true;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

impl Release {
    /// Fills every field not set on this release from its template.
    ///
    /// The template is copied, so releases sharing a template never share
    /// state. Returns an error if the named template does not exist.
    pub fn init_from_template(&mut self, templates: &[ReleaseTemplate]) -> Result<()> {
        if self.template.is_empty() {
            return Ok(());
        }

        let Some(template) = templates.iter().find(|t| t.name == self.template) else {
            return Err(Error::validation(format!(
                "Release {} uses template {} which is not defined in releaseTemplates",
                self.name, self.template
            )));
        };

        if self.builder.is_none() {
            self.builder = template.builder.clone();
        }
        if self.clone_repository.is_none() {
            self.clone_repository = template.clone_repository;
        }
        if self.actions.is_empty() {
            self.actions = template.actions.clone();
        }
        if self.triggers.is_empty() {
            self.triggers = template.triggers.clone();
        }
        if self.stages.is_empty() {
            self.stages = template.stages.clone();
        }
        Ok(())
    }

    /// Fills unset fields; a release without its own builder gets a copy of
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
            trigger.set_defaults(preferences, TriggerContext::Release, &self.name);
        }
        for stage in &mut self.stages {
            stage.set_defaults(builder);
        }
    }

    pub fn validate(&self, preferences: &Preferences) -> Result<()> {
        if let Some(builder) = &self.builder {
            builder.validate(preferences)?;
        }

        let mut action_names = HashSet::new();
        for action in &self.actions {
            if action.name.is_empty() {
                return Err(Error::validation(format!(
                    "Release {} has an action without a name",
                    self.name
                )));
            }
            if !action_names.insert(action.name.as_str()) {
                return Err(Error::validation(format!(
                    "Release {} declares action {} more than once",
                    self.name, action.name
                )));
            }
        }

        for trigger in &self.triggers {
            trigger.validate(TriggerContext::Release, &self.name)?;
        }

        stage::validate_stages(&format!("releases.{}.stages", self.name), &self.stages)
    }
}
