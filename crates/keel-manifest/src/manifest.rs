//! The manifest root: decode, default cascade, validation and trigger
//! flattening.

use crate::bot::Bot;
use crate::builder::Builder;
use crate::error::{Error, Result};
use crate::event::pipeline_name;
use crate::helpers::{self, CustomProperties};
use crate::ports::SchemaValidator;
use crate::preferences::Preferences;
use crate::release::Release;
use crate::release_template::ReleaseTemplate;
use crate::schema::JsonSchemaValidator;
use crate::section::{self, Named};
use crate::stage::{self, Stage};
use crate::trigger::{Trigger, TriggerContext};
use crate::version::Version;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Mapping;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub archived: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub builder: Builder,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "is_default")]
    pub version: Version,
    #[serde(rename = "env", skip_serializing_if = "BTreeMap::is_empty")]
    pub global_env_vars: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: CustomProperties,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<Trigger>,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "section::serialize_section"
    )]
    pub stages: Vec<Stage>,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "section::serialize_section"
    )]
    pub release_templates: Vec<ReleaseTemplate>,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "section::serialize_section"
    )]
    pub releases: Vec<Release>,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "section::serialize_section"
    )]
    pub bots: Vec<Bot>,
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ManifestFields {
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    builder: Builder,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    version: Version,
    #[serde(rename = "env", default)]
    global_env_vars: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "helpers::deserialize_body")]
    metadata: Mapping,
    #[serde(default)]
    triggers: Vec<Trigger>,
    #[serde(default, deserialize_with = "helpers::deserialize_body")]
    stages: Mapping,
    /// Former name of `stages`, read only when `stages` is absent.
    #[serde(default, deserialize_with = "helpers::deserialize_body")]
    pipelines: Mapping,
    #[serde(default, deserialize_with = "helpers::deserialize_body")]
    release_templates: Mapping,
    #[serde(default, deserialize_with = "helpers::deserialize_body")]
    releases: Mapping,
    #[serde(default, deserialize_with = "helpers::deserialize_body")]
    bots: Mapping,
}

impl<'de> Deserialize<'de> for Manifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let fields = ManifestFields::deserialize(deserializer)?;

        let stages = if fields.stages.is_empty() && !fields.pipelines.is_empty() {
            section::decode_section("pipelines", fields.pipelines)
        } else {
            section::decode_section("stages", fields.stages)
        }
        .map_err(D::Error::custom)?;

        Ok(Manifest {
            archived: fields.archived,
            builder: fields.builder,
            labels: fields.labels,
            version: fields.version,
            global_env_vars: fields.global_env_vars,
            metadata: helpers::clean_custom_properties(fields.metadata)
                .map_err(|e| D::Error::custom(format!("metadata: {e}")))?,
            triggers: fields.triggers,
            stages,
            release_templates: section::decode_section("releaseTemplates", fields.release_templates)
                .map_err(D::Error::custom)?,
            releases: section::decode_section("releases", fields.releases)
                .map_err(D::Error::custom)?,
            bots: section::decode_section("bots", fields.bots).map_err(D::Error::custom)?,
        })
    }
}

impl Manifest {
    /// Decodes a manifest document and resolves release templates.
    ///
    /// No defaults are applied and nothing is validated beyond the document
    /// shape.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut manifest: Manifest = serde_yaml::from_str(content)?;
        manifest.resolve_templates()?;
        Ok(manifest)
    }

    fn resolve_templates(&mut self) -> Result<()> {
        let templates = &self.release_templates;
        self.releases
            .iter_mut()
            .try_for_each(|release| release.init_from_template(templates))
    }

    /// Fills every unset field, top-down. Running it twice is a no-op.
    pub fn set_defaults(&mut self, preferences: &Preferences) {
        self.builder.set_defaults(preferences);
        self.version.set_defaults(preferences);

        for trigger in &mut self.triggers {
            trigger.set_defaults(preferences, TriggerContext::Build, "");
        }
        for stage in &mut self.stages {
            stage.set_defaults(&self.builder);
        }
        for release in &mut self.releases {
            release.set_defaults(preferences, &self.builder);
        }
        for bot in &mut self.bots {
            bot.set_defaults(preferences, &self.builder);
        }
    }

    /// Validates against `preferences`, checking metadata with the bundled
    /// JSON-schema validator.
    pub fn validate(&self, preferences: &Preferences) -> Result<()> {
        self.validate_with(preferences, &JsonSchemaValidator)
    }

    /// Validates against `preferences`; stops at the first violation.
    pub fn validate_with(
        &self,
        preferences: &Preferences,
        schema_validator: &dyn SchemaValidator,
    ) -> Result<()> {
        self.builder.validate(preferences)?;
        if self.version.custom.is_some() && self.version.semver.is_some() {
            return Err(Error::validation(
                "version declares both custom and semver; set only one of them",
            ));
        }
        self.validate_labels(preferences)?;

        if self.stages.is_empty() {
            return Err(Error::validation("The manifest should define 1 or more stages"));
        }
        stage::validate_stages("stages", &self.stages)?;

        for trigger in &self.triggers {
            trigger.validate(TriggerContext::Build, "")?;
        }

        section::ensure_unique_names("releases", &self.releases)?;
        for release in &self.releases {
            release.validate(preferences)?;
        }

        section::ensure_unique_names("bots", &self.bots)?;
        for bot in &self.bots {
            bot.validate(preferences)?;
        }

        self.validate_metadata(preferences, schema_validator)
    }

    fn validate_labels(&self, preferences: &Preferences) -> Result<()> {
        for (key, value) in &self.labels {
            let Some(pattern) = preferences.label_regexes.get(key) else {
                continue;
            };
            let pattern = format!("^(?:{})$", pattern.trim());
            let re = Regex::new(&pattern).map_err(|e| {
                Error::Validation(format!("Label regex for {key} is invalid: {e}"))
            })?;
            if !re.is_match(value) {
                return Err(Error::Validation(format!(
                    "Label {key} does not match regex {pattern}"
                )));
            }
        }
        Ok(())
    }

    fn validate_metadata(
        &self,
        preferences: &Preferences,
        schema_validator: &dyn SchemaValidator,
    ) -> Result<()> {
        if preferences.metadata_validation_schema.is_empty() {
            return Ok(());
        }

        let document = serde_json::to_vec(&self.metadata)?;
        let result =
            schema_validator.validate(&preferences.metadata_validation_schema, &document)?;
        if !result.valid {
            return Err(Error::Validation(format!(
                "Metadata validation failed: {}",
                result.errors.join("; ")
            )));
        }
        Ok(())
    }

    /// Build, release and bot triggers as one list, with `self` resolved to
    /// `source/owner/name`. The manifest itself keeps `self`.
    pub fn get_all_triggers(&self, repo_source: &str, repo_owner: &str, repo_name: &str) -> Vec<Trigger> {
        let pipeline = pipeline_name(repo_source, repo_owner, repo_name);

        self.triggers
            .iter()
            .chain(self.releases.iter().flat_map(|r| r.triggers.iter()))
            .chain(self.bots.iter().flat_map(|b| b.triggers.iter()))
            .map(|trigger| {
                let mut trigger = trigger.clone();
                trigger.replace_self(&pipeline);
                trigger
            })
            .collect()
    }

    pub fn release(&self, name: &str) -> Option<&Release> {
        self.releases.iter().find(|r| r.name() == name)
    }

    pub fn bot(&self, name: &str) -> Option<&Bot> {
        self.bots.iter().find(|b| b.name() == name)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::SchemaValidation;
    use pretty_assertions::assert_eq;

    const MINIMAL: &str = r#"
builder:
  track: stable
labels:
  app: keel-cli
  team: keel
stages:
  build:
    image: golang:1.22-alpine
    commands:
    - go build ./...
"#;

    fn compiled(yaml: &str) -> Manifest {
        let mut manifest = Manifest::from_yaml_str(yaml).unwrap();
        manifest.set_defaults(&Preferences::default());
        manifest
    }

    struct RejectAll;

    impl SchemaValidator for RejectAll {
        fn validate(&self, _schema: &str, _document: &[u8]) -> Result<SchemaValidation> {
            Ok(SchemaValidation {
                valid: false,
                errors: vec!["owner is required".to_string()],
            })
        }
    }

    #[test]
    fn test_minimal_manifest_is_valid() {
        let manifest = compiled(MINIMAL);
        assert!(manifest.validate(&Preferences::default()).is_ok());
        assert_eq!(manifest.stages[0].name, "build");
        assert_eq!(manifest.version.semver.as_ref().unwrap().patch, "{{auto}}");
    }

    #[test]
    fn test_unknown_top_level_key_fails_to_decode() {
        let err = Manifest::from_yaml_str("stagez:\n  build:\n    image: alpine").unwrap_err();
        assert!(matches!(err, Error::Decode(_)), "{err}");
    }

    #[test]
    fn test_decode_error_names_stage() {
        let err = Manifest::from_yaml_str("stages:\n  build:\n    retries: -1").unwrap_err();
        assert!(err.to_string().contains("stages.build"), "{err}");
    }

    #[test]
    fn test_requires_a_stage() {
        let manifest = compiled("builder:\n  track: stable");
        assert!(manifest.validate(&Preferences::default()).is_err());
    }

    #[test]
    fn test_label_regex() {
        let mut preferences = Preferences::default();
        preferences
            .label_regexes
            .insert("team".to_string(), " keel|platform ".to_string());
        assert!(compiled(MINIMAL).validate(&preferences).is_ok());

        preferences
            .label_regexes
            .insert("team".to_string(), "platform".to_string());
        let err = compiled(MINIMAL).validate(&preferences).unwrap_err();
        assert!(err.to_string().contains("Label team"), "{err}");

        preferences
            .label_regexes
            .insert("team".to_string(), "(unclosed".to_string());
        assert!(compiled(MINIMAL).validate(&preferences).is_err());
    }

    #[test]
    fn test_metadata_schema_uses_validator_port() {
        let preferences = Preferences {
            metadata_validation_schema: r#"{"type": "object"}"#.to_string(),
            ..Default::default()
        };
        let manifest = compiled(MINIMAL);

        assert!(manifest.validate(&preferences).is_ok());
        let err = manifest.validate_with(&preferences, &RejectAll).unwrap_err();
        assert!(err.to_string().contains("owner is required"), "{err}");
    }

    #[test]
    fn test_metadata_checked_against_schema() {
        let preferences = Preferences {
            metadata_validation_schema:
                r#"{"type": "object", "required": ["owner"], "properties": {"owner": {"type": "string"}}}"#
                    .to_string(),
            ..Default::default()
        };

        let with_owner = compiled(&format!("{MINIMAL}metadata:\n  owner: team-keel\n"));
        assert!(with_owner.validate(&preferences).is_ok());

        let without_owner = compiled(&format!("{MINIMAL}metadata:\n  tier: 1\n"));
        assert!(without_owner.validate(&preferences).is_err());
    }

    #[test]
    fn test_release_builder_is_an_independent_copy() {
        let mut manifest = compiled(&format!(
            "{MINIMAL}releases:\n  staging:\n    stages:\n      deploy:\n        image: alpine\n  production:\n    stages:\n      deploy:\n        image: alpine\n"
        ));
        if let Some(builder) = manifest.releases[0].builder.as_mut() {
            builder.track = "dev".to_string();
        }

        assert_eq!(manifest.builder.track, "stable");
        assert_eq!(manifest.releases[1].builder.as_ref().unwrap().track, "stable");
    }

    #[test]
    fn test_get_all_triggers_resolves_self_on_copies() {
        let manifest = compiled(&format!(
            r#"{MINIMAL}triggers:
- pipeline:
    name: self
releases:
  production:
    triggers:
    - release:
        name: self
        target: staging
    stages:
      deploy:
        image: alpine
"#
        ));

        let triggers = manifest.get_all_triggers("github.com", "keel", "keel-cli");
        assert_eq!(triggers.len(), 2);
        assert_eq!(triggers[0].pipeline.as_ref().unwrap().name, "github.com/keel/keel-cli");
        assert_eq!(triggers[1].release.as_ref().unwrap().name, "github.com/keel/keel-cli");
        assert_eq!(manifest.triggers[0].pipeline.as_ref().unwrap().name, "self");
    }

    #[test]
    fn test_version_declares_one_kind() {
        let custom_only = compiled(&format!("{MINIMAL}version:\n  custom:\n    labelTemplate: '{{{{revision}}}}'\n"));
        assert!(custom_only.validate(&Preferences::default()).is_ok());

        let both = compiled(&format!(
            "{MINIMAL}version:\n  semver:\n    major: 1\n  custom:\n    labelTemplate: '{{{{revision}}}}'\n"
        ));
        let err = both.validate(&Preferences::default()).unwrap_err();
        assert!(err.to_string().contains("both custom and semver"), "{err}");
    }

    #[test]
    fn test_duplicate_release_names() {
        let manifest = compiled(&format!(
            "{MINIMAL}releases:\n  a:\n    name: prod\n    stages:\n      deploy:\n        image: alpine\n  b:\n    name: prod\n    stages:\n      deploy:\n        image: alpine\n"
        ));
        assert!(manifest.validate(&Preferences::default()).is_err());
    }

    #[test]
    fn test_lookup_by_name() {
        let manifest = compiled(&format!(
            "{MINIMAL}releases:\n  production:\n    stages:\n      deploy:\n        image: alpine\n"
        ));
        assert!(manifest.release("production").is_some());
        assert!(manifest.release("staging").is_none());
        assert!(manifest.bot("production").is_none());
    }
}
