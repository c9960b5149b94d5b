//! Reusable release definitions that releases inherit from.

use crate::builder::Builder;
use crate::helpers;
use crate::release::ReleaseAction;
use crate::section::{self, Named};
use crate::stage::Stage;
use crate::trigger::Trigger;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Mapping;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReleaseTemplate {
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
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ReleaseTemplateFields {
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
}

impl<'de> Deserialize<'de> for ReleaseTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let body = helpers::deserialize_body(deserializer)?;
        let fields: ReleaseTemplateFields =
            helpers::decode_reserved(body).map_err(D::Error::custom)?;
        let stages = section::decode_section("stages", fields.stages).map_err(D::Error::custom)?;

        Ok(ReleaseTemplate {
            name: fields.name,
            builder: fields.builder,
            clone_repository: fields.clone_repository,
            actions: fields.actions,
            triggers: fields.triggers,
            stages,
        })
    }
}

impl Named for ReleaseTemplate {
    const KEEPS_DECLARED_NAME: bool = true;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip_yaml() {
        let yaml = "builder:
  track: dev
clone: true
actions:
- name: deploy-canary
stages:
  deploy:
    image: extensions/gke:stable
    credentials: gke-production
";
        let template: ReleaseTemplate = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(serde_yaml::to_string(&template).unwrap(), yaml);
    }

    #[test]
    fn test_declared_name_wins_over_key() {
        let mapping: Mapping = serde_yaml::from_str(
            "gke:\n  name: gke-deploy\n  stages:\n    deploy:\n      image: extensions/gke:stable\nplain:\n",
        )
        .unwrap();
        let templates: Vec<ReleaseTemplate> = section::decode_section("releaseTemplates", mapping).unwrap();

        assert_eq!(templates[0].name, "gke-deploy");
        assert_eq!(templates[1].name, "plain");
    }
}
