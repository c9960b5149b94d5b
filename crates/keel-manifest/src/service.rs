//! Sidecar containers attached to a stage.

use crate::builder::Builder;
use crate::error::{Error, Result};
use crate::helpers::{self, CustomProperties};
use crate::stage::{default_shell, DEFAULT_WHEN};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

const DEFAULT_READINESS_TIMEOUT_SECONDS: u32 = 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "image", skip_serializing_if = "String::is_empty")]
    pub container_image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub shell: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub run_commands_in_foreground: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub when: String,
    #[serde(rename = "env", skip_serializing_if = "BTreeMap::is_empty")]
    pub env_vars: BTreeMap<String, String>,
    /// Keeps running across the remaining stages instead of just its own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_stage: Option<bool>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub continue_after_stage: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readiness: Option<ReadinessProbe>,
    #[serde(flatten)]
    pub custom_properties: CustomProperties,
}

/// Readiness check for a service: an HTTP GET against `path` or an exec of
/// `command`, bounded by `timeout_seconds`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReadinessProbe {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceFields {
    #[serde(default)]
    name: String,
    #[serde(rename = "image", default)]
    container_image: String,
    #[serde(default)]
    shell: String,
    #[serde(default)]
    commands: Vec<String>,
    #[serde(default)]
    run_commands_in_foreground: bool,
    #[serde(default)]
    when: String,
    #[serde(rename = "env", default)]
    env_vars: BTreeMap<String, String>,
    #[serde(default)]
    multi_stage: Option<bool>,
    #[serde(default)]
    continue_after_stage: bool,
    #[serde(default)]
    readiness: Option<ReadinessProbe>,
}

impl ServiceFields {
    const RESERVED: &'static [&'static str] = &[
        "name",
        "image",
        "shell",
        "commands",
        "runCommandsInForeground",
        "when",
        "env",
        "multiStage",
        "continueAfterStage",
        "readiness",
    ];
}

impl<'de> Deserialize<'de> for Service {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let body = helpers::deserialize_body(deserializer)?;
        let (known, rest) = helpers::split_reserved(body, ServiceFields::RESERVED);
        let fields: ServiceFields = helpers::decode_reserved(known).map_err(D::Error::custom)?;
        let custom_properties = helpers::clean_custom_properties(rest).map_err(D::Error::custom)?;

        Ok(Service {
            name: fields.name,
            container_image: fields.container_image,
            shell: fields.shell,
            commands: fields.commands,
            run_commands_in_foreground: fields.run_commands_in_foreground,
            when: fields.when,
            env_vars: fields.env_vars,
            multi_stage: fields.multi_stage,
            continue_after_stage: fields.continue_after_stage,
            readiness: fields.readiness,
            custom_properties,
        })
    }
}

impl Service {
    /// Fills unset fields; `parent_has_image` tells whether the owning stage
    /// runs its own container.
    pub fn set_defaults(&mut self, builder: &Builder, parent_has_image: bool) {
        if self.shell.is_empty() {
            self.shell = default_shell(builder).to_string();
        }
        if self.when.is_empty() {
            self.when = DEFAULT_WHEN.to_string();
        }
        if self.multi_stage.is_none() {
            self.multi_stage = Some(!parent_has_image);
        }
        if let Some(readiness) = &mut self.readiness {
            readiness.set_defaults();
        }
    }

    pub fn validate(&self, stage_name: &str) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::validation(format!(
                "Stage {stage_name} has a service without a name"
            )));
        }
        if self.container_image.is_empty() {
            return Err(Error::validation(format!(
                "Service {} in stage {} has no image set",
                self.name, stage_name
            )));
        }
        if let Some(readiness) = &self.readiness {
            readiness.validate().map_err(|message| {
                Error::validation(format!(
                    "Service {} in stage {} has an invalid readiness probe: {}",
                    self.name, stage_name, message
                ))
            })?;
        }
        Ok(())
    }
}

impl ReadinessProbe {
    pub fn is_http_get(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn is_exec(&self) -> bool {
        !self.command.is_empty()
    }

    pub fn set_defaults(&mut self) {
        if self.timeout_seconds.is_none() {
            self.timeout_seconds = Some(DEFAULT_READINESS_TIMEOUT_SECONDS);
        }
        if self.is_http_get() && self.protocol.is_empty() {
            self.protocol = "http".to_string();
        }
    }

    fn validate(&self) -> std::result::Result<(), &'static str> {
        match (self.is_http_get(), self.is_exec()) {
            (true, true) => Err("set either path or command, not both"),
            (false, false) => Err("set a path or a command"),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SERVICE: &str = "name: kubernetes
image: bsycorp/kind:latest-1.15
env:
  SOME_ENVIRONMENT_VAR: some value with spaces
continueAfterStage: true
readiness:
  path: /kubernetes-ready
  timeoutSeconds: 60
  port: 80
  protocol: http
  hostname: kubernetes.kube-system.svc.cluster.local
";

    #[test]
    fn test_round_trip_yaml() {
        let service: Service = serde_yaml::from_str(SERVICE).unwrap();
        assert_eq!(serde_yaml::to_string(&service).unwrap(), SERVICE);
    }

    #[test]
    fn test_unknown_keys_become_custom_properties() {
        let service: Service =
            serde_yaml::from_str("name: db\nimage: cockroachdb/cockroach\nsize: large").unwrap();
        assert_eq!(
            service.custom_properties.get("size"),
            Some(&serde_json::json!("large"))
        );
        assert!(!service.custom_properties.contains_key("image"));
    }

    #[test]
    fn test_multi_stage_defaults_from_parent_image() {
        let mut with_parent_image = Service::default();
        with_parent_image.set_defaults(&Builder::default(), true);
        assert_eq!(with_parent_image.multi_stage, Some(false));

        let mut without_parent_image = Service::default();
        without_parent_image.set_defaults(&Builder::default(), false);
        assert_eq!(without_parent_image.multi_stage, Some(true));
    }

    #[test]
    fn test_readiness_probe_must_pick_one_style() {
        let mut service: Service = serde_yaml::from_str(
            "name: db\nimage: postgres\nreadiness:\n  path: /ready\n  command: [pg_isready]",
        )
        .unwrap();
        service.set_defaults(&Builder::default(), true);
        assert!(service.validate("test").is_err());

        service.readiness = Some(ReadinessProbe {
            command: vec!["pg_isready".to_string()],
            ..Default::default()
        });
        assert!(service.validate("test").is_ok());
    }

    #[test]
    fn test_requires_image() {
        let service = Service {
            name: "db".to_string(),
            ..Default::default()
        };
        assert!(service.validate("test").is_err());
    }
}
