//! Pipeline stages and their defaulting and validation rules.

use crate::builder::{Builder, OperatingSystem};
use crate::error::{Error, Result};
use crate::helpers::{self, CustomProperties};
use crate::section::{self, Named};
use crate::service::Service;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Mapping;
use std::collections::BTreeMap;

pub(crate) const DEFAULT_WHEN: &str = "status == 'succeeded'";

const POSIX_SHELL: &str = "/bin/sh";
const WINDOWS_SHELL: &str = "powershell";
const POSIX_WORKING_DIRECTORY: &str = "/keel-work";
const WINDOWS_WORKING_DIRECTORY: &str = "C:/keel-work";

/// A unit of work, or a group of child stages run in parallel.
///
/// The name always comes from the key the stage is declared under.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "image", skip_serializing_if = "String::is_empty")]
    pub container_image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub shell: String,
    #[serde(rename = "workDir", skip_serializing_if = "String::is_empty")]
    pub working_directory: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub run_commands_in_foreground: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub when: String,
    #[serde(rename = "env", skip_serializing_if = "BTreeMap::is_empty")]
    pub env_vars: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub auto_injected: bool,
    #[serde(skip_serializing_if = "is_zero")]
    pub retries: u32,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "section::serialize_section"
    )]
    pub parallel_stages: Vec<Stage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
    #[serde(flatten)]
    pub custom_properties: CustomProperties,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StageFields {
    #[serde(rename = "image", default)]
    container_image: String,
    #[serde(default)]
    shell: String,
    #[serde(rename = "workDir", default)]
    working_directory: String,
    #[serde(default)]
    commands: Vec<String>,
    #[serde(default)]
    run_commands_in_foreground: bool,
    #[serde(default)]
    when: String,
    #[serde(rename = "env", default)]
    env_vars: BTreeMap<String, String>,
    #[serde(default)]
    auto_injected: bool,
    #[serde(default)]
    retries: u32,
    #[serde(default, deserialize_with = "helpers::deserialize_body")]
    parallel_stages: Mapping,
    #[serde(default)]
    services: Vec<Service>,
}

impl StageFields {
    // `name` is reserved so it is never captured; the section key wins.
    const RESERVED: &'static [&'static str] = &[
        "name",
        "image",
        "shell",
        "workDir",
        "commands",
        "runCommandsInForeground",
        "when",
        "env",
        "autoInjected",
        "retries",
        "parallelStages",
        "services",
    ];
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let body = helpers::deserialize_body(deserializer)?;
        let (known, rest) = helpers::split_reserved(body, StageFields::RESERVED);
        let fields: StageFields = helpers::decode_reserved(known).map_err(D::Error::custom)?;
        let parallel_stages = section::decode_section("parallelStages", fields.parallel_stages)
            .map_err(D::Error::custom)?;
        let custom_properties = helpers::clean_custom_properties(rest).map_err(D::Error::custom)?;

        Ok(Stage {
            name: String::new(),
            container_image: fields.container_image,
            shell: fields.shell,
            working_directory: fields.working_directory,
            commands: fields.commands,
            run_commands_in_foreground: fields.run_commands_in_foreground,
            when: fields.when,
            env_vars: fields.env_vars,
            auto_injected: fields.auto_injected,
            retries: fields.retries,
            parallel_stages,
            services: fields.services,
            custom_properties,
        })
    }
}

impl Named for Stage {
    const KEEPS_DECLARED_NAME: bool = false;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

pub(crate) fn default_shell(builder: &Builder) -> &'static str {
    match builder.os() {
        OperatingSystem::Windows => WINDOWS_SHELL,
        OperatingSystem::Linux => POSIX_SHELL,
    }
}

fn default_working_directory(builder: &Builder) -> &'static str {
    match builder.os() {
        OperatingSystem::Windows => WINDOWS_WORKING_DIRECTORY,
        OperatingSystem::Linux => POSIX_WORKING_DIRECTORY,
    }
}

impl Stage {
    pub fn is_parallel(&self) -> bool {
        !self.parallel_stages.is_empty()
    }

    /// Fills unset fields from the builder the stage runs on.
    ///
    /// Parallel groups get no shell or working directory; their children do.
    pub fn set_defaults(&mut self, builder: &Builder) {
        if !self.is_parallel() {
            if self.shell.is_empty() {
                self.shell = default_shell(builder).to_string();
            }
            if self.working_directory.is_empty() {
                self.working_directory = default_working_directory(builder).to_string();
            }
        }

        if self.when.is_empty() {
            self.when = DEFAULT_WHEN.to_string();
        }

        for stage in &mut self.parallel_stages {
            stage.set_defaults(builder);
        }

        let has_image = !self.container_image.is_empty();
        for service in &mut self.services {
            service.set_defaults(builder, has_image);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_parallel() {
            let conflicting = [
                ("image", !self.container_image.is_empty()),
                ("shell", !self.shell.is_empty()),
                ("workDir", !self.working_directory.is_empty()),
                ("commands", !self.commands.is_empty()),
                ("env", !self.env_vars.is_empty()),
            ];
            if let Some((parameter, _)) = conflicting.iter().find(|(_, set)| *set) {
                return Err(Error::validation(format!(
                    "Stage {} cannot use parameters parallelStages and {} at the same time",
                    self.name, parameter
                )));
            }

            validate_stages("parallelStages", &self.parallel_stages)?;
        } else if self.container_image.is_empty() && self.services.is_empty() {
            return Err(Error::validation(format!(
                "Stage {} has no image set",
                self.name
            )));
        }

        for service in &self.services {
            service.validate(&self.name)?;
        }

        Ok(())
    }
}

/// Validates an ordered stage section: unique names, then every stage.
pub(crate) fn validate_stages(section: &str, stages: &[Stage]) -> Result<()> {
    section::ensure_unique_names(section, stages)?;
    stages.iter().try_for_each(Stage::validate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode(yaml: &str) -> Stage {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn windows() -> Builder {
        Builder {
            operating_system: Some(OperatingSystem::Windows),
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_reserved_fields() {
        let stage = decode(
            r#"
image: docker:17.03.0-ce
shell: /bin/bash
workDir: /go/src/github.com/keel/keel
commands:
- cp /go/bin/keel-ci-builder ./publish
- docker build -t keel-ci-builder ./publish
when: status == 'succeeded' && branch == 'master'
env:
  SOME_ENVIRONMENT_VAR: some value with spaces
retries: 2
autoInjected: true
"#,
        );

        assert_eq!(stage.container_image, "docker:17.03.0-ce");
        assert_eq!(stage.shell, "/bin/bash");
        assert_eq!(stage.working_directory, "/go/src/github.com/keel/keel");
        assert_eq!(stage.commands.len(), 2);
        assert_eq!(stage.when, "status == 'succeeded' && branch == 'master'");
        assert_eq!(stage.env_vars["SOME_ENVIRONMENT_VAR"], "some value with spaces");
        assert_eq!(stage.retries, 2);
        assert!(stage.auto_injected);
        assert!(stage.custom_properties.is_empty());
    }

    #[test]
    fn test_name_key_is_not_a_custom_property() {
        let stage = decode("name: declared\nimage: alpine");
        assert_eq!(stage.name, "");
        assert!(stage.custom_properties.is_empty());
    }

    #[test]
    fn test_negative_retries_fail_to_decode() {
        assert!(serde_yaml::from_str::<Stage>("image: alpine\nretries: -1").is_err());
    }

    #[test]
    fn test_custom_properties_are_captured() {
        let stage = decode(
            r#"
image: extensions/gke:stable
credentials: gke-tooling
dryrun: true
container:
  repository: extensions
  tag: alpha
"#,
        );

        assert_eq!(stage.custom_properties["credentials"], serde_json::json!("gke-tooling"));
        assert_eq!(stage.custom_properties["dryrun"], serde_json::json!(true));
        assert_eq!(
            stage.custom_properties["container"],
            serde_json::json!({"repository": "extensions", "tag": "alpha"})
        );
    }

    #[test]
    fn test_parallel_stages_keep_declaration_order() {
        let stage = decode(
            r#"
parallelStages:
  zeta:
    image: golang:1.12.4-alpine3.9
  alpha:
    image: golang:1.12.4-alpine3.9
  middle:
"#,
        );

        let names: Vec<_> = stage.parallel_stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "middle"]);
    }

    #[test]
    fn test_round_trip_yaml() {
        let yaml = "image: golang:1.12.4-alpine3.9
shell: /bin/sh
commands:
- go test ./...
env:
  CGO_ENABLED: '0'
retries: 1
parallelStages:
  lint:
    image: golangci/golangci-lint
services:
- name: db
  image: postgres
dryrun: true
";
        let stage = decode(yaml);
        let encoded = serde_yaml::to_string(&stage).unwrap();
        assert_eq!(decode(&encoded), stage);
    }

    #[test]
    fn test_linux_defaults() {
        let mut stage = decode("image: alpine");
        stage.set_defaults(&Builder::default());

        assert_eq!(stage.shell, "/bin/sh");
        assert_eq!(stage.working_directory, "/keel-work");
        assert_eq!(stage.when, "status == 'succeeded'");
    }

    #[test]
    fn test_windows_defaults() {
        let mut stage = decode("image: mcr.microsoft.com/windows/servercore");
        stage.set_defaults(&windows());

        assert_eq!(stage.shell, "powershell");
        assert_eq!(stage.working_directory, "C:/keel-work");
    }

    #[test]
    fn test_parallel_group_skips_shell_and_workdir() {
        let mut stage = decode("parallelStages:\n  a:\n    image: alpine\n  b:\n    image: alpine");
        stage.set_defaults(&Builder::default());

        assert_eq!(stage.shell, "");
        assert_eq!(stage.working_directory, "");
        assert_eq!(stage.when, "status == 'succeeded'");
        assert!(stage.parallel_stages.iter().all(|s| s.shell == "/bin/sh"));
        assert!(stage.validate().is_ok());
    }

    #[test]
    fn test_defaults_are_idempotent() {
        let mut stage = decode("image: alpine\nservices:\n- name: db\n  image: postgres");
        stage.set_defaults(&Builder::default());
        let once = stage.clone();
        stage.set_defaults(&Builder::default());
        assert_eq!(stage, once);
    }

    #[test]
    fn test_parallel_stages_exclude_parent_fields() {
        for field in [
            "image: alpine",
            "shell: /bin/sh",
            "workDir: /work",
            "commands: [ls]",
            "env: {A: b}",
        ] {
            let mut stage =
                decode(&format!("{field}\nparallelStages:\n  a:\n    image: alpine"));
            stage.name = "build".to_string();
            assert!(stage.validate().is_err(), "{field}");
        }
    }

    #[test]
    fn test_requires_image_or_service() {
        let stage = Stage {
            name: "build".to_string(),
            ..Default::default()
        };
        assert!(stage.validate().is_err());

        let with_service = decode("services:\n- name: db\n  image: postgres");
        assert!(with_service.validate().is_ok());
    }

    #[test]
    fn test_nested_parallel_stage_is_validated() {
        let stage = decode("parallelStages:\n  a:\n    image: alpine\n  b:\n    commands: [ls]");
        assert!(stage.validate().is_err());
    }
}
