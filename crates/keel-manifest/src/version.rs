//! Version declaration and rendering.

use crate::helpers::StringOrStringArray;
use crate::preferences::Preferences;
use regex::Regex;
use serde::{Deserialize, Serialize};

const AUTO_PLACEHOLDER: &str = "{{auto}}";
const BRANCH_PLACEHOLDER: &str = "{{branch}}";
const REVISION_PLACEHOLDER: &str = "{{revision}}";

/// Longest label that is still a valid DNS label.
const MAX_LABEL_LENGTH: usize = 63;
/// Prepended to labels that do not start with a letter.
const LABEL_PREFIX: &str = "x";

/// Either a custom label template or a semantic version; semver when neither
/// is declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Version {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semver: Option<SemverVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SemverVersion {
    #[serde(default)]
    pub major: u64,
    #[serde(default)]
    pub minor: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub patch: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label_template: String,
    #[serde(default, skip_serializing_if = "StringOrStringArray::is_empty")]
    pub release_branch: StringOrStringArray,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawCustomVersion")]
pub struct CustomVersion {
    pub label_template: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawCustomVersion {
    #[serde(default)]
    label_template: String,
}

impl From<RawCustomVersion> for CustomVersion {
    fn from(raw: RawCustomVersion) -> Self {
        let label_template = if raw.label_template.is_empty() {
            REVISION_PLACEHOLDER.to_string()
        } else {
            raw.label_template
        };
        Self { label_template }
    }
}

/// Build context a version is rendered against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionParams {
    pub auto_increment: u64,
    pub branch: String,
    pub revision: String,
}

impl Version {
    pub fn set_defaults(&mut self, preferences: &Preferences) {
        if self.custom.is_none() && self.semver.is_none() {
            self.semver = Some(SemverVersion::default());
        }
        if let Some(semver) = &mut self.semver {
            semver.set_defaults(preferences);
        }
    }

    pub fn version(&self, params: &VersionParams) -> String {
        if let Some(custom) = &self.custom {
            return custom.version(params);
        }
        if let Some(semver) = &self.semver {
            return semver.version(params);
        }
        String::new()
    }
}

impl CustomVersion {
    pub fn version(&self, params: &VersionParams) -> String {
        render_template(&self.label_template, params)
    }
}

impl SemverVersion {
    pub fn set_defaults(&mut self, preferences: &Preferences) {
        if self.patch.is_empty() {
            self.patch = AUTO_PLACEHOLDER.to_string();
        }
        if self.label_template.is_empty() {
            self.label_template = BRANCH_PLACEHOLDER.to_string();
        }
        if self.release_branch.is_empty() {
            self.release_branch = StringOrStringArray::new([preferences.default_branch.clone()]);
        }
    }

    pub fn version(&self, params: &VersionParams) -> String {
        format!(
            "{}.{}.{}",
            self.major,
            self.minor,
            self.patch_with_label(params)
        )
    }

    pub fn patch_with_label(&self, params: &VersionParams) -> String {
        let patch = self.patch(params);
        if self.is_release_branch(&params.branch) {
            return patch;
        }
        format!("{}-{}", patch, self.label(params))
    }

    pub fn patch(&self, params: &VersionParams) -> String {
        render_template(&self.patch, params)
    }

    /// The rendered label template, made safe for use as a DNS label.
    pub fn label(&self, params: &VersionParams) -> String {
        tidy_label(&render_template(&self.label_template, params))
    }

    pub fn is_release_branch(&self, branch: &str) -> bool {
        self.release_branch.values.iter().any(|release_branch| {
            if looks_like_pattern(release_branch) {
                Regex::new(&format!("^(?:{release_branch})$"))
                    .map(|re| re.is_match(branch))
                    .unwrap_or(false)
            } else {
                release_branch == branch
            }
        })
    }
}

fn render_template(template: &str, params: &VersionParams) -> String {
    template
        .replace(AUTO_PLACEHOLDER, &params.auto_increment.to_string())
        .replace(BRANCH_PLACEHOLDER, &params.branch)
        .replace(REVISION_PLACEHOLDER, &params.revision)
}

fn looks_like_pattern(value: &str) -> bool {
    value.chars().any(|c| "^$.*+?()[]{}|\\".contains(c))
}

/// Lower-cases the label, collapses every run of non-alphanumeric characters
/// into a single hyphen, prefixes labels not starting with a letter, trims
/// trailing hyphens and truncates to 63 characters.
pub fn tidy_label(label: &str) -> String {
    let mut collapsed = String::with_capacity(label.len());
    let mut in_separator = false;
    for c in label.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            collapsed.push(c);
            in_separator = false;
        } else if !in_separator {
            collapsed.push('-');
            in_separator = true;
        }
    }

    if !collapsed.starts_with(|c: char| c.is_ascii_lowercase()) {
        collapsed.insert_str(0, LABEL_PREFIX);
    }

    collapsed.truncate(MAX_LABEL_LENGTH);
    collapsed.trim_end_matches('-').to_string()
}
