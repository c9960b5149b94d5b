//! Reading manifests from text or disk in one step.

use crate::error::Result;
use crate::manifest::Manifest;
use crate::preferences::Preferences;
use std::path::Path;
use tracing::debug;

/// Decodes `content`, applies defaults and optionally validates.
///
/// Without `preferences` the built-in defaults are used; empty fields of
/// supplied preferences are filled from them.
pub fn read_manifest(
    preferences: Option<&Preferences>,
    content: &str,
    validate: bool,
) -> Result<Manifest> {
    let mut preferences = preferences.cloned().unwrap_or_default();
    preferences.set_defaults();
    let preferences = &preferences;

    let mut manifest = Manifest::from_yaml_str(content)?;
    manifest.set_defaults(preferences);
    debug!(
        stages = manifest.stages.len(),
        releases = manifest.releases.len(),
        bots = manifest.bots.len(),
        "Applied manifest defaults"
    );

    if validate && let Err(e) = manifest.validate(preferences) {
        debug!(error = %e, "Manifest failed validation");
        return Err(e);
    }

    Ok(manifest)
}

pub fn read_manifest_from_file(
    preferences: Option<&Preferences>,
    path: impl AsRef<Path>,
    validate: bool,
) -> Result<Manifest> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Reading manifest");

    let content = std::fs::read_to_string(path)?;
    let manifest = read_manifest(preferences, &content, validate)?;

    debug!(path = %path.display(), "Finished reading manifest");
    Ok(manifest)
}

/// Whether anything exists at `path`.
pub fn exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}
