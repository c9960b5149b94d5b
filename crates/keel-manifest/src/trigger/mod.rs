//! Automated triggers connecting pipelines to each other and to external
//! events.
//!
//! A trigger pairs exactly one source with exactly one action; which action
//! is legal depends on whether the trigger belongs to the build, a release or
//! a bot.

mod actions;
mod filter;
pub mod schedule;
mod sources;

pub use actions::{TriggerBotAction, TriggerBuildAction, TriggerReleaseAction};
pub use sources::{
    BitbucketTrigger, CronTrigger, DockerTrigger, GitTrigger, GithubTrigger, PipelineTrigger,
    PubSubTrigger, ReleaseTrigger, RepositoryHookTrigger, SELF_REFERENCE,
};

use crate::error::{Error, Result};
use crate::event::Event;
use crate::preferences::Preferences;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The part of a manifest a trigger belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerContext {
    Build,
    Release,
    Bot,
}

impl TriggerContext {
    fn action_key(&self) -> &'static str {
        match self {
            TriggerContext::Build => "builds",
            TriggerContext::Release => "releases",
            TriggerContext::Bot => "runs",
        }
    }
}

impl fmt::Display for TriggerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerContext::Build => f.write_str("build"),
            TriggerContext::Release => f.write_str("release"),
            TriggerContext::Bot => f.write_str("bot"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Trigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<PipelineTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<ReleaseTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<CronTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubsub: Option<PubSubTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitbucket: Option<BitbucketTrigger>,

    #[serde(rename = "builds", default, skip_serializing_if = "Option::is_none")]
    pub build_action: Option<TriggerBuildAction>,
    #[serde(rename = "releases", default, skip_serializing_if = "Option::is_none")]
    pub release_action: Option<TriggerReleaseAction>,
    #[serde(rename = "runs", default, skip_serializing_if = "Option::is_none")]
    pub bot_action: Option<TriggerBotAction>,
}

/// Borrowed view of whichever source a trigger declares.
#[derive(Debug, Clone, Copy)]
pub enum SourceRef<'a> {
    Pipeline(&'a PipelineTrigger),
    Release(&'a ReleaseTrigger),
    Git(&'a GitTrigger),
    Docker(&'a DockerTrigger),
    Cron(&'a CronTrigger),
    PubSub(&'a PubSubTrigger),
    Github(&'a GithubTrigger),
    Bitbucket(&'a BitbucketTrigger),
}

impl SourceRef<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceRef::Pipeline(_) => "pipeline",
            SourceRef::Release(_) => "release",
            SourceRef::Git(_) => "git",
            SourceRef::Docker(_) => "docker",
            SourceRef::Cron(_) => "cron",
            SourceRef::PubSub(_) => "pubsub",
            SourceRef::Github(_) => "github",
            SourceRef::Bitbucket(_) => "bitbucket",
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            SourceRef::Pipeline(t) => t.validate(),
            SourceRef::Release(t) => t.validate(),
            SourceRef::Git(t) => t.validate(),
            SourceRef::Docker(t) => t.validate(),
            SourceRef::Cron(t) => t.validate(),
            SourceRef::PubSub(t) => t.validate(),
            SourceRef::Github(t) => t.validate_as("github"),
            SourceRef::Bitbucket(t) => t.validate_as("bitbucket"),
        }
    }

    fn fires(&self, event: &Event) -> bool {
        match (self, event) {
            (SourceRef::Pipeline(t), Event { pipeline: Some(e), .. }) => t.fires(e),
            (SourceRef::Release(t), Event { release: Some(e), .. }) => t.fires(e),
            (SourceRef::Git(t), Event { git: Some(e), .. }) => t.fires(e),
            (SourceRef::Docker(t), Event { docker: Some(e), .. }) => t.fires(e),
            (SourceRef::Cron(t), Event { cron: Some(e), .. }) => t.fires(e),
            (SourceRef::PubSub(t), Event { pubsub: Some(e), .. }) => t.fires(e),
            (SourceRef::Github(t), Event { github: Some(e), .. }) => t.fires_github(e),
            (SourceRef::Bitbucket(t), Event { bitbucket: Some(e), .. }) => t.fires_bitbucket(e),
            _ => false,
        }
    }
}

impl Trigger {
    /// Every source this trigger declares; valid triggers declare one.
    pub fn sources(&self) -> impl Iterator<Item = SourceRef<'_>> {
        [
            self.pipeline.as_ref().map(SourceRef::Pipeline),
            self.release.as_ref().map(SourceRef::Release),
            self.git.as_ref().map(SourceRef::Git),
            self.docker.as_ref().map(SourceRef::Docker),
            self.cron.as_ref().map(SourceRef::Cron),
            self.pubsub.as_ref().map(SourceRef::PubSub),
            self.github.as_ref().map(SourceRef::Github),
            self.bitbucket.as_ref().map(SourceRef::Bitbucket),
        ]
        .into_iter()
        .flatten()
    }

    /// The declared source, if exactly one is set.
    pub fn source(&self) -> Option<SourceRef<'_>> {
        let mut sources = self.sources();
        match (sources.next(), sources.next()) {
            (Some(source), None) => Some(source),
            _ => None,
        }
    }

    /// Whether the source refers to the pipeline owning the trigger.
    pub fn references_self(&self) -> bool {
        self.pipeline.as_ref().is_some_and(|t| t.name == SELF_REFERENCE)
            || self.release.as_ref().is_some_and(|t| t.name == SELF_REFERENCE)
            || self.github.as_ref().is_some_and(|t| t.repository == SELF_REFERENCE)
            || self.bitbucket.as_ref().is_some_and(|t| t.repository == SELF_REFERENCE)
    }

    /// Fills source and action defaults; `target_name` is the owning release
    /// or bot and is empty for build triggers.
    pub fn set_defaults(
        &mut self,
        preferences: &Preferences,
        context: TriggerContext,
        target_name: &str,
    ) {
        if let Some(t) = &mut self.pipeline {
            t.set_defaults();
        }
        if let Some(t) = &mut self.release {
            t.set_defaults();
        }
        if let Some(t) = &mut self.git {
            t.set_defaults();
        }
        if let Some(t) = &mut self.github {
            t.set_defaults();
        }
        if let Some(t) = &mut self.bitbucket {
            t.set_defaults();
        }

        match context {
            TriggerContext::Build => self
                .build_action
                .get_or_insert_with(TriggerBuildAction::default)
                .set_defaults(preferences),
            TriggerContext::Release => {
                let source_is_self = self.references_self();
                self.release_action
                    .get_or_insert_with(TriggerReleaseAction::default)
                    .set_defaults(target_name, source_is_self);
            }
            TriggerContext::Bot => self
                .bot_action
                .get_or_insert_with(TriggerBotAction::default)
                .set_defaults(preferences, target_name),
        }
    }

    pub fn validate(&self, context: TriggerContext, target_name: &str) -> Result<()> {
        let owner = match context {
            TriggerContext::Build => "build".to_string(),
            _ => format!("{context} {target_name}"),
        };

        let sources: Vec<_> = self.sources().collect();
        let source = match sources.as_slice() {
            [source] => source,
            [] => {
                return Err(Error::validation(format!(
                    "Trigger for {owner} has no source; set one of pipeline, release, git, docker, cron, pubsub, github or bitbucket"
                )));
            }
            many => {
                let kinds: Vec<_> = many.iter().map(SourceRef::kind).collect();
                return Err(Error::validation(format!(
                    "Trigger for {owner} sets more than one source: {}",
                    kinds.join(", ")
                )));
            }
        };
        source
            .validate()
            .map_err(|e| Error::validation(format!("Trigger for {owner}: {}", message(e))))?;

        let declared = [
            (TriggerContext::Build, self.build_action.is_some()),
            (TriggerContext::Release, self.release_action.is_some()),
            (TriggerContext::Bot, self.bot_action.is_some()),
        ];
        for (action_context, is_set) in declared {
            if action_context != context && is_set {
                return Err(Error::validation(format!(
                    "Trigger for {owner} cannot use {} actions",
                    action_context.action_key()
                )));
            }
        }

        let action = match context {
            TriggerContext::Build => self.build_action.as_ref().map(TriggerBuildAction::validate),
            TriggerContext::Release => self
                .release_action
                .as_ref()
                .map(|a| a.validate(target_name)),
            TriggerContext::Bot => self.bot_action.as_ref().map(|a| a.validate(target_name)),
        };
        match action {
            Some(result) => result,
            None => Err(Error::validation(format!(
                "Trigger for {owner} has no {} action",
                context.action_key()
            ))),
        }
    }

    /// Whether `event` satisfies this trigger's source filters.
    ///
    /// Never fails; a misconfigured filter simply does not fire.
    pub fn fires(&self, event: &Event) -> bool {
        self.source().is_some_and(|source| source.fires(event))
    }

    /// Rewrites every literal `self` in the source to `pipeline_name`.
    pub fn replace_self(&mut self, pipeline_name: &str) {
        let targets = [
            self.pipeline.as_mut().map(|t| &mut t.name),
            self.release.as_mut().map(|t| &mut t.name),
            self.github.as_mut().map(|t| &mut t.repository),
            self.bitbucket.as_mut().map(|t| &mut t.repository),
        ];
        for value in targets.into_iter().flatten() {
            if *value == SELF_REFERENCE {
                *value = pipeline_name.to_string();
            }
        }
    }
}

fn message(error: Error) -> String {
    match error {
        Error::Validation(message) | Error::Decode(message) => message,
        other => other.to_string(),
    }
}
