//! Trigger sources: what a trigger listens to, with per-source defaults,
//! validation and firing predicates.

use super::{filter, schedule};
use crate::error::{Error, Result};
use crate::event::{
    BitbucketEvent, CronEvent, DockerEvent, GitEvent, GithubEvent, PipelineEvent, PubSubEvent,
    ReleaseEvent,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Literal standing for the pipeline that owns the trigger.
pub const SELF_REFERENCE: &str = "self";

const DEFAULT_BRANCH_FILTER: &str = "master|main";
const FINISHED: &str = "finished";
const SUCCEEDED: &str = "succeeded";

/// Fires when a build of a pipeline starts or finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineTrigger {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub event: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
}

impl PipelineTrigger {
    pub fn set_defaults(&mut self) {
        if self.event.is_empty() {
            self.event = FINISHED.to_string();
        }
        if self.event == FINISHED && self.status.is_empty() {
            self.status = SUCCEEDED.to_string();
        }
        if self.branch.is_empty() {
            self.branch = DEFAULT_BRANCH_FILTER.to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.event.is_empty() {
            return Err(Error::validation("Set pipeline.event in your trigger to 'started' or 'finished'"));
        }
        if self.event == FINISHED && self.status.is_empty() {
            return Err(Error::validation(
                "Set pipeline.status in your trigger to 'succeeded' or 'failed' for event 'finished'",
            ));
        }
        if self.name.is_empty() {
            return Err(Error::validation(
                "Set pipeline.name in your trigger to a full qualified pipeline name, i.e. github.com/keel/keel-cli",
            ));
        }
        Ok(())
    }

    pub fn fires(&self, event: &PipelineEvent) -> bool {
        filter::matches(&self.event, &event.event)
            && filter::matches(&self.status, &event.status)
            && filter::names_match(&self.name, &event.pipeline_name())
            && filter::matches(&self.branch, &event.branch)
    }
}

/// Fires when a release of a pipeline starts or finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseTrigger {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub event: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
}

impl ReleaseTrigger {
    pub fn set_defaults(&mut self) {
        if self.event.is_empty() {
            self.event = FINISHED.to_string();
        }
        if self.event == FINISHED && self.status.is_empty() {
            self.status = SUCCEEDED.to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.event.is_empty() {
            return Err(Error::validation("Set release.event in your trigger to 'started' or 'finished'"));
        }
        if self.event == FINISHED && self.status.is_empty() {
            return Err(Error::validation(
                "Set release.status in your trigger to 'succeeded' or 'failed' for event 'finished'",
            ));
        }
        if self.name.is_empty() {
            return Err(Error::validation(
                "Set release.name in your trigger to a full qualified pipeline name, i.e. github.com/keel/keel-cli",
            ));
        }
        if self.target.is_empty() {
            return Err(Error::validation("Set release.target in your trigger to a release target name"));
        }
        Ok(())
    }

    pub fn fires(&self, event: &ReleaseEvent) -> bool {
        filter::matches(&self.event, &event.event)
            && filter::matches(&self.status, &event.status)
            && filter::names_match(&self.name, &event.pipeline_name())
            && filter::matches(&self.target, &event.target)
    }
}

/// Fires on changes to a git repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitTrigger {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub event: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
}

impl GitTrigger {
    pub fn set_defaults(&mut self) {
        if self.event.is_empty() {
            self.event = "push".to_string();
        }
        if self.branch.is_empty() {
            self.branch = DEFAULT_BRANCH_FILTER.to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.event.is_empty() {
            return Err(Error::validation("Set git.event in your trigger to 'push'"));
        }
        if self.repository.is_empty() {
            return Err(Error::validation(
                "Set git.repository in your trigger to a full qualified repository name, i.e. github.com/keel/keel-cli",
            ));
        }
        Ok(())
    }

    pub fn fires(&self, event: &GitEvent) -> bool {
        filter::matches(&self.event, &event.event)
            && filter::names_match(&self.repository, &event.repository)
            && filter::matches(&self.branch, &event.branch)
    }
}

/// Fires when a container image is pushed or updated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DockerTrigger {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub event: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
}

impl DockerTrigger {
    pub fn validate(&self) -> Result<()> {
        if self.image.is_empty() {
            return Err(Error::validation("Set docker.image in your trigger"));
        }
        Ok(())
    }

    pub fn fires(&self, event: &DockerEvent) -> bool {
        filter::matches(&self.event, &event.event)
            && filter::matches(&self.image, &event.image)
            && filter::matches(&self.tag, &event.tag)
    }
}

/// Fires on a standard five-field cron schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CronTrigger {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub schedule: String,
}

impl CronTrigger {
    pub fn validate(&self) -> Result<()> {
        if self.schedule.is_empty() {
            return Err(Error::validation("Set cron.schedule in your trigger, i.e. '*/5 * * * *'"));
        }
        schedule::parse(&self.schedule).map_err(Error::Validation)?;
        Ok(())
    }

    pub fn fires(&self, event: &CronEvent) -> bool {
        match schedule::parse(&self.schedule) {
            Ok(parsed) => schedule::is_due(&parsed, event.time),
            Err(e) => {
                debug!(schedule = %self.schedule, error = %e, "Cron trigger schedule does not parse");
                false
            }
        }
    }
}

/// Fires on messages published to a pub/sub topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PubSubTrigger {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub topic: String,
}

impl PubSubTrigger {
    pub fn validate(&self) -> Result<()> {
        if self.project.is_empty() {
            return Err(Error::validation("Set pubsub.project in your trigger"));
        }
        if self.topic.is_empty() {
            return Err(Error::validation("Set pubsub.topic in your trigger"));
        }
        Ok(())
    }

    pub fn fires(&self, event: &PubSubEvent) -> bool {
        // Both are mandatory, so an empty filter must not act as a wildcard.
        !self.project.is_empty()
            && !self.topic.is_empty()
            && filter::matches(&self.project, &event.project)
            && filter::matches(&self.topic, &event.topic)
    }
}

/// Fires on webhook events from a hosted repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryHookTrigger {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,
}

pub type GithubTrigger = RepositoryHookTrigger;
pub type BitbucketTrigger = RepositoryHookTrigger;

impl RepositoryHookTrigger {
    pub fn set_defaults(&mut self) {
        if self.repository.is_empty() {
            self.repository = SELF_REFERENCE.to_string();
        }
    }

    pub(crate) fn validate_as(&self, source: &str) -> Result<()> {
        if self.events.is_empty() {
            return Err(Error::validation(format!(
                "Set at least one event in {source}.events in your trigger"
            )));
        }
        if self.repository.is_empty() {
            return Err(Error::validation(format!(
                "Set {source}.repository in your trigger"
            )));
        }
        Ok(())
    }

    fn fires_for(&self, event: &str, repository: &str) -> bool {
        if !repository.is_empty() && !filter::names_match(&self.repository, repository) {
            return false;
        }
        self.events.iter().any(|e| e == event)
    }

    pub fn fires_github(&self, event: &GithubEvent) -> bool {
        self.fires_for(&event.event, &event.repository)
    }

    pub fn fires_bitbucket(&self, event: &BitbucketEvent) -> bool {
        self.fires_for(&event.event, &event.repository)
    }
}
