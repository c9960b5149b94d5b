//! Inbound events that triggers are evaluated against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Container for any event; at most one payload is expected to be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fired: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<PipelineEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<ReleaseEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<CronEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubsub: Option<PubSubEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitbucket: Option<BitbucketEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual: Option<ManualEvent>,
}

/// A build of some pipeline started or finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineEvent {
    pub build_version: String,
    pub repo_source: String,
    pub repo_owner: String,
    pub repo_name: String,
    #[serde(rename = "repoBranch")]
    pub branch: String,
    pub status: String,
    pub event: String,
}

impl PipelineEvent {
    pub fn pipeline_name(&self) -> String {
        pipeline_name(&self.repo_source, &self.repo_owner, &self.repo_name)
    }
}

/// A release of some pipeline started or finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReleaseEvent {
    pub release_version: String,
    pub repo_source: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub target: String,
    pub status: String,
    pub event: String,
}

impl ReleaseEvent {
    pub fn pipeline_name(&self) -> String {
        pipeline_name(&self.repo_source, &self.repo_owner, &self.repo_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitEvent {
    pub event: String,
    pub repository: String,
    pub branch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerEvent {
    pub event: String,
    pub image: String,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronEvent {
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManualEvent {
    #[serde(rename = "userID")]
    pub user_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PubSubEvent {
    pub project: String,
    pub topic: String,
    pub message: PubSubMessage,
}

/// Push message as delivered by a pub/sub subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PubSubMessage {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub data: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub publish_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubEvent {
    pub event: String,
    pub repository: String,
    pub delivery: String,
    pub payload: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BitbucketEvent {
    pub event: String,
    pub repository: String,
    #[serde(rename = "hookUUID")]
    pub hook_uuid: String,
    #[serde(rename = "requestUUID")]
    pub request_uuid: String,
    pub attempt_number: String,
    pub payload: String,
}

/// Fully-qualified `source/owner/name` of a pipeline.
pub fn pipeline_name(source: &str, owner: &str, name: &str) -> String {
    format!("{source}/{owner}/{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_event_name() {
        let event = PipelineEvent {
            repo_source: "github.com".to_string(),
            repo_owner: "keel".to_string(),
            repo_name: "keel-api".to_string(),
            ..Default::default()
        };
        assert_eq!(event.pipeline_name(), "github.com/keel/keel-api");
    }

    #[test]
    fn test_decode_pubsub_push_message() {
        let event: Event = serde_json::from_str(
            r#"{
                "pubsub": {
                    "project": "my-project",
                    "topic": "my-topic",
                    "message": {
                        "attributes": {"origin": "scheduler"},
                        "data": "aGVsbG8=",
                        "messageId": "136969346945",
                        "publishTime": "2019-04-05T11:10:00Z"
                    }
                }
            }"#,
        )
        .unwrap();

        let pubsub = event.pubsub.unwrap();
        assert_eq!(pubsub.topic, "my-topic");
        assert_eq!(pubsub.message.message_id, "136969346945");
        assert_eq!(pubsub.message.attributes["origin"], "scheduler");
    }

    #[test]
    fn test_decode_cron_event() {
        let event: Event = serde_json::from_str(r#"{"cron": {"time": "2019-04-05T11:10:00Z"}}"#).unwrap();
        assert_eq!(event.cron.unwrap().time.to_rfc3339(), "2019-04-05T11:10:00+00:00");
    }
}
