use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Video,
    Article,
    Exercise,
    Book,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningResource {
    pub id: String,
    pub title: String,
    pub kind: ResourceKind,
    pub duration_minutes: u32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub resources: Vec<LearningResource>,
}

/// A curated sequence of topics, each with its own study resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

impl LearningPath {
    pub fn resources(&self) -> impl Iterator<Item = &LearningResource> {
        self.topics.iter().flat_map(|topic| topic.resources.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub percent: u32,
    pub title: String,
    pub remaining_items: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub total_topics: usize,
    pub completed_topics: usize,
    pub total_resources: usize,
    pub completed_resources: usize,
    pub total_minutes: u64,
    pub remaining_minutes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_milestone: Option<Milestone>,
}
