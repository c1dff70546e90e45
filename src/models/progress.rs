use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::analysis::{Category, DesignAnalysis};
use crate::models::feedback::Sentiment;
use crate::models::recommendation::Recommendation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl CompletionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionStatus::NotStarted => "not_started",
            CompletionStatus::InProgress => "in_progress",
            CompletionStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "not_started" => Ok(CompletionStatus::NotStarted),
            "in_progress" => Ok(CompletionStatus::InProgress),
            "completed" => Ok(CompletionStatus::Completed),
            other => Err(AppError::invalid_input(format!(
                "unknown completion status: {other}"
            ))),
        }
    }
}

/// Scores captured for a single analysis, in [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryScores {
    pub overall: f64,
    pub composition: f64,
    pub color: f64,
    pub technique: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typography: Option<f64>,
}

impl EntryScores {
    pub fn category(&self, category: Category) -> f64 {
        match category {
            Category::Composition => self.composition,
            Category::Color => self.color,
            Category::Technique => self.technique,
        }
    }
}

impl From<&DesignAnalysis> for EntryScores {
    fn from(analysis: &DesignAnalysis) -> Self {
        Self {
            overall: analysis.overall.score,
            composition: analysis.composition.score,
            color: analysis.color.score,
            technique: analysis.technique.score,
            typography: analysis.typography,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressFeedback {
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One row of a user's learning history. Scores never change after the
/// entry is appended; feedback may be attached later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub id: String,
    pub user_id: String,
    pub resource_id: String,
    pub recorded_at: DateTime<Utc>,
    pub completion_status: CompletionStatus,
    pub time_spent_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<EntryScores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<ProgressFeedback>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: DateTime<Utc>,
    pub score: f64,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSnapshot {
    pub resource_id: String,
    pub feedback: ProgressFeedback,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningMetrics {
    pub completed_resources: usize,
    pub total_resources: usize,
    pub average_score: f64,
    pub strongest_areas: Vec<Category>,
    pub areas_for_improvement: Vec<Category>,
    pub learning_trend: Vec<TrendPoint>,
    pub recent_feedback: Vec<FeedbackSnapshot>,
    pub skill_levels: BTreeMap<String, f64>,
    pub recommendations: Vec<Recommendation>,
}
