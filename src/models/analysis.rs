use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::recommendation::Recommendation;

/// Grouping of related design sub-metrics. Declaration order is the
/// evaluation and tie-break order used throughout scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Composition,
    Color,
    Technique,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Composition, Category::Color, Category::Technique];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Composition => "composition",
            Category::Color => "color",
            Category::Technique => "technique",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named sub-metric values for one category, e.g. `balance`, `rhythm`, `unity`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryMetrics(BTreeMap<String, f64>);

impl CategoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, f64> {
        self.0.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for CategoryMetrics {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Raw sub-metric vectors produced by the inference backend for one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub composition: CategoryMetrics,
    pub color: CategoryMetrics,
    pub technique: CategoryMetrics,
}

impl ModelOutput {
    pub fn metrics(&self, category: Category) -> &CategoryMetrics {
        match category {
            Category::Composition => &self.composition,
            Category::Color => &self.color,
            Category::Technique => &self.technique,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResult {
    pub score: f64,
    #[serde(default)]
    pub findings: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallResult {
    pub score: f64,
    pub summary: String,
    #[serde(default)]
    pub improvements: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl LearningLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LearningLevel::Beginner => "beginner",
            LearningLevel::Intermediate => "intermediate",
            LearningLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for LearningLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete critique of one uploaded design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignAnalysis {
    pub id: String,
    pub user_id: String,
    pub resource_id: String,
    pub image_digest: String,
    pub composition: CategoryResult,
    pub color: CategoryResult,
    pub technique: CategoryResult,
    pub overall: OverallResult,
    pub level: LearningLevel,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typography: Option<f64>,
    pub created_at: String,
}

impl DesignAnalysis {
    pub fn category(&self, category: Category) -> &CategoryResult {
        match category {
            Category::Composition => &self.composition,
            Category::Color => &self.color,
            Category::Technique => &self.technique,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadFormat {
    Jpeg,
    Png,
    Gif,
}

impl UploadFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            UploadFormat::Jpeg => "image/jpeg",
            UploadFormat::Png => "image/png",
            UploadFormat::Gif => "image/gif",
        }
    }
}

/// Raw upload as received from the caller.
#[derive(Debug, Clone)]
pub struct DesignUpload {
    pub user_id: String,
    pub resource_id: Option<String>,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Upload that passed validation and is ready to be sent to a model backend.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub format: UploadFormat,
    pub width: u32,
    pub height: u32,
    pub digest: String,
    pub bytes: Vec<u8>,
}
