use serde::{Deserialize, Serialize};

pub const DEFAULT_COMPOSITION_WEIGHT: f64 = 0.4;
pub const DEFAULT_COLOR_WEIGHT: f64 = 0.3;
pub const DEFAULT_TECHNIQUE_WEIGHT: f64 = 0.3;

pub const DEFAULT_BALANCE_THRESHOLD: f64 = 0.6;
pub const DEFAULT_HARMONY_THRESHOLD: f64 = 0.5;
pub const DEFAULT_PRECISION_THRESHOLD: f64 = 0.7;

pub const DEFAULT_INTERMEDIATE_CUTOFF: f64 = 0.4;
pub const DEFAULT_ADVANCED_CUTOFF: f64 = 0.7;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallWeights {
    pub composition: f64,
    pub color: f64,
    pub technique: f64,
}

impl Default for OverallWeights {
    fn default() -> Self {
        Self {
            composition: DEFAULT_COMPOSITION_WEIGHT,
            color: DEFAULT_COLOR_WEIGHT,
            technique: DEFAULT_TECHNIQUE_WEIGHT,
        }
    }
}

impl OverallWeights {
    pub fn total(&self) -> f64 {
        self.composition + self.color + self.technique
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationThresholds {
    pub composition_balance: f64,
    pub color_harmony: f64,
    pub technique_precision: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            composition_balance: DEFAULT_BALANCE_THRESHOLD,
            color_harmony: DEFAULT_HARMONY_THRESHOLD,
            technique_precision: DEFAULT_PRECISION_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelCutoffs {
    pub intermediate: f64,
    pub advanced: f64,
}

impl Default for LevelCutoffs {
    fn default() -> Self {
        Self {
            intermediate: DEFAULT_INTERMEDIATE_CUTOFF,
            advanced: DEFAULT_ADVANCED_CUTOFF,
        }
    }
}

/// Tunable constants of the scoring pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: OverallWeights,
    #[serde(default)]
    pub thresholds: RecommendationThresholds,
    #[serde(default)]
    pub level_cutoffs: LevelCutoffs,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: OverallWeights::default(),
            thresholds: RecommendationThresholds::default(),
            level_cutoffs: LevelCutoffs::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfigUpdate {
    pub weights: Option<OverallWeights>,
    pub thresholds: Option<RecommendationThresholds>,
    pub level_cutoffs: Option<LevelCutoffs>,
    pub max_upload_bytes: Option<usize>,
}
