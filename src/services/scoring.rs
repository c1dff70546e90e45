use serde_json::json;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::analysis::{
    Category, CategoryMetrics, CategoryResult, LearningLevel, OverallResult,
};
use crate::models::settings::{LevelCutoffs, ScoringConfig};

const STRONG_METRIC: f64 = 0.7;
const ADEQUATE_METRIC: f64 = 0.4;
const WEIGHT_TOLERANCE: f64 = 1e-6;

struct SuggestionRule {
    category: Category,
    metric: &'static str,
    below: f64,
    text: &'static str,
}

const SUGGESTION_RULES: &[SuggestionRule] = &[
    SuggestionRule {
        category: Category::Composition,
        metric: "balance",
        below: 0.6,
        text: "Distribute visual weight more evenly across the canvas",
    },
    SuggestionRule {
        category: Category::Composition,
        metric: "unity",
        below: 0.5,
        text: "Align color scheme and typography so the elements read as one design",
    },
    SuggestionRule {
        category: Category::Color,
        metric: "harmony",
        below: 0.5,
        text: "Try complementary colors to strengthen the palette",
    },
    SuggestionRule {
        category: Category::Color,
        metric: "contrast",
        below: 0.5,
        text: "Increase contrast between foreground and background",
    },
    SuggestionRule {
        category: Category::Technique,
        metric: "precision",
        below: 0.7,
        text: "Practice straight-line and contour exercises to improve line control",
    },
    SuggestionRule {
        category: Category::Technique,
        metric: "consistency",
        below: 0.6,
        text: "Keep stroke and tone treatment consistent across the piece",
    },
];

/// Mean of the sub-metric values. Every value must be finite and in [0,1].
pub fn mean_score(category: Category, metrics: &CategoryMetrics) -> AppResult<f64> {
    if metrics.is_empty() {
        return Err(AppError::invalid_input_with_details(
            format!("{category} metrics are empty"),
            json!({ "category": category.as_str() }),
        ));
    }

    let mut total = 0.0;
    for (name, value) in metrics.iter() {
        ensure_unit_interval(*value, || {
            json!({ "category": category.as_str(), "metric": name, "value": value })
        })?;
        total += value;
    }

    Ok(total / metrics.len() as f64)
}

/// Reduce one category's sub-metrics to a scored result with findings and
/// templated suggestions.
pub fn score(category: Category, metrics: &CategoryMetrics) -> AppResult<CategoryResult> {
    let score = mean_score(category, metrics)?;

    let findings = metrics
        .iter()
        .map(|(name, value)| format!("{name}: {} ({value:.2})", metric_label(*value)))
        .collect();

    let suggestions = SUGGESTION_RULES
        .iter()
        .filter(|rule| rule.category == category)
        .filter(|rule| matches!(metrics.get(rule.metric), Some(value) if value < rule.below))
        .map(|rule| rule.text.to_string())
        .collect();

    debug!(target: "app::scoring", category = %category, score, "category scored");

    Ok(CategoryResult {
        score,
        findings,
        suggestions,
    })
}

/// Combine the three category results with the default weights.
pub fn aggregate(
    composition: &CategoryResult,
    color: &CategoryResult,
    technique: &CategoryResult,
) -> AppResult<OverallResult> {
    aggregate_with(&ScoringConfig::default(), composition, color, technique)
}

pub fn aggregate_with(
    config: &ScoringConfig,
    composition: &CategoryResult,
    color: &CategoryResult,
    technique: &CategoryResult,
) -> AppResult<OverallResult> {
    let weights = &config.weights;
    if (weights.total() - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(AppError::invalid_input_with_details(
            "overall weights must sum to 1",
            json!({ "total": weights.total() }),
        ));
    }

    let scored = [
        (Category::Composition, composition),
        (Category::Color, color),
        (Category::Technique, technique),
    ];
    for (category, result) in &scored {
        ensure_unit_interval(result.score, || {
            json!({ "category": category.as_str(), "score": result.score })
        })?;
    }

    let raw = composition.score * weights.composition
        + color.score * weights.color
        + technique.score * weights.technique;
    // Only rounding noise can push an in-range weighted sum outside [0,1].
    let score = raw.clamp(0.0, 1.0);
    let level = classify_level_with(&config.level_cutoffs, score);

    let strongest = pick(&scored, |candidate, best| candidate > best);
    let weakest = pick(&scored, |candidate, best| candidate < best);
    let summary = format!(
        "Overall score {score:.2} ({level}). Strongest area: {}; weakest area: {}.",
        strongest.as_str(),
        weakest.as_str()
    );

    let mut lagging: Vec<_> = scored
        .iter()
        .filter(|(_, result)| result.score < config.level_cutoffs.advanced)
        .collect();
    lagging.sort_by(|a, b| a.1.score.total_cmp(&b.1.score));

    let mut improvements = Vec::new();
    for (category, result) in lagging {
        if result.suggestions.is_empty() {
            improvements.push(format!("Keep practicing {} fundamentals", category.as_str()));
        } else {
            improvements.extend(result.suggestions.iter().cloned());
        }
    }

    Ok(OverallResult {
        score,
        summary,
        improvements,
    })
}

pub fn classify_level(score: f64) -> LearningLevel {
    classify_level_with(&LevelCutoffs::default(), score)
}

/// Each band includes its lower bound.
pub fn classify_level_with(cutoffs: &LevelCutoffs, score: f64) -> LearningLevel {
    if score >= cutoffs.advanced {
        LearningLevel::Advanced
    } else if score >= cutoffs.intermediate {
        LearningLevel::Intermediate
    } else {
        LearningLevel::Beginner
    }
}

pub(crate) fn ensure_unit_interval(
    value: f64,
    details: impl FnOnce() -> serde_json::Value,
) -> AppResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AppError::invalid_input_with_details(
            "score must be within [0, 1]",
            details(),
        ))
    }
}

fn metric_label(value: f64) -> &'static str {
    if value >= STRONG_METRIC {
        "strong"
    } else if value >= ADEQUATE_METRIC {
        "adequate"
    } else {
        "weak"
    }
}

// Ties keep the earlier category in declaration order.
fn pick(scored: &[(Category, &CategoryResult)], better: impl Fn(f64, f64) -> bool) -> Category {
    let mut best = scored[0];
    for candidate in &scored[1..] {
        if better(candidate.1.score, best.1.score) {
            best = *candidate;
        }
    }
    best.0
}
