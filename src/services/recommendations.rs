use serde_json::json;
use tracing::debug;

use crate::error::AppResult;
use crate::models::analysis::{Category, ModelOutput};
use crate::models::recommendation::{Priority, Recommendation};
use crate::models::settings::RecommendationThresholds;
use crate::services::scoring::{ensure_unit_interval, mean_score};

struct ThresholdRule {
    category: Category,
    metric: &'static str,
    priority: Priority,
    suggestion: &'static str,
}

/// Evaluated in this order; output order follows it regardless of severity.
const RULES: [ThresholdRule; 3] = [
    ThresholdRule {
        category: Category::Composition,
        metric: "balance",
        priority: Priority::High,
        suggestion: "Visual weight is unevenly distributed; arrange elements for a more balanced layout",
    },
    ThresholdRule {
        category: Category::Color,
        metric: "harmony",
        priority: Priority::Medium,
        suggestion: "Palette harmony is weak; try complementary colors",
    },
    ThresholdRule {
        category: Category::Technique,
        metric: "precision",
        priority: Priority::Medium,
        suggestion: "Line control can improve; practice precise line exercises",
    },
];

fn threshold_for(thresholds: &RecommendationThresholds, category: Category) -> f64 {
    match category {
        Category::Composition => thresholds.composition_balance,
        Category::Color => thresholds.color_harmony,
        Category::Technique => thresholds.technique_precision,
    }
}

pub fn recommend(output: &ModelOutput) -> AppResult<Vec<Recommendation>> {
    recommend_with(&RecommendationThresholds::default(), output)
}

/// Emit one recommendation per rule whose sub-metric falls strictly below its
/// threshold. A missing sub-metric is judged by the category mean; an empty
/// category never fires. Any non-finite or out-of-range value is rejected.
pub fn recommend_with(
    thresholds: &RecommendationThresholds,
    output: &ModelOutput,
) -> AppResult<Vec<Recommendation>> {
    for category in Category::ALL {
        for (name, value) in output.metrics(category).iter() {
            ensure_unit_interval(*value, || {
                json!({ "category": category.as_str(), "metric": name, "value": value })
            })?;
        }
    }

    let mut recommendations = Vec::new();

    for rule in &RULES {
        let metrics = output.metrics(rule.category);
        let value = match metrics.get(rule.metric) {
            Some(value) => value,
            None if metrics.is_empty() => continue,
            None => mean_score(rule.category, metrics)?,
        };

        if value < threshold_for(thresholds, rule.category) {
            debug!(
                target: "app::recommendations",
                category = %rule.category,
                metric = rule.metric,
                value,
                priority = %rule.priority,
                "recommendation threshold fired"
            );
            recommendations.push(Recommendation::new(
                rule.category.as_str(),
                rule.suggestion,
                rule.priority,
            ));
        }
    }

    Ok(recommendations)
}
