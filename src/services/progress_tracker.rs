use std::collections::BTreeMap;

use tracing::debug;

use crate::models::analysis::Category;
use crate::models::progress::{
    CompletionStatus, EntryScores, FeedbackSnapshot, LearningMetrics, ProgressEntry, TrendPoint,
};
use crate::models::recommendation::{Priority, Recommendation};

const AREA_LIMIT: usize = 3;
const RECENT_FEEDBACK_LIMIT: usize = 5;
const SKILL_SUGGESTION_FLOOR: f64 = 0.4;
const SKILL_SUGGESTION_CEILING: f64 = 0.7;

pub const SKILL_VISUAL_HIERARCHY: &str = "visual_hierarchy";
pub const SKILL_COLOR_HARMONY: &str = "color_harmony";
pub const SKILL_COMPOSITION: &str = "composition";
pub const SKILL_ILLUSTRATION: &str = "illustration_technique";
pub const SKILL_TYPOGRAPHY: &str = "typography";

/// Order in which skill suggestions are emitted.
const SKILL_ORDER: [&str; 5] = [
    SKILL_VISUAL_HIERARCHY,
    SKILL_COLOR_HARMONY,
    SKILL_COMPOSITION,
    SKILL_ILLUSTRATION,
    SKILL_TYPOGRAPHY,
];

/// Recompute every learning metric from the full history. The result does not
/// depend on the order of `history`.
pub fn compute_metrics(history: &[ProgressEntry]) -> LearningMetrics {
    // Chronological order fixes float summation order too.
    let mut scored: Vec<(&ProgressEntry, &EntryScores)> = history
        .iter()
        .filter_map(|entry| entry.results.as_ref().map(|scores| (entry, scores)))
        .collect();
    scored.sort_by(|a, b| {
        a.0.recorded_at
            .cmp(&b.0.recorded_at)
            .then_with(|| a.0.id.cmp(&b.0.id))
    });

    let completed_resources = history
        .iter()
        .filter(|entry| entry.completion_status == CompletionStatus::Completed)
        .count();

    let average_score = average(scored.iter().map(|(_, scores)| scores.overall));

    let (strongest_areas, areas_for_improvement) = if scored.is_empty() {
        (Vec::new(), Vec::new())
    } else {
        let category_means: Vec<(Category, f64)> = Category::ALL
            .iter()
            .map(|category| {
                (
                    *category,
                    average(scored.iter().map(|(_, scores)| scores.category(*category))),
                )
            })
            .collect();
        (
            rank_areas(&category_means, true),
            rank_areas(&category_means, false),
        )
    };

    let learning_trend = learning_trend(&scored);
    let recent_feedback = recent_feedback(history);
    let skill_levels = skill_levels(&scored);
    let recommendations = recommendations(&areas_for_improvement, &skill_levels);

    debug!(
        target: "app::progress",
        entries = history.len(),
        scored = scored.len(),
        average_score,
        "learning metrics recomputed"
    );

    LearningMetrics {
        completed_resources,
        total_resources: history.len(),
        average_score,
        strongest_areas,
        areas_for_improvement,
        learning_trend,
        recent_feedback,
        skill_levels,
        recommendations,
    }
}

/// Category with the highest score; ties go to the earlier declared category.
pub fn dominant_category(scores: &EntryScores) -> Category {
    let mut best = Category::Composition;
    for category in &Category::ALL[1..] {
        if scores.category(*category) > scores.category(best) {
            best = *category;
        }
    }
    best
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

// Stable sort keeps declaration order among equal means.
fn rank_areas(means: &[(Category, f64)], descending: bool) -> Vec<Category> {
    let mut ranked = means.to_vec();
    if descending {
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    } else {
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    }
    ranked
        .into_iter()
        .take(AREA_LIMIT)
        .map(|(category, _)| category)
        .collect()
}

// `scored` is already chronological.
fn learning_trend(scored: &[(&ProgressEntry, &EntryScores)]) -> Vec<TrendPoint> {
    scored
        .iter()
        .copied()
        .map(|(entry, scores)| TrendPoint {
            date: entry.recorded_at,
            score: scores.overall,
            category: dominant_category(scores),
        })
        .collect()
}

fn recent_feedback(history: &[ProgressEntry]) -> Vec<FeedbackSnapshot> {
    let mut with_feedback: Vec<&ProgressEntry> = history
        .iter()
        .filter(|entry| entry.feedback.is_some())
        .collect();
    with_feedback.sort_by(|a, b| {
        b.recorded_at
            .cmp(&a.recorded_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    with_feedback
        .into_iter()
        .take(RECENT_FEEDBACK_LIMIT)
        .filter_map(|entry| {
            entry.feedback.clone().map(|feedback| FeedbackSnapshot {
                resource_id: entry.resource_id.clone(),
                feedback,
                date: entry.recorded_at,
            })
        })
        .collect()
}

fn skill_levels(scored: &[(&ProgressEntry, &EntryScores)]) -> BTreeMap<String, f64> {
    let mut samples: BTreeMap<&'static str, Vec<f64>> =
        SKILL_ORDER.iter().map(|skill| (*skill, Vec::new())).collect();

    for (_, scores) in scored {
        let mut push = |skill: &'static str, value: f64| {
            if let Some(values) = samples.get_mut(skill) {
                values.push(value);
            }
        };
        push(
            SKILL_VISUAL_HIERARCHY,
            (scores.composition + scores.technique) / 2.0,
        );
        push(SKILL_COLOR_HARMONY, scores.color);
        push(
            SKILL_COMPOSITION,
            scores.composition * 0.7 + scores.color * 0.3,
        );
        push(SKILL_ILLUSTRATION, scores.technique);
        if let Some(typography) = scores.typography {
            push(SKILL_TYPOGRAPHY, typography);
        }
    }

    samples
        .into_iter()
        .map(|(skill, values)| (skill.to_string(), average(values.into_iter())))
        .collect()
}

fn recommendations(
    areas_for_improvement: &[Category],
    skill_levels: &BTreeMap<String, f64>,
) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = areas_for_improvement
        .iter()
        .map(|area| Recommendation::new(area.as_str(), area_suggestion(*area), Priority::High))
        .collect();

    // The map iterates alphabetically; suggestions follow SKILL_ORDER.
    for skill in SKILL_ORDER {
        let Some(level) = skill_levels.get(skill) else {
            continue;
        };
        if *level > SKILL_SUGGESTION_FLOOR && *level < SKILL_SUGGESTION_CEILING {
            recommendations.push(Recommendation::new(
                skill,
                skill_suggestion(skill),
                Priority::Medium,
            ));
        }
    }

    recommendations
}

fn area_suggestion(area: Category) -> &'static str {
    match area {
        Category::Composition => "Work through composition exercises and core design principles",
        Category::Color => "Practice color theory and palette harmony",
        Category::Technique => "Strengthen fundamental illustration techniques",
    }
}

fn skill_suggestion(skill: &str) -> &'static str {
    match skill {
        SKILL_VISUAL_HIERARCHY => "Refine the ordering and emphasis of visual elements",
        SKILL_COLOR_HARMONY => "Build palettes and experiment with color combinations",
        SKILL_COMPOSITION => "Apply balance and proportion in composition studies",
        SKILL_ILLUSTRATION => "Experiment with different illustration techniques",
        SKILL_TYPOGRAPHY => "Study font pairing and typographic hierarchy",
        _ => "Practice targeted exercises for this skill",
    }
}
