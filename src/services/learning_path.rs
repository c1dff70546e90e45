use tracing::debug;

use crate::models::learning_path::{LearningPath, Milestone, ProgressStats};

const MILESTONES: [u32; 4] = [25, 50, 75, 100];

/// Completion counts, time estimates and the next milestone for a path.
///
/// Remaining time assumes each unfinished resource takes the path's mean
/// resource duration. A path without resources has no milestone.
pub fn progress_stats(path: &LearningPath) -> ProgressStats {
    let total_topics = path.topics.len();
    let completed_topics = path.topics.iter().filter(|topic| topic.completed).count();

    let total_resources = path.resources().count();
    let completed_resources = path.resources().filter(|resource| resource.completed).count();
    let total_minutes: u64 = path
        .resources()
        .map(|resource| u64::from(resource.duration_minutes))
        .sum();

    let remaining_minutes = if total_resources == 0 {
        0
    } else {
        let remaining = (total_resources - completed_resources) as f64;
        (remaining * total_minutes as f64 / total_resources as f64).round() as u64
    };

    let last_activity = path
        .resources()
        .filter(|resource| resource.completed)
        .filter_map(|resource| resource.completed_at)
        .max();

    let next_milestone = next_milestone(completed_resources, total_resources);

    debug!(
        target: "app::progress",
        path_id = %path.id,
        completed_resources,
        total_resources,
        remaining_minutes,
        "learning path progress computed"
    );

    ProgressStats {
        total_topics,
        completed_topics,
        total_resources,
        completed_resources,
        total_minutes,
        remaining_minutes,
        last_activity,
        next_milestone,
    }
}

// First milestone strictly above the current percentage, compared in integers.
fn next_milestone(completed: usize, total: usize) -> Option<Milestone> {
    if total == 0 {
        return None;
    }

    MILESTONES
        .iter()
        .copied()
        .find(|percent| *percent as usize * total > completed * 100)
        .map(|percent| {
            let needed = (percent as usize * total).div_ceil(100);
            Milestone {
                percent,
                title: format!("{percent}% complete"),
                remaining_items: needed.saturating_sub(completed),
            }
        })
}

/// Human-readable remaining time, e.g. `45 minutes` or `2 hours 5 minutes`.
pub fn format_remaining(minutes: u64) -> String {
    fn unit(value: u64, singular: &str) -> String {
        if value == 1 {
            format!("1 {singular}")
        } else {
            format!("{value} {singular}s")
        }
    }

    if minutes < 60 {
        return unit(minutes, "minute");
    }

    let hours = minutes / 60;
    match minutes % 60 {
        0 => unit(hours, "hour"),
        rest => format!("{} {}", unit(hours, "hour"), unit(rest, "minute")),
    }
}
