use crate::error::{AppError, AppResult};
use crate::models::analysis::Category;
use crate::models::feedback::{Difficulty, FeedbackInput, LearningContext, Sentiment};
use crate::models::progress::{EntryScores, ProgressFeedback};

const RATING_WEIGHT: f64 = 0.4;
const COMMENT_WEIGHT: f64 = 0.3;
const CONTEXT_WEIGHT: f64 = 0.3;
const POSITIVE_CUTOFF: f64 = 0.6;
const NEGATIVE_CUTOFF: f64 = 0.4;
const STRONG_TAG: f64 = 0.7;
const WEAK_TAG: f64 = 0.4;

const POSITIVE_WORDS: [&str; 6] = ["good", "great", "excellent", "helpful", "useful", "clear"];
const NEGATIVE_WORDS: [&str; 6] = ["bad", "hard", "confusing", "insufficient", "weak", "pointless"];

const STRENGTH_EXPANSIONS: [(&str, &str); 4] = [
    ("color", "Color use and harmony"),
    ("composition", "Composition and visual hierarchy"),
    ("technique", "Technical execution and precision"),
    ("creativ", "Creative approach and originality"),
];

const IMPROVEMENT_HINTS: [(&str, &str); 3] = [
    ("color", "Work through color theory studies"),
    ("composition", "Review the core design principles"),
    ("technique", "Repeat fundamental technique drills"),
];

pub fn validate(input: &FeedbackInput) -> AppResult<()> {
    if input.user_id.trim().is_empty() || input.resource_id.trim().is_empty() {
        return Err(AppError::invalid_input(
            "feedback requires a user id and resource id",
        ));
    }
    if !(1..=5).contains(&input.rating) {
        return Err(AppError::invalid_input("rating must be between 1 and 5"));
    }
    if let Some(context) = &input.learning_context {
        if !(0.0..=1.0).contains(&context.comprehension) {
            return Err(AppError::invalid_input("comprehension must be within [0, 1]"));
        }
    }
    Ok(())
}

/// Weighted blend of rating, comment tone and learning context.
pub fn sentiment_score(input: &FeedbackInput) -> f64 {
    let mut score = f64::from(input.rating) / 5.0 * RATING_WEIGHT;

    if let Some(comments) = &input.comments {
        score += comment_sentiment(comments) * COMMENT_WEIGHT;
    }
    if let Some(context) = &input.learning_context {
        score += context_score(context) * CONTEXT_WEIGHT;
    }

    score
}

pub fn classify_sentiment(score: f64) -> Sentiment {
    if score > POSITIVE_CUTOFF {
        Sentiment::Positive
    } else if score < NEGATIVE_CUTOFF {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

pub fn comment_sentiment(comment: &str) -> f64 {
    let mut score: f64 = 0.5;
    for word in comment
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
    {
        let word = word.to_lowercase();
        if POSITIVE_WORDS.contains(&word.as_str()) {
            score += 0.1;
        }
        if NEGATIVE_WORDS.contains(&word.as_str()) {
            score -= 0.1;
        }
    }
    score.clamp(0.0, 1.0)
}

fn context_score(context: &LearningContext) -> f64 {
    let mut score = 0.5;
    match context.difficulty {
        Difficulty::Appropriate => score += 0.2,
        Difficulty::TooDifficult => score -= 0.2,
        Difficulty::TooEasy => {}
    }
    score += (context.comprehension - 0.5) * 0.2;
    score -= 0.1 * context.technical_issues.len().min(3) as f64;
    score.clamp(0.0, 1.0)
}

pub fn expand_strength(strength: &str) -> String {
    let lowered = strength.to_lowercase();
    STRENGTH_EXPANSIONS
        .iter()
        .find(|(key, _)| lowered.contains(key))
        .map(|(_, expansion)| expansion.to_string())
        .unwrap_or_else(|| strength.to_string())
}

pub fn annotate_improvement(improvement: &str) -> String {
    let lowered = improvement.to_lowercase();
    match IMPROVEMENT_HINTS.iter().find(|(key, _)| lowered.contains(key)) {
        Some((_, hint)) => format!("{improvement} - Suggestion: {hint}"),
        None => improvement.to_string(),
    }
}

pub fn score_tags(scores: &EntryScores) -> Vec<String> {
    let mut tags = Vec::new();
    for category in Category::ALL {
        let value = scores.category(category);
        if value > STRONG_TAG {
            tags.push(format!("strong-{}", category.as_str()));
        }
        if value < WEAK_TAG {
            tags.push(format!("{}-needs-work", category.as_str()));
        }
    }
    tags
}

/// Build the stored feedback record, enriching free text and tagging it with
/// the scores of the analysis it refers to.
pub fn enrich(input: &FeedbackInput, scores: Option<&EntryScores>) -> ProgressFeedback {
    let sentiment = classify_sentiment(sentiment_score(input));

    let mut tags = input.tags.clone();
    if let Some(scores) = scores {
        for tag in score_tags(scores) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }

    ProgressFeedback {
        rating: input.rating,
        comments: input
            .comments
            .as_ref()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()),
        strengths: input.strengths.iter().map(|s| expand_strength(s)).collect(),
        improvements: input
            .improvements
            .iter()
            .map(|s| annotate_improvement(s))
            .collect(),
        sentiment: Some(sentiment),
        tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(rating: u8, comments: Option<&str>) -> FeedbackInput {
        FeedbackInput {
            user_id: "user-1".into(),
            resource_id: "resource-1".into(),
            rating,
            comments: comments.map(str::to_string),
            strengths: vec![],
            improvements: vec![],
            tags: vec![],
            learning_context: None,
        }
    }

    #[test]
    fn rating_must_be_in_range() {
        assert!(validate(&input(0, None)).is_err());
        assert!(validate(&input(6, None)).is_err());
        assert!(validate(&input(3, None)).is_ok());
    }

    #[test]
    fn comment_words_shift_sentiment() {
        assert!((comment_sentiment("Great and helpful!") - 0.7).abs() < 1e-9);
        assert!((comment_sentiment("confusing, bad") - 0.3).abs() < 1e-9);
        assert_eq!(comment_sentiment("neutral words only"), 0.5);
    }

    #[test]
    fn sentiment_blends_components() {
        let mut feedback = input(5, Some("great"));
        feedback.learning_context = Some(LearningContext {
            difficulty: Difficulty::Appropriate,
            time_spent_seconds: 900,
            comprehension: 1.0,
            technical_issues: vec![],
        });
        // 0.4 + 0.6 * 0.3 + 0.8 * 0.3
        assert!((sentiment_score(&feedback) - 0.82).abs() < 1e-9);
        assert_eq!(classify_sentiment(sentiment_score(&feedback)), Sentiment::Positive);

        assert_eq!(classify_sentiment(sentiment_score(&input(1, None))), Sentiment::Negative);
        assert_eq!(classify_sentiment(0.5), Sentiment::Neutral);
    }

    #[test]
    fn enrich_expands_text_and_adds_score_tags() {
        let mut feedback = input(4, Some("  "));
        feedback.strengths = vec!["nice color choices".into(), "bold".into()];
        feedback.improvements = vec!["technique on edges".into()];
        feedback.tags = vec!["poster".into()];

        let scores = EntryScores {
            overall: 0.6,
            composition: 0.8,
            color: 0.5,
            technique: 0.3,
            typography: None,
        };
        let enriched = enrich(&feedback, Some(&scores));

        assert_eq!(enriched.comments, None);
        assert_eq!(enriched.strengths[0], "Color use and harmony");
        assert_eq!(enriched.strengths[1], "bold");
        assert_eq!(
            enriched.improvements[0],
            "technique on edges - Suggestion: Repeat fundamental technique drills"
        );
        assert_eq!(
            enriched.tags,
            vec![
                "poster".to_string(),
                "strong-composition".to_string(),
                "technique-needs-work".to_string()
            ]
        );
    }
}
