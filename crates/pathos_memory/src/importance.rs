//! Salience heuristics for incoming turns.

use pathos_core::appraisal::EmotionTag;

const SELF_REFERENCE: &[&str] = &["i ", "i'm", "im ", "my ", "me ", "mine "];
const PREFERENCES: &[&str] = &["i like", "i love", "i enjoy", "i hate", "i prefer"];
const PLANS: &[&str] = &["tomorrow", "next week", "in a year", "plan", "goal"];

/// Longest message excerpt kept in an LTM summary.
const SUMMARY_CHARS: usize = 140;

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// Salience hint in [0, 1] for a message.
///
/// Self-reference, stated preferences, plans and strong emotion raise it;
/// crisis turns are always near-maximal.
pub fn score_importance(text: &str, emotion: EmotionTag, flagged: bool) -> f32 {
    if flagged {
        return 0.95;
    }
    // Pad so a trailing "me"/"my" still matches the space-suffixed needles.
    let lower = format!("{} ", text.to_lowercase());
    let mut score = 0.2f32;

    if contains_any(&lower, SELF_REFERENCE) {
        score += 0.2;
    }
    if contains_any(&lower, PREFERENCES) {
        score += 0.2;
    }
    if contains_any(&lower, PLANS) {
        score += 0.1;
    }
    match emotion {
        EmotionTag::Sadness | EmotionTag::Anger | EmotionTag::Fear => score += 0.2,
        EmotionTag::Joy | EmotionTag::Gratitude => score += 0.15,
        EmotionTag::Surprise | EmotionTag::Disgust | EmotionTag::Neutral => {}
    }
    score.clamp(0.0, 1.0)
}

/// Compact LTM phrasing of a turn.
pub fn summarise(text: &str, emotion: EmotionTag, flagged: bool) -> String {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let cleaned = if cleaned.chars().count() > SUMMARY_CHARS {
        let cut: String = cleaned.chars().take(SUMMARY_CHARS).collect();
        format!("{}…", cut)
    } else {
        cleaned
    };

    if flagged {
        return format!("The user expressed a crisis/safety concern: \"{}\"", cleaned);
    }
    match emotion {
        EmotionTag::Sadness | EmotionTag::Anger | EmotionTag::Fear => {
            format!("The user felt {} about: \"{}\"", emotion, cleaned)
        }
        EmotionTag::Joy | EmotionTag::Gratitude => {
            format!("The user shared a positive moment ({}): \"{}\"", emotion, cleaned)
        }
        EmotionTag::Surprise | EmotionTag::Disgust | EmotionTag::Neutral => {
            format!("User said: \"{}\"", cleaned)
        }
    }
}
