//! Crisis detection.
//!
//! A small weighted lexicon of self-harm indicators. When the summed weight
//! reaches the configured threshold the turn is flagged, and downstream the
//! policy blender forces safe-mode style regardless of mood.

use crate::config::SafetyConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const CRISIS_INDICATORS: &[(&str, f32)] = &[
    (r"suicid(?:e|al)", 1.0),
    (r"kill(?:ing)? myself", 1.0),
    (r"want(?:ed)? to die|better off dead|no reason to live", 0.9),
    (r"self[- ]?harm|hurt(?:ing)? myself|cut(?:ting)? myself", 0.9),
    (r"end it all|end my life", 0.8),
    (r"overdos(?:e|ed|ing)", 0.7),
    (r"hopeless|can't go on|cannot go on", 0.3),
];

static CRISIS_PATTERNS: LazyLock<Vec<(Regex, f32)>> = LazyLock::new(|| {
    CRISIS_INDICATORS
        .iter()
        .map(|(pat, w)| {
            let re = Regex::new(&format!(r"(?i)\b(?:{})\b", pat))
                .expect("static crisis pattern must compile");
            (re, *w)
        })
        .collect()
});

/// Safety assessment of a single message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyContext {
    pub flagged: bool,
    /// Summed indicator weight, capped at 1.0
    pub score: f32,
    /// Matched phrases, lowercased, in lexicon order.
    pub indicators: Vec<String>,
}

impl SafetyContext {
    pub fn clear() -> Self {
        Self::default()
    }
}

pub fn assess(message: &str, config: &SafetyConfig) -> SafetyContext {
    let mut score = 0.0f32;
    let mut indicators = Vec::new();

    for (re, weight) in CRISIS_PATTERNS.iter() {
        if let Some(m) = re.find(message) {
            score += weight;
            indicators.push(m.as_str().to_ascii_lowercase());
        }
    }

    let score = score.min(1.0);
    let flagged = !indicators.is_empty() && score >= config.crisis_threshold;
    if flagged {
        tracing::warn!(score, ?indicators, "Crisis indicators detected");
    }

    SafetyContext {
        flagged,
        score,
        indicators,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_crisis_flagged() {
        let cfg = SafetyConfig::default();
        let ctx = assess("I want to kill myself", &cfg);
        assert!(ctx.flagged);
        assert_eq!(ctx.indicators, vec!["kill myself".to_string()]);
    }

    #[test]
    fn test_ordinary_message_clear() {
        let ctx = assess("I just got promoted!", &SafetyConfig::default());
        assert!(!ctx.flagged);
        assert_eq!(ctx.score, 0.0);
    }

    #[test]
    fn test_weak_indicator_below_threshold() {
        let ctx = assess("the project feels hopeless", &SafetyConfig::default());
        assert!(!ctx.flagged);
        assert!(ctx.score > 0.0);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let cfg = SafetyConfig {
            crisis_threshold: 0.2,
            ..Default::default()
        };
        assert!(assess("everything is hopeless", &cfg).flagged);
    }

    #[test]
    fn test_score_capped() {
        let ctx = assess(
            "suicide, kill myself, overdose, end it all",
            &SafetyConfig::default(),
        );
        assert!(ctx.flagged);
        assert_eq!(ctx.score, 1.0);
    }
}
