//! Memory records and the small text helpers used to match them.

use pathos_core::affect::deserialize_safe_f32;
use pathos_core::appraisal::{tokenize, EmotionTag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTier {
    Stm,
    Ltm,
}

impl MemoryTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryTier::Stm => "stm",
            MemoryTier::Ltm => "ltm",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Normalized topic key (significant tokens of the original message).
    pub key: String,
    /// Raw message for STM, compact summary for LTM.
    pub content: String,
    pub emotion: EmotionTag,
    /// Whether the turn carried crisis indicators.
    pub flagged: bool,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub salience: f32,
    /// Turn index
    pub created_at: u64,
    /// Turn index
    pub last_reinforced_at: u64,
    /// Exponential decay per elapsed turn.
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub decay_rate: f32,
    pub mentions: u32,
    /// STM only: already represented in LTM.
    #[serde(default)]
    pub promoted: bool,
}

impl MemoryRecord {
    /// `salience * exp(-decay_rate * turns since last reinforcement)`
    pub fn effective_salience(&self, now: u64) -> f32 {
        let age = now.saturating_sub(self.last_reinforced_at) as f32;
        (self.salience * (-self.decay_rate * age).exp()).clamp(0.0, 1.0)
    }

    /// Recency weight in (0, 1], measured from creation.
    pub fn recency(&self, now: u64) -> f32 {
        let age = now.saturating_sub(self.created_at) as f32;
        (-self.decay_rate * age).exp()
    }

    pub fn reinforce(&mut self, now: u64, boost: f32) {
        self.salience = (self.salience + boost).min(1.0);
        self.last_reinforced_at = now;
        self.mentions = self.mentions.saturating_add(1);
    }

    pub fn key_tokens(&self) -> BTreeSet<String> {
        self.key.split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect()
    }
}

/// A recall hit, most relevant first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalledMemory {
    pub record: MemoryRecord,
    pub tier: MemoryTier,
    pub relevance: f32,
}

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "is", "are", "was", "were", "be", "been", "to", "of",
    "in", "on", "at", "for", "with", "it", "it's", "this", "that", "i", "i'm", "me", "my", "you",
    "your", "we", "so", "just", "do", "did", "have", "has", "had", "am", "about", "really", "very",
];

/// Significant lowercase tokens of `text`.
pub fn significant_tokens(text: &str) -> BTreeSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.len() > 1 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

pub fn normalize_key(text: &str) -> String {
    significant_tokens(text).into_iter().collect::<Vec<_>>().join(" ")
}

/// Jaccard similarity of two token sets; 0 when both are empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

/// Share of `query` tokens present in `record`, in [0, 1].
pub fn overlap(query: &BTreeSet<String>, record: &BTreeSet<String>) -> f32 {
    if query.is_empty() {
        return 0.0;
    }
    query.intersection(record).count() as f32 / query.len() as f32
}
