//! Appraisal: raw message → discrete emotion tag + continuous PAD deltas.
//!
//! Pure and stateless. Keyword rules take priority; when no rule fires a
//! lexicon polarity score decides. Anything ambiguous collapses to
//! `Neutral` with zero deltas instead of failing.

use crate::affect::MoodState;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Below this confidence an appraisal is treated as neutral.
pub const MIN_CONFIDENCE: f32 = 0.2;

/// Messages longer than this are appraised on their first N chars only.
pub const MAX_APPRAISAL_CHARS: usize = 4000;

/// Closed set of emotion categories the pipeline knows how to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionTag {
    Joy,
    Gratitude,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Disgust,
    Neutral,
}

impl EmotionTag {
    pub const ALL: [EmotionTag; 8] = [
        EmotionTag::Joy,
        EmotionTag::Gratitude,
        EmotionTag::Sadness,
        EmotionTag::Anger,
        EmotionTag::Fear,
        EmotionTag::Surprise,
        EmotionTag::Disgust,
        EmotionTag::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionTag::Joy => "joy",
            EmotionTag::Gratitude => "gratitude",
            EmotionTag::Sadness => "sadness",
            EmotionTag::Anger => "anger",
            EmotionTag::Fear => "fear",
            EmotionTag::Surprise => "surprise",
            EmotionTag::Disgust => "disgust",
            EmotionTag::Neutral => "neutral",
        }
    }

    /// PAD delta this emotion pushes toward at full intensity.
    pub fn prototype(&self) -> MoodState {
        match self {
            EmotionTag::Joy => MoodState::new(0.8, 0.2, 0.2),
            EmotionTag::Gratitude => MoodState::new(0.6, 0.1, 0.2),
            EmotionTag::Anger => MoodState::new(-0.7, 0.6, 0.4),
            EmotionTag::Sadness => MoodState::new(-0.7, -0.4, -0.4),
            EmotionTag::Fear => MoodState::new(-0.8, 0.5, -0.6),
            EmotionTag::Surprise => MoodState::new(0.1, 0.7, -0.1),
            EmotionTag::Disgust => MoodState::new(-0.6, 0.3, 0.3),
            EmotionTag::Neutral => MoodState::neutral(),
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, EmotionTag::Joy | EmotionTag::Gratitude)
    }

    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            EmotionTag::Sadness | EmotionTag::Anger | EmotionTag::Fear | EmotionTag::Disgust
        )
    }
}

impl std::fmt::Display for EmotionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who or what the emotion is directed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum Target {
    /// The person writing the message ("I", "me", "my").
    Speaker,
    /// The agent itself ("you").
    Agent,
    /// Someone or something named in the conversation.
    Entity(String),
}

/// Why an input was degraded before appraisal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputIssue {
    Empty,
    Oversized,
}

/// Reference-resolution context: entities mentioned earlier, most recent last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub entities: Vec<String>,
}

impl ConversationContext {
    /// Maximum number of entities remembered for pronoun resolution.
    pub const CAPACITY: usize = 16;

    /// Record entities from a message; re-mentioned entities move to the back.
    pub fn observe(&mut self, message: &str) {
        for entity in extract_entities(message) {
            self.entities.retain(|e| !e.eq_ignore_ascii_case(&entity));
            self.entities.push(entity);
        }
        if self.entities.len() > Self::CAPACITY {
            let excess = self.entities.len() - Self::CAPACITY;
            self.entities.drain(..excess);
        }
    }

    pub fn most_recent(&self) -> Option<&str> {
        self.entities.last().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppraisalResult {
    pub emotion: EmotionTag,
    pub valence_delta: f32,
    pub arousal_delta: f32,
    pub dominance_delta: f32,
    pub target: Option<Target>,
    /// 0.0 – 1.0
    pub confidence: f32,
    /// Lexicon polarity in [-1, 1], independent of the chosen tag.
    pub polarity: f32,
    pub input_issue: Option<InputIssue>,
}

impl AppraisalResult {
    pub fn neutral(confidence: f32) -> Self {
        Self {
            emotion: EmotionTag::Neutral,
            valence_delta: 0.0,
            arousal_delta: 0.0,
            dominance_delta: 0.0,
            target: None,
            confidence: confidence.clamp(0.0, 1.0),
            polarity: 0.0,
            input_issue: None,
        }
    }

    pub fn delta(&self) -> MoodState {
        MoodState {
            pleasure: self.valence_delta,
            arousal: self.arousal_delta,
            dominance: self.dominance_delta,
        }
    }
}

// ============================================================================
// Lexicon
// ============================================================================

const RULES: &[(EmotionTag, &str)] = &[
    (
        EmotionTag::Gratitude,
        r"thanks|thank you|appreciate|appreciated|grateful|thankful",
    ),
    (
        EmotionTag::Anger,
        r"angry|furious|pissed|annoyed|outraged|infuriating|infuriated|livid|mad at",
    ),
    (
        EmotionTag::Sadness,
        r"sad|upset|depressed|lonely|miserable|heartbroken|unhappy|crying|grieving|devastated",
    ),
    (
        EmotionTag::Fear,
        r"scared|afraid|panic|panicking|anxious|terrified|worried|nervous|frightened",
    ),
    (
        EmotionTag::Disgust,
        r"disgusting|disgusted|gross|revolting|sickening|repulsive|nasty",
    ),
    (
        EmotionTag::Surprise,
        r"wow|surprised|unexpected|unexpectedly|suddenly|shocked|can't believe|cannot believe|no way",
    ),
    (
        EmotionTag::Joy,
        r"happy|glad|great|awesome|amazing|wonderful|excited|thrilled|delighted|promoted|love it|fantastic|yay|celebrate|celebrating",
    ),
];

const POSITIVE_WORDS: &[&str] = &[
    "good", "nice", "love", "like", "enjoy", "enjoyed", "fun", "best", "better", "cool", "proud",
    "hope", "beautiful", "perfect", "excellent", "happy", "glad", "great", "awesome", "win",
    "won", "success", "passed", "promoted", "thanks", "helpful", "lovely", "relieved",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "worst", "hate", "horrible", "sucks", "stupid", "wrong", "fail",
    "failed", "hurt", "pain", "tired", "broken", "problem", "sad", "angry", "useless", "lost",
    "alone", "scared", "worried", "miserable", "rejected", "fired", "sick", "annoying",
];

const INTENSIFIERS: &[&str] = &[
    "very", "really", "so", "extremely", "super", "totally", "incredibly", "absolutely",
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "isn't", "wasn't", "don't", "didn't", "doesn't", "can't", "won't",
    "aren't", "hardly",
];

const FIRST_PERSON: &[&str] = &["i", "me", "my", "mine", "myself", "i'm", "i've", "i'd", "i'll"];
const SECOND_PERSON: &[&str] = &["you", "your", "yours", "yourself", "you're", "you've"];
const THIRD_PERSON: &[&str] = &["he", "she", "him", "her", "they", "them", "his", "their"];

const RELATIONS: &[&str] = &[
    "mom", "mother", "dad", "father", "boss", "manager", "friend", "partner", "wife", "husband",
    "girlfriend", "boyfriend", "sister", "brother", "son", "daughter", "teacher", "coworker",
    "colleague", "dog", "cat", "team",
];

/// Capitalized words that never name someone a pronoun could refer to.
const NOT_ENTITIES: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "january",
    "february", "march", "april", "may", "june", "july", "august", "september", "october",
    "november", "december", "today", "tomorrow", "yesterday", "ok", "okay",
];

fn is_entity_candidate(lower: &str) -> bool {
    !(FIRST_PERSON.contains(&lower)
        || SECOND_PERSON.contains(&lower)
        || THIRD_PERSON.contains(&lower)
        || NOT_ENTITIES.contains(&lower))
}

static RULE_PATTERNS: LazyLock<Vec<(EmotionTag, Regex)>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|(tag, words)| {
            let re = Regex::new(&format!(r"(?i)\b(?:{})\b", words))
                .expect("static emotion rule must compile");
            (*tag, re)
        })
        .collect()
});

static RE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z][A-Za-z']*").expect("static word regex must compile"));

/// Lowercased word tokens, apostrophes kept so "don't" stays one token.
pub fn tokenize(text: &str) -> Vec<String> {
    RE_WORD
        .find_iter(text)
        .map(|m| m.as_str().to_ascii_lowercase())
        .collect()
}

fn preceded_by_negation(text: &str, start: usize) -> bool {
    let before = tokenize(&text[..start]);
    before.iter().rev().take(3).any(|w| NEGATIONS.contains(&w.as_str()))
}

/// Named entities worth tracking for reference resolution.
///
/// Capitalized words that are not sentence-initial, plus "my <relation>"
/// phrases (stored as the relation noun, e.g. "boss").
pub fn extract_entities(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut prev: Option<&str> = None;
    let mut sentence_start = true;

    for raw in text.split_whitespace() {
        let word = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'');
        if word.is_empty() {
            sentence_start = raw.ends_with(&['.', '!', '?'][..]);
            continue;
        }
        let lower = word.to_ascii_lowercase();

        if prev == Some("my") && RELATIONS.contains(&lower.as_str()) {
            if !out.iter().any(|e| e == &lower) {
                out.push(lower.clone());
            }
        } else if !sentence_start
            && word.len() > 1
            && word.chars().next().is_some_and(|c| c.is_ascii_uppercase())
            && word.chars().skip(1).all(|c| c.is_ascii_lowercase())
            && is_entity_candidate(&lower)
            && !out.iter().any(|e| e == word)
        {
            out.push(word.to_string());
        }

        sentence_start = raw.ends_with(&['.', '!', '?'][..]);
        prev = Some(if lower == "my" { "my" } else { "" });
    }
    out
}

fn detect_target(text: &str, tokens: &[String], ctx: &ConversationContext) -> Option<Target> {
    // Direct mention of a known entity wins; prefer the most recently discussed.
    for entity in ctx.entities.iter().rev() {
        let needle = entity.to_ascii_lowercase();
        if tokens.iter().any(|t| *t == needle) {
            return Some(Target::Entity(entity.clone()));
        }
    }
    if let Some(fresh) = extract_entities(text).into_iter().next() {
        return Some(Target::Entity(fresh));
    }

    let has = |set: &[&str]| tokens.iter().any(|t| set.contains(&t.as_str()));
    let first = has(FIRST_PERSON);
    let second = has(SECOND_PERSON);
    let third = has(THIRD_PERSON);

    if second && !first {
        return Some(Target::Agent);
    }
    if third {
        if let Some(entity) = ctx.most_recent() {
            return Some(Target::Entity(entity.to_string()));
        }
    }
    if first && !second {
        return Some(Target::Speaker);
    }
    None
}

/// Lexicon polarity in [-1, 1] plus the number of intensifiers seen.
fn polarity(tokens: &[String], exclamations: usize) -> (f32, usize) {
    let mut raw = 0.0f32;
    let mut intensifiers = 0;

    for (i, tok) in tokens.iter().enumerate() {
        let base = if POSITIVE_WORDS.contains(&tok.as_str()) {
            1.0
        } else if NEGATIVE_WORDS.contains(&tok.as_str()) {
            -1.0
        } else {
            if INTENSIFIERS.contains(&tok.as_str()) {
                intensifiers += 1;
            }
            continue;
        };

        let window = &tokens[i.saturating_sub(3)..i];
        let negated = window.iter().any(|w| NEGATIONS.contains(&w.as_str()));
        let boosted = i > 0 && INTENSIFIERS.contains(&tokens[i - 1].as_str());

        let mut score = if negated { -0.75 * base } else { base };
        if boosted {
            score *= 1.3;
        }
        raw += score;
    }

    if raw != 0.0 {
        raw += raw.signum() * 0.1 * exclamations.min(3) as f32;
    }

    (raw / (raw * raw + 2.0).sqrt(), intensifiers)
}

/// Appraise a message against the conversation context.
///
/// Never fails: empty input yields a neutral result with confidence 0.
pub fn appraise(message: &str, ctx: &ConversationContext) -> AppraisalResult {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        let mut result = AppraisalResult::neutral(0.0);
        result.input_issue = Some(InputIssue::Empty);
        return result;
    }

    let (text, issue) = if trimmed.chars().count() > MAX_APPRAISAL_CHARS {
        let cut: String = trimmed.chars().take(MAX_APPRAISAL_CHARS).collect();
        (cut, Some(InputIssue::Oversized))
    } else {
        (trimmed.to_string(), None)
    };

    let tokens = tokenize(&text);
    let exclamations = text.matches('!').count();
    let (compound, intensifiers) = polarity(&tokens, exclamations);
    let target = detect_target(&text, &tokens, ctx);

    // Keyword rules: count non-negated hits per tag, first rule wins ties.
    let mut best: Option<(EmotionTag, usize)> = None;
    for (tag, re) in RULE_PATTERNS.iter() {
        let hits = re
            .find_iter(&text)
            .filter(|m| !preceded_by_negation(&text, m.start()))
            .count();
        if hits > 0 && best.map_or(true, |(_, h)| hits > h) {
            best = Some((*tag, hits));
        }
    }

    let (emotion, confidence) = match best {
        Some((tag, hits)) => {
            let agrees = (tag.is_positive() && compound > 0.0) || (tag.is_negative() && compound < 0.0);
            let conf = 0.6
                + 0.1 * (hits - 1) as f32
                + 0.05 * intensifiers.min(2) as f32
                + 0.05 * exclamations.min(1) as f32
                + if agrees { 0.1 } else { 0.0 };
            (tag, conf.min(0.95))
        }
        None => {
            let tag = if compound > 0.0 {
                EmotionTag::Joy
            } else if compound < 0.0 {
                if target == Some(Target::Agent) {
                    EmotionTag::Anger
                } else {
                    EmotionTag::Sadness
                }
            } else {
                EmotionTag::Neutral
            };
            (tag, (compound.abs() * 0.8).min(0.9))
        }
    };

    if emotion == EmotionTag::Neutral || confidence < MIN_CONFIDENCE {
        let mut result = AppraisalResult::neutral(confidence);
        result.target = target;
        result.polarity = compound;
        result.input_issue = issue;
        return result;
    }

    let intensity =
        (0.75 + 0.1 * intensifiers.min(2) as f32 + 0.05 * exclamations.min(2) as f32).min(1.0);
    let proto = emotion.prototype().scale(intensity);
    let arousal_bump = 0.05 * exclamations.min(3) as f32;

    AppraisalResult {
        emotion,
        valence_delta: proto.pleasure,
        arousal_delta: (proto.arousal + arousal_bump).clamp(-1.0, 1.0),
        dominance_delta: proto.dominance,
        target,
        confidence,
        polarity: compound,
        input_issue: issue,
    }
}
