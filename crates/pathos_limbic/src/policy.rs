//! Policy Blender - from internal state to generation constraints
//!
//! Mood, neurochemistry, persona and attachment are folded into a small set
//! of style knobs in [0, 1]. The external model never sees raw feelings,
//! only these knobs, the strategy, sampling hints and a capped memory
//! context. Safety is a hard override: a flagged turn always gets
//! `StyleParams::SAFE_MODE`.

use pathos_core::appraisal::{EmotionTag, Target};
use pathos_core::attachment::AttachmentState;
use pathos_core::persona::PersonaProfile;
use pathos_core::safety::SafetyContext;
use pathos_core::{MoodState, NeurochemistryState};
use serde::{Deserialize, Serialize};

/// Style knobs handed to the model. Every field lives in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleParams {
    pub warmth: f32,
    pub formality: f32,
    /// High = soft, tentative language.
    pub hedging: f32,
    pub emoji: f32,
    pub pace: f32,
    pub verbosity: f32,
    pub assertiveness: f32,
}

impl StyleParams {
    /// Fixed style for flagged turns.
    pub const SAFE_MODE: StyleParams = StyleParams {
        warmth: 0.9,
        formality: 0.6,
        hedging: 0.3,
        emoji: 0.0,
        pace: 0.3,
        verbosity: 0.4,
        assertiveness: 0.5,
    };

    pub const NEUTRAL: StyleParams = StyleParams {
        warmth: 0.5,
        formality: 0.5,
        hedging: 0.5,
        emoji: 0.3,
        pace: 0.5,
        verbosity: 0.5,
        assertiveness: 0.5,
    };

    pub fn clamped(self) -> Self {
        let c = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.5 };
        Self {
            warmth: c(self.warmth),
            formality: c(self.formality),
            hedging: c(self.hedging),
            emoji: c(self.emoji),
            pace: c(self.pace),
            verbosity: c(self.verbosity),
            assertiveness: c(self.assertiveness),
        }
    }

    pub fn is_valid(&self) -> bool {
        [
            self.warmth,
            self.formality,
            self.hedging,
            self.emoji,
            self.pace,
            self.verbosity,
            self.assertiveness,
        ]
        .iter()
        .all(|v| (0.0..=1.0).contains(v))
    }

    /// Plain-language guidance lines for the prompt.
    pub fn guidance(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.emoji > 0.5 {
            out.push("You may include at most one light emoji.");
        } else {
            out.push("Avoid emojis.");
        }
        if self.formality > 0.6 {
            out.push("Use precise, professional wording.");
        } else if self.formality < 0.4 {
            out.push("Keep the wording casual.");
        }
        if self.hedging < 0.4 {
            out.push("Be direct; avoid 'maybe', 'might' and 'perhaps'.");
        } else if self.hedging > 0.6 {
            out.push("Use soft, tentative language.");
        }
        if self.verbosity < 0.4 {
            out.push("Keep it to one or two sentences.");
        } else if self.verbosity > 0.7 {
            out.push("A slightly longer, fuller answer is fine.");
        }
        if self.warmth > 0.7 {
            out.push("Sound warm and caring.");
        }
        out
    }
}

impl Default for StyleParams {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Reflect the user's tone while staying supportive.
    Mirror,
    /// Gently lower arousal and increase clarity and agency.
    #[default]
    Regulate,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Mirror => "mirror",
            Strategy::Regulate => "regulate",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyFlags {
    pub crisis: bool,
    pub score: f32,
    pub indicators: Vec<String>,
}

impl From<&SafetyContext> for SafetyFlags {
    fn from(ctx: &SafetyContext) -> Self {
        Self {
            crisis: ctx.flagged,
            score: ctx.score,
            indicators: ctx.indicators.clone(),
        }
    }
}

/// A recalled memory as the blender sees it, most relevant first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryExcerpt {
    pub text: String,
    /// "stm" or "ltm"
    pub source: String,
    pub relevance: f32,
}

/// Sampling adjustments derived from arousal and verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingHints {
    /// Added to the configured temperature (-0.1 to +0.3).
    pub temperature_delta: f32,
    /// Multiplies the configured max_tokens (0.5 to 1.3).
    pub max_tokens_factor: f32,
}

impl Default for SamplingHints {
    fn default() -> Self {
        Self {
            temperature_delta: 0.0,
            max_tokens_factor: 1.0,
        }
    }
}

/// Everything the external model call is conditioned on for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationDirective {
    pub target_mood: MoodState,
    pub style: StyleParams,
    pub strategy: Strategy,
    pub memories: Vec<MemoryExcerpt>,
    pub safety: SafetyFlags,
    pub sampling: SamplingHints,
    pub emotion: EmotionTag,
    pub target: Option<Target>,
}

impl GenerationDirective {
    pub fn is_safe_mode(&self) -> bool {
        self.safety.crisis
    }

    pub fn memory_chars(&self) -> usize {
        self.memories.iter().map(|m| m.text.chars().count()).sum()
    }
}

/// Per-turn cues the blender reads besides the core state.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnCues {
    pub emotion: EmotionTag,
    pub target: Option<Target>,
    pub attachment: AttachmentState,
}

impl Default for TurnCues {
    fn default() -> Self {
        Self {
            emotion: EmotionTag::Neutral,
            target: None,
            attachment: AttachmentState::default(),
        }
    }
}

// ============================================================================
// Blender
// ============================================================================

#[derive(Debug, Clone)]
pub struct PolicyBlender {
    pub max_memories: usize,
    /// Cap on the total characters of memory excerpts in a directive.
    pub max_context_chars: usize,
    pub neuro_baseline: NeurochemistryState,
}

impl Default for PolicyBlender {
    fn default() -> Self {
        Self {
            max_memories: 3,
            max_context_chars: 600,
            neuro_baseline: NeurochemistryState::resting(),
        }
    }
}

/// Smallest excerpt worth truncating into the remaining budget.
const MIN_EXCERPT_CHARS: usize = 24;

impl PolicyBlender {
    pub fn blend(
        &self,
        mood: &MoodState,
        neuro: &NeurochemistryState,
        persona: &PersonaProfile,
        memories: &[MemoryExcerpt],
        safety: &SafetyContext,
        cues: &TurnCues,
    ) -> GenerationDirective {
        let memories = self.select_memories(memories);
        let safety_flags = SafetyFlags::from(safety);

        if safety.flagged {
            tracing::debug!("Safety override: safe-mode style");
            return GenerationDirective {
                target_mood: mood.clamped(),
                style: StyleParams::SAFE_MODE,
                strategy: Strategy::Regulate,
                memories,
                safety: safety_flags,
                sampling: SamplingHints {
                    temperature_delta: -0.1,
                    max_tokens_factor: 1.0,
                },
                emotion: cues.emotion,
                target: cues.target.clone(),
            };
        }

        let mood = mood.clamped();
        let strategy = choose_strategy(&mood, cues);
        let style = self.style_for(&mood, neuro, persona, cues, strategy);
        let sampling = sampling_for(&mood, &style);

        GenerationDirective {
            target_mood: mood,
            style,
            strategy,
            memories,
            safety: safety_flags,
            sampling,
            emotion: cues.emotion,
            target: cues.target.clone(),
        }
    }

    fn style_for(
        &self,
        mood: &MoodState,
        neuro: &NeurochemistryState,
        persona: &PersonaProfile,
        cues: &TurnCues,
        strategy: Strategy,
    ) -> StyleParams {
        let (p, a, d) = mood.as_tuple();
        let serotonin_dev = neuro.serotonin - self.neuro_baseline.serotonin;
        let tension = (neuro.noradrenaline - self.neuro_baseline.noradrenaline).max(0.0);

        let mut style = StyleParams {
            warmth: 0.5 + 0.4 * p - 0.2 * d + 0.1 * serotonin_dev + cues.attachment.warmth_nudge(),
            formality: 0.5 + 0.3 * d - 0.2 * a,
            hedging: 0.6 - 0.4 * d + 0.1 * (1.0 - p.abs()),
            emoji: 0.3 + 0.5 * p,
            pace: 0.5 + 0.4 * a,
            verbosity: 0.5 + 0.35 * a + 0.1 * p,
            assertiveness: 0.5 + 0.45 * d - 0.1 * tension,
        };

        // Persona style pins pull the computed value toward the pinned one.
        let w = persona.weight.clamp(0.0, 1.0);
        if let Some(f) = persona.style.formality {
            style.formality += (f - style.formality) * w;
        }
        if let Some(dir) = persona.style.directness {
            style.hedging += ((1.0 - dir) - style.hedging) * w;
            style.assertiveness += (dir - style.assertiveness) * w * 0.5;
        }
        if let Some(e) = persona.style.emoji {
            style.emoji += (e - style.emoji) * w;
        }

        if strategy == Strategy::Regulate {
            style.pace -= 0.1;
            style.warmth += 0.05;
            style.verbosity -= 0.05;
        }

        // Hostility aimed at the agent: be plain and direct.
        if matches!(cues.emotion, EmotionTag::Anger | EmotionTag::Disgust)
            && cues.target == Some(Target::Agent)
        {
            style.hedging -= 0.2;
            style.emoji -= 0.2;
        }

        style.clamped()
    }

    /// Keep excerpts in relevance order until the count or character cap is hit.
    fn select_memories(&self, memories: &[MemoryExcerpt]) -> Vec<MemoryExcerpt> {
        let mut out = Vec::new();
        let mut used = 0usize;

        for m in memories.iter().take(self.max_memories) {
            let len = m.text.chars().count();
            let remaining = self.max_context_chars.saturating_sub(used);
            if len <= remaining {
                used += len;
                out.push(m.clone());
            } else {
                if remaining >= MIN_EXCERPT_CHARS {
                    let text: String = m.text.chars().take(remaining - 1).collect();
                    out.push(MemoryExcerpt {
                        text: format!("{}…", text),
                        ..m.clone()
                    });
                }
                break;
            }
        }
        out
    }
}

fn choose_strategy(mood: &MoodState, cues: &TurnCues) -> Strategy {
    let distressed = mood.pleasure < -0.2 || mood.arousal > 0.5;
    let negative_turn = cues.emotion.is_negative();
    if distressed || negative_turn {
        Strategy::Regulate
    } else {
        Strategy::Mirror
    }
}

fn sampling_for(mood: &MoodState, style: &StyleParams) -> SamplingHints {
    let calm_bonus = if mood.arousal < -0.3 { -0.1 } else { 0.0 };
    SamplingHints {
        temperature_delta: (0.15 * mood.arousal + calm_bonus).clamp(-0.1, 0.3),
        max_tokens_factor: (0.5 + style.verbosity * 0.8).clamp(0.5, 1.3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathos_core::config::SafetyConfig;
    use pathos_core::safety::assess;

    fn excerpt(text: &str, relevance: f32) -> MemoryExcerpt {
        MemoryExcerpt {
            text: text.to_string(),
            source: "ltm".to_string(),
            relevance,
        }
    }

    #[test]
    fn test_warmth_tracks_pleasure() {
        let blender = PolicyBlender::default();
        let persona = PersonaProfile::default();
        let neuro = NeurochemistryState::resting();
        let safe = SafetyContext::clear();
        let cues = TurnCues::default();
        let happy = blender.blend(&MoodState::new(0.8, 0.0, 0.0), &neuro, &persona, &[], &safe, &cues);
        let sad = blender.blend(&MoodState::new(-0.8, 0.0, 0.0), &neuro, &persona, &[], &safe, &cues);
        assert!(happy.style.warmth > sad.style.warmth);
        assert!(happy.style.emoji > sad.style.emoji);
    }

    #[test]
    fn test_verbosity_tracks_arousal_and_assertiveness_tracks_dominance() {
        let blender = PolicyBlender::default();
        let persona = PersonaProfile::default();
        let neuro = NeurochemistryState::resting();
        let safe = SafetyContext::clear();
        let cues = TurnCues::default();
        let calm = blender.blend(&MoodState::new(0.2, -0.6, -0.6), &neuro, &persona, &[], &safe, &cues);
        let active = blender.blend(&MoodState::new(0.2, 0.4, 0.6), &neuro, &persona, &[], &safe, &cues);
        assert!(active.style.verbosity > calm.style.verbosity);
        assert!(active.style.assertiveness > calm.style.assertiveness);
    }

    #[test]
    fn test_safety_overrides_style() {
        let blender = PolicyBlender::default();
        let safety = assess("I want to end it all, I might kill myself", &SafetyConfig::default());
        assert!(safety.flagged);
        let d = blender.blend(
            &MoodState::new(1.0, 1.0, 1.0),
            &NeurochemistryState::new(1.0, 0.0, 1.0),
            &PersonaProfile::preset("supportive_friend").unwrap(),
            &[],
            &safety,
            &TurnCues::default(),
        );
        assert_eq!(d.style, StyleParams::SAFE_MODE);
        assert_eq!(d.strategy, Strategy::Regulate);
        assert!(d.is_safe_mode());
    }

    #[test]
    fn test_anger_at_agent_lowers_hedging_and_emoji() {
        let blender = PolicyBlender::default();
        let persona = PersonaProfile::default();
        let mood = MoodState::new(-0.3, 0.4, 0.1);
        let neuro = NeurochemistryState::resting();
        let safe = SafetyContext::clear();
        let plain = TurnCues {
            emotion: EmotionTag::Anger,
            target: Some(Target::Speaker),
            ..Default::default()
        };
        let at_agent = TurnCues {
            target: Some(Target::Agent),
            ..plain.clone()
        };
        let a = blender.blend(&mood, &neuro, &persona, &[], &safe, &plain);
        let b = blender.blend(&mood, &neuro, &persona, &[], &safe, &at_agent);
        assert!(b.style.hedging < a.style.hedging);
        assert!(b.style.emoji <= a.style.emoji);
    }

    #[test]
    fn test_persona_pins_pull_style() {
        let blender = PolicyBlender::default();
        let neuro = NeurochemistryState::resting();
        let safe = SafetyContext::clear();
        let cues = TurnCues::default();
        let mood = MoodState::neutral();
        let plain = blender.blend(&mood, &neuro, &PersonaProfile::default(), &[], &safe, &cues);
        let sci = PersonaProfile::preset("analytical_scientist").unwrap();
        let pinned = blender.blend(&mood, &neuro, &sci, &[], &safe, &cues);
        assert!(pinned.style.formality > plain.style.formality);
        assert!(pinned.style.hedging < plain.style.hedging);
    }

    #[test]
    fn test_strategy_selection() {
        let blender = PolicyBlender::default();
        let persona = PersonaProfile::default();
        let neuro = NeurochemistryState::resting();
        let safe = SafetyContext::clear();
        let joyful = TurnCues {
            emotion: EmotionTag::Joy,
            ..Default::default()
        };
        let d = blender.blend(&MoodState::new(0.5, 0.2, 0.2), &neuro, &persona, &[], &safe, &joyful);
        assert_eq!(d.strategy, Strategy::Mirror);
        let sad = TurnCues {
            emotion: EmotionTag::Sadness,
            ..Default::default()
        };
        let d = blender.blend(&MoodState::new(-0.4, -0.2, -0.2), &neuro, &persona, &[], &safe, &sad);
        assert_eq!(d.strategy, Strategy::Regulate);
    }

    #[test]
    fn test_memory_context_capped() {
        let blender = PolicyBlender {
            max_memories: 3,
            max_context_chars: 50,
            ..Default::default()
        };
        let mems = vec![
            excerpt("The user felt joy about: a promotion at work", 0.9),
            excerpt("The user likes hiking on weekends with their dog", 0.8),
            excerpt("short", 0.1),
        ];
        let d = blender.blend(
            &MoodState::neutral(),
            &NeurochemistryState::resting(),
            &PersonaProfile::default(),
            &mems,
            &SafetyContext::clear(),
            &TurnCues::default(),
        );
        assert!(d.memory_chars() <= 50);
        assert_eq!(d.memories[0].text, mems[0].text);
    }

    #[test]
    fn test_memory_count_capped() {
        let blender = PolicyBlender {
            max_memories: 2,
            ..Default::default()
        };
        let mems: Vec<_> = (0..5).map(|i| excerpt(&format!("m{}", i), 1.0)).collect();
        let d = blender.blend(
            &MoodState::neutral(),
            &NeurochemistryState::resting(),
            &PersonaProfile::default(),
            &mems,
            &SafetyContext::clear(),
            &TurnCues::default(),
        );
        assert_eq!(d.memories.len(), 2);
        assert_eq!(d.memories[1].text, "m1");
    }
}
