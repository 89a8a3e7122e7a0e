//! Self-reflection: a structured internal monologue per turn.
//!
//! Built only from state the turn has already computed, never from the
//! model's reply, so the record exists even when generation fails.
//! `reflect` is pure and infallible.

use crate::policy::{MemoryExcerpt, Strategy};
use pathos_core::appraisal::{AppraisalResult, EmotionTag, Target};
use pathos_core::attachment::AttachmentState;
use pathos_core::{MoodState, NeurochemistryState};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Memories cited per reflection.
const MAX_CITATIONS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionRecord {
    pub turn: u64,
    pub mood: MoodState,
    pub mood_label: String,
    pub emotion: EmotionTag,
    pub confidence: f32,
    pub memory_citations: Vec<String>,
    pub strategy: Strategy,
    pub safe_mode: bool,
    pub reasoning: String,
}

impl ReflectionRecord {
    pub fn cites(&self, needle: &str) -> bool {
        self.reasoning.contains(needle) || self.emotion.as_str() == needle
    }
}

/// Context around the turn that the reflection narrates.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionContext {
    pub turn: u64,
    pub previous_mood: MoodState,
    pub neuro_baseline: NeurochemistryState,
    pub attachment: AttachmentState,
    pub strategy: Strategy,
    pub safe_mode: bool,
}

impl Default for ReflectionContext {
    fn default() -> Self {
        Self {
            turn: 0,
            previous_mood: MoodState::neutral(),
            neuro_baseline: NeurochemistryState::resting(),
            attachment: AttachmentState::default(),
            strategy: Strategy::default(),
            safe_mode: false,
        }
    }
}

pub fn reflect(
    mood: &MoodState,
    neuro: &NeurochemistryState,
    appraisal: &AppraisalResult,
    memories_used: &[MemoryExcerpt],
    ctx: &ReflectionContext,
) -> ReflectionRecord {
    let memory_citations: Vec<String> = memories_used
        .iter()
        .take(MAX_CITATIONS)
        .map(|m| m.text.clone())
        .collect();

    let reasoning = match narrate(mood, neuro, appraisal, &memory_citations, ctx) {
        Ok(text) => text,
        Err(_) => {
            tracing::warn!("Reflection formatting failed, using generic summary");
            generic_summary(appraisal.emotion)
        }
    };

    ReflectionRecord {
        turn: ctx.turn,
        mood: *mood,
        mood_label: mood.label().to_string(),
        emotion: appraisal.emotion,
        confidence: appraisal.confidence,
        memory_citations,
        strategy: ctx.strategy,
        safe_mode: ctx.safe_mode,
        reasoning,
    }
}

fn generic_summary(emotion: EmotionTag) -> String {
    format!("I interpreted the message as '{}'.", emotion)
}

fn narrate(
    mood: &MoodState,
    neuro: &NeurochemistryState,
    appraisal: &AppraisalResult,
    citations: &[String],
    ctx: &ReflectionContext,
) -> Result<String, std::fmt::Error> {
    let mut out = String::new();

    write!(
        out,
        "I interpreted the message as '{}' (confidence {:.2}). ",
        appraisal.emotion, appraisal.confidence
    )?;

    match &appraisal.target {
        Some(Target::Agent) => out.push_str("I believe the feeling is mainly directed at me. "),
        Some(Target::Speaker) => out.push_str("I believe they are talking about themself. "),
        Some(Target::Entity(name)) => write!(out, "The feeling seems to be about {}. ", name)?,
        None => out.push_str("I'm not sure who the feeling is directed at. "),
    }

    write!(
        out,
        "My sense of attachment feels {} (bond={:.2}). ",
        ctx.attachment.band(),
        ctx.attachment.bond
    )?;

    let [p, a, d] = mood.describe_axes();
    write!(out, "My mood is {}, {}, {}. ", p, a, d)?;
    write!(out, "Internally, {}. ", neuro.describe(&ctx.neuro_baseline).join(", "))?;

    if ctx.safe_mode {
        out.push_str(
            "Crisis indicators were present, so I set my own mood aside and answered in safe mode. ",
        );
    } else {
        match ctx.strategy {
            Strategy::Regulate => out.push_str(
                "I aimed to regulate: gently lower arousal and move toward a calmer, safer state. ",
            ),
            Strategy::Mirror => {
                out.push_str("I aimed to mirror their tone while staying supportive. ")
            }
        }
    }

    let shift = mood.sub(&ctx.previous_mood);
    if shift.magnitude_l1() < 0.1 {
        out.push_str("This message only caused a small adjustment to my mood.");
    } else {
        write!(
            out,
            "This message noticeably shifted my mood (ΔP={:+.2}, ΔA={:+.2}, ΔD={:+.2}).",
            shift.pleasure, shift.arousal, shift.dominance
        )?;
    }

    if !citations.is_empty() {
        out.push_str("\nI recalled:");
        for c in citations {
            write!(out, "\n- {}", c)?;
        }
    }

    Ok(out)
}
