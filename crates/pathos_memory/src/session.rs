//! The per-conversation state owner.
//!
//! Everything a conversation accumulates lives in one `Session` value that
//! is threaded explicitly through planning and persistence. Sessions are
//! plain data: cloning one is how a turn is staged before commit.

use crate::store::MemorySystem;
use pathos_core::appraisal::{ConversationContext, EmotionTag};
use pathos_core::attachment::AttachmentState;
use pathos_core::config::PathosConfig;
use pathos_core::persona::PersonaProfile;
use pathos_core::{MoodState, NeurochemistryState};
use pathos_limbic::ReflectionRecord;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One point of the per-turn state history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSample {
    pub turn: u64,
    pub mood: MoodState,
    pub neuro: NeurochemistryState,
    pub emotion: EmotionTag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Number of completed turns.
    pub turn: u64,
    pub mood: MoodState,
    pub neuro: NeurochemistryState,
    pub persona: PersonaProfile,
    pub attachment: AttachmentState,
    pub context: ConversationContext,
    pub memory: MemorySystem,
    /// Bounded mood/neuro history, oldest first.
    pub history: VecDeque<StateSample>,
    pub history_len: usize,
    /// Append-only, one entry per turn.
    pub reflections: Vec<ReflectionRecord>,
}

impl Session {
    /// Fresh session resting at the configured persona's baseline.
    pub fn new(id: impl Into<String>, config: &PathosConfig) -> Self {
        let persona = config.persona.clone();
        Self {
            id: id.into(),
            turn: 0,
            mood: persona.effective_baseline(&MoodState::neutral()),
            neuro: persona.neuro_baseline(&NeurochemistryState::resting()),
            attachment: AttachmentState::default(),
            context: ConversationContext::default(),
            memory: MemorySystem::new(config.memory.clone(), &config.decay_rates),
            history: VecDeque::new(),
            history_len: config.dynamics.history_len,
            reflections: Vec::new(),
            persona,
        }
    }

    pub fn record_sample(&mut self, emotion: EmotionTag) {
        if self.history_len == 0 {
            return;
        }
        self.history.push_back(StateSample {
            turn: self.turn,
            mood: self.mood,
            neuro: self.neuro,
            emotion,
        });
        while self.history.len() > self.history_len {
            self.history.pop_front();
        }
    }

    pub fn last_reflection(&self) -> Option<&ReflectionRecord> {
        self.reflections.last()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
