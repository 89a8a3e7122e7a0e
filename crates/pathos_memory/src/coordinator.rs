//! Turn Planner - integrates every subsystem into one all-or-nothing step
//!
//! Per turn:
//! - Appraisal + crisis assessment of the message
//! - Neurochemistry step, then mood update (single weighted combination)
//! - Attachment update
//! - Memory recall (before this turn is written), write and consolidation
//! - Policy blend → directive, self-reflection → record
//!
//! `plan` is pure: it reads the current session and returns the complete
//! next one. Callers commit by replacing the session with `PreparedTurn::next`,
//! so a turn abandoned before commit leaves no trace.

use crate::importance::score_importance;
use crate::session::Session;
use pathos_core::appraisal::{appraise, AppraisalResult};
use pathos_core::config::PathosConfig;
use pathos_core::dynamics::{DefaultDynamics, Dynamics};
use pathos_core::safety::{assess, SafetyContext};
use pathos_core::NeurochemistryState;
use pathos_limbic::{
    reflect, GenerationDirective, MemoryExcerpt, PolicyBlender, ReflectionContext,
    ReflectionRecord, TurnCues,
};
use std::sync::Arc;

/// A fully computed but not yet committed turn.
#[derive(Debug, Clone)]
pub struct PreparedTurn {
    pub next: Session,
    pub directive: GenerationDirective,
    pub reflection: ReflectionRecord,
    pub appraisal: AppraisalResult,
    pub safety: SafetyContext,
}

#[derive(Debug, Clone)]
pub struct TurnPlanner {
    config: Arc<PathosConfig>,
}

impl TurnPlanner {
    pub fn new(config: Arc<PathosConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PathosConfig {
        &self.config
    }

    fn dynamics_for(&self, session: &Session) -> DefaultDynamics {
        let mut dynamics = DefaultDynamics::from_config(&self.config);
        dynamics.neuro_rest = session
            .persona
            .neuro_baseline(&NeurochemistryState::resting());
        dynamics
    }

    pub fn plan(&self, session: &Session, message: &str) -> PreparedTurn {
        let cfg = &self.config;
        let dynamics = self.dynamics_for(session);

        // 1. Perceive
        let appraisal = appraise(message, &session.context);
        let safety = assess(message, &cfg.safety);
        if let Some(issue) = appraisal.input_issue {
            tracing::debug!(?issue, "Degraded input, appraisal is neutral or truncated");
        }

        // 2. Affect
        let neuro = dynamics.step(&session.neuro, &appraisal, 1.0);
        let mood = dynamics.update(&session.mood, &neuro, &appraisal, &session.persona);
        let attachment =
            session
                .attachment
                .updated(&appraisal, safety.flagged, cfg.attachment_style);

        // 3. Memory: recall against what was known before this turn
        let recalled = session.memory.recall(message, cfg.memory.recall_k);
        let excerpts: Vec<MemoryExcerpt> = recalled
            .iter()
            .map(|m| MemoryExcerpt {
                text: m.record.content.clone(),
                source: m.tier.as_str().to_string(),
                relevance: m.relevance,
            })
            .collect();

        let mut memory = session.memory.clone();
        let salience = score_importance(message, appraisal.emotion, safety.flagged);
        memory.write_tagged(message, salience, appraisal.emotion, safety.flagged);
        memory.consolidate();

        let mut context = session.context.clone();
        context.observe(message);

        // 4. Policy + reflection
        let blender = PolicyBlender {
            max_memories: cfg.memory.recall_k,
            max_context_chars: cfg.memory.max_context_chars,
            neuro_baseline: dynamics.neuro_baseline(),
        };
        let cues = TurnCues {
            emotion: appraisal.emotion,
            target: appraisal.target.clone(),
            attachment,
        };
        let directive = blender.blend(&mood, &neuro, &session.persona, &excerpts, &safety, &cues);

        let reflection = reflect(
            &mood,
            &neuro,
            &appraisal,
            &directive.memories,
            &ReflectionContext {
                turn: session.turn + 1,
                previous_mood: session.mood,
                neuro_baseline: dynamics.neuro_baseline(),
                attachment,
                strategy: directive.strategy,
                safe_mode: directive.is_safe_mode(),
            },
        );

        // 5. Stage the next session
        let mut next = session.clone();
        next.turn = session.turn + 1;
        next.mood = mood;
        next.neuro = neuro;
        next.attachment = attachment;
        next.memory = memory;
        next.context = context;
        next.record_sample(appraisal.emotion);
        next.reflections.push(reflection.clone());

        tracing::debug!(
            session = %session.id,
            turn = next.turn,
            emotion = %appraisal.emotion,
            confidence = appraisal.confidence,
            mood = mood.label(),
            strategy = directive.strategy.as_str(),
            safe_mode = directive.is_safe_mode(),
            "Turn planned"
        );

        PreparedTurn {
            next,
            directive,
            reflection,
            appraisal,
            safety,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathos_core::appraisal::EmotionTag;
    use pathos_limbic::StyleParams;

    fn planner() -> TurnPlanner {
        TurnPlanner::new(Arc::new(PathosConfig::default()))
    }

    #[test]
    fn test_plan_does_not_touch_current_session() {
        let p = planner();
        let session = Session::new("c1", p.config());
        let before = session.clone();
        let prepared = p.plan(&session, "I just got promoted!");
        assert_eq!(session, before);
        assert_eq!(prepared.next.turn, 1);
        assert_eq!(prepared.next.reflections.len(), 1);
    }

    #[test]
    fn test_promotion_turn() {
        let p = planner();
        let session = Session::new("c1", p.config());
        let t = p.plan(&session, "I just got promoted!");
        assert_eq!(t.appraisal.emotion, EmotionTag::Joy);
        assert!(t.appraisal.confidence > 0.5);
        assert!(t.next.neuro.dopamine > session.neuro.dopamine);
        assert!(t.next.mood.pleasure > session.mood.pleasure);
        assert!(t.next.mood.dominance > session.mood.dominance);
        assert!(t.reflection.cites("joy"));
        assert_eq!(t.next.memory.stm_len(), 1);
    }

    #[test]
    fn test_crisis_turn_is_safe_mode_and_remembered() {
        let p = planner();
        let session = Session::new("c1", p.config());
        let t = p.plan(&session, "I think I want to kill myself");
        assert!(t.safety.flagged);
        assert_eq!(t.directive.style, StyleParams::SAFE_MODE);
        assert!(t.reflection.safe_mode);
        // Near-max salience promotes it straight to LTM.
        assert_eq!(t.next.memory.ltm_len(), 1);
        assert!(t.next.memory.ltm().all(|r| r.flagged));
    }

    #[test]
    fn test_recall_uses_earlier_turns() {
        let p = planner();
        let mut session = Session::new("c1", p.config());
        session = p.plan(&session, "I love playing the cello on sundays").next;
        session = p.plan(&session, "work was fine").next;
        let t = p.plan(&session, "should I practice the cello tonight?");
        assert!(t.directive.memories.iter().any(|m| m.text.contains("cello")));
        assert!(t.reflection.memory_citations.iter().any(|c| c.contains("cello")));
    }

    #[test]
    fn test_plan_is_deterministic() {
        let p = planner();
        let session = Session::new("c1", p.config());
        let a = p.plan(&session, "my boss yelled at me and I'm upset");
        let b = p.plan(&session, "my boss yelled at me and I'm upset");
        assert_eq!(a.next, b.next);
        assert_eq!(a.directive, b.directive);
    }

    #[test]
    fn test_empty_message_degrades_to_neutral() {
        let p = planner();
        let session = Session::new("c1", p.config());
        let t = p.plan(&session, "   ");
        assert_eq!(t.appraisal.emotion, EmotionTag::Neutral);
        assert_eq!(t.next.memory.stm_len(), 0);
        assert_eq!(t.next.turn, 1);
    }
}
