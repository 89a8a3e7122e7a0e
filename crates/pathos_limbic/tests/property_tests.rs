//! Property-based tests for pathos_limbic.
//!
//! The blender must always emit valid style knobs, safety must dominate
//! affect, and reflection must be a pure function of its inputs.

use pathos_core::appraisal::{AppraisalResult, EmotionTag, Target};
use pathos_core::attachment::AttachmentState;
use pathos_core::persona::{PersonaBias, PersonaProfile, StyleOverrides};
use pathos_core::safety::SafetyContext;
use pathos_core::{MoodState, NeurochemistryState};
use pathos_limbic::{
    reflect, MemoryExcerpt, PolicyBlender, ReflectionContext, Strategy as ResponseStrategy,
    StyleParams, TurnCues,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_mood() -> impl Strategy<Value = MoodState> {
    (-1.0f32..=1.0, -1.0f32..=1.0, -1.0f32..=1.0).prop_map(|(p, a, d)| MoodState::new(p, a, d))
}

fn arb_neuro() -> impl Strategy<Value = NeurochemistryState> {
    (0.0f32..=1.0, 0.0f32..=1.0, 0.0f32..=1.0)
        .prop_map(|(d, s, n)| NeurochemistryState::new(d, s, n))
}

fn arb_emotion() -> impl Strategy<Value = EmotionTag> {
    prop::sample::select(EmotionTag::ALL.to_vec())
}

fn arb_target() -> impl Strategy<Value = Option<Target>> {
    prop_oneof![
        Just(None),
        Just(Some(Target::Speaker)),
        Just(Some(Target::Agent)),
        "[A-Z][a-z]{2,8}".prop_map(|n| Some(Target::Entity(n))),
    ]
}

fn arb_persona() -> impl Strategy<Value = PersonaProfile> {
    (
        -1.0f32..=1.0,
        -1.0f32..=1.0,
        -1.0f32..=1.0,
        0.0f32..=1.0,
        prop::option::of(0.0f32..=1.0),
        prop::option::of(0.0f32..=1.0),
        prop::option::of(0.0f32..=1.0),
    )
        .prop_map(|(o, e, c, w, formality, directness, emoji)| PersonaProfile {
            bias: PersonaBias {
                optimism: o,
                energy: e,
                confidence: c,
            },
            weight: w,
            style: StyleOverrides {
                formality,
                directness,
                emoji,
            },
            ..PersonaProfile::default()
        })
}

fn arb_cues() -> impl Strategy<Value = TurnCues> {
    (arb_emotion(), arb_target(), 0.0f32..=1.0).prop_map(|(emotion, target, bond)| TurnCues {
        emotion,
        target,
        attachment: AttachmentState { bond },
    })
}

fn arb_memories() -> impl Strategy<Value = Vec<MemoryExcerpt>> {
    prop::collection::vec(
        ("[a-z ]{0,300}", 0.0f32..=1.0).prop_map(|(text, relevance)| MemoryExcerpt {
            text,
            source: "stm".to_string(),
            relevance,
        }),
        0..8,
    )
}

fn arb_appraisal() -> impl Strategy<Value = AppraisalResult> {
    (arb_emotion(), arb_mood(), 0.0f32..=1.0, arb_target()).prop_map(
        |(emotion, delta, confidence, target)| AppraisalResult {
            emotion,
            valence_delta: delta.pleasure,
            arousal_delta: delta.arousal,
            dominance_delta: delta.dominance,
            target,
            confidence,
            polarity: 0.0,
            input_issue: None,
        },
    )
}

fn flagged() -> SafetyContext {
    SafetyContext {
        flagged: true,
        score: 1.0,
        indicators: vec!["kill myself".to_string()],
    }
}

// ============================================================================
// Blender properties
// ============================================================================

proptest! {
    #[test]
    fn style_always_in_unit_range(
        mood in arb_mood(),
        neuro in arb_neuro(),
        persona in arb_persona(),
        cues in arb_cues(),
    ) {
        let blender = PolicyBlender::default();
        let d = blender.blend(&mood, &neuro, &persona, &[], &SafetyContext::clear(), &cues);
        prop_assert!(d.style.is_valid(), "{:?}", d.style);
    }

    /// Safety dominates affect: flagged turns always get the fixed safe style.
    #[test]
    fn safety_dominates_affect(
        mood in arb_mood(),
        neuro in arb_neuro(),
        persona in arb_persona(),
        cues in arb_cues(),
        memories in arb_memories(),
    ) {
        let blender = PolicyBlender::default();
        let d = blender.blend(&mood, &neuro, &persona, &memories, &flagged(), &cues);
        prop_assert_eq!(d.style, StyleParams::SAFE_MODE);
        prop_assert_eq!(d.strategy, ResponseStrategy::Regulate);
        prop_assert!(d.safety.crisis);
    }

    #[test]
    fn memory_context_respects_caps(
        memories in arb_memories(),
        max_memories in 0usize..5,
        max_context_chars in 0usize..400,
    ) {
        let blender = PolicyBlender {
            max_memories,
            max_context_chars,
            ..PolicyBlender::default()
        };
        let d = blender.blend(
            &MoodState::neutral(),
            &NeurochemistryState::resting(),
            &PersonaProfile::default(),
            &memories,
            &SafetyContext::clear(),
            &TurnCues::default(),
        );
        prop_assert!(d.memories.len() <= max_memories);
        prop_assert!(d.memory_chars() <= max_context_chars);
    }

    /// Reflection is idempotent and leaves its inputs untouched.
    #[test]
    fn reflect_is_idempotent(
        mood in arb_mood(),
        neuro in arb_neuro(),
        appraisal in arb_appraisal(),
        memories in arb_memories(),
        previous in arb_mood(),
        safe_mode in any::<bool>(),
    ) {
        let ctx = ReflectionContext {
            turn: 7,
            previous_mood: previous,
            safe_mode,
            ..ReflectionContext::default()
        };
        let (m0, n0, a0) = (mood, neuro, appraisal.clone());
        let first = reflect(&mood, &neuro, &appraisal, &memories, &ctx);
        let second = reflect(&mood, &neuro, &appraisal, &memories, &ctx);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(mood, m0);
        prop_assert_eq!(neuro, n0);
        prop_assert_eq!(appraisal, a0);
        prop_assert!(!first.reasoning.is_empty());
        prop_assert!(first.memory_citations.len() <= 2);
    }
}

#[test]
fn directive_serializes_for_logging() {
    let d = PolicyBlender::default().blend(
        &MoodState::new(0.4, 0.1, 0.2),
        &NeurochemistryState::resting(),
        &PersonaProfile::default(),
        &[],
        &SafetyContext::clear(),
        &TurnCues::default(),
    );
    let json = serde_json::to_value(&d).unwrap();
    assert_eq!(json["strategy"], "mirror");
    assert!(json["style"]["warmth"].as_f64().unwrap() > 0.5);
}
