//! Property-based tests for pathos_core.
//!
//! Clamp, monotonicity and convergence invariants that must hold for every
//! valid input, plus the promotion scenario end to end through the core.

use pathos_core::appraisal::{appraise, AppraisalResult, ConversationContext, EmotionTag, Target};
use pathos_core::dynamics::{DefaultDynamics, Dynamics};
use pathos_core::persona::{PersonaBias, PersonaDelta, PersonaProfile};
use pathos_core::{MoodState, NeurochemistryState};
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

/// Appraisals with deliberately oversized deltas to stress clamping.
fn arb_appraisal() -> impl Strategy<Value = AppraisalResult> {
    (arb_emotion(), -2.0f32..=2.0, -2.0f32..=2.0, -2.0f32..=2.0, 0.0f32..=1.0).prop_map(
        |(emotion, v, a, d, confidence)| AppraisalResult {
            emotion,
            valence_delta: v,
            arousal_delta: a,
            dominance_delta: d,
            target: None,
            confidence,
            polarity: 0.0,
            input_issue: None,
        },
    )
}

fn arb_persona() -> impl Strategy<Value = PersonaProfile> {
    (-1.0f32..=1.0, -1.0f32..=1.0, -1.0f32..=1.0, 0.0f32..=1.0).prop_map(|(o, e, c, w)| {
        PersonaProfile {
            bias: PersonaBias {
                optimism: o,
                energy: e,
                confidence: c,
            },
            weight: w,
            ..PersonaProfile::default()
        }
    })
}

fn in_cube(m: &MoodState) -> bool {
    [m.pleasure, m.arousal, m.dominance]
        .iter()
        .all(|v| v.is_finite() && (-1.0..=1.0).contains(v))
}

// ============================================================================
// Mood / neurochemistry invariants
// ============================================================================

proptest! {
    #[test]
    fn mood_update_stays_in_cube(
        mood in arb_mood(),
        neuro in arb_neuro(),
        appraisal in arb_appraisal(),
        persona in arb_persona(),
    ) {
        let dyn_ = DefaultDynamics::default();
        let next = dyn_.update(&mood, &neuro, &appraisal, &persona);
        prop_assert!(in_cube(&next), "out of range: {:?}", next);
    }

    #[test]
    fn neuro_step_stays_in_unit_range(
        neuro in arb_neuro(),
        appraisal in arb_appraisal(),
        dt in 0.0f32..10.0,
    ) {
        let dyn_ = DefaultDynamics::default();
        let next = dyn_.step(&neuro, &appraisal, dt);
        for v in [next.dopamine, next.serotonin, next.noradrenaline] {
            prop_assert!((0.0..=1.0).contains(&v));
        }
    }

    /// Without impulses every modulator approaches its baseline monotonically
    /// and never crosses it.
    #[test]
    fn neuro_decay_monotonic_without_overshoot(neuro in arb_neuro(), turns in 1usize..40) {
        let dyn_ = DefaultDynamics::default();
        let base = dyn_.neuro_baseline();
        let quiet = AppraisalResult::neutral(0.0);
        let mut prev = neuro;
        for _ in 0..turns {
            let next = dyn_.step(&prev, &quiet, 1.0);
            for (p, n, b) in [
                (prev.dopamine, next.dopamine, base.dopamine),
                (prev.serotonin, next.serotonin, base.serotonin),
                (prev.noradrenaline, next.noradrenaline, base.noradrenaline),
            ] {
                prop_assert!((n - b).abs() <= (p - b).abs() + 1e-6);
                // Same side of the baseline (or on it).
                prop_assert!((p - b) * (n - b) >= -1e-9);
            }
            prev = next;
        }
    }

    #[test]
    fn neutral_turns_converge_to_persona_baseline(
        mood in arb_mood(),
        neuro in arb_neuro(),
        persona in arb_persona(),
    ) {
        let dyn_ = DefaultDynamics::default();
        let ctx = ConversationContext::default();
        let mut m = mood;
        let mut n = neuro;
        for _ in 0..50 {
            let a = appraise("the meeting is at noon", &ctx);
            n = dyn_.step(&n, &a, 1.0);
            m = dyn_.update(&m, &n, &a, &persona);
        }
        let baseline = persona.effective_baseline(&MoodState::neutral());
        prop_assert!(m.distance(&baseline) < 0.05, "mood {:?} baseline {:?}", m, baseline);
    }

    #[test]
    fn persona_adjust_never_leaves_range(
        persona in arb_persona(),
        dop in -2.0f32..2.0,
        den in -2.0f32..2.0,
        dc in -2.0f32..2.0,
    ) {
        let delta = PersonaDelta { optimism: dop, energy: den, confidence: dc };
        match persona.bias.adjust(delta) {
            Ok(b) => prop_assert!(b.validate().is_ok()),
            Err(_) => {
                let raw = [
                    persona.bias.optimism + dop,
                    persona.bias.energy + den,
                    persona.bias.confidence + dc,
                ];
                prop_assert!(raw.iter().any(|v| !(-1.0..=1.0).contains(v)));
            }
        }
    }

    #[test]
    fn appraise_never_panics_and_bounds_confidence(msg in ".{0,200}") {
        let r = appraise(&msg, &ConversationContext::default());
        prop_assert!((0.0..=1.0).contains(&r.confidence));
        prop_assert!(in_cube(&r.delta()));
    }
}

// ============================================================================
// Scenario
// ============================================================================

#[test]
fn promotion_raises_dopamine_pleasure_and_dominance() {
    let dyn_ = DefaultDynamics::default();
    let persona = PersonaProfile::default();
    let a = appraise("I just got promoted!", &ConversationContext::default());
    assert_eq!(a.emotion, EmotionTag::Joy);
    assert!(a.confidence > 0.5);
    assert_eq!(a.target, Some(Target::Speaker));

    let neuro0 = NeurochemistryState::resting();
    let mood0 = MoodState::neutral();
    let neuro1 = dyn_.step(&neuro0, &a, 1.0);
    let mood1 = dyn_.update(&mood0, &neuro1, &a, &persona);

    assert!(neuro1.dopamine > neuro0.dopamine);
    assert!(mood1.pleasure > mood0.pleasure);
    assert!(mood1.dominance > mood0.dominance);
    let bound = 1.0 - dyn_.decay.mood_inertia;
    assert!(mood1.pleasure - mood0.pleasure <= bound + 1e-6);
}
