//! Property-based tests for prompt assembly and reply clean-up.

use pathos_core::appraisal::EmotionTag;
use pathos_core::persona::PersonaProfile;
use pathos_core::MoodState;
use pathos_limbic::{
    GenerationDirective, MemoryExcerpt, SafetyFlags, SamplingHints, Strategy as ResponseStrategy,
    StyleParams,
};
use pathos_reasoning::engine::sanitize_reply;
use pathos_reasoning::PromptBuilder;
use proptest::prelude::*;

fn arb_style() -> impl Strategy<Value = StyleParams> {
    prop::array::uniform7(0.0f32..=1.0).prop_map(|v| StyleParams {
        warmth: v[0],
        formality: v[1],
        hedging: v[2],
        emoji: v[3],
        pace: v[4],
        verbosity: v[5],
        assertiveness: v[6],
    })
}

fn arb_directive() -> impl Strategy<Value = GenerationDirective> {
    (
        arb_style(),
        prop::collection::vec(".{0,400}", 0..5),
        -1.0f32..=1.0,
    )
        .prop_map(|(style, texts, p)| GenerationDirective {
            target_mood: MoodState::new(p, -p / 2.0, 0.1),
            style,
            strategy: ResponseStrategy::Regulate,
            memories: texts
                .into_iter()
                .map(|text| MemoryExcerpt {
                    text,
                    source: "stm".into(),
                    relevance: 0.5,
                })
                .collect(),
            safety: SafetyFlags::default(),
            sampling: SamplingHints::default(),
            emotion: EmotionTag::Neutral,
            target: None,
        })
}

proptest! {
    /// The assembled prompt never exceeds the configured budget.
    #[test]
    fn prompt_within_budget(
        directive in arb_directive(),
        message in ".{0,3000}",
        budget in 400usize..6000,
    ) {
        let p = PromptBuilder::new(budget).build(&PersonaProfile::default(), &directive, &message);
        prop_assert!(p.char_len() <= budget);
    }

    /// Clean-up never grows the reply and leaves no outer whitespace.
    #[test]
    fn sanitize_never_grows(text in "[\\PC\n]{0,300}", style in arb_style()) {
        let clean = sanitize_reply(&text, &style);
        prop_assert!(clean.chars().count() <= text.chars().count());
        prop_assert_eq!(clean.trim(), clean.as_str());
    }
}
