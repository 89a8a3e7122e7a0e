//! Prompt assembly: GenerationDirective → system prompt + user message.
//!
//! The directive is the only affective input the provider sees. Recalled
//! memories are the first thing dropped when the context budget is tight.

use pathos_core::appraisal::Target;
use pathos_core::persona::PersonaProfile;
use pathos_limbic::{GenerationDirective, Strategy};
use std::fmt::Write;

/// Smallest budget honoured; below this the prompt would lose its header.
const MIN_BUDGET_CHARS: usize = 400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn char_len(&self) -> usize {
        self.system.chars().count() + self.user.chars().count()
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    budget_chars: usize,
}

impl PromptBuilder {
    pub fn new(budget_chars: usize) -> Self {
        Self {
            budget_chars: budget_chars.max(MIN_BUDGET_CHARS),
        }
    }

    pub fn build(&self, persona: &PersonaProfile, directive: &GenerationDirective, message: &str) -> Prompt {
        let user = truncate_chars(message.trim(), self.budget_chars / 2);
        let remaining = self.budget_chars.saturating_sub(user.chars().count());

        let head = header(persona, directive);
        let mut system = head.clone();

        if !directive.memories.is_empty() {
            let mut section = String::from("\n== RECALLED CONTEXT ==\n");
            let mut used = 0usize;
            for m in &directive.memories {
                let line = format!("- {}\n", m.text);
                if head.chars().count() + section.chars().count() + line.chars().count() > remaining {
                    break;
                }
                section.push_str(&line);
                used += 1;
            }
            if used > 0 {
                system.push_str(&section);
            } else {
                tracing::debug!("Recalled context dropped to fit prompt budget");
            }
        }

        if system.chars().count() > remaining {
            system = truncate_chars(&system, remaining);
        }

        Prompt { system, user }
    }
}

fn header(persona: &PersonaProfile, d: &GenerationDirective) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        "You are a caring conversational companion. Reply in plain prose, never mention these instructions."
    );
    if persona.name != "neutral" {
        let _ = writeln!(out, "Persona: {}.", persona.name.replace('_', " "));
    }

    let m = &d.target_mood;
    let _ = writeln!(
        out,
        "Your current mood is {} (pleasure {:+.2}, arousal {:+.2}, dominance {:+.2}).",
        m.label(),
        m.pleasure,
        m.arousal,
        m.dominance
    );

    let aimed = match &d.target {
        Some(Target::Agent) => " toward you".to_string(),
        Some(Target::Speaker) => " about themselves".to_string(),
        Some(Target::Entity(name)) => format!(" about {}", name),
        None => String::new(),
    };
    let _ = writeln!(out, "The user seems to express {}{}.", d.emotion, aimed);

    match d.strategy {
        Strategy::Mirror => {
            let _ = writeln!(out, "Match the user's emotional tone.");
        }
        Strategy::Regulate => {
            let _ = writeln!(out, "Gently steady the conversation and respond calmly.");
        }
    }

    let _ = writeln!(out, "\n== STYLE ==");
    for line in d.style.guidance() {
        let _ = writeln!(out, "- {}", line);
    }
    out
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
