//! Persona modulation.
//!
//! A persona is a slow-changing bias (optimism, energy, confidence) that
//! offsets the resting mood, shifts the neurochemical baseline, speeds up or
//! slows down mood inertia and optionally pins some style knobs.
//! It only changes through explicit `adjust` calls.

use crate::affect::MoodState;
use crate::error::{check_range, ConfigError};
use crate::neuro::NeurochemistryState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaBias {
    /// Offsets pleasure. -1.0 to 1.0
    pub optimism: f32,
    /// Offsets arousal and loosens mood inertia. -1.0 to 1.0
    pub energy: f32,
    /// Offsets dominance. -1.0 to 1.0
    pub confidence: f32,
}

/// Slider movement for `PersonaBias::adjust`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaDelta {
    pub optimism: f32,
    pub energy: f32,
    pub confidence: f32,
}

impl PersonaBias {
    pub fn new(optimism: f32, energy: f32, confidence: f32) -> Result<Self, ConfigError> {
        let bias = Self {
            optimism,
            energy,
            confidence,
        };
        bias.validate()?;
        Ok(bias)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("persona.optimism", self.optimism, -1.0, 1.0)?;
        check_range("persona.energy", self.energy, -1.0, 1.0)?;
        check_range("persona.confidence", self.confidence, -1.0, 1.0)?;
        Ok(())
    }

    /// Apply slider deltas. Results outside [-1, 1] are rejected rather than
    /// clamped, leaving `self` as the last-known-good bias. Sums that miss a
    /// bound only by float rounding land on the bound.
    pub fn adjust(&self, delta: PersonaDelta) -> Result<PersonaBias, ConfigError> {
        PersonaBias::new(
            snap_to_bound(self.optimism + delta.optimism),
            snap_to_bound(self.energy + delta.energy),
            snap_to_bound(self.confidence + delta.confidence),
        )
    }

    pub fn as_offset(&self) -> MoodState {
        MoodState {
            pleasure: self.optimism,
            arousal: self.energy,
            dominance: self.confidence,
        }
    }
}

const BOUND_EPSILON: f32 = 1e-5;

fn snap_to_bound(value: f32) -> f32 {
    if (value.abs() - 1.0).abs() <= BOUND_EPSILON {
        value.signum()
    } else {
        value
    }
}

/// Pure linear blend: `base + weight * bias`, clamped to the PAD cube.
pub fn apply(base_baseline: &MoodState, persona: &PersonaBias, weight: f32) -> MoodState {
    base_baseline
        .add(&persona.as_offset().scale(weight.clamp(0.0, 1.0)))
        .clamped()
}

/// Optional hard overrides for style knobs, all in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleOverrides {
    pub formality: Option<f32>,
    /// 1 = very direct, 0 = very hedged
    pub directness: Option<f32>,
    pub emoji: Option<f32>,
}

impl StyleOverrides {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(v) = self.formality {
            check_range("persona.style.formality", v, 0.0, 1.0)?;
        }
        if let Some(v) = self.directness {
            check_range("persona.style.directness", v, 0.0, 1.0)?;
        }
        if let Some(v) = self.emoji {
            check_range("persona.style.emoji", v, 0.0, 1.0)?;
        }
        Ok(())
    }
}

/// Offsets applied to the neurochemical resting levels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuroShift {
    pub dopamine: f32,
    pub serotonin: f32,
    pub noradrenaline: f32,
}

/// A complete persona: bias, how strongly it applies, and its side effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaProfile {
    pub name: String,
    #[serde(flatten)]
    pub bias: PersonaBias,
    /// How strongly the persona biases mood & style (0.0 - 1.0)
    pub weight: f32,
    pub neuro_shift: NeuroShift,
    pub style: StyleOverrides,
}

impl Default for PersonaProfile {
    fn default() -> Self {
        Self {
            name: "neutral".to_string(),
            bias: PersonaBias::default(),
            weight: 0.5,
            neuro_shift: NeuroShift::default(),
            style: StyleOverrides::default(),
        }
    }
}

impl PersonaProfile {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bias.validate()?;
        check_range("persona.weight", self.weight, 0.0, 1.0)?;
        check_range("persona.neuro_shift.dopamine", self.neuro_shift.dopamine, -0.5, 0.5)?;
        check_range("persona.neuro_shift.serotonin", self.neuro_shift.serotonin, -0.5, 0.5)?;
        check_range(
            "persona.neuro_shift.noradrenaline",
            self.neuro_shift.noradrenaline,
            -0.5,
            0.5,
        )?;
        self.style.validate()
    }

    /// Resting mood the conversation decays toward.
    pub fn effective_baseline(&self, base: &MoodState) -> MoodState {
        apply(base, &self.bias, self.weight)
    }

    /// Resting neurochemistry after the persona's shift.
    pub fn neuro_baseline(&self, base: &NeurochemistryState) -> NeurochemistryState {
        base.shifted(
            self.neuro_shift.dopamine,
            self.neuro_shift.serotonin,
            self.neuro_shift.noradrenaline,
        )
    }

    /// Energetic personas change mood faster; low-energy ones are stickier.
    pub fn effective_inertia(&self, base_inertia: f32) -> f32 {
        (base_inertia - 0.15 * self.bias.energy * self.weight).clamp(0.05, 0.95)
    }

    pub fn preset(name: &str) -> Option<PersonaProfile> {
        let key = name.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        let profile = match key.as_str() {
            "neutral" => PersonaProfile::default(),
            "calm_therapist" => PersonaProfile {
                name: "calm_therapist".to_string(),
                bias: PersonaBias {
                    optimism: 0.2,
                    energy: -0.2,
                    confidence: 0.1,
                },
                weight: 0.5,
                neuro_shift: NeuroShift {
                    dopamine: 0.05,
                    serotonin: 0.15,
                    noradrenaline: -0.1,
                },
                style: StyleOverrides {
                    formality: Some(0.7),
                    directness: Some(0.5),
                    emoji: Some(0.2),
                },
            },
            "supportive_friend" => PersonaProfile {
                name: "supportive_friend".to_string(),
                bias: PersonaBias {
                    optimism: 0.3,
                    energy: 0.1,
                    confidence: 0.0,
                },
                weight: 0.5,
                neuro_shift: NeuroShift {
                    dopamine: 0.1,
                    serotonin: 0.05,
                    noradrenaline: 0.0,
                },
                style: StyleOverrides {
                    formality: Some(0.3),
                    directness: Some(0.6),
                    emoji: Some(0.7),
                },
            },
            "analytical_scientist" => PersonaProfile {
                name: "analytical_scientist".to_string(),
                bias: PersonaBias {
                    optimism: 0.1,
                    energy: 0.0,
                    confidence: 0.2,
                },
                weight: 0.5,
                neuro_shift: NeuroShift::default(),
                style: StyleOverrides {
                    formality: Some(0.8),
                    directness: Some(0.8),
                    emoji: Some(0.1),
                },
            },
            _ => return None,
        };
        Some(profile)
    }

    pub fn preset_names() -> &'static [&'static str] {
        &[
            "neutral",
            "calm_therapist",
            "supportive_friend",
            "analytical_scientist",
        ]
    }
}
