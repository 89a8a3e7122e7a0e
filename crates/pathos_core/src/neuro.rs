//! Simulated neuromodulators.
//!
//! Three scalar levels in [0, 1]:
//! - dopamine: reward / motivation
//! - serotonin: safety / well-being
//! - noradrenaline: alertness / stress
//!
//! The levels themselves are inert data; `dynamics` owns how they move.

use crate::affect::{deserialize_safe_f32, sanitize_f32, MoodState};
use serde::{Deserialize, Serialize};

/// Which modulator an impulse or description refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modulator {
    Dopamine,
    Serotonin,
    Noradrenaline,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeurochemistryState {
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub dopamine: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub serotonin: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub noradrenaline: f32,
}

impl Default for NeurochemistryState {
    fn default() -> Self {
        Self::resting()
    }
}

impl NeurochemistryState {
    pub fn new(dopamine: f32, serotonin: f32, noradrenaline: f32) -> Self {
        Self {
            dopamine,
            serotonin,
            noradrenaline,
        }
        .clamped()
    }

    /// Default resting levels: mid dopamine/serotonin, lower noradrenaline.
    pub const fn resting() -> Self {
        Self {
            dopamine: 0.5,
            serotonin: 0.5,
            noradrenaline: 0.3,
        }
    }

    pub fn clamped(self) -> Self {
        let rest = Self::resting();
        Self {
            dopamine: sanitize_f32(self.dopamine, rest.dopamine).clamp(0.0, 1.0),
            serotonin: sanitize_f32(self.serotonin, rest.serotonin).clamp(0.0, 1.0),
            noradrenaline: sanitize_f32(self.noradrenaline, rest.noradrenaline).clamp(0.0, 1.0),
        }
    }

    pub fn level(&self, m: Modulator) -> f32 {
        match m {
            Modulator::Dopamine => self.dopamine,
            Modulator::Serotonin => self.serotonin,
            Modulator::Noradrenaline => self.noradrenaline,
        }
    }

    /// Shift every level by the given offsets (used for persona baseline shifts).
    pub fn shifted(&self, dopamine: f32, serotonin: f32, noradrenaline: f32) -> Self {
        Self::new(
            self.dopamine + dopamine,
            self.serotonin + serotonin,
            self.noradrenaline + noradrenaline,
        )
    }

    /// Map the deviation from `baseline` to a PAD bias.
    ///
    /// - Dopamine → positive valence & moderate arousal.
    /// - Serotonin → positive valence, slightly calmer & less dominant.
    /// - Noradrenaline → high arousal & dominance, slightly lower valence.
    ///
    /// At baseline the bias is exactly zero, so resting chemistry never
    /// drags the mood away from its persona baseline.
    pub fn pad_bias(&self, baseline: &NeurochemistryState) -> MoodState {
        let d = self.dopamine - baseline.dopamine;
        let s = self.serotonin - baseline.serotonin;
        let n = self.noradrenaline - baseline.noradrenaline;

        MoodState::new(
            0.5 * d + 0.6 * s - 0.2 * n,
            0.4 * d - 0.2 * s + 0.7 * n,
            0.3 * d - 0.3 * s + 0.6 * n,
        )
    }

    /// Short phrases describing levels that stand out from `baseline`.
    pub fn describe(&self, baseline: &NeurochemistryState) -> Vec<&'static str> {
        let mut out = Vec::new();
        let d = self.dopamine - baseline.dopamine;
        let s = self.serotonin - baseline.serotonin;
        let n = self.noradrenaline - baseline.noradrenaline;

        if d > 0.15 {
            out.push("dopamine is relatively high (more motivation/optimism)");
        } else if d < -0.15 {
            out.push("dopamine is lower than usual (less motivated)");
        }
        if s > 0.15 {
            out.push("serotonin is high (feeling calm and caring)");
        } else if s < -0.15 {
            out.push("serotonin is low (less sense of safety)");
        }
        if n > 0.15 {
            out.push("noradrenaline is high (alert and slightly tense)");
        } else if n < -0.15 {
            out.push("noradrenaline is low (very relaxed)");
        }
        if out.is_empty() {
            out.push("neurochemistry is roughly balanced");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_bias_zero_at_baseline() {
        let base = NeurochemistryState::resting();
        let bias = base.pad_bias(&base);
        assert!(bias.magnitude_l1() < 1e-6);
    }

    #[test]
    fn test_dopamine_pulls_pleasure_up() {
        let base = NeurochemistryState::resting();
        let high = NeurochemistryState::new(0.9, 0.5, 0.3);
        assert!(high.pad_bias(&base).pleasure > 0.0);
    }

    #[test]
    fn test_noradrenaline_pulls_arousal_up() {
        let base = NeurochemistryState::resting();
        let tense = NeurochemistryState::new(0.5, 0.5, 0.9);
        let bias = tense.pad_bias(&base);
        assert!(bias.arousal > 0.0);
        assert!(bias.pleasure < 0.0);
    }

    #[test]
    fn test_new_clamps() {
        let n = NeurochemistryState::new(2.0, -1.0, f32::NAN);
        assert_eq!(n.dopamine, 1.0);
        assert_eq!(n.serotonin, 0.0);
        assert_eq!(n.noradrenaline, 0.3);
    }

    #[test]
    fn test_describe_balanced() {
        let base = NeurochemistryState::resting();
        assert_eq!(base.describe(&base), vec!["neurochemistry is roughly balanced"]);
    }
}
