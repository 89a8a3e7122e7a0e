//! Affect Model based on Mehrabian's Pleasure-Arousal-Dominance space
//!
//! Mood is a point in a continuous 3D cube rather than a discrete label.
//! Every axis lives in [-1, 1]; every constructor and every update clamps.

use serde::{Deserialize, Deserializer, Serialize};

/// Guard against NaN and Infinity in state values.
/// If the value is NaN or Inf, replace with the provided fallback (homeostatic default).
#[inline]
pub(crate) fn sanitize_f32(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        tracing::warn!("NaN/Inf detected in affect state, resetting to fallback {}", fallback);
        fallback
    }
}

/// Deserialize an f32, mapping non-finite or missing-precision junk to 0.0.
///
/// Snapshots written by older builds (or edited by hand) must never smuggle
/// NaN into the running simulation.
pub fn deserialize_safe_f32<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let v = f64::deserialize(deserializer)? as f32;
    Ok(if v.is_finite() { v } else { 0.0 })
}

/// A PAD mood vector.
///
/// Used both for the live mood of a conversation and for deltas/offsets
/// (appraisal prototypes, persona bias, neurochemistry bias), which share
/// the same [-1, 1] range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoodState {
    /// Pleasure / valence: displeasure (-1) to pleasure (+1)
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub pleasure: f32,

    /// Arousal: calm (-1) to activated (+1)
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub arousal: f32,

    /// Dominance: submissive (-1) to in control (+1)
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub dominance: f32,
}

impl Default for MoodState {
    fn default() -> Self {
        Self::neutral()
    }
}

impl MoodState {
    pub fn new(pleasure: f32, arousal: f32, dominance: f32) -> Self {
        Self {
            pleasure,
            arousal,
            dominance,
        }
        .clamped()
    }

    pub const fn neutral() -> Self {
        Self {
            pleasure: 0.0,
            arousal: 0.0,
            dominance: 0.0,
        }
    }

    /// Clamp every axis to [-1, 1], replacing non-finite values with 0.
    pub fn clamped(self) -> Self {
        Self {
            pleasure: sanitize_f32(self.pleasure, 0.0).clamp(-1.0, 1.0),
            arousal: sanitize_f32(self.arousal, 0.0).clamp(-1.0, 1.0),
            dominance: sanitize_f32(self.dominance, 0.0).clamp(-1.0, 1.0),
        }
    }

    pub fn scale(&self, factor: f32) -> Self {
        Self {
            pleasure: self.pleasure * factor,
            arousal: self.arousal * factor,
            dominance: self.dominance * factor,
        }
    }

    /// Component-wise sum. Not clamped: callers combine several terms and
    /// clamp once at the end.
    pub fn add(&self, other: &MoodState) -> Self {
        Self {
            pleasure: self.pleasure + other.pleasure,
            arousal: self.arousal + other.arousal,
            dominance: self.dominance + other.dominance,
        }
    }

    pub fn sub(&self, other: &MoodState) -> Self {
        Self {
            pleasure: self.pleasure - other.pleasure,
            arousal: self.arousal - other.arousal,
            dominance: self.dominance - other.dominance,
        }
    }

    /// Interpolate between two moods
    pub fn lerp(&self, other: &MoodState, t: f32) -> MoodState {
        let t = t.clamp(0.0, 1.0);
        MoodState {
            pleasure: self.pleasure + (other.pleasure - self.pleasure) * t,
            arousal: self.arousal + (other.arousal - self.arousal) * t,
            dominance: self.dominance + (other.dominance - self.dominance) * t,
        }
    }

    /// Euclidean distance between two points in PAD space.
    pub fn distance(&self, other: &MoodState) -> f32 {
        let d = self.sub(other);
        (d.pleasure.powi(2) + d.arousal.powi(2) + d.dominance.powi(2)).sqrt()
    }

    /// Sum of absolute components; used to describe how much a turn moved the mood.
    pub fn magnitude_l1(&self) -> f32 {
        self.pleasure.abs() + self.arousal.abs() + self.dominance.abs()
    }

    pub fn as_tuple(&self) -> (f32, f32, f32) {
        (self.pleasure, self.arousal, self.dominance)
    }

    /// Describe the mood as three axis phrases, e.g. "high pleasure".
    pub fn describe_axes(&self) -> [String; 3] {
        [
            describe_axis("pleasure", self.pleasure),
            describe_axis("arousal", self.arousal),
            describe_axis("dominance", self.dominance),
        ]
    }

    /// Closest coarse label, for logs and compact prompt lines.
    pub fn label(&self) -> &'static str {
        if self.magnitude_l1() < 0.15 {
            return "neutral";
        }
        match (self.pleasure >= 0.0, self.arousal >= 0.0, self.dominance >= 0.0) {
            (true, true, true) => "exuberant",
            (true, true, false) => "dependent",
            (true, false, true) => "relaxed",
            (true, false, false) => "docile",
            (false, true, true) => "hostile",
            (false, true, false) => "anxious",
            (false, false, true) => "disdainful",
            (false, false, false) => "bored",
        }
    }
}

fn describe_axis(name: &str, v: f32) -> String {
    if v > 0.4 {
        format!("high {}", name)
    } else if v > 0.15 {
        format!("slightly elevated {}", name)
    } else if v < -0.4 {
        format!("very low {}", name)
    } else if v < -0.15 {
        format!("slightly reduced {}", name)
    } else {
        format!("neutral {}", name)
    }
}
