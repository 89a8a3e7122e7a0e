//! Attachment bond between the agent and the person it talks to.
//!
//! A single scalar in [0, 1] that grows slowly with warm exchanges and
//! shrinks with hostility aimed at the agent. The configured attachment
//! style scales how strongly positive and negative events register.

use crate::affect::{deserialize_safe_f32, sanitize_f32};
use crate::appraisal::{AppraisalResult, EmotionTag, Target};
use serde::{Deserialize, Serialize};

pub const INITIAL_BOND: f32 = 0.3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentStyle {
    #[default]
    Secure,
    Anxious,
    Avoidant,
    Disorganized,
}

impl AttachmentStyle {
    /// (positive gain, negative gain)
    pub fn gains(&self) -> (f32, f32) {
        match self {
            AttachmentStyle::Secure => (1.0, 1.0),
            AttachmentStyle::Anxious => (1.2, 1.5),
            AttachmentStyle::Avoidant => (0.5, 0.8),
            AttachmentStyle::Disorganized => (0.8, 1.5),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentStyle::Secure => "secure",
            AttachmentStyle::Anxious => "anxious",
            AttachmentStyle::Avoidant => "avoidant",
            AttachmentStyle::Disorganized => "disorganized",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttachmentState {
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub bond: f32,
}

impl Default for AttachmentState {
    fn default() -> Self {
        Self { bond: INITIAL_BOND }
    }
}

impl AttachmentState {
    /// Bond after one appraised turn. Pure.
    pub fn updated(
        &self,
        appraisal: &AppraisalResult,
        safety_flagged: bool,
        style: AttachmentStyle,
    ) -> AttachmentState {
        let (pos_gain, neg_gain) = style.gains();
        let at_agent = appraisal.target == Some(Target::Agent);
        let at_speaker = appraisal.target == Some(Target::Speaker);

        let mut delta = match appraisal.emotion {
            // Gratitude aimed at the agent ("thank you") counts at any polarity.
            EmotionTag::Gratitude if at_agent => 0.04 * pos_gain,
            EmotionTag::Gratitude | EmotionTag::Joy if appraisal.polarity > 0.2 => 0.04 * pos_gain,
            EmotionTag::Sadness | EmotionTag::Fear if at_speaker => 0.02 * pos_gain,
            EmotionTag::Anger | EmotionTag::Disgust if at_agent => -0.05 * neg_gain,
            _ => 0.0,
        };
        if safety_flagged {
            delta += 0.01;
        }

        AttachmentState {
            bond: (sanitize_f32(self.bond, INITIAL_BOND) + delta).clamp(0.0, 1.0),
        }
    }

    pub fn band(&self) -> &'static str {
        if self.bond > 0.7 {
            "strong"
        } else if self.bond > 0.4 {
            "growing"
        } else {
            "early"
        }
    }

    /// Warmth offset: +0.1 at full bond, -0.1 with no bond.
    pub fn warmth_nudge(&self) -> f32 {
        0.2 * (self.bond - 0.5)
    }
}
