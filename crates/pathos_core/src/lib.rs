//! Affect model for a conversational agent.
//!
//! Pure, deterministic state and update rules: PAD mood, simulated
//! neurochemistry, message appraisal, persona bias, attachment, crisis
//! detection and the configuration surface that parameterizes them.

pub mod affect;
pub mod appraisal;
pub mod attachment;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod neuro;
pub mod persona;
pub mod safety;

pub use affect::MoodState;
pub use appraisal::{appraise, AppraisalResult, ConversationContext, EmotionTag, InputIssue, Target};
pub use attachment::{AttachmentState, AttachmentStyle};
pub use config::{ConfigHandle, PathosConfig};
pub use dynamics::{DefaultDynamics, Dynamics};
pub use error::ConfigError;
pub use neuro::{Modulator, NeurochemistryState};
pub use persona::{PersonaBias, PersonaDelta, PersonaProfile};
pub use safety::{assess, SafetyContext};
