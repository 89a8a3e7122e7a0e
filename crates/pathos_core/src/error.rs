//! Configuration errors.
//!
//! Subsystem functions clamp instead of failing; only configuration is
//! rejected outright, and always with the offending field named.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    #[error("{field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Validate that `value` is finite and inside `[min, max]`.
pub fn check_range(field: &str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite {
            field: field.to_string(),
        });
    }
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field: field.to_string(),
            value: value as f64,
            min: min as f64,
            max: max as f64,
        });
    }
    Ok(())
}
