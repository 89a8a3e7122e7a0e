use crate::attachment::AttachmentStyle;
use crate::error::{check_range, ConfigError};
use crate::persona::PersonaProfile;
use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathosConfig {
    pub persona: PersonaProfile,
    pub attachment_style: AttachmentStyle,
    pub memory: MemoryConfig,
    pub decay_rates: DecayRates,
    pub dynamics: DynamicsConfig,
    pub safety: SafetyConfig,
    pub llm: LlmConfig,
    pub session: SessionConfig,
}

impl PathosConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied and the result is validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config =
            Self::from_toml_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        config.validate().with_context(|| "Invalid config")?;
        Ok(config)
    }

    /// Try to load from path; if the file is missing or invalid, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({:#}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                if let Err(e) = cfg.validate() {
                    tracing::warn!("Ignoring invalid env overrides: {}", e);
                    return Self::default();
                }
                cfg
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PATHOS_LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("PATHOS_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("PATHOS_LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("PATHOS_LLM_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.llm.timeout_secs = n;
            }
        }
    }

    /// Reject out-of-range values. Never clamps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.persona.validate()?;
        self.memory.validate()?;
        self.decay_rates.validate()?;
        self.dynamics.validate()?;
        self.safety.validate()?;
        self.llm.validate()?;
        Ok(())
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Short-term buffer size (FIFO)
    pub stm_capacity: usize,
    pub ltm_capacity: usize,
    /// STM records at or above this salience are promoted to LTM.
    pub promotion_salience: f32,
    /// STM records mentioned at least this many times are promoted.
    pub promotion_mentions: u32,
    /// Salience boost applied when an LTM record is referenced again.
    pub reinforcement_boost: f32,
    /// LTM records whose effective salience drops below this are evicted.
    pub salience_floor: f32,
    /// Memories recalled per turn
    pub recall_k: usize,
    /// Upper bound on memory excerpt characters handed to the model.
    pub max_context_chars: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            stm_capacity: 20,
            ltm_capacity: 12,
            promotion_salience: 0.6,
            promotion_mentions: 3,
            reinforcement_boost: 0.1,
            salience_floor: 0.1,
            recall_k: 3,
            max_context_chars: 600,
        }
    }
}

impl MemoryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.stm_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "memory.stm_capacity".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.ltm_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "memory.ltm_capacity".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.promotion_mentions == 0 {
            return Err(ConfigError::Invalid {
                field: "memory.promotion_mentions".into(),
                reason: "must be at least 1".into(),
            });
        }
        check_range("memory.promotion_salience", self.promotion_salience, 0.0, 1.0)?;
        check_range("memory.reinforcement_boost", self.reinforcement_boost, 0.0, 1.0)?;
        check_range("memory.salience_floor", self.salience_floor, 0.0, 1.0)?;
        if self.salience_floor >= self.promotion_salience {
            return Err(ConfigError::Invalid {
                field: "memory.salience_floor".into(),
                reason: "must be below memory.promotion_salience".into(),
            });
        }
        Ok(())
    }
}

/// Per-subsystem decay rates, all per elapsed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayRates {
    /// Share of the current mood kept each turn (0 = snap to target, 1 = frozen).
    pub mood_inertia: f32,
    /// Fraction of each modulator's distance to baseline removed per turn.
    pub neurochemistry: f32,
    /// Exponential salience decay for STM records.
    pub stm: f32,
    /// Exponential salience decay for LTM records.
    pub ltm: f32,
}

impl Default for DecayRates {
    fn default() -> Self {
        Self {
            mood_inertia: 0.7,
            neurochemistry: 0.1,
            stm: 0.15,
            ltm: 0.03,
        }
    }
}

impl DecayRates {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range("decay_rates.mood_inertia", self.mood_inertia, 0.0, 0.99)?;
        check_range("decay_rates.neurochemistry", self.neurochemistry, 0.0, 1.0)?;
        check_range("decay_rates.stm", self.stm, 0.0, 5.0)?;
        check_range("decay_rates.ltm", self.ltm, 0.0, 5.0)?;
        Ok(())
    }
}

/// Coupling coefficients between subsystems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsConfig {
    /// Learning rate from appraisal deltas to neuromodulator impulses.
    pub impulse_gain: f32,
    /// Largest impulse any single modulator can receive in one turn.
    pub max_impulse: f32,
    /// Weight of the neurochemistry PAD bias in the mood target.
    pub neuro_weight: f32,
    /// Weight of the appraisal delta in the mood target.
    pub appraisal_weight: f32,
    /// Turns of mood/neuro history kept on the session.
    pub history_len: usize,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            impulse_gain: 0.4,
            max_impulse: 0.25,
            neuro_weight: 0.4,
            appraisal_weight: 1.0,
            history_len: 64,
        }
    }
}

impl DynamicsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range("dynamics.impulse_gain", self.impulse_gain, 0.0, 2.0)?;
        check_range("dynamics.max_impulse", self.max_impulse, 0.0, 1.0)?;
        check_range("dynamics.neuro_weight", self.neuro_weight, 0.0, 1.0)?;
        check_range("dynamics.appraisal_weight", self.appraisal_weight, 0.0, 2.0)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Summed crisis indicator weight at which a turn is flagged.
    pub crisis_threshold: f32,
    /// Sent instead of a model reply on flagged turns.
    pub crisis_reply: String,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            crisis_threshold: 0.5,
            crisis_reply: "I'm really sorry you're going through this. I'm not able to help in an \
                emergency, but you don't have to face it alone. Please contact local emergency \
                services or a crisis line such as Samaritans (116 123 in the UK and Ireland) \
                right now."
                .to_string(),
        }
    }
}

impl SafetyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range("safety.crisis_threshold", self.crisis_threshold, 0.05, 1.0)?;
        if self.crisis_reply.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "safety.crisis_reply".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "ollama", "openai" or "mock"
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Hard bound on a single generate call, retries included.
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Reply used when the model times out or fails.
    pub fallback_reply: String,
    /// Character budget for the assembled prompt.
    pub context_budget_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3".to_string(),
            base_url: None,
            max_tokens: 512,
            temperature: 0.7,
            timeout_secs: 30,
            max_retries: 2,
            fallback_reply: "(Fallback) I'm having trouble reaching the language model right \
                now, but I'm still here and listening."
                .to_string(),
            context_budget_chars: 8_000,
        }
    }
}

impl LlmConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range("llm.temperature", self.temperature, 0.0, 2.0)?;
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "llm.timeout_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.fallback_reply.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "llm.fallback_reply".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    pub db_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Memory,
            db_path: "pathos.db".to_string(),
        }
    }
}

// ============================================================================
// Last-known-good handle
// ============================================================================

/// Shared, read-mostly config. Readers never block; `replace` only swaps in
/// a candidate that validates.
pub struct ConfigHandle {
    inner: ArcSwap<PathosConfig>,
}

impl ConfigHandle {
    pub fn new(config: PathosConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            inner: ArcSwap::from_pointee(config),
        })
    }

    pub fn current(&self) -> Arc<PathosConfig> {
        self.inner.load_full()
    }

    /// Validate and swap. On error the previous config stays active.
    pub fn replace(&self, candidate: PathosConfig) -> Result<(), ConfigError> {
        match candidate.validate() {
            Ok(()) => {
                self.inner.store(Arc::new(candidate));
                tracing::info!("Configuration updated");
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Rejected configuration, keeping last-known-good: {}", e);
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("config", &self.current())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
