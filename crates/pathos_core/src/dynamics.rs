//! State Dynamics: how mood and neurochemistry evolve turn by turn
//!
//! Neurochemistry: level' = baseline + (level - baseline) * (1 - rate)^dt + impulse
//! Mood:           mood'  = inertia * mood + (1 - inertia) * target
//!
//! where the mood target is a single weighted sum of the persona baseline,
//! the appraisal delta and the neurochemistry bias. Time is measured in
//! elapsed turns, never wall-clock, so every run is replayable.

use crate::affect::{sanitize_f32, MoodState};
use crate::appraisal::AppraisalResult;
use crate::config::{DecayRates, DynamicsConfig, PathosConfig};
use crate::neuro::NeurochemistryState;
use crate::persona::PersonaProfile;

/// Trait for implementing state dynamics
pub trait Dynamics: Send + Sync {
    /// Advance neurochemistry by `dt` turns given one appraisal.
    fn step(
        &self,
        state: &NeurochemistryState,
        appraisal: &AppraisalResult,
        dt: f32,
    ) -> NeurochemistryState;

    /// Move the mood toward the combined target, with inertia.
    fn update(
        &self,
        mood: &MoodState,
        neuro: &NeurochemistryState,
        appraisal: &AppraisalResult,
        persona: &PersonaProfile,
    ) -> MoodState;

    /// Resting neurochemistry this dynamics decays toward.
    fn neuro_baseline(&self) -> NeurochemistryState;

    /// Fold `turns` stimulus-free turns over the state.
    fn idle(
        &self,
        mood: &MoodState,
        neuro: &NeurochemistryState,
        persona: &PersonaProfile,
        turns: u32,
    ) -> (MoodState, NeurochemistryState) {
        let quiet = AppraisalResult::neutral(0.0);
        (0..turns).fold((*mood, *neuro), |(m, n), _| {
            let n = self.step(&n, &quiet, 1.0);
            let m = self.update(&m, &n, &quiet, persona);
            (m, n)
        })
    }
}

/// Default exponential-decay dynamics with linear impulses.
#[derive(Debug, Clone)]
pub struct DefaultDynamics {
    pub params: DynamicsConfig,
    pub decay: DecayRates,

    /// Resting mood before persona bias.
    pub mood_rest: MoodState,
    /// Resting neurochemistry after persona shift.
    pub neuro_rest: NeurochemistryState,
}

impl Default for DefaultDynamics {
    fn default() -> Self {
        Self {
            params: DynamicsConfig::default(),
            decay: DecayRates::default(),
            mood_rest: MoodState::neutral(),
            neuro_rest: NeurochemistryState::resting(),
        }
    }
}

impl DefaultDynamics {
    pub fn from_config(config: &PathosConfig) -> Self {
        Self {
            params: config.dynamics.clone(),
            decay: config.decay_rates.clone(),
            mood_rest: MoodState::neutral(),
            neuro_rest: config.persona.neuro_baseline(&NeurochemistryState::resting()),
        }
    }

    /// Per-modulator impulses (dopamine, serotonin, noradrenaline) for one appraisal.
    ///
    /// Positive valence feeds dopamine and, more weakly, serotonin; negative
    /// valence drains serotonin and adds tension; arousal raises noradrenaline.
    pub fn impulses(&self, appraisal: &AppraisalResult) -> (f32, f32, f32) {
        let conf = appraisal.confidence.clamp(0.0, 1.0);
        let lr = self.params.impulse_gain;
        let p = sanitize_f32(appraisal.valence_delta, 0.0) * conf;
        let a = sanitize_f32(appraisal.arousal_delta, 0.0) * conf;
        let d = sanitize_f32(appraisal.dominance_delta, 0.0) * conf;

        let mut dopamine = 0.1 * lr * d;
        let mut serotonin = 0.0;
        let mut noradrenaline = 0.0;

        if p > 0.0 {
            dopamine += lr * p;
            serotonin += 0.5 * lr * p;
        } else if p < 0.0 {
            serotonin -= 0.5 * lr * p.abs();
            noradrenaline += 0.4 * lr * p.abs();
        }
        if a > 0.0 {
            noradrenaline += 0.6 * lr * a;
        }

        let cap = self.params.max_impulse;
        (
            dopamine.clamp(-cap, cap),
            serotonin.clamp(-cap, cap),
            noradrenaline.clamp(-cap, cap),
        )
    }

    fn decay_factor(&self, dt: f32) -> f32 {
        let dt = sanitize_f32(dt, 1.0).max(0.0);
        (1.0 - self.decay.neurochemistry).clamp(0.0, 1.0).powf(dt)
    }
}

impl Dynamics for DefaultDynamics {
    fn step(
        &self,
        state: &NeurochemistryState,
        appraisal: &AppraisalResult,
        dt: f32,
    ) -> NeurochemistryState {
        let k = self.decay_factor(dt);
        let base = &self.neuro_rest;
        let state = state.clamped();
        let (di, si, ni) = self.impulses(appraisal);

        NeurochemistryState::new(
            base.dopamine + (state.dopamine - base.dopamine) * k + di,
            base.serotonin + (state.serotonin - base.serotonin) * k + si,
            base.noradrenaline + (state.noradrenaline - base.noradrenaline) * k + ni,
        )
    }

    fn update(
        &self,
        mood: &MoodState,
        neuro: &NeurochemistryState,
        appraisal: &AppraisalResult,
        persona: &PersonaProfile,
    ) -> MoodState {
        let baseline = persona.effective_baseline(&self.mood_rest);
        let conf = appraisal.confidence.clamp(0.0, 1.0);

        let target = baseline
            .add(&appraisal.delta().scale(conf * self.params.appraisal_weight))
            .add(&neuro.pad_bias(&self.neuro_rest).scale(self.params.neuro_weight))
            .clamped();

        let inertia = persona.effective_inertia(self.decay.mood_inertia);
        mood.clamped().lerp(&target, 1.0 - inertia).clamped()
    }

    fn neuro_baseline(&self) -> NeurochemistryState {
        self.neuro_rest
    }
}
