//! Evidence decay: plain exponential decay and state-tiered decay.

use serde::{Deserialize, Serialize};

use super::classify::Thresholds;
use crate::types::error::{KsError, KsResult};
use crate::types::TopicState;

/// Per-day decay rate used when no state table applies.
pub const DEFAULT_DECAY_RATE: f64 = 0.05;

/// Per-day decay rates, one per topic state.
///
/// Higher states decay more slowly: established engagement fades later
/// than a single glance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayRates {
    pub latent: f64,
    pub discovered: f64,
    pub engaged: f64,
    pub saturated: f64,
}

impl DecayRates {
    /// The same rate for every state.
    pub fn uniform(rate: f64) -> Self {
        Self {
            latent: rate,
            discovered: rate,
            engaged: rate,
            saturated: rate,
        }
    }

    /// Base rate for a state.
    pub fn rate_for(&self, state: TopicState) -> f64 {
        match state {
            TopicState::Latent => self.latent,
            TopicState::Discovered => self.discovered,
            TopicState::Engaged => self.engaged,
            TopicState::Saturated => self.saturated,
        }
    }

    /// Reject negative or non-finite rates.
    pub fn validate(&self) -> KsResult<()> {
        for state in TopicState::ALL {
            let rate = self.rate_for(state);
            if !rate.is_finite() || rate < 0.0 {
                return Err(KsError::invalid(format!(
                    "decay rate for {state} must be >= 0, got {rate}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for DecayRates {
    fn default() -> Self {
        Self {
            latent: 0.10,
            discovered: 0.05,
            engaged: 0.03,
            saturated: 0.01,
        }
    }
}

/// Apply exponential decay: `evidence * e^(-rate * elapsed_days)`.
///
/// A negative `elapsed_days` leaves the evidence untouched (clock skew is
/// never treated as time passing).
pub fn apply_decay(evidence: f64, elapsed_days: f64, rate: f64) -> KsResult<f64> {
    if !evidence.is_finite() || evidence < 0.0 {
        return Err(KsError::invalid(format!(
            "evidence must be >= 0, got {evidence}"
        )));
    }
    if !rate.is_finite() || rate < 0.0 {
        return Err(KsError::invalid(format!(
            "decay rate must be >= 0, got {rate}"
        )));
    }
    if elapsed_days.is_nan() {
        return Err(KsError::invalid("elapsed days must be a number"));
    }
    if elapsed_days < 0.0 {
        log::debug!("negative elapsed time {elapsed_days} days, skipping decay");
        return Ok(evidence);
    }

    Ok(evidence * (-rate * elapsed_days).exp())
}

/// Decay model selecting its rate from the topic's current state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TieredDecay {
    pub thresholds: Thresholds,
    pub rates: DecayRates,
}

impl TieredDecay {
    /// Create a tiered decay model.
    pub fn new(thresholds: Thresholds, rates: DecayRates) -> Self {
        Self { thresholds, rates }
    }

    /// Effective per-day rate for `evidence`, scaled by `stale_multiplier`.
    ///
    /// The state is taken from the evidence before any decay is applied.
    pub fn effective_rate(&self, evidence: f64, stale_multiplier: f64) -> KsResult<f64> {
        if !stale_multiplier.is_finite() || stale_multiplier < 0.0 {
            return Err(KsError::invalid(format!(
                "stale multiplier must be >= 0, got {stale_multiplier}"
            )));
        }
        let state = self.thresholds.classify(evidence);
        Ok(self.rates.rate_for(state) * stale_multiplier)
    }

    /// Decay `evidence` at the rate of its current state.
    pub fn decay(&self, evidence: f64, elapsed_days: f64, stale_multiplier: f64) -> KsResult<f64> {
        let rate = self.effective_rate(evidence, stale_multiplier)?;
        apply_decay(evidence, elapsed_days, rate)
    }

    /// Age `current` by `elapsed_days`, then add `delta`.
    ///
    /// Decay always precedes the new contribution.
    pub fn accumulate(
        &self,
        current: f64,
        delta: f64,
        elapsed_days: f64,
        stale_multiplier: f64,
    ) -> KsResult<f64> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(KsError::invalid(format!(
                "evidence delta must be >= 0, got {delta}"
            )));
        }
        let decayed = self.decay(current, elapsed_days, stale_multiplier)?;
        Ok(decayed + delta)
    }
}

/// Tiered decay with the default thresholds and rate table.
pub fn tiered_decay(evidence: f64, elapsed_days: f64, stale_multiplier: f64) -> KsResult<f64> {
    TieredDecay::default().decay(evidence, elapsed_days, stale_multiplier)
}

/// Decay `current` with the default tiered model, then add `delta`.
pub fn accumulate(current: f64, delta: f64, elapsed_days: f64) -> KsResult<f64> {
    TieredDecay::default().accumulate(current, delta, elapsed_days, 1.0)
}
