//! State classifier: evidence scalar to discrete topic state.

use serde::{Deserialize, Serialize};

use crate::types::error::{KsError, KsResult};
use crate::types::{StateVector, TopicState};

/// Three strictly increasing evidence thresholds.
///
/// Bands are closed on the left: `[0, discovered)` is Latent,
/// `[discovered, engaged)` is Discovered, `[engaged, saturated)` is Engaged
/// and `[saturated, inf)` is Saturated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Evidence at which a topic becomes Discovered.
    pub discovered: f64,
    /// Evidence at which a topic becomes Engaged.
    pub engaged: f64,
    /// Evidence at which a topic becomes Saturated.
    pub saturated: f64,
}

impl Thresholds {
    /// Create thresholds, requiring `0 < discovered < engaged < saturated`.
    pub fn new(discovered: f64, engaged: f64, saturated: f64) -> KsResult<Self> {
        let thresholds = Self {
            discovered,
            engaged,
            saturated,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Check the ordering invariant.
    pub fn validate(&self) -> KsResult<()> {
        let ordered = self.discovered > 0.0
            && self.discovered < self.engaged
            && self.engaged < self.saturated
            && self.saturated.is_finite();
        if ordered {
            Ok(())
        } else {
            Err(KsError::invalid(format!(
                "thresholds must be positive and strictly increasing, got {} / {} / {}",
                self.discovered, self.engaged, self.saturated
            )))
        }
    }

    /// Map an evidence value to its state.
    pub fn classify(&self, evidence: f64) -> TopicState {
        if evidence >= self.saturated {
            TopicState::Saturated
        } else if evidence >= self.engaged {
            TopicState::Engaged
        } else if evidence >= self.discovered {
            TopicState::Discovered
        } else {
            TopicState::Latent
        }
    }

    /// Like [`Thresholds::classify`], but rejects negative or NaN evidence.
    pub fn classify_checked(&self, evidence: f64) -> KsResult<TopicState> {
        if evidence.is_nan() || evidence < 0.0 {
            return Err(KsError::invalid(format!(
                "evidence must be >= 0, got {evidence}"
            )));
        }
        Ok(self.classify(evidence))
    }

    /// Lower bound of the band belonging to `state`.
    pub fn lower_bound(&self, state: TopicState) -> f64 {
        match state {
            TopicState::Latent => 0.0,
            TopicState::Discovered => self.discovered,
            TopicState::Engaged => self.engaged,
            TopicState::Saturated => self.saturated,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            discovered: 1.0,
            engaged: 3.0,
            saturated: 6.0,
        }
    }
}

/// Classify `evidence` with the default thresholds.
pub fn classify(evidence: f64) -> TopicState {
    Thresholds::default().classify(evidence)
}

/// Vector with the whole `mass` on `state`.
///
/// Only used to initialise a fresh topic; transitions always move mass
/// inside the existing vector.
pub fn state_to_one_hot_vector(state: TopicState, mass: f64) -> StateVector {
    StateVector::one_hot(state, mass)
}
