//! Discrete topic states and the mass-carrying state vector.

use std::ops::Index;

use serde::{Deserialize, Serialize};

use super::{MASS_EPSILON, STATE_COUNT};
use crate::types::error::{KsError, KsResult};

/// Ordered engagement state of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TopicState {
    /// No meaningful interaction yet.
    Latent = 0,
    /// The user has come across the topic.
    Discovered = 1,
    /// The user is actively working with the topic.
    Engaged = 2,
    /// Interaction has accumulated past the top threshold.
    Saturated = 3,
}

impl TopicState {
    /// All states in ascending order.
    pub const ALL: [TopicState; STATE_COUNT] = [
        Self::Latent,
        Self::Discovered,
        Self::Engaged,
        Self::Saturated,
    ];

    /// Convert an index to a TopicState, returning None for invalid values.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Latent),
            1 => Some(Self::Discovered),
            2 => Some(Self::Engaged),
            3 => Some(Self::Saturated),
            _ => None,
        }
    }

    /// Position of this state inside a [`StateVector`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Return a human-readable name for this state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Latent => "latent",
            Self::Discovered => "discovered",
            Self::Engaged => "engaged",
            Self::Saturated => "saturated",
        }
    }

    /// Parse a state from a string name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "latent" => Some(Self::Latent),
            "discovered" => Some(Self::Discovered),
            "engaged" => Some(Self::Engaged),
            "saturated" => Some(Self::Saturated),
            _ => None,
        }
    }
}

impl std::fmt::Display for TopicState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Mass distributed over the four topic states, indexed by [`TopicState`].
///
/// Every vector the engine produces sums to a fixed total mass. The engine
/// only ever relocates whole buckets, so the sum never drifts. Decoding goes
/// through [`StateVector::new`], so a persisted vector with a negative entry
/// is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "[f64; STATE_COUNT]", into = "[f64; STATE_COUNT]")]
pub struct StateVector([f64; STATE_COUNT]);

impl StateVector {
    /// Build a vector from raw values, rejecting negative or non-finite entries.
    pub fn new(values: [f64; STATE_COUNT]) -> KsResult<Self> {
        for (i, v) in values.iter().enumerate() {
            if !v.is_finite() || *v < 0.0 {
                return Err(KsError::invalid(format!(
                    "state vector entry {i} must be a finite non-negative number, got {v}"
                )));
            }
        }
        Ok(Self(values))
    }

    /// All-zero vector.
    pub fn zeros() -> Self {
        Self([0.0; STATE_COUNT])
    }

    /// Vector with the full `mass` placed on `state`.
    pub fn one_hot(state: TopicState, mass: f64) -> Self {
        let mut values = [0.0; STATE_COUNT];
        values[state.index()] = mass;
        Self(values)
    }

    /// Underlying values.
    pub fn as_array(&self) -> &[f64; STATE_COUNT] {
        &self.0
    }

    /// Consume into the underlying values.
    pub fn into_array(self) -> [f64; STATE_COUNT] {
        self.0
    }

    /// Mass held by a single state.
    pub fn mass_of(&self, state: TopicState) -> f64 {
        self.0[state.index()]
    }

    /// Sum of all entries.
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Whether the vector sums to `mass` within [`MASS_EPSILON`].
    pub fn is_conserved(&self, mass: f64) -> bool {
        (self.sum() - mass).abs() <= MASS_EPSILON
    }

    /// The state holding the most mass. Ties resolve to the lower state.
    pub fn dominant_state(&self) -> TopicState {
        let mut best = 0;
        for i in 1..STATE_COUNT {
            if self.0[i] > self.0[best] {
                best = i;
            }
        }
        TopicState::from_index(best).unwrap_or(TopicState::Latent)
    }

    /// Move the entire bucket at `from` onto `to`.
    pub(crate) fn relocate(&mut self, from: usize, to: usize) {
        let moved = self.0[from];
        self.0[from] = 0.0;
        self.0[to] += moved;
    }

    /// Add `weight * other` element-wise.
    pub(crate) fn add_scaled(&mut self, other: &StateVector, weight: f64) {
        for i in 0..STATE_COUNT {
            self.0[i] += other.0[i] * weight;
        }
    }

    /// Multiply every entry by `factor`.
    pub(crate) fn scale(&mut self, factor: f64) {
        for v in &mut self.0 {
            *v *= factor;
        }
    }
}

impl Index<usize> for StateVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl Index<TopicState> for StateVector {
    type Output = f64;

    fn index(&self, state: TopicState) -> &f64 {
        &self.0[state.index()]
    }
}

impl TryFrom<[f64; STATE_COUNT]> for StateVector {
    type Error = KsError;

    fn try_from(values: [f64; STATE_COUNT]) -> KsResult<Self> {
        Self::new(values)
    }
}

impl From<StateVector> for [f64; STATE_COUNT] {
    fn from(vector: StateVector) -> Self {
        vector.0
    }
}
