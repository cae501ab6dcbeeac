//! Mass transition engine: relocates state-vector mass as evidence crosses thresholds.

use serde::Serialize;

use super::classify::Thresholds;
use crate::types::{StateVector, TopicState, MASS_EPSILON};

/// A completed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateTransition {
    pub from: TopicState,
    pub to: TopicState,
}

impl StateTransition {
    /// Number of thresholds crossed.
    pub fn steps(&self) -> usize {
        self.from.index().abs_diff(self.to.index())
    }

    /// Whether the topic moved to a higher state.
    pub fn is_forward(&self) -> bool {
        self.to > self.from
    }
}

/// Move all mass at `from` onto the higher state `to`. No-op when `from` is empty.
pub fn move_mass_forward(vector: &mut StateVector, from: TopicState, to: TopicState) {
    debug_assert!(from < to, "forward move from {from} to {to}");
    if from >= to || vector[from] == 0.0 {
        return;
    }
    relocate_checked(vector, from, to);
}

/// Move all mass at `from` onto the lower state `to`. No-op when `from` is empty.
pub fn move_mass_backward(vector: &mut StateVector, from: TopicState, to: TopicState) {
    debug_assert!(from > to, "backward move from {from} to {to}");
    if from <= to || vector[from] == 0.0 {
        return;
    }
    relocate_checked(vector, from, to);
}

fn relocate_checked(vector: &mut StateVector, from: TopicState, to: TopicState) {
    let before = vector.sum();
    vector.relocate(from.index(), to.index());
    debug_assert!(
        (vector.sum() - before).abs() <= MASS_EPSILON,
        "mass drifted from {before} to {} moving {from} -> {to}",
        vector.sum()
    );
}

/// Update `vector` for an evidence change from `old_evidence` to `new_evidence`.
///
/// Mass steps one state at a time, so a single update may cross several
/// thresholds (Latent straight to Engaged passes through Discovered).
/// Returns the transition performed, or `None` when both values fall in
/// the same band and the vector is left untouched.
pub fn handle_state_transition(
    vector: &mut StateVector,
    old_evidence: f64,
    new_evidence: f64,
    thresholds: &Thresholds,
) -> Option<StateTransition> {
    let old_state = thresholds.classify(old_evidence);
    let new_state = thresholds.classify(new_evidence);
    step_between(vector, old_state, new_state)
}

/// Step mass from `old_state` to `new_state` one band at a time.
pub fn step_between(
    vector: &mut StateVector,
    old_state: TopicState,
    new_state: TopicState,
) -> Option<StateTransition> {
    if old_state == new_state {
        return None;
    }

    let mut current = old_state.index();
    let target = new_state.index();
    while current != target {
        let next = if target > current {
            current + 1
        } else {
            current - 1
        };
        let (from, to) = match (TopicState::from_index(current), TopicState::from_index(next)) {
            (Some(from), Some(to)) => (from, to),
            _ => break,
        };
        if next > current {
            move_mass_forward(vector, from, to);
        } else {
            move_mass_backward(vector, from, to);
        }
        current = next;
    }

    Some(StateTransition {
        from: old_state,
        to: new_state,
    })
}
