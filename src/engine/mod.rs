//! The evidence and state evolution engine.

pub mod baseline;
pub mod classify;
pub mod decay;
pub mod evidence;
pub mod retention;
pub mod snapshot;
pub mod transition;
pub mod update;

pub use baseline::{
    compute_simple_baseline, compute_weighted_baseline, BaselineMode, BaselineOrchestrator,
    BaselineResult, SpaceBaseline,
};
pub use classify::{classify, state_to_one_hot_vector, Thresholds};
pub use decay::{
    accumulate, apply_decay, tiered_decay, DecayRates, TieredDecay, DEFAULT_DECAY_RATE,
};
pub use evidence::{compute_delta, DEFAULT_READING_DEPTH};
pub use retention::{RetentionPlan, RetentionPolicy, RetentionTier};
pub use snapshot::SnapshotBuilder;
pub use transition::{
    handle_state_transition, move_mass_backward, move_mass_forward, StateTransition,
};
pub use update::{DecayReport, EvidenceEngine, TopicRecord, TopicUpdate};
