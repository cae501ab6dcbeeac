//! Knowledge state: evidence accumulation and topic state evolution.
//!
//! Turns interactions with captured artifacts into per-topic evidence,
//! decays that evidence over time at a rate tiered by topic state, keeps a
//! mass-conserving four-state vector per topic, and reduces historical
//! snapshots of those vectors into uniform or recency-weighted baselines.

pub mod cli;
pub mod config;
pub mod engine;
pub mod ffi;
pub mod format;
pub mod store;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::EngineConfig;
pub use engine::{
    compute_simple_baseline, compute_weighted_baseline, BaselineMode, BaselineOrchestrator,
    BaselineResult, DecayRates, DecayReport, EvidenceEngine, RetentionPolicy, SnapshotBuilder,
    SpaceBaseline, StateTransition, Thresholds, TieredDecay, TopicRecord, TopicUpdate,
};
pub use format::{SnapshotReader, SnapshotWriter};
pub use store::{RetentionReport, SnapshotStore};
pub use types::{
    now_utc, InteractionEvent, InteractionKind, KsError, KsResult, Snapshot, SnapshotData,
    SnapshotType, SpaceSnapshot, StateVector, SubspaceSummary, TopicState, MASS_EPSILON,
    STATE_COUNT, TOTAL_MASS,
};
