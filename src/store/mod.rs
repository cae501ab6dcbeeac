//! In-memory snapshot history.

pub mod snapshot_store;
pub mod temporal_index;

pub use snapshot_store::{RetentionReport, SnapshotStore};
pub use temporal_index::TemporalIndex;
