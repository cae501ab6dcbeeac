//! All data types for the knowledge state library.

pub mod error;
pub mod header;
pub mod interaction;
pub mod snapshot;
pub mod state;

pub use error::{KsError, KsResult};
pub use header::{FileHeader, HEADER_SIZE};
pub use interaction::{InteractionEvent, InteractionKind};
pub use snapshot::{Snapshot, SnapshotData, SnapshotType, SpaceSnapshot, SubspaceSummary};
pub use state::{StateVector, TopicState};

/// Magic bytes at the start of every .ksnap file.
pub const KSNAP_MAGIC: [u8; 4] = [0x4B, 0x53, 0x4E, 0x50]; // "KSNP"

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Number of discrete topic states.
pub const STATE_COUNT: usize = 4;

/// Total mass carried by every state vector.
pub const TOTAL_MASS: f64 = 10.0;

/// Tolerance when checking that a vector still sums to its mass.
pub const MASS_EPSILON: f64 = 1e-9;

/// Upper clamp applied to reading depth before it scales evidence.
pub const MAX_READING_DEPTH: f64 = 1.5;

/// Seconds in one day, used to turn timestamps into elapsed days.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Returns the current UTC time.
pub fn now_utc() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

/// Fractional days elapsed from `from` to `to`. Negative when `to` precedes `from`.
pub fn elapsed_days(
    from: chrono::DateTime<chrono::Utc>,
    to: chrono::DateTime<chrono::Utc>,
) -> f64 {
    (to - from).num_milliseconds() as f64 / (SECONDS_PER_DAY * 1000.0)
}
