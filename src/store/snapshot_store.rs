//! Snapshot store: owns a snapshot history and prunes it at save time.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use super::temporal_index::TemporalIndex;
use crate::engine::retention::RetentionPolicy;
use crate::types::{KsError, KsResult, Snapshot};

/// Report from a retention pass.
#[derive(Debug, Default)]
pub struct RetentionReport {
    /// Number of snapshots left in the store.
    pub kept: usize,
    /// Ids of the snapshots removed.
    pub deleted: Vec<String>,
}

/// A user's snapshot history, indexed by id and by time.
#[derive(Debug)]
pub struct SnapshotStore {
    snapshots: HashMap<String, Snapshot>,
    temporal_index: TemporalIndex,
}

impl SnapshotStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self {
            snapshots: HashMap::new(),
            temporal_index: TemporalIndex::new(),
        }
    }

    /// Create from pre-existing snapshots (used by reader).
    pub fn from_snapshots(snapshots: Vec<Snapshot>) -> KsResult<Self> {
        let mut store = Self::new();
        for snapshot in snapshots {
            store.insert(snapshot)?;
        }
        Ok(store)
    }

    /// Add a snapshot. Snapshots are immutable, so an id may only be stored once.
    pub fn insert(&mut self, snapshot: Snapshot) -> KsResult<()> {
        if self.snapshots.contains_key(&snapshot.id) {
            return Err(KsError::DuplicateSnapshot(snapshot.id));
        }
        self.temporal_index.add(snapshot.timestamp, &snapshot.id);
        self.snapshots.insert(snapshot.id.clone(), snapshot);
        Ok(())
    }

    /// Remove a snapshot by id.
    pub fn remove(&mut self, id: &str) -> Option<Snapshot> {
        let snapshot = self.snapshots.remove(id)?;
        self.temporal_index.remove(snapshot.timestamp, id);
        Some(snapshot)
    }

    /// Get a snapshot by id.
    pub fn get(&self, id: &str) -> Option<&Snapshot> {
        self.snapshots.get(id)
    }

    /// All snapshots, oldest first.
    pub fn snapshots(&self) -> Vec<&Snapshot> {
        self.resolve(self.temporal_index.ordered())
    }

    /// Snapshots taken within `[start, end]`, oldest first.
    pub fn range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<&Snapshot> {
        self.resolve(self.temporal_index.range(start, end))
    }

    /// Snapshots taken within the `days` before `now`, oldest first.
    ///
    /// Fails when `days` is negative or reaches past the representable range.
    pub fn window(&self, now: DateTime<Utc>, days: i64) -> KsResult<Vec<&Snapshot>> {
        if days < 0 {
            return Err(KsError::invalid(format!("window must be >= 0 days, got {days}")));
        }
        let start = Duration::try_days(days)
            .and_then(|span| now.checked_sub_signed(span))
            .ok_or_else(|| KsError::invalid(format!("window of {days} days is out of range")))?;
        Ok(self.range(start, now))
    }

    /// The newest `n` snapshots, newest first.
    pub fn most_recent(&self, n: usize) -> Vec<&Snapshot> {
        self.resolve(self.temporal_index.most_recent(n))
    }

    /// Snapshots belonging to one user, oldest first.
    pub fn for_user(&self, user_id: &str) -> Vec<&Snapshot> {
        self.snapshots()
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .collect()
    }

    /// Delete every snapshot the policy does not retain at `now`.
    pub fn prune(&mut self, policy: &RetentionPolicy, now: DateTime<Utc>) -> RetentionReport {
        let ordered: Vec<Snapshot> = self.snapshots().into_iter().cloned().collect();
        let plan = policy.plan(&ordered, now);

        for id in &plan.delete {
            self.remove(id);
        }
        if !plan.delete.is_empty() {
            log::info!(
                "retention removed {} snapshots, {} kept",
                plan.delete.len(),
                plan.keep.len()
            );
        }

        RetentionReport {
            kept: self.len(),
            deleted: plan.delete,
        }
    }

    /// Store a new snapshot and apply retention to the whole history.
    pub fn save(
        &mut self,
        snapshot: Snapshot,
        policy: &RetentionPolicy,
        now: DateTime<Utc>,
    ) -> KsResult<RetentionReport> {
        log::debug!(
            "saving {} snapshot {} for user {}",
            snapshot.snapshot_type,
            snapshot.id,
            snapshot.user_id
        );
        self.insert(snapshot)?;
        Ok(self.prune(policy, now))
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Oldest and newest snapshot timestamps, if any.
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.temporal_index.span()
    }

    fn resolve<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Vec<&Snapshot> {
        ids.into_iter()
            .filter_map(|id| self.snapshots.get(id))
            .collect()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
