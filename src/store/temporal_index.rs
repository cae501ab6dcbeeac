//! Temporal index: sorted (timestamp, snapshot_id) pairs for time range queries.

use chrono::{DateTime, Utc};

/// Sorted list of (timestamp, snapshot_id) pairs.
#[derive(Debug)]
pub struct TemporalIndex {
    /// Sorted by timestamp ascending, then id.
    entries: Vec<(DateTime<Utc>, String)>,
}

impl TemporalIndex {
    /// Create a new, empty temporal index.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Get all snapshot ids taken within a time range (inclusive).
    pub fn range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<&str> {
        let lo = self.entries.partition_point(|(ts, _)| *ts < start);
        let hi = self.entries.partition_point(|(ts, _)| *ts <= end);
        if lo >= hi {
            return Vec::new();
        }
        self.entries[lo..hi].iter().map(|(_, id)| id.as_str()).collect()
    }

    /// Get the most recent N snapshot ids, newest first.
    pub fn most_recent(&self, n: usize) -> Vec<&str> {
        let start = self.entries.len().saturating_sub(n);
        self.entries[start..]
            .iter()
            .rev()
            .map(|(_, id)| id.as_str())
            .collect()
    }

    /// All ids, oldest first.
    pub fn ordered(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, id)| id.as_str())
    }

    /// Incrementally add a snapshot.
    pub fn add(&mut self, timestamp: DateTime<Utc>, id: &str) {
        let pos = self
            .entries
            .partition_point(|(ts, eid)| (*ts, eid.as_str()) < (timestamp, id));
        self.entries.insert(pos, (timestamp, id.to_string()));
    }

    /// Remove a snapshot from the index.
    pub fn remove(&mut self, timestamp: DateTime<Utc>, id: &str) {
        let pos = self
            .entries
            .partition_point(|(ts, eid)| (*ts, eid.as_str()) < (timestamp, id));
        if self
            .entries
            .get(pos)
            .is_some_and(|(ts, eid)| *ts == timestamp && eid == id)
        {
            self.entries.remove(pos);
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest and newest timestamps, if any.
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.entries.first(), self.entries.last()) {
            (Some((first, _)), Some((last, _))) => Some((*first, *last)),
            _ => None,
        }
    }
}

impl Default for TemporalIndex {
    fn default() -> Self {
        Self::new()
    }
}
