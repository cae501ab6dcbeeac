//! Snapshot builder: groups current topic states under one timestamp.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::update::TopicRecord;
use crate::types::{
    KsError, KsResult, Snapshot, SnapshotData, SnapshotType, SpaceSnapshot, StateVector,
    SubspaceSummary, TOTAL_MASS,
};

/// Builder for constructing Snapshot instances.
///
/// Captures state exactly as handed in; no decay or transition runs here.
pub struct SnapshotBuilder {
    id: Option<String>,
    user_id: String,
    snapshot_type: SnapshotType,
    timestamp: DateTime<Utc>,
    total_mass: f64,
    spaces: Vec<SpaceSnapshot>,
}

impl SnapshotBuilder {
    /// Create a new builder with the required fields.
    pub fn new(
        user_id: impl Into<String>,
        snapshot_type: SnapshotType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            snapshot_type,
            timestamp,
            total_mass: TOTAL_MASS,
            spaces: Vec::new(),
        }
    }

    /// Use a caller-supplied id instead of a generated one.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Mass every captured vector must sum to.
    pub fn total_mass(mut self, mass: f64) -> Self {
        self.total_mass = mass;
        self
    }

    /// Add a topic.
    pub fn space(
        mut self,
        space_id: impl Into<String>,
        name: impl Into<String>,
        mass_vector: StateVector,
        total_evidence: f64,
        subspaces: Vec<SubspaceSummary>,
    ) -> Self {
        self.spaces.push(SpaceSnapshot {
            space_id: space_id.into(),
            name: name.into(),
            mass_vector,
            total_evidence,
            subspaces,
        });
        self
    }

    /// Add a topic from its tracked record.
    pub fn record(
        self,
        record: &TopicRecord,
        name: impl Into<String>,
        subspaces: Vec<SubspaceSummary>,
    ) -> Self {
        let id = record.topic_id.clone();
        self.space(id, name, record.state_vector, record.evidence, subspaces)
    }

    /// Build the snapshot, validating every captured topic.
    pub fn build(self) -> KsResult<Snapshot> {
        let mut seen = HashSet::with_capacity(self.spaces.len());
        for space in &self.spaces {
            if !seen.insert(space.space_id.as_str()) {
                return Err(KsError::invalid(format!(
                    "space {} captured twice",
                    space.space_id
                )));
            }
            validate_space(space, self.total_mass)?;
        }

        let id = self
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(Snapshot {
            id,
            user_id: self.user_id,
            snapshot_type: self.snapshot_type,
            timestamp: self.timestamp,
            data: SnapshotData {
                spaces: self.spaces,
            },
        })
    }
}

/// Check one captured topic against the engine invariants.
pub fn validate_space(space: &SpaceSnapshot, total_mass: f64) -> KsResult<()> {
    StateVector::new(space.mass_vector.into_array())?;
    if !space.mass_vector.is_conserved(total_mass) {
        return Err(KsError::invalid(format!(
            "space {} mass vector sums to {}, expected {}",
            space.space_id,
            space.mass_vector.sum(),
            total_mass
        )));
    }
    if !space.total_evidence.is_finite() || space.total_evidence < 0.0 {
        return Err(KsError::invalid(format!(
            "space {} has negative evidence {}",
            space.space_id, space.total_evidence
        )));
    }
    if let Some(sub) = space.subspaces.iter().find(|s| s.evidence < 0.0) {
        return Err(KsError::invalid(format!(
            "subspace {} of space {} has negative evidence {}",
            sub.id, space.space_id, sub.evidence
        )));
    }
    Ok(())
}
