//! Snapshot records: timestamped captures of every topic's state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::{StateVector, TopicState};
use crate::engine::classify::Thresholds;

/// How often the scheduled run producing a snapshot fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SnapshotType {
    Daily = 0,
    Weekly = 1,
    Monthly = 2,
}

impl SnapshotType {
    /// Return a human-readable name for this snapshot type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Parse a snapshot type from a string name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

impl std::fmt::Display for SnapshotType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Summary of one sub-topic inside a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubspaceSummary {
    pub id: String,
    pub name: String,
    pub evidence: f64,
    pub state: TopicState,
}

impl SubspaceSummary {
    /// Summarise a sub-topic, deriving its state from its evidence.
    pub fn from_evidence(
        id: impl Into<String>,
        name: impl Into<String>,
        evidence: f64,
        thresholds: &Thresholds,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            evidence,
            state: thresholds.classify(evidence),
        }
    }
}

/// One topic ("space") as captured in a snapshot.
///
/// The `alias` attributes accept payloads written with the older field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSnapshot {
    pub space_id: String,
    pub name: String,
    #[serde(alias = "stateVector")]
    pub mass_vector: StateVector,
    #[serde(alias = "evidence")]
    pub total_evidence: f64,
    #[serde(default)]
    pub subspaces: Vec<SubspaceSummary>,
}

impl SpaceSnapshot {
    /// Number of sub-topics captured for this topic.
    pub fn subspace_count(&self) -> usize {
        self.subspaces.len()
    }
}

/// Payload of a snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SnapshotData {
    #[serde(alias = "topics", default)]
    pub spaces: Vec<SpaceSnapshot>,
}

/// An immutable, timestamped capture of a user's topic states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    pub user_id: String,
    pub snapshot_type: SnapshotType,
    pub timestamp: DateTime<Utc>,
    pub data: SnapshotData,
}

impl Snapshot {
    /// Look up a captured topic by id.
    pub fn space(&self, space_id: &str) -> Option<&SpaceSnapshot> {
        self.data.spaces.iter().find(|s| s.space_id == space_id)
    }

    /// Number of topics captured.
    pub fn space_count(&self) -> usize {
        self.data.spaces.len()
    }
}
