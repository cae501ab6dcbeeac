//! Interaction events produced by the capture pipeline.

use serde::{Deserialize, Serialize};

use crate::engine::evidence::compute_delta;
use crate::types::error::KsResult;

/// Named engagement tiers and their interaction weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    /// Passing exposure, such as a skimmed page.
    Glance,
    /// A normal read of captured content.
    Read,
    /// Deliberate study: highlights, notes, repeated visits.
    Deep,
}

impl InteractionKind {
    /// Interaction weight for this tier.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Glance => 0.2,
            Self::Read => 1.0,
            Self::Deep => 2.0,
        }
    }

    /// Return a human-readable name for this tier.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Glance => "glance",
            Self::Read => "read",
            Self::Deep => "deep",
        }
    }

    /// Parse a tier from a string name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "glance" => Some(Self::Glance),
            "read" => Some(Self::Read),
            "deep" => Some(Self::Deep),
            _ => None,
        }
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One interaction of the user with an artifact assigned to a topic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    /// Interaction-type weight, `>= 0`.
    pub weight: f64,
    /// Relevance of the artifact to the topic, in `[0, 1]`.
    pub relevance: f64,
    /// How far the user read. Clamped to `[0, 1.5]`; 1.0 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_depth: Option<f64>,
}

impl InteractionEvent {
    /// Create an event from a raw weight.
    pub fn new(weight: f64, relevance: f64) -> Self {
        Self {
            weight,
            relevance,
            reading_depth: None,
        }
    }

    /// Create an event from a named tier.
    pub fn from_kind(kind: InteractionKind, relevance: f64) -> Self {
        Self::new(kind.weight(), relevance)
    }

    /// Set the reading depth.
    pub fn reading_depth(mut self, depth: f64) -> Self {
        self.reading_depth = Some(depth);
        self
    }

    /// Evidence contributed by this event.
    pub fn delta(&self) -> KsResult<f64> {
        compute_delta(self.weight, self.relevance, self.reading_depth)
    }
}
