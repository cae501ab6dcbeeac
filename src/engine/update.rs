//! Topic update pipeline: interaction event to new evidence and state vector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classify::Thresholds;
use super::decay::{DecayRates, TieredDecay};
use super::transition::{handle_state_transition, StateTransition};
use crate::types::{
    elapsed_days, InteractionEvent, KsError, KsResult, StateVector, TopicState, TOTAL_MASS,
};

/// Persisted per-topic state, owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRecord {
    pub topic_id: String,
    pub evidence: f64,
    pub state_vector: StateVector,
    pub last_updated: DateTime<Utc>,
}

impl TopicRecord {
    /// A fresh topic: no evidence, all mass Latent.
    pub fn new(topic_id: impl Into<String>, mass: f64, created_at: DateTime<Utc>) -> Self {
        Self {
            topic_id: topic_id.into(),
            evidence: 0.0,
            state_vector: StateVector::one_hot(TopicState::Latent, mass),
            last_updated: created_at,
        }
    }
}

/// Result of updating one topic.
#[derive(Debug, Clone)]
pub struct TopicUpdate {
    /// The record to write back.
    pub record: TopicRecord,
    /// Evidence contributed by the interaction (0 for decay-only updates).
    pub delta: f64,
    /// Evidence before the update.
    pub old_evidence: f64,
    /// The state change, if a threshold was crossed.
    pub transition: Option<StateTransition>,
}

impl TopicUpdate {
    /// Evidence after the update.
    pub fn new_evidence(&self) -> f64 {
        self.record.evidence
    }
}

/// Report from a batch decay pass.
#[derive(Debug, Default)]
pub struct DecayReport {
    /// Number of topics whose evidence changed.
    pub topics_decayed: usize,
    /// Topics that changed state, with the transition performed.
    pub transitions: Vec<(String, StateTransition)>,
    /// Topics that are Latent after the pass.
    pub latent_topics: Vec<String>,
}

/// Applies interactions and decay to caller-owned topic records.
///
/// Holds configuration only. Every call takes the prior record and returns
/// the next one, so callers decide where records live and must serialise
/// concurrent updates to the same topic.
#[derive(Debug, Clone)]
pub struct EvidenceEngine {
    decay: TieredDecay,
    total_mass: f64,
    stale_multiplier: f64,
}

impl EvidenceEngine {
    /// Create an engine with the default mass, thresholds and rates.
    pub fn new() -> Self {
        Self {
            decay: TieredDecay::default(),
            total_mass: TOTAL_MASS,
            stale_multiplier: 1.0,
        }
    }

    /// Create an engine with custom thresholds and decay rates.
    pub fn with_model(thresholds: Thresholds, rates: DecayRates, total_mass: f64) -> Self {
        Self {
            decay: TieredDecay::new(thresholds, rates),
            total_mass,
            stale_multiplier: 1.0,
        }
    }

    /// Scale every decay rate by `multiplier`.
    pub fn stale_multiplier(mut self, multiplier: f64) -> Self {
        self.stale_multiplier = multiplier;
        self
    }

    /// Thresholds in use.
    pub fn thresholds(&self) -> &Thresholds {
        &self.decay.thresholds
    }

    /// Total mass every record must carry.
    pub fn total_mass(&self) -> f64 {
        self.total_mass
    }

    /// Start tracking a new topic.
    pub fn new_record(&self, topic_id: impl Into<String>, at: DateTime<Utc>) -> TopicRecord {
        TopicRecord::new(topic_id, self.total_mass, at)
    }

    /// Apply one interaction to a topic at time `at`.
    ///
    /// The prior evidence is decayed over the time since `last_updated`,
    /// the event's delta is added, and the state vector follows the
    /// resulting state change.
    pub fn apply_interaction(
        &self,
        record: &TopicRecord,
        event: &InteractionEvent,
        at: DateTime<Utc>,
    ) -> KsResult<TopicUpdate> {
        let delta = event.delta()?;
        self.advance(record, delta, at)
    }

    /// Decay a topic up to `at` without a new interaction.
    pub fn decay_to(&self, record: &TopicRecord, at: DateTime<Utc>) -> KsResult<TopicUpdate> {
        self.advance(record, 0.0, at)
    }

    /// Run decay across a batch of records in place.
    pub fn run_decay(&self, records: &mut [TopicRecord], at: DateTime<Utc>) -> KsResult<DecayReport> {
        let mut report = DecayReport::default();

        for record in records.iter_mut() {
            let update = self.decay_to(record, at)?;
            if update.new_evidence() != update.old_evidence {
                report.topics_decayed += 1;
            }
            if let Some(transition) = update.transition {
                report.transitions.push((record.topic_id.clone(), transition));
            }
            *record = update.record;
            if self.decay.thresholds.classify(record.evidence) == TopicState::Latent {
                report.latent_topics.push(record.topic_id.clone());
            }
        }

        log::debug!(
            "decay pass: {} records, {} decayed, {} transitions",
            records.len(),
            report.topics_decayed,
            report.transitions.len()
        );
        Ok(report)
    }

    fn advance(&self, record: &TopicRecord, delta: f64, at: DateTime<Utc>) -> KsResult<TopicUpdate> {
        if !record.state_vector.is_conserved(self.total_mass) {
            return Err(KsError::invalid(format!(
                "state vector of topic {} sums to {}, expected {}",
                record.topic_id,
                record.state_vector.sum(),
                self.total_mass
            )));
        }

        let elapsed = elapsed_days(record.last_updated, at);
        if elapsed < 0.0 {
            log::warn!(
                "topic {} updated at {} before its last update {}, not decaying",
                record.topic_id,
                at,
                record.last_updated
            );
        }

        let new_evidence =
            self.decay
                .accumulate(record.evidence, delta, elapsed, self.stale_multiplier)?;

        let mut state_vector = record.state_vector;
        let transition = handle_state_transition(
            &mut state_vector,
            record.evidence,
            new_evidence,
            &self.decay.thresholds,
        );
        if let Some(t) = transition {
            log::debug!(
                "topic {} moved {} -> {} (evidence {:.3} -> {:.3})",
                record.topic_id,
                t.from,
                t.to,
                record.evidence,
                new_evidence
            );
        }

        Ok(TopicUpdate {
            record: TopicRecord {
                topic_id: record.topic_id.clone(),
                evidence: new_evidence,
                state_vector,
                last_updated: record.last_updated.max(at),
            },
            delta,
            old_evidence: record.evidence,
            transition,
        })
    }
}

impl Default for EvidenceEngine {
    fn default() -> Self {
        Self::new()
    }
}
