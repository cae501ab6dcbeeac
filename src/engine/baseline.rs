//! Baseline orchestrator: reduces a snapshot history into average topic states.
//!
//! Two reductions share one grouping pass:
//!
//! - **simple**: every snapshot mentioning a topic counts equally
//! - **weighted**: snapshot `k` (0 = oldest) weighs `e^(alpha * k)`,
//!   normalised over the snapshots that mention the topic
//!
//! A topic absent from a snapshot is left out of that topic's denominator,
//! never counted as zero.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::SnapshotStore;
use crate::types::{KsError, KsResult, Snapshot, StateVector};

/// Averaged state of a single topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceBaseline {
    pub space_id: String,
    /// Name taken from the most recent snapshot mentioning the topic.
    pub name: String,
    pub avg_mass_vector: StateVector,
    pub avg_evidence: f64,
    pub avg_subspace_count: f64,
    /// Number of snapshots that mentioned the topic.
    pub snapshot_count: usize,
}

/// Aggregate statistics over a list of snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineResult {
    pub spaces: Vec<SpaceBaseline>,
    pub global_avg_mass_vector: StateVector,
    pub total_spaces: usize,
    pub snapshot_count: usize,
}

impl BaselineResult {
    /// Look up a topic's baseline by id.
    pub fn space(&self, space_id: &str) -> Option<&SpaceBaseline> {
        self.spaces.iter().find(|s| s.space_id == space_id)
    }
}

/// Averaging algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum BaselineMode {
    Simple,
    Weighted { alpha: f64 },
}

#[derive(Default)]
struct Accumulator {
    name: String,
    weight: f64,
    mass: StateVector,
    evidence: f64,
    subspaces: f64,
    count: usize,
}

/// Uniform average over every snapshot.
pub fn compute_simple_baseline(snapshots: &[Snapshot]) -> KsResult<BaselineResult> {
    if snapshots.is_empty() {
        return Err(KsError::EmptyInput);
    }
    let ordered = by_timestamp(snapshots);
    let exponents = vec![0.0; ordered.len()];
    Ok(reduce(&ordered, &exponents))
}

/// Recency-weighted average; `alpha` must lie in `(0, 1]`.
///
/// As `alpha` approaches zero this converges to the simple baseline.
pub fn compute_weighted_baseline(snapshots: &[Snapshot], alpha: f64) -> KsResult<BaselineResult> {
    if snapshots.is_empty() {
        return Err(KsError::EmptyInput);
    }
    if !(alpha > 0.0 && alpha <= 1.0) {
        return Err(KsError::invalid(format!(
            "alpha must be within (0, 1], got {alpha}"
        )));
    }

    let ordered = by_timestamp(snapshots);
    let exponents: Vec<f64> = (0..ordered.len()).map(|rank| alpha * rank as f64).collect();
    Ok(reduce(&ordered, &exponents))
}

/// Oldest first; snapshots sharing a timestamp keep their input order.
fn by_timestamp(snapshots: &[Snapshot]) -> Vec<&Snapshot> {
    let mut ordered: Vec<&Snapshot> = snapshots.iter().collect();
    ordered.sort_by_key(|s| s.timestamp);
    ordered
}

/// Each snapshot weighs `e^exponent`. Weights are shifted by the largest
/// exponent among the snapshots that contribute, per topic and globally, so
/// the newest contributor always weighs 1 and no normaliser is below 1.
fn reduce(snapshots: &[&Snapshot], exponents: &[f64]) -> BaselineResult {
    let mut newest: BTreeMap<&str, f64> = BTreeMap::new();
    let mut global_newest = f64::NEG_INFINITY;
    for (snapshot, &e) in snapshots.iter().zip(exponents) {
        for space in &snapshot.data.spaces {
            let top = newest.entry(space.space_id.as_str()).or_insert(e);
            *top = top.max(e);
            global_newest = global_newest.max(e);
        }
    }

    let mut per_space: BTreeMap<&str, Accumulator> = BTreeMap::new();
    let mut global = StateVector::zeros();
    let mut global_weight = 0.0;

    for (snapshot, &e) in snapshots.iter().zip(exponents) {
        for space in &snapshot.data.spaces {
            let id = space.space_id.as_str();
            let w = (e - newest.get(id).copied().unwrap_or(e)).exp();
            let acc = per_space.entry(id).or_default();
            acc.name.clone_from(&space.name);
            acc.weight += w;
            acc.mass.add_scaled(&space.mass_vector, w);
            acc.evidence += space.total_evidence * w;
            acc.subspaces += space.subspace_count() as f64 * w;
            acc.count += 1;

            let g = (e - global_newest).exp();
            global.add_scaled(&space.mass_vector, g);
            global_weight += g;
        }
    }

    if global_weight > 0.0 {
        global.scale(1.0 / global_weight);
    }

    let spaces: Vec<SpaceBaseline> = per_space
        .into_iter()
        .map(|(space_id, mut acc)| {
            acc.mass.scale(1.0 / acc.weight);
            SpaceBaseline {
                space_id: space_id.to_string(),
                name: acc.name,
                avg_mass_vector: acc.mass,
                avg_evidence: acc.evidence / acc.weight,
                avg_subspace_count: acc.subspaces / acc.weight,
                snapshot_count: acc.count,
            }
        })
        .collect();

    BaselineResult {
        total_spaces: spaces.len(),
        spaces,
        global_avg_mass_vector: global,
        snapshot_count: snapshots.len(),
    }
}

/// Computes baselines over stored histories with a fixed averaging mode.
pub struct BaselineOrchestrator {
    mode: BaselineMode,
}

impl BaselineOrchestrator {
    /// Create an orchestrator for the given mode.
    pub fn new(mode: BaselineMode) -> Self {
        Self { mode }
    }

    /// The averaging mode in use.
    pub fn mode(&self) -> BaselineMode {
        self.mode
    }

    /// Reduce an explicit list of snapshots.
    pub fn compute(&self, snapshots: &[Snapshot]) -> KsResult<BaselineResult> {
        match self.mode {
            BaselineMode::Simple => compute_simple_baseline(snapshots),
            BaselineMode::Weighted { alpha } => compute_weighted_baseline(snapshots, alpha),
        }
    }

    /// Reduce the trailing `days` of a store, optionally for one user.
    pub fn compute_window(
        &self,
        store: &SnapshotStore,
        user_id: Option<&str>,
        now: DateTime<Utc>,
        days: i64,
    ) -> KsResult<BaselineResult> {
        let window: Vec<Snapshot> = store
            .window(now, days)?
            .into_iter()
            .filter(|s| user_id.map_or(true, |u| s.user_id == u))
            .cloned()
            .collect();
        log::debug!(
            "baseline over {} snapshots in the last {} days ({:?})",
            window.len(),
            days,
            self.mode
        );
        self.compute(&window)
    }
}

impl Default for BaselineOrchestrator {
    fn default() -> Self {
        Self::new(BaselineMode::Simple)
    }
}
