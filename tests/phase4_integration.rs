//! Phase 4 tests: baselines, configuration and the full pipeline.

use knowledge_state::cli::commands::{cmd_add, cmd_prune};
use knowledge_state::config::EngineConfig;
use knowledge_state::engine::{
    compute_simple_baseline, compute_weighted_baseline, BaselineMode, BaselineOrchestrator,
    RetentionPolicy, RetentionTier, SnapshotBuilder,
};
use knowledge_state::format::{SnapshotReader, SnapshotWriter};
use knowledge_state::store::SnapshotStore;
use knowledge_state::types::{
    InteractionEvent, InteractionKind, KsError, Snapshot, SnapshotType, StateVector,
    SubspaceSummary, TopicState, TOTAL_MASS,
};

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tempfile::tempdir;

// ==================== Helpers ====================

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn day(d: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 6, 0, 0).unwrap() + Duration::days(d)
}

fn sub(id: &str) -> SubspaceSummary {
    SubspaceSummary {
        id: id.into(),
        name: id.to_uppercase(),
        evidence: 0.5,
        state: TopicState::Latent,
    }
}

/// One topic per snapshot, evidence given, vector one-hot on its state.
fn single(id: &str, ts: DateTime<Utc>, space: &str, evidence: f64) -> Snapshot {
    let state = knowledge_state::engine::classify(evidence);
    SnapshotBuilder::new("user-1", SnapshotType::Daily, ts)
        .id(id)
        .space(space, space, StateVector::one_hot(state, TOTAL_MASS), evidence, vec![])
        .build()
        .unwrap()
}

fn two_snapshots() -> Vec<Snapshot> {
    let first = SnapshotBuilder::new("user-1", SnapshotType::Daily, day(0))
        .id("s1")
        .space(
            "rust",
            "Rust (old)",
            StateVector::one_hot(TopicState::Latent, TOTAL_MASS),
            0.5,
            vec![],
        )
        .space(
            "go",
            "Go",
            StateVector::one_hot(TopicState::Discovered, TOTAL_MASS),
            1.5,
            vec![sub("a"), sub("b")],
        )
        .build()
        .unwrap();
    let second = SnapshotBuilder::new("user-1", SnapshotType::Daily, day(1))
        .id("s2")
        .space(
            "rust",
            "Rust",
            StateVector::one_hot(TopicState::Discovered, TOTAL_MASS),
            1.5,
            vec![sub("c")],
        )
        .build()
        .unwrap();
    // Newest first on purpose: baselines order by timestamp themselves.
    vec![second, first]
}

// ==================== Simple Baseline Tests ====================

#[test]
fn test_simple_baseline_empty() {
    assert!(matches!(
        compute_simple_baseline(&[]),
        Err(KsError::EmptyInput)
    ));
}

#[test]
fn test_simple_baseline_averages() {
    let result = compute_simple_baseline(&two_snapshots()).unwrap();

    assert_eq!(result.snapshot_count, 2);
    assert_eq!(result.total_spaces, 2);
    let ids: Vec<&str> = result.spaces.iter().map(|s| s.space_id.as_str()).collect();
    assert_eq!(ids, vec!["go", "rust"]);

    let rust = result.space("rust").unwrap();
    assert_eq!(rust.avg_mass_vector.as_array(), &[5.0, 5.0, 0.0, 0.0]);
    assert!(approx(rust.avg_evidence, 1.0));
    assert!(approx(rust.avg_subspace_count, 0.5));
    assert_eq!(rust.snapshot_count, 2);
    assert_eq!(rust.name, "Rust");
}

#[test]
fn test_simple_baseline_partial_coverage() {
    let result = compute_simple_baseline(&two_snapshots()).unwrap();

    // "go" only appears once: averaged over one snapshot, not two.
    let go = result.space("go").unwrap();
    assert_eq!(go.snapshot_count, 1);
    assert_eq!(go.avg_mass_vector.as_array(), &[0.0, 10.0, 0.0, 0.0]);
    assert!(approx(go.avg_evidence, 1.5));
    assert!(approx(go.avg_subspace_count, 2.0));
}

#[test]
fn test_simple_baseline_global_vector() {
    let result = compute_simple_baseline(&two_snapshots()).unwrap();
    let global = result.global_avg_mass_vector;
    assert!(approx(global[0], 10.0 / 3.0));
    assert!(approx(global[1], 20.0 / 3.0));
    assert_eq!(global[2], 0.0);
    assert!(global.is_conserved(TOTAL_MASS));
}

#[test]
fn test_snapshot_without_spaces_counts_but_adds_nothing() {
    let mut snapshots = two_snapshots();
    snapshots.push(
        SnapshotBuilder::new("user-1", SnapshotType::Daily, day(2))
            .id("empty")
            .build()
            .unwrap(),
    );
    let result = compute_simple_baseline(&snapshots).unwrap();
    assert_eq!(result.snapshot_count, 3);
    assert_eq!(result.space("rust").unwrap().snapshot_count, 2);
    assert!(approx(result.space("rust").unwrap().avg_evidence, 1.0));
}

#[test]
fn test_baseline_vectors_keep_total_mass() {
    let mut snapshots = Vec::new();
    for i in 0..40 {
        snapshots.push(single(&format!("s{i}"), day(i), "t", (i % 9) as f64));
    }
    let simple = compute_simple_baseline(&snapshots).unwrap();
    let weighted = compute_weighted_baseline(&snapshots, 0.3).unwrap();
    for result in [simple, weighted] {
        assert!(result.global_avg_mass_vector.is_conserved(TOTAL_MASS));
        for space in &result.spaces {
            assert!((space.avg_mass_vector.sum() - TOTAL_MASS).abs() < 1e-9);
        }
    }
}

// ==================== Weighted Baseline Tests ====================

#[test]
fn test_weighted_baseline_empty_before_alpha() {
    assert!(matches!(
        compute_weighted_baseline(&[], 0.5),
        Err(KsError::EmptyInput)
    ));
    assert!(matches!(
        compute_weighted_baseline(&[], 7.0),
        Err(KsError::EmptyInput)
    ));
}

#[test]
fn test_weighted_baseline_rejects_alpha() {
    let snapshots = two_snapshots();
    for alpha in [0.0, -0.1, 1.5, f64::NAN] {
        assert!(
            matches!(
                compute_weighted_baseline(&snapshots, alpha),
                Err(KsError::InvalidArgument(_))
            ),
            "alpha {alpha}"
        );
    }
    assert!(compute_weighted_baseline(&snapshots, 1.0).is_ok());
}

#[test]
fn test_weighted_baseline_recency_bias() {
    let snapshots = vec![
        single("old", day(0), "rust", 10.0),
        single("new", day(1), "rust", 20.0),
    ];
    let weighted = compute_weighted_baseline(&snapshots, 1.0).unwrap();
    let simple = compute_simple_baseline(&snapshots).unwrap();

    let e = (-1.0f64).exp();
    let expected = (10.0 * e + 20.0) / (1.0 + e);
    let rust = weighted.space("rust").unwrap();
    assert!(approx(rust.avg_evidence, expected));
    assert!((rust.avg_evidence - 17.31).abs() < 0.01);
    assert!(rust.avg_evidence > simple.space("rust").unwrap().avg_evidence);
}

#[test]
fn test_larger_alpha_moves_toward_recent() {
    let snapshots = vec![
        single("old", day(0), "rust", 10.0),
        single("new", day(1), "rust", 20.0),
    ];
    let mut previous = compute_simple_baseline(&snapshots)
        .unwrap()
        .space("rust")
        .unwrap()
        .avg_evidence;
    for alpha in [0.1, 0.4, 0.7, 1.0] {
        let avg = compute_weighted_baseline(&snapshots, alpha)
            .unwrap()
            .space("rust")
            .unwrap()
            .avg_evidence;
        assert!(avg > previous, "alpha {alpha}");
        assert!(avg < 20.0);
        previous = avg;
    }
}

#[test]
fn test_weighted_baseline_single_snapshot_matches_simple() {
    let snapshots = vec![single("only", day(0), "rust", 4.0)];
    let weighted = compute_weighted_baseline(&snapshots, 0.8).unwrap();
    let simple = compute_simple_baseline(&snapshots).unwrap();
    assert_eq!(weighted, simple);
}

#[test]
fn test_weighted_converges_to_simple() {
    let snapshots: Vec<Snapshot> = (0..10)
        .map(|i| single(&format!("s{i}"), day(i), "rust", i as f64))
        .collect();
    let simple = compute_simple_baseline(&snapshots).unwrap();
    let weighted = compute_weighted_baseline(&snapshots, 0.001).unwrap();

    let s = simple.space("rust").unwrap();
    let w = weighted.space("rust").unwrap();
    assert!(approx(s.avg_evidence, 4.5));
    assert!((w.avg_evidence - s.avg_evidence).abs() < 0.1);
    assert!(w.avg_evidence > s.avg_evidence);
    for i in 0..4 {
        assert!((w.avg_mass_vector[i] - s.avg_mass_vector[i]).abs() < 0.1);
    }
}

#[test]
fn test_weighted_partial_coverage_normalises_per_topic() {
    // "go" appears only in the oldest snapshot; its average is its own value.
    let snapshots = vec![
        single("a", day(0), "go", 2.0),
        single("b", day(1), "rust", 1.0),
        single("c", day(2), "rust", 3.0),
    ];
    let weighted = compute_weighted_baseline(&snapshots, 1.0).unwrap();
    assert!(approx(weighted.space("go").unwrap().avg_evidence, 2.0));
    assert_eq!(weighted.space("go").unwrap().snapshot_count, 1);

    let simple = compute_simple_baseline(&snapshots).unwrap();
    assert!(approx(simple.space("go").unwrap().avg_evidence, 2.0));
    assert!(approx(simple.space("rust").unwrap().avg_evidence, 2.0));
    assert_eq!(simple.total_spaces, weighted.total_spaces);
}

#[test]
fn test_baseline_input_order_independent() {
    let mut snapshots: Vec<Snapshot> = (0..25)
        .map(|i| single(&format!("s{i}"), day(i), "rust", (i % 7) as f64))
        .collect();
    let ordered_simple = compute_simple_baseline(&snapshots).unwrap();
    let ordered_weighted = compute_weighted_baseline(&snapshots, 0.2).unwrap();

    let mut rng = StdRng::seed_from_u64(99);
    snapshots.shuffle(&mut rng);

    assert_eq!(compute_simple_baseline(&snapshots).unwrap(), ordered_simple);
    assert_eq!(
        compute_weighted_baseline(&snapshots, 0.2).unwrap(),
        ordered_weighted
    );
}

#[test]
fn test_baseline_long_history_stays_finite() {
    let snapshots: Vec<Snapshot> = (0..2_000)
        .map(|i| single(&format!("s{i}"), day(i), "rust", 1.0))
        .collect();
    let result = compute_weighted_baseline(&snapshots, 1.0).unwrap();
    let rust = result.space("rust").unwrap();
    assert!(rust.avg_evidence.is_finite());
    assert!(approx(rust.avg_evidence, 1.0));
}

#[test]
fn test_weighted_baseline_topic_seen_only_long_ago() {
    let mut snapshots = vec![single("s0", day(0), "old", 5.0)];
    snapshots.extend(
        (1..800).map(|i| single(&format!("s{i}"), day(0) + Duration::hours(i), "rust", 1.0)),
    );

    let result = compute_weighted_baseline(&snapshots, 1.0).unwrap();
    let old = result.space("old").unwrap();
    assert_eq!(old.snapshot_count, 1);
    assert!(approx(old.avg_evidence, 5.0));
    assert_eq!(
        old.avg_mass_vector,
        StateVector::one_hot(TopicState::Engaged, TOTAL_MASS)
    );
    assert!(approx(result.space("rust").unwrap().avg_evidence, 1.0));
    assert!(result.global_avg_mass_vector.as_array().iter().all(|v| v.is_finite()));
    assert!(result.global_avg_mass_vector.is_conserved(TOTAL_MASS));
}

#[test]
fn test_baseline_json_shape() {
    let result = compute_simple_baseline(&two_snapshots()).unwrap();
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["totalSpaces"], 2);
    assert_eq!(value["snapshotCount"], 2);
    assert!(value["globalAvgMassVector"].is_array());
    assert!(value["spaces"][0].get("avgSubspaceCount").is_some());
}

// ==================== Orchestrator Tests ====================

fn history_store() -> SnapshotStore {
    let mut store = SnapshotStore::new();
    for i in 0..10 {
        store.insert(single(&format!("u1-{i}"), day(i), "rust", i as f64)).unwrap();
    }
    let other = SnapshotBuilder::new("user-2", SnapshotType::Daily, day(9))
        .id("u2")
        .space(
            "go",
            "Go",
            StateVector::one_hot(TopicState::Saturated, TOTAL_MASS),
            9.0,
            vec![],
        )
        .build()
        .unwrap();
    store.insert(other).unwrap();
    store
}

#[test]
fn test_orchestrator_window() {
    let store = history_store();
    let orchestrator = BaselineOrchestrator::default();
    assert_eq!(orchestrator.mode(), BaselineMode::Simple);

    // Days 7, 8, 9 for user-1.
    let result = orchestrator
        .compute_window(&store, Some("user-1"), day(9), 2)
        .unwrap();
    assert_eq!(result.snapshot_count, 3);
    assert!(approx(result.space("rust").unwrap().avg_evidence, 8.0));
    assert!(result.space("go").is_none());

    let everyone = orchestrator.compute_window(&store, None, day(9), 2).unwrap();
    assert_eq!(everyone.snapshot_count, 4);
    assert_eq!(everyone.total_spaces, 2);
}

#[test]
fn test_orchestrator_empty_window() {
    let store = history_store();
    let orchestrator = BaselineOrchestrator::new(BaselineMode::Weighted { alpha: 0.5 });
    let err = orchestrator
        .compute_window(&store, Some("user-1"), day(100), 5)
        .unwrap_err();
    assert!(matches!(err, KsError::EmptyInput));
}

#[test]
fn test_orchestrator_rejects_unrepresentable_window() {
    let store = history_store();
    let orchestrator = BaselineOrchestrator::default();
    for days in [i64::MAX, 1 << 50, -1] {
        let err = orchestrator
            .compute_window(&store, None, day(9), days)
            .unwrap_err();
        assert!(matches!(err, KsError::InvalidArgument(_)), "days {days}");
    }
    assert!(store.window(day(9), i64::MAX).is_err());
    assert_eq!(store.window(day(9), 100_000).unwrap().len(), store.len());
}

#[test]
fn test_orchestrator_dispatches_mode() {
    let snapshots = vec![
        single("old", day(0), "rust", 10.0),
        single("new", day(1), "rust", 20.0),
    ];
    let weighted = BaselineOrchestrator::new(BaselineMode::Weighted { alpha: 1.0 })
        .compute(&snapshots)
        .unwrap();
    assert_eq!(weighted, compute_weighted_baseline(&snapshots, 1.0).unwrap());
}

// ==================== Config Tests ====================

#[test]
fn test_config_defaults() {
    let config = EngineConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.total_mass, TOTAL_MASS);
    assert_eq!(config.thresholds.engaged, 3.0);
    assert_eq!(config.decay.rates.latent, 0.10);
    assert_eq!(config.decay.stale_multiplier, 1.0);
    assert_eq!(config.retention, RetentionPolicy::default());
    assert_eq!(config.baseline.alpha, 0.1);
    assert_eq!(config.baseline.window_days, 30);
}

#[test]
fn test_config_save_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = EngineConfig::default();
    config.total_mass = 100.0;
    config.decay.stale_multiplier = 1.5;
    config.baseline.alpha = 0.25;
    config.save(&path).unwrap();

    let loaded = EngineConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_partial_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[thresholds]\ndiscovered = 2.0\n\n[decay]\nlatent = 0.5\n",
    )
    .unwrap();

    let config = EngineConfig::load(&path).unwrap();
    assert_eq!(config.thresholds.discovered, 2.0);
    assert_eq!(config.thresholds.engaged, 3.0);
    assert_eq!(config.decay.rates.latent, 0.5);
    assert_eq!(config.decay.rates.saturated, 0.01);
    assert_eq!(config.decay.stale_multiplier, 1.0);
    assert_eq!(config.total_mass, TOTAL_MASS);
}

#[test]
fn test_config_rejects_invalid() {
    let dir = tempdir().unwrap();
    let cases = [
        "[thresholds]\ndiscovered = 5.0\n",
        "[baseline]\nalpha = 0.0\n",
        "total_mass = -1.0\n",
        "[decay]\nengaged = -0.2\n",
        "[retention]\ndaily_days = 90\n",
        "this is = not [toml",
    ];
    for (i, content) in cases.iter().enumerate() {
        let path = dir.path().join(format!("bad{i}.toml"));
        std::fs::write(&path, content).unwrap();
        let err = EngineConfig::load(&path).unwrap_err();
        assert!(matches!(err, KsError::Config(_)), "case {i}: {err}");
    }
}

#[test]
fn test_config_missing_file() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    assert!(matches!(
        EngineConfig::load(&missing),
        Err(KsError::Config(_))
    ));
    assert!(EngineConfig::load_or_default(Some(&missing)).is_err());
}

#[test]
fn test_config_builds_components() {
    let mut config = EngineConfig::default();
    config.total_mass = 4.0;
    let engine = config.evidence_engine();
    assert_eq!(engine.total_mass(), 4.0);
    assert_eq!(
        engine.new_record("x", day(0)).state_vector.as_array(),
        &[4.0, 0.0, 0.0, 0.0]
    );

    assert_eq!(
        config.baseline_orchestrator(true).mode(),
        BaselineMode::Weighted { alpha: 0.1 }
    );
    assert_eq!(config.baseline_orchestrator(false).mode(), BaselineMode::Simple);
}

// ==================== Full Pipeline ====================

#[test]
fn test_full_pipeline() {
    let _ = env_logger::builder().is_test(true).try_init();

    let config = EngineConfig::default();
    let engine = config.evidence_engine();
    let mut store = SnapshotStore::new();

    let mut rust = engine.new_record("rust", day(0));
    let mut go = engine.new_record("go", day(0));

    for d in 0..20 {
        let at = day(d);
        // Daily deep reading on rust; go only touched in the first week.
        let deep = InteractionEvent::from_kind(InteractionKind::Deep, 0.9).reading_depth(1.2);
        rust = engine.apply_interaction(&rust, &deep, at).unwrap().record;
        go = if d < 7 {
            let read = InteractionEvent::from_kind(InteractionKind::Read, 0.6);
            engine.apply_interaction(&go, &read, at).unwrap().record
        } else {
            engine.decay_to(&go, at).unwrap().record
        };

        let snapshot = SnapshotBuilder::new("user-1", SnapshotType::Daily, at)
            .total_mass(engine.total_mass())
            .record(&rust, "Rust", vec![])
            .record(&go, "Go", vec![])
            .build()
            .unwrap();
        store.save(snapshot, &config.retention, at).unwrap();
    }

    assert_eq!(store.len(), 20);
    assert_eq!(rust.state_vector.dominant_state(), TopicState::Saturated);
    assert!(rust.state_vector.is_conserved(TOTAL_MASS));
    assert!(go.state_vector.is_conserved(TOTAL_MASS));

    // Persist and reload.
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.ksnap");
    SnapshotWriter::new(engine.total_mass())
        .write_to_file(&store, &path)
        .unwrap();
    let reloaded = SnapshotReader::read_from_file(&path).unwrap();
    assert_eq!(reloaded.len(), 20);

    let simple = config
        .baseline_orchestrator(false)
        .compute_window(&reloaded, Some("user-1"), day(19), 30)
        .unwrap();
    let weighted = config
        .baseline_orchestrator(true)
        .compute_window(&reloaded, Some("user-1"), day(19), 30)
        .unwrap();

    assert_eq!(simple.snapshot_count, 20);
    assert_eq!(simple.total_spaces, 2);
    // Recent snapshots carry more rust evidence, so weighting pulls it up.
    let rs = simple.space("rust").unwrap();
    let rw = weighted.space("rust").unwrap();
    assert!(rw.avg_evidence > rs.avg_evidence);
    assert!(weighted.global_avg_mass_vector.is_conserved(TOTAL_MASS));
}

#[test]
fn test_pipeline_retention_over_months() {
    let policy = RetentionPolicy::default();
    let mut store = SnapshotStore::new();
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 30, 0).unwrap();

    for d in 0..500 {
        let at = start + Duration::days(d);
        store.save(single(&format!("d{d}"), at, "rust", 1.0), &policy, at).unwrap();
    }

    let now = start + Duration::days(499);
    for snapshot in store.snapshots() {
        assert!(policy.should_keep(snapshot.timestamp, now));
    }
    assert!(store.len() < 60);

    // One month-start for every month from May 2025 to March 2026.
    let monthly: Vec<_> = store
        .snapshots()
        .into_iter()
        .filter(|s| policy.tier(s.timestamp, now) == RetentionTier::Monthly)
        .collect();
    assert_eq!(monthly.len(), 11);
    assert!(monthly.iter().all(|s| s.timestamp.day() == 1));

    let baseline = compute_simple_baseline(
        &store.snapshots().into_iter().cloned().collect::<Vec<_>>(),
    )
    .unwrap();
    assert!(approx(baseline.space("rust").unwrap().avg_evidence, 1.0));
}

#[test]
fn test_cli_refuses_archive_with_other_mass() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("history.ksnap");
    let incoming = dir.path().join("snapshot.json");

    let mut store = SnapshotStore::new();
    store.insert(single("first", day(0), "rust", 1.0)).unwrap();
    SnapshotWriter::new(TOTAL_MASS)
        .write_to_file(&store, &archive)
        .unwrap();
    let next = single("second", day(1), "rust", 2.0);
    std::fs::write(&incoming, serde_json::to_string(&next).unwrap()).unwrap();

    let mut config = EngineConfig::default();
    config.total_mass = 4.0;
    let err = cmd_add(&archive, &incoming, Some(day(1)), &config, true).unwrap_err();
    assert!(matches!(err, KsError::InvalidArgument(_)));
    let err = cmd_prune(&archive, Some(day(1)), &config, true).unwrap_err();
    assert!(matches!(err, KsError::InvalidArgument(_)));

    // Nothing was rewritten.
    let reread = SnapshotReader::read_from_file(&archive).unwrap();
    assert_eq!(reread.len(), 1);
    assert_eq!(SnapshotReader::read_header(&archive).unwrap().total_mass, TOTAL_MASS);

    cmd_add(&archive, &incoming, Some(day(1)), &EngineConfig::default(), true).unwrap();
    assert_eq!(SnapshotReader::read_from_file(&archive).unwrap().len(), 2);
}
