//! CLI command implementations.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::engine::{apply_decay, SnapshotBuilder, TieredDecay, TopicRecord};
use crate::format::{SnapshotReader, SnapshotWriter};
use crate::store::SnapshotStore;
use crate::types::{
    now_utc, InteractionEvent, KsError, KsResult, Snapshot, SnapshotType, TopicState,
    MASS_EPSILON,
};

/// Create a new empty .ksnap file.
pub fn cmd_create(path: &Path, config: &EngineConfig) -> KsResult<()> {
    let store = SnapshotStore::new();
    let writer = SnapshotWriter::new(config.total_mass);
    writer.write_to_file(&store, path)?;
    println!("Created {}", path.display());
    Ok(())
}

/// Load an archive that will be rewritten with the configured total mass.
fn open_for_write(path: &Path, config: &EngineConfig) -> KsResult<SnapshotStore> {
    let header = SnapshotReader::read_header(path)?;
    if (header.total_mass - config.total_mass).abs() > MASS_EPSILON {
        return Err(KsError::invalid(format!(
            "{} holds total mass {}, configured mass is {}",
            path.display(),
            header.total_mass,
            config.total_mass
        )));
    }
    SnapshotReader::read_from_file(path)
}

/// Display information about a .ksnap file.
pub fn cmd_info(path: &Path, json: bool) -> KsResult<()> {
    let header = SnapshotReader::read_header(path)?;
    let store = SnapshotReader::read_from_file(path)?;
    let file_size = std::fs::metadata(path)?.len();
    let span = store.span();

    let count_of = |t: SnapshotType| {
        store
            .snapshots()
            .iter()
            .filter(|s| s.snapshot_type == t)
            .count()
    };

    if json {
        let info = serde_json::json!({
            "file": path.display().to_string(),
            "version": header.version,
            "total_mass": header.total_mass,
            "snapshots": store.len(),
            "file_size": file_size,
            "oldest": span.map(|(first, _)| first.to_rfc3339()),
            "newest": span.map(|(_, last)| last.to_rfc3339()),
            "snapshot_types": {
                "daily": count_of(SnapshotType::Daily),
                "weekly": count_of(SnapshotType::Weekly),
                "monthly": count_of(SnapshotType::Monthly),
            }
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&info).unwrap_or_default()
        );
    } else {
        println!("File: {}", path.display());
        println!("Version: {}", header.version);
        println!("Total mass: {}", header.total_mass);
        println!("Snapshots: {}", store.len());
        println!("File size: {}", format_size(file_size));
        if let Some((first, last)) = span {
            println!("Oldest: {}", first.to_rfc3339());
            println!("Newest: {}", last.to_rfc3339());
        }
        println!("Snapshot types:");
        println!("  Daily: {}", count_of(SnapshotType::Daily));
        println!("  Weekly: {}", count_of(SnapshotType::Weekly));
        println!("  Monthly: {}", count_of(SnapshotType::Monthly));
    }
    Ok(())
}

/// Add a snapshot from a JSON file, applying retention.
pub fn cmd_add(
    path: &Path,
    json_path: &Path,
    now: Option<DateTime<Utc>>,
    config: &EngineConfig,
    json: bool,
) -> KsResult<()> {
    let mut store = open_for_write(path, config)?;
    let content = std::fs::read_to_string(json_path)?;
    let snapshot: Snapshot = serde_json::from_str(&content)?;
    for space in &snapshot.data.spaces {
        crate::engine::snapshot::validate_space(space, config.total_mass)?;
    }
    let id = snapshot.id.clone();

    let report = store.save(snapshot, &config.retention, now.unwrap_or_else(now_utc))?;

    let writer = SnapshotWriter::new(config.total_mass);
    writer.write_to_file(&store, path)?;

    if json {
        println!(
            "{}",
            serde_json::json!({"id": id, "kept": report.kept, "deleted": report.deleted})
        );
    } else {
        println!("Added snapshot {} to {}", id, path.display());
        if !report.deleted.is_empty() {
            println!("Retention removed {} snapshots", report.deleted.len());
        }
    }
    Ok(())
}

/// Apply retention to a .ksnap file without adding anything.
pub fn cmd_prune(
    path: &Path,
    now: Option<DateTime<Utc>>,
    config: &EngineConfig,
    json: bool,
) -> KsResult<()> {
    let mut store = open_for_write(path, config)?;
    let report = store.prune(&config.retention, now.unwrap_or_else(now_utc));

    let writer = SnapshotWriter::new(config.total_mass);
    writer.write_to_file(&store, path)?;

    if json {
        println!(
            "{}",
            serde_json::json!({"kept": report.kept, "deleted": report.deleted})
        );
    } else {
        println!("Retention complete:");
        println!("  Kept: {}", report.kept);
        println!("  Deleted: {}", report.deleted.len());
    }
    Ok(())
}

/// List the newest snapshots.
pub fn cmd_list(path: &Path, limit: usize, json: bool) -> KsResult<()> {
    let store = SnapshotReader::read_from_file(path)?;
    let recent = store.most_recent(limit);

    if json {
        let items: Vec<serde_json::Value> = recent
            .iter()
            .map(|s| {
                serde_json::json!({
                    "id": s.id,
                    "user_id": s.user_id,
                    "snapshot_type": s.snapshot_type.name(),
                    "timestamp": s.timestamp.to_rfc3339(),
                    "spaces": s.space_count(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&items).unwrap_or_default()
        );
    } else {
        println!("Snapshots ({} of {}):", recent.len(), store.len());
        for s in recent {
            println!(
                "  {} {} {:<7} {} spaces  {}",
                s.timestamp.format("%Y-%m-%d %H:%M"),
                s.user_id,
                s.snapshot_type.name(),
                s.space_count(),
                s.id
            );
        }
    }
    Ok(())
}

/// Print one snapshot by id.
pub fn cmd_show(path: &Path, id: &str) -> KsResult<()> {
    let store = SnapshotReader::read_from_file(path)?;
    let snapshot = store
        .get(id)
        .ok_or_else(|| KsError::SnapshotNotFound(id.to_string()))?;
    println!(
        "{}",
        serde_json::to_string_pretty(snapshot).unwrap_or_default()
    );
    Ok(())
}

/// Export all snapshots as JSON.
pub fn cmd_export(path: &Path, pretty: bool) -> KsResult<()> {
    let store = SnapshotReader::read_from_file(path)?;
    let output = serde_json::json!({ "snapshots": store.snapshots() });

    if pretty {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("{}", serde_json::to_string(&output).unwrap_or_default());
    }
    Ok(())
}

/// Options for the baseline command.
pub struct BaselineArgs<'a> {
    pub weighted: bool,
    pub alpha: Option<f64>,
    pub days: Option<i64>,
    pub user: Option<&'a str>,
    pub now: Option<DateTime<Utc>>,
}

/// Compute a baseline over the trailing window of a .ksnap file.
pub fn cmd_baseline(
    path: &Path,
    args: BaselineArgs<'_>,
    config: &EngineConfig,
    json: bool,
) -> KsResult<()> {
    let store = SnapshotReader::read_from_file(path)?;

    let mut config = config.clone();
    if let Some(alpha) = args.alpha {
        config.baseline.alpha = alpha;
    }
    let days = args.days.unwrap_or(config.baseline.window_days);
    let orchestrator = config.baseline_orchestrator(args.weighted);
    let now = args.now.unwrap_or_else(now_utc);

    let result = orchestrator.compute_window(&store, args.user, now, days)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).unwrap_or_default()
        );
    } else {
        println!(
            "Baseline over {} snapshots ({} days, {}):",
            result.snapshot_count,
            days,
            if args.weighted { "weighted" } else { "simple" }
        );
        println!("  Spaces: {}", result.total_spaces);
        println!(
            "  Global mass: {}",
            format_vector(result.global_avg_mass_vector.as_array())
        );
        for space in &result.spaces {
            println!(
                "  {} ({}): evidence {:.3}, subspaces {:.2}, mass {}",
                space.name,
                space.space_id,
                space.avg_evidence,
                space.avg_subspace_count,
                format_vector(space.avg_mass_vector.as_array())
            );
        }
    }
    Ok(())
}

/// Classify an evidence value.
pub fn cmd_classify(evidence: f64, config: &EngineConfig, json: bool) -> KsResult<()> {
    let state = config.thresholds.classify_checked(evidence)?;
    if json {
        println!(
            "{}",
            serde_json::json!({"evidence": evidence, "state": state.name(), "index": state.index()})
        );
    } else {
        println!("{} -> {} ({})", evidence, state.name(), state.index());
    }
    Ok(())
}

/// Compute the evidence delta of one interaction.
pub fn cmd_evidence(
    weight: f64,
    relevance: f64,
    depth: Option<f64>,
    json: bool,
) -> KsResult<()> {
    let mut event = InteractionEvent::new(weight, relevance);
    if let Some(d) = depth {
        event = event.reading_depth(d);
    }
    let delta = event.delta()?;
    if json {
        println!("{}", serde_json::json!({"event": event, "delta": delta}));
    } else {
        println!("Evidence delta: {:.6}", delta);
    }
    Ok(())
}

/// Decay an evidence value, tiered by state unless a fixed rate is given.
pub fn cmd_decay(
    evidence: f64,
    days: f64,
    stale: Option<f64>,
    rate: Option<f64>,
    config: &EngineConfig,
    json: bool,
) -> KsResult<()> {
    let stale = stale.unwrap_or(config.decay.stale_multiplier);
    let model = TieredDecay::new(config.thresholds, config.decay.rates);
    let (effective_rate, decayed) = match rate {
        Some(r) => (r, apply_decay(evidence, days, r)?),
        None => (
            model.effective_rate(evidence, stale)?,
            model.decay(evidence, days, stale)?,
        ),
    };
    let before = config.thresholds.classify(evidence);
    let after = config.thresholds.classify(decayed);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "evidence": evidence,
                "days": days,
                "rate": effective_rate,
                "decayed": decayed,
                "state_before": before.name(),
                "state_after": after.name(),
            })
        );
    } else {
        println!("Decay over {} days at {:.4}/day:", days, effective_rate);
        println!("  Evidence: {:.6} -> {:.6}", evidence, decayed);
        println!("  State: {} -> {}", before, after);
    }
    Ok(())
}

/// Apply an interaction to one topic in a JSON records file.
pub fn cmd_update(
    records_path: &Path,
    topic_id: &str,
    event: InteractionEvent,
    at: Option<DateTime<Utc>>,
    config: &EngineConfig,
    json: bool,
) -> KsResult<()> {
    let mut records = read_records(records_path)?;
    let engine = config.evidence_engine();
    let at = at.unwrap_or_else(now_utc);

    let pos = match records.iter().position(|r| r.topic_id == topic_id) {
        Some(pos) => pos,
        None => {
            records.push(engine.new_record(topic_id, at));
            records.len() - 1
        }
    };

    let update = engine.apply_interaction(&records[pos], &event, at)?;
    records[pos] = update.record.clone();
    write_records(records_path, &records)?;

    let state = config.thresholds.classify(update.new_evidence());
    if json {
        println!(
            "{}",
            serde_json::json!({
                "topic_id": topic_id,
                "delta": update.delta,
                "old_evidence": update.old_evidence,
                "new_evidence": update.new_evidence(),
                "state": state.name(),
                "state_vector": update.record.state_vector,
                "transition": update.transition,
            })
        );
    } else {
        println!(
            "Topic {}: evidence {:.4} -> {:.4} ({})",
            topic_id,
            update.old_evidence,
            update.new_evidence(),
            state
        );
        if let Some(t) = update.transition {
            println!("  Transition: {} -> {}", t.from, t.to);
        }
        println!(
            "  Mass: {}",
            format_vector(update.record.state_vector.as_array())
        );
    }
    Ok(())
}

/// Capture every tracked topic into a snapshot and save it to a .ksnap file.
pub fn cmd_snapshot(
    records_path: &Path,
    path: &Path,
    user_id: &str,
    snapshot_type: SnapshotType,
    at: Option<DateTime<Utc>>,
    config: &EngineConfig,
    json: bool,
) -> KsResult<()> {
    let records = read_records(records_path)?;
    let at = at.unwrap_or_else(now_utc);

    let mut builder =
        SnapshotBuilder::new(user_id, snapshot_type, at).total_mass(config.total_mass);
    for record in &records {
        builder = builder.record(record, record.topic_id.clone(), Vec::new());
    }
    let snapshot = builder.build()?;
    let id = snapshot.id.clone();

    let mut store = if path.exists() {
        open_for_write(path, config)?
    } else {
        SnapshotStore::new()
    };
    let report = store.save(snapshot, &config.retention, at)?;
    SnapshotWriter::new(config.total_mass).write_to_file(&store, path)?;

    if json {
        println!(
            "{}",
            serde_json::json!({"id": id, "spaces": records.len(), "kept": report.kept, "deleted": report.deleted})
        );
    } else {
        println!(
            "Captured {} topics as {} snapshot {}",
            records.len(),
            snapshot_type,
            id
        );
        if !report.deleted.is_empty() {
            println!("Retention removed {} snapshots", report.deleted.len());
        }
    }
    Ok(())
}

fn read_records(path: &Path) -> KsResult<Vec<TopicRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn write_records(path: &Path, records: &[TopicRecord]) -> KsResult<()> {
    let content = serde_json::to_string_pretty(records)?;
    std::fs::write(path, content)?;
    Ok(())
}

fn format_vector(values: &[f64; 4]) -> String {
    let parts: Vec<String> = TopicState::ALL
        .iter()
        .zip(values)
        .map(|(state, v)| format!("{}={:.2}", &state.name()[..1], v))
        .collect();
    format!("[{}]", parts.join(" "))
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
