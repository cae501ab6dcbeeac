//! CLI entry point for the `kstate` command-line tool.

use std::path::PathBuf;
use std::process;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use knowledge_state::cli::commands::{self, BaselineArgs};
use knowledge_state::config::EngineConfig;
use knowledge_state::types::{InteractionEvent, InteractionKind, SnapshotType};
use knowledge_state::KsError;

#[derive(Parser)]
#[command(
    name = "kstate",
    about = "Knowledge state CLI: topic evidence, decay and snapshot baselines"
)]
struct Cli {
    /// Output format: "text" (default) or "json"
    #[arg(long, default_value = "text")]
    format: String,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty .ksnap archive
    Create {
        /// Path to the .ksnap file to create
        file: PathBuf,
    },
    /// Display information about a .ksnap archive
    Info {
        /// Path to the .ksnap file
        file: PathBuf,
    },
    /// Add a snapshot from JSON and apply retention
    Add {
        /// Path to the .ksnap file
        file: PathBuf,
        /// Path to the snapshot JSON file
        json_file: PathBuf,
        /// Reference time for retention (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<String>,
    },
    /// Apply retention to an archive
    Prune {
        /// Path to the .ksnap file
        file: PathBuf,
        /// Reference time for retention (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<String>,
    },
    /// List the newest snapshots
    List {
        /// Path to the .ksnap file
        file: PathBuf,
        /// Maximum snapshots to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Print one snapshot as JSON
    Show {
        /// Path to the .ksnap file
        file: PathBuf,
        /// Snapshot id
        id: String,
    },
    /// Export all snapshots as JSON
    Export {
        /// Path to the .ksnap file
        file: PathBuf,
        /// Pretty-print JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Compute a baseline over the trailing window of an archive
    Baseline {
        /// Path to the .ksnap file
        file: PathBuf,
        /// Use recency weighting instead of a uniform average
        #[arg(long)]
        weighted: bool,
        /// Recency weight in (0, 1]
        #[arg(long)]
        alpha: Option<f64>,
        /// Window length in days
        #[arg(long)]
        days: Option<i64>,
        /// Only include this user's snapshots
        #[arg(long)]
        user: Option<String>,
        /// End of the window (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<String>,
    },
    /// Classify an evidence value into a topic state
    Classify {
        /// Evidence value
        evidence: f64,
    },
    /// Compute the evidence delta of one interaction
    Evidence {
        /// Interaction weight (>= 0)
        #[arg(long)]
        weight: f64,
        /// Relevance in [0, 1]
        #[arg(long)]
        relevance: f64,
        /// Reading depth, clamped to [0, 1.5]
        #[arg(long)]
        depth: Option<f64>,
    },
    /// Decay an evidence value over a number of days
    Decay {
        /// Evidence value
        evidence: f64,
        /// Elapsed days
        #[arg(long)]
        days: f64,
        /// Staleness multiplier applied to the tiered rate
        #[arg(long)]
        stale: Option<f64>,
        /// Fixed rate per day instead of the tiered table
        #[arg(long)]
        rate: Option<f64>,
    },
    /// Apply an interaction to a topic in a JSON records file
    Update {
        /// Path to the topic records JSON file
        records: PathBuf,
        /// Topic id
        topic: String,
        /// Interaction tier: glance, read, deep
        #[arg(long, default_value = "read")]
        kind: String,
        /// Raw interaction weight, overrides --kind
        #[arg(long)]
        weight: Option<f64>,
        /// Relevance in [0, 1]
        #[arg(long)]
        relevance: f64,
        /// Reading depth, clamped to [0, 1.5]
        #[arg(long)]
        depth: Option<f64>,
        /// Interaction time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Capture every tracked topic into a snapshot archive
    Snapshot {
        /// Path to the topic records JSON file
        records: PathBuf,
        /// Path to the .ksnap file
        file: PathBuf,
        /// Owner of the snapshot
        #[arg(long)]
        user: String,
        /// Snapshot type: daily, weekly, monthly
        #[arg(long = "type", default_value = "daily")]
        snapshot_type: String,
        /// Capture time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
}

fn parse_time(value: Option<String>) -> Option<DateTime<Utc>> {
    let value = value?;
    match DateTime::parse_from_rfc3339(&value) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            eprintln!("Invalid timestamp {}: {}", value, e);
            process::exit(3);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let json = cli.format == "json";

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match EngineConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(3);
        }
    };

    let result = match cli.command {
        Commands::Create { file } => commands::cmd_create(&file, &config),
        Commands::Info { file } => commands::cmd_info(&file, json),
        Commands::Add {
            file,
            json_file,
            now,
        } => commands::cmd_add(&file, &json_file, parse_time(now), &config, json),
        Commands::Prune { file, now } => commands::cmd_prune(&file, parse_time(now), &config, json),
        Commands::List { file, limit } => commands::cmd_list(&file, limit, json),
        Commands::Show { file, id } => commands::cmd_show(&file, &id),
        Commands::Export { file, pretty } => commands::cmd_export(&file, pretty),
        Commands::Baseline {
            file,
            weighted,
            alpha,
            days,
            user,
            now,
        } => commands::cmd_baseline(
            &file,
            BaselineArgs {
                weighted,
                alpha,
                days,
                user: user.as_deref(),
                now: parse_time(now),
            },
            &config,
            json,
        ),
        Commands::Classify { evidence } => commands::cmd_classify(evidence, &config, json),
        Commands::Evidence {
            weight,
            relevance,
            depth,
        } => commands::cmd_evidence(weight, relevance, depth, json),
        Commands::Decay {
            evidence,
            days,
            stale,
            rate,
        } => commands::cmd_decay(evidence, days, stale, rate, &config, json),
        Commands::Update {
            records,
            topic,
            kind,
            weight,
            relevance,
            depth,
            at,
        } => {
            let mut event = match (weight, InteractionKind::from_name(&kind)) {
                (Some(w), _) => InteractionEvent::new(w, relevance),
                (None, Some(k)) => InteractionEvent::from_kind(k, relevance),
                (None, None) => {
                    eprintln!("Invalid interaction kind: {}", kind);
                    process::exit(3);
                }
            };
            if let Some(d) = depth {
                event = event.reading_depth(d);
            }
            commands::cmd_update(&records, &topic, event, parse_time(at), &config, json)
        }
        Commands::Snapshot {
            records,
            file,
            user,
            snapshot_type,
            at,
        } => {
            let st = match SnapshotType::from_name(&snapshot_type) {
                Some(st) => st,
                None => {
                    eprintln!("Invalid snapshot type: {}", snapshot_type);
                    process::exit(3);
                }
            };
            commands::cmd_snapshot(&records, &file, &user, st, parse_time(at), &config, json)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let code = match &e {
            KsError::Io(_) => 1,
            KsError::InvalidMagic
            | KsError::UnsupportedVersion(_)
            | KsError::Truncated
            | KsError::Corrupt(_)
            | KsError::Compression(_) => 2,
            KsError::InvalidArgument(_) | KsError::Config(_) | KsError::Json(_) => 3,
            KsError::EmptyInput | KsError::SnapshotNotFound(_) => 4,
            _ => 5,
        };
        process::exit(code);
    }
}
