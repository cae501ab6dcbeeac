//! Engine configuration with TOML persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::{
    BaselineMode, BaselineOrchestrator, DecayRates, EvidenceEngine, RetentionPolicy, Thresholds,
};
use crate::types::{KsError, KsResult, TOTAL_MASS};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "KSTATE_CONFIG";

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Mass carried by every state vector.
    pub total_mass: f64,

    /// State thresholds.
    pub thresholds: Thresholds,

    /// Decay configuration.
    pub decay: DecayConfig,

    /// Snapshot retention bands.
    pub retention: RetentionPolicy,

    /// Baseline defaults.
    pub baseline: BaselineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// Per-state daily rates.
    #[serde(flatten)]
    pub rates: DecayRates,

    /// Multiplier applied to every rate.
    pub stale_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Recency weight for weighted baselines, in (0, 1].
    pub alpha: f64,

    /// Trailing window, in days, that baselines are computed over.
    pub window_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            total_mass: TOTAL_MASS,
            thresholds: Thresholds::default(),
            decay: DecayConfig::default(),
            retention: RetentionPolicy::default(),
            baseline: BaselineConfig::default(),
        }
    }
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            rates: DecayRates::default(),
            stale_multiplier: 1.0,
        }
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            window_days: 30,
        }
    }
}

impl EngineConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> KsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            KsError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| KsError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as TOML.
    pub fn save(&self, path: &Path) -> KsResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| KsError::Config(format!("failed to encode config: {e}")))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from the resolved path, or fall back to defaults when none exists.
    pub fn load_or_default(explicit: Option<&Path>) -> KsResult<Self> {
        match resolve_config_path(explicit) {
            Some(path) => {
                log::debug!("loading config from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Reject inconsistent settings.
    pub fn validate(&self) -> KsResult<()> {
        if !self.total_mass.is_finite() || self.total_mass <= 0.0 {
            return Err(KsError::Config(format!(
                "total_mass must be positive, got {}",
                self.total_mass
            )));
        }
        if !self.decay.stale_multiplier.is_finite() || self.decay.stale_multiplier < 0.0 {
            return Err(KsError::Config(format!(
                "stale_multiplier must be >= 0, got {}",
                self.decay.stale_multiplier
            )));
        }
        if !(self.baseline.alpha > 0.0 && self.baseline.alpha <= 1.0) {
            return Err(KsError::Config(format!(
                "baseline alpha must be within (0, 1], got {}",
                self.baseline.alpha
            )));
        }
        if self.baseline.window_days <= 0 {
            return Err(KsError::Config(format!(
                "baseline window_days must be positive, got {}",
                self.baseline.window_days
            )));
        }
        self.thresholds
            .validate()
            .and_then(|_| self.decay.rates.validate())
            .and_then(|_| self.retention.validate())
            .map_err(|e| KsError::Config(e.to_string()))
    }

    /// Build an evidence engine from this configuration.
    pub fn evidence_engine(&self) -> EvidenceEngine {
        EvidenceEngine::with_model(self.thresholds, self.decay.rates, self.total_mass)
            .stale_multiplier(self.decay.stale_multiplier)
    }

    /// Build a baseline orchestrator, weighted or simple.
    pub fn baseline_orchestrator(&self, weighted: bool) -> BaselineOrchestrator {
        let mode = if weighted {
            BaselineMode::Weighted {
                alpha: self.baseline.alpha,
            }
        } else {
            BaselineMode::Simple
        };
        BaselineOrchestrator::new(mode)
    }
}

/// Resolve the config file path using priority order:
/// 1. Explicit path (CLI arg)
/// 2. KSTATE_CONFIG environment variable
/// 3. .kstate/config.toml in current directory
///
/// Returns None when nothing is configured, meaning defaults apply.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }

    let cwd_config = PathBuf::from(".kstate/config.toml");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    None
}
