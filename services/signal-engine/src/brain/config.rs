//! Engine configuration
//!
//! Layered like the rest of the service: optional TOML file, then
//! `SIGNAL_ENGINE_*` environment variables (`__` separates nested keys, e.g.
//! `SIGNAL_ENGINE_SCORING__IMPULSE_POLICY=hard_stop`).

use serde::{Deserialize, Serialize};

use crate::brain::presets::PlanMode;
use crate::error::{EngineError, Result};
use crate::market::StrengthThresholds;

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of trailing bars the feature extractor looks at
    #[serde(default = "default_lookback_window")]
    pub lookback_window: usize,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub counter_trend: CounterTrendConfig,
    #[serde(default)]
    pub market_strength: MarketStrengthConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub output: OutputFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback_window: default_lookback_window(),
            scoring: ScoringConfig::default(),
            counter_trend: CounterTrendConfig::default(),
            market_strength: MarketStrengthConfig::default(),
            log_level: default_log_level(),
            output: OutputFormat::default(),
        }
    }
}

/// What happens when impulse falls below the context stop threshold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpulsePolicy {
    /// Soft warning only
    #[default]
    Warn,
    /// Hard stop below the stop threshold, warning below the warn threshold
    HardStop,
}

/// Primary signal scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Minimum confidence for ENTER (and for AVOID when stops exist)
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: u8,
    #[serde(default)]
    pub impulse_policy: ImpulsePolicy,
    /// Apply the per-context bonus table and its warnings
    #[serde(default = "default_true")]
    pub context_adjustments: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            impulse_policy: ImpulsePolicy::default(),
            context_adjustments: true,
        }
    }
}

/// Whether factor weights adapt to the regime or stay close to the base table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingMode {
    Static,
    #[default]
    Adaptive,
}

/// Counter-trend detector gates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterTrendConfig {
    /// Minimum number of triggered factors
    #[serde(default = "default_min_signals")]
    pub min_signals: usize,
    /// Minimum weighted raw score
    #[serde(default = "default_min_score")]
    pub min_score: i64,
    #[serde(default = "default_enter_threshold")]
    pub enter_threshold: u8,
    #[serde(default = "default_watch_threshold")]
    pub watch_threshold: u8,
    #[serde(default)]
    pub weighting: WeightingMode,
    #[serde(default)]
    pub plan_mode: PlanMode,
}

impl Default for CounterTrendConfig {
    fn default() -> Self {
        Self {
            min_signals: default_min_signals(),
            min_score: default_min_score(),
            enter_threshold: default_enter_threshold(),
            watch_threshold: default_watch_threshold(),
            weighting: WeightingMode::default(),
            plan_mode: PlanMode::default(),
        }
    }
}

/// Market strength derivation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketStrengthConfig {
    /// Estimate a score when the snapshot carries none
    #[serde(default)]
    pub derive_when_missing: bool,
    #[serde(flatten)]
    pub thresholds: StrengthThresholds,
}

/// CLI output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn default_lookback_window() -> usize { 12 }
fn default_log_level() -> String { "info".to_string() }
fn default_confidence_threshold() -> u8 { 58 }
fn default_true() -> bool { true }
fn default_min_signals() -> usize { 2 }
fn default_min_score() -> i64 { 38 }
fn default_enter_threshold() -> u8 { 65 }
fn default_watch_threshold() -> u8 { 48 }

impl EngineConfig {
    /// Load from the optional config file and environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("SIGNAL_ENGINE_CONFIG")
            .unwrap_or_else(|_| "signal-engine.toml".to_string());
        Self::load_from(&path)
    }

    /// Load from an explicit file path (missing file means defaults)
    pub fn load_from(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("SIGNAL_ENGINE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: EngineConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.lookback_window == 0 {
            return Err(EngineError::InvalidConfig(
                "lookback_window must be at least 1".to_string(),
            ));
        }
        if self.scoring.confidence_threshold > 100 {
            return Err(EngineError::InvalidConfig(format!(
                "scoring.confidence_threshold {} exceeds 100",
                self.scoring.confidence_threshold
            )));
        }
        let ct = &self.counter_trend;
        if ct.watch_threshold > ct.enter_threshold {
            return Err(EngineError::InvalidConfig(format!(
                "counter_trend.watch_threshold {} is above enter_threshold {}",
                ct.watch_threshold, ct.enter_threshold
            )));
        }
        if ct.min_signals == 0 {
            return Err(EngineError::InvalidConfig(
                "counter_trend.min_signals must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
