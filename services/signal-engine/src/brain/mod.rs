//! Brain module - Signal Confidence Engine
//!
//! Derived features, the declarative signal catalog, confidence scoring and
//! the counter-trend advisory with its adaptive factor weighting.

pub mod catalog;
pub mod config;
pub mod counter_trend;
pub mod engine;
pub mod evaluator;
pub mod factors;
pub mod features;
pub mod presets;
pub mod report;
pub mod scorer;
pub mod signal;
pub mod weighting;

// Re-export main types for convenience
pub use catalog::{default_catalog, SignalContext, SignalDefinition, SignalStage, CATALOG_VERSION};
pub use config::{
    CounterTrendConfig,
    EngineConfig,
    ImpulsePolicy,
    MarketStrengthConfig,
    OutputFormat,
    ScoringConfig,
    WeightingMode,
};
pub use engine::SignalEngine;
pub use factors::CtFactor;
pub use features::DerivedMetrics;
pub use presets::{CounterTrendPlan, PlanAction, PlanMode};
pub use report::render_text;
pub use signal::{Action, CounterTrendAction, CounterTrendResult, EngineOutput, SignalResult};
pub use weighting::{WeightMemory, WeightMemoryStore};
