//! Market data boundary - snapshot record, canonical bars, strength estimator

pub mod candle;
pub mod snapshot;
pub mod strength;

pub use candle::Candle;
pub use snapshot::{
    Direction, MarketSnapshot, MarketStrength, RangeState, RecentWindow, StrengthLabel,
    TimeframeState, TrendBias,
};
pub use strength::{StrengthThresholds, StructureBias};
