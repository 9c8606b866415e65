//! Signal Engine - ranked entry signals with confidence scoring
//!
//! Consumes a flat market snapshot (indicators plus optional recent bars)
//! and produces scored entry signals and a counter-trend advisory.

pub mod brain;
pub mod error;
pub mod market;
pub mod observability;

pub use brain::{render_text, EngineConfig, EngineOutput, SignalEngine, WeightMemory, WeightMemoryStore};
pub use error::{EngineError, Result};
pub use market::{Candle, Direction, MarketSnapshot};

/// Parse a snapshot from JSON text
pub fn parse_snapshot(json: &str) -> Result<MarketSnapshot> {
    Ok(serde_json::from_str(json)?)
}

/// Read and parse a snapshot file
pub fn load_snapshot(path: impl AsRef<std::path::Path>) -> Result<MarketSnapshot> {
    let text = std::fs::read_to_string(path)?;
    parse_snapshot(&text)
}
