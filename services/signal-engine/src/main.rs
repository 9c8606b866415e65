//! Signal Engine CLI
//!
//! Reads one market snapshot (file argument or stdin), evaluates it and
//! prints the result:
//! 1. Loads configuration (file + environment)
//! 2. Parses and normalises the snapshot
//! 3. Runs the engine with a fresh weight memory for the symbol
//! 4. Prints plain text or pretty JSON

use std::io::Read;

use anyhow::Context;
use tracing::info;

use signal_engine::brain::engine::DEFAULT_SYMBOL;
use signal_engine::brain::OutputFormat;
use signal_engine::observability::{init_tracing, Logger};
use signal_engine::{load_snapshot, parse_snapshot, render_text, EngineConfig, SignalEngine, WeightMemoryStore};

fn main() -> anyhow::Result<()> {
    let config = EngineConfig::load().context("loading configuration")?;
    init_tracing(&config.log_level);

    let path = std::env::args().nth(1);
    let snapshot = match path.as_deref() {
        Some(p) => load_snapshot(p).with_context(|| format!("loading snapshot from {}", p))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            parse_snapshot(&buf).context("parsing snapshot from stdin")?
        }
    };

    let symbol = snapshot.symbol.clone().unwrap_or_else(|| DEFAULT_SYMBOL.to_string());
    let bars = snapshot.candles.len().to_string();
    Logger::event(
        tracing::Level::INFO,
        "cli",
        "snapshot_loaded",
        &[
            ("source", path.as_deref().unwrap_or("stdin")),
            ("symbol", symbol.as_str()),
            ("bars", bars.as_str()),
        ],
    );

    let output_format = config.output;
    let engine = SignalEngine::new(config);
    let mut store = WeightMemoryStore::new();
    let output = engine.evaluate_for_symbol(&snapshot, &mut store);

    for signal in &output.signals {
        Logger::signal_event(&symbol, signal);
    }
    if let Some(ct) = &output.counter_trend {
        Logger::counter_trend_event(&symbol, ct);
    }
    info!(signals = output.signals.len(), "Evaluation complete");

    match output_format {
        OutputFormat::Text => println!("{}", render_text(&output)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
    }

    Ok(())
}
