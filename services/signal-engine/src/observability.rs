//! Observability: tracing setup and structured engine events

use tracing_subscriber::EnvFilter;

use crate::brain::signal::{CounterTrendResult, SignalResult};

/// Install the fmt subscriber
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed (tests, embedding callers)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Structured logger for consistent log formatting
pub struct Logger;

impl Logger {
    /// Log a structured event
    pub fn event(level: tracing::Level, component: &str, event: &str, attributes: &[(&str, &str)]) {
        let attrs = attributes
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ");

        match level {
            tracing::Level::ERROR => tracing::error!(component, event, %attrs),
            tracing::Level::WARN => tracing::warn!(component, event, %attrs),
            tracing::Level::INFO => tracing::info!(component, event, %attrs),
            tracing::Level::DEBUG => tracing::debug!(component, event, %attrs),
            _ => tracing::trace!(component, event, %attrs),
        }
    }

    /// Log a scored signal
    pub fn signal_event(symbol: &str, signal: &SignalResult) {
        tracing::info!(
            symbol = %symbol,
            signal_id = signal.id,
            direction = %signal.direction,
            confidence = signal.confidence,
            action = signal.action.as_str(),
            stops = signal.stops.len(),
            warnings = signal.warnings.len(),
            "signal_event"
        );
    }

    /// Log the counter-trend decision
    pub fn counter_trend_event(symbol: &str, result: &CounterTrendResult) {
        tracing::info!(
            symbol = %symbol,
            active = result.active,
            direction = %result.direction,
            confidence = result.confidence,
            action = result.action.as_str(),
            score = result.score,
            factors = result.triggered_factors.len(),
            "counter_trend_event"
        );
    }
}
