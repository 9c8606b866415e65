//! Counter-trend detector
//!
//! Looks for exhaustion of the move the primary signal wants to ride and,
//! when enough weighted evidence stacks up, proposes the opposite trade
//! together with a level plan. An inactive result always says why.

use tracing::{debug, info};

use crate::brain::config::CounterTrendConfig;
use crate::brain::factors::{self, CtFactor, FactorContext};
use crate::brain::features::{estimate_atr, or_default, DerivedMetrics};
use crate::brain::presets::{build_plan, plan_action};
use crate::brain::scorer::{MAX_CONFIDENCE, MIN_CONFIDENCE};
use crate::brain::signal::{CounterTrendAction, CounterTrendResult, SignalResult};
use crate::brain::weighting::{compute_weights, WeightMap, WeightMemory, WeightingInput};
use crate::market::MarketSnapshot;

/// Inputs to one detector run
#[derive(Debug, Clone, Copy)]
pub struct CounterTrendInput<'a> {
    pub snapshot: &'a MarketSnapshot,
    pub metrics: &'a DerivedMetrics,
    /// Highest-priority scored signal
    pub primary: &'a SignalResult,
    pub market_strength: Option<f64>,
    pub lookback: usize,
    pub config: &'a CounterTrendConfig,
}

/// Very strong, stable, orderly trend: never fade it
pub fn kill_switch(metrics: &DerivedMetrics, impulse: f64) -> bool {
    metrics.trend_stability > 0.85 && impulse > 0.65 && metrics.volatility_regime < 1.8
}

fn confidence(raw_score: i64, metrics: &DerivedMetrics) -> u8 {
    let penalty = if metrics.volatility_regime > 2.0 { 8 } else { 0 };
    (25 + raw_score - penalty).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE) as u8
}

/// Run the detector against the primary signal's direction
///
/// The weight memory is only touched when the factor-count gate passes.
pub fn detect(input: &CounterTrendInput<'_>, memory: &mut WeightMemory) -> CounterTrendResult {
    let cfg = input.config;
    let m = input.metrics;
    let direction = input.primary.direction;
    let impulse = m.impulse(direction);

    let ctx = FactorContext {
        snapshot: input.snapshot,
        window: input.snapshot.recent(input.lookback),
        metrics: m,
        direction,
    };
    let triggered = factors::detect(&ctx);
    debug!(?direction, ?triggered, "Counter-trend factors");

    if kill_switch(m, impulse) {
        return CounterTrendResult::inactive(
            direction,
            triggered,
            0,
            WeightMap::new(),
            vec![format!(
                "Kill switch: dominant trend (stability {:.2}, impulse {:.2}, volatility {:.2})",
                m.trend_stability, impulse, m.volatility_regime
            )],
        );
    }

    if triggered.len() < cfg.min_signals {
        return CounterTrendResult::inactive(
            direction,
            triggered.clone(),
            0,
            WeightMap::new(),
            vec![format!(
                "Only {} counter-trend factor(s), need {}",
                triggered.len(),
                cfg.min_signals
            )],
        );
    }

    let weights = compute_weights(
        &WeightingInput {
            triggered: &triggered,
            metrics: m,
            snapshot: input.snapshot,
            direction,
            market_strength: input.market_strength,
            mode: cfg.weighting,
        },
        memory,
    );
    let raw_score: i64 = weights.values().sum();

    if raw_score < cfg.min_score {
        return CounterTrendResult::inactive(
            direction,
            triggered,
            raw_score,
            weights,
            vec![format!(
                "Counter-trend score {} below minimum {}",
                raw_score, cfg.min_score
            )],
        );
    }

    let confidence = confidence(raw_score, m);
    let action = if confidence >= cfg.enter_threshold {
        CounterTrendAction::Enter
    } else if confidence >= cfg.watch_threshold {
        CounterTrendAction::Watch
    } else {
        CounterTrendAction::Ignore
    };
    let reversed = direction.opposite();

    let mut reasons = vec!["Counter-trend conditions detected".to_string()];
    reasons.extend(triggered.iter().map(|f: &CtFactor| f.label().to_string()));

    let plan = input.snapshot.last_close().and_then(|last_close| {
        let risk_unit = or_default(
            Some(estimate_atr(&input.snapshot.candles, input.snapshot.atr)),
            or_default(Some(last_close * 0.01), 1.0),
        );
        build_plan(
            cfg.plan_mode,
            reversed,
            plan_action(confidence, cfg.watch_threshold, input.primary.has_hard_stops()),
            last_close,
            risk_unit,
        )
    });

    info!(
        direction = %reversed,
        confidence,
        action = action.as_str(),
        score = raw_score,
        factors = triggered.len(),
        "Counter-trend active"
    );

    CounterTrendResult {
        active: true,
        faded_direction: direction,
        direction: reversed,
        confidence,
        action,
        triggered_factors: triggered,
        score: raw_score,
        weights,
        reasons,
        plan,
    }
}
