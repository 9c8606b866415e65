//! Adaptive factor weighting
//!
//! Turns the base weight table into per-tick weights for the triggered
//! counter-trend factors, then smooths them against the previous tick.
//! The smoothing memory is an explicit value owned by the caller, one per
//! instrument, so nothing leaks between symbols or test cases.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::brain::config::WeightingMode;
use crate::brain::factors::{CtFactor, Factor};
use crate::brain::features::DerivedMetrics;
use crate::market::{Direction, MarketSnapshot};

/// Integer weight per triggered factor
pub type WeightMap = BTreeMap<CtFactor, i64>;

/// Previous tick's smoothed weights for one instrument
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightMemory {
    previous: WeightMap,
}

impl WeightMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, factor: CtFactor) -> Option<i64> {
        self.previous.get(&factor).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }

    pub fn reset(&mut self) {
        self.previous.clear();
    }
}

/// Weight memories keyed by instrument symbol
#[derive(Debug, Clone, Default)]
pub struct WeightMemoryStore {
    memories: HashMap<String, WeightMemory>,
}

impl WeightMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory for `symbol`, created empty on first use
    pub fn memory_for(&mut self, symbol: &str) -> &mut WeightMemory {
        self.memories.entry(symbol.to_string()).or_default()
    }

    pub fn get(&self, symbol: &str) -> Option<&WeightMemory> {
        self.memories.get(symbol)
    }

    pub fn reset(&mut self) {
        self.memories.clear();
    }
}

/// Inputs to one weighting pass
#[derive(Debug, Clone, Copy)]
pub struct WeightingInput<'a> {
    pub triggered: &'a [CtFactor],
    pub metrics: &'a DerivedMetrics,
    pub snapshot: &'a MarketSnapshot,
    /// Direction of the primary signal
    pub direction: Direction,
    pub market_strength: Option<f64>,
    pub mode: WeightingMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrendBucket {
    Strong,
    Weak,
    Chop,
}

impl TrendBucket {
    fn of(trend_stability: f64) -> Self {
        if trend_stability > 0.75 {
            TrendBucket::Strong
        } else if trend_stability < 0.35 {
            TrendBucket::Weak
        } else {
            TrendBucket::Chop
        }
    }
}

fn regime_multiplier(factor: CtFactor, m: &DerivedMetrics) -> f64 {
    let vr = m.volatility_regime;
    let ts = m.trend_stability;
    match factor {
        CtFactor::WickSignal if vr > 2.0 => 0.6,
        CtFactor::WickSignal if vr < 1.0 => 1.2,
        CtFactor::RsiDivergence if ts < 0.4 => 1.3,
        CtFactor::RsiDivergence if ts > 0.9 => 0.5,
        CtFactor::Absorption if vr > 1.8 => 1.3,
        CtFactor::WeakImpulse if ts > 0.8 => 0.6,
        CtFactor::WeakImpulse => 1.1,
        CtFactor::WeakTrend if ts < 0.35 => 1.4,
        CtFactor::HtfExhaustion if vr < 1.2 => 1.2,
        CtFactor::StructureShift if vr > 2.2 => 0.7,
        _ => 1.0,
    }
}

fn context_boost(factor: CtFactor, m: &DerivedMetrics, market_strength: Option<f64>) -> f64 {
    let mut boost: f64 = 1.0;
    if factor == CtFactor::Absorption && market_strength.is_some_and(|score| score < 25.0) {
        boost += 0.2;
    }
    if factor == CtFactor::WickSignal && m.volatility_regime > 2.0 {
        boost -= 0.2;
    }
    boost.clamp(0.5, 1.5)
}

/// Raw (unrounded, unsmoothed) weights for the triggered factors
fn raw_weights(input: &WeightingInput<'_>) -> BTreeMap<CtFactor, f64> {
    let m = input.metrics;
    let s = input.snapshot;

    let mut weights: BTreeMap<CtFactor, f64> = input
        .triggered
        .iter()
        .map(|&f| {
            let mut w = f.base_weight();
            if input.mode != WeightingMode::Static {
                w *= regime_multiplier(f, m);
                w *= context_boost(f, m, input.market_strength);
            }
            (f, w)
        })
        .collect();

    let mut scale = |f: CtFactor, by: f64| {
        if let Some(w) = weights.get_mut(&f) {
            *w *= by;
        }
    };

    if input.direction == Direction::Short {
        scale(CtFactor::WickSignal, 1.15);
        scale(CtFactor::Absorption, 1.10);
    }

    match TrendBucket::of(m.trend_stability) {
        TrendBucket::Strong => {
            scale(CtFactor::WeakImpulse, 0.8);
            scale(CtFactor::WeakTrend, 0.8);
        }
        TrendBucket::Weak => {
            scale(CtFactor::WeakTrend, 1.2);
            scale(CtFactor::RsiDivergence, 1.1);
        }
        TrendBucket::Chop => scale(CtFactor::WickSignal, 1.1),
    }

    if s.rsi.is_some_and(|rsi| rsi > 70.0 || rsi < 30.0) {
        scale(CtFactor::RsiDivergence, 1.25);
    }

    if let (Some(volume), Some(avg)) = (s.volume, s.avg_volume) {
        if volume < avg * 0.6 {
            scale(CtFactor::WickSignal, 0.7);
            scale(CtFactor::Absorption, 0.8);
        }
    }

    let has = |f: CtFactor| input.triggered.contains(&f);
    let mut bump = |f: CtFactor, by: f64| {
        if let Some(w) = weights.get_mut(&f) {
            *w += by;
        }
    };

    if has(CtFactor::WeakTrend) && has(CtFactor::RsiDivergence) {
        bump(CtFactor::RsiDivergence, 3.0);
        bump(CtFactor::WeakTrend, 3.0);
    }
    if has(CtFactor::Absorption) && has(CtFactor::WickSignal) {
        bump(CtFactor::Absorption, 2.0);
    }
    if has(CtFactor::StructureShift) && has(CtFactor::RsiDivergence) {
        bump(CtFactor::StructureShift, 2.0);
    }

    let damping = 1.0 / (m.volatility_regime + 2.0).ln();
    let decay = if input.triggered.len() >= 5 { 0.85 } else { 1.0 };
    for w in weights.values_mut() {
        *w *= damping * decay;
    }

    weights
}

/// Compute smoothed weights and store them as the new memory
///
/// Only the triggered factors survive into the memory; a factor that drops
/// out and later re-triggers starts from its unsmoothed weight again.
pub fn compute_weights(input: &WeightingInput<'_>, memory: &mut WeightMemory) -> WeightMap {
    let raw = raw_weights(input);

    let smoothed: WeightMap = raw
        .iter()
        .map(|(&f, &w)| {
            let w = if w.is_finite() {
                (w.round() as i64).clamp(1, 25)
            } else {
                1
            };
            let prev = memory.get(f).unwrap_or(w);
            // two-point average, halves round up
            let avg = ((w + prev) as f64 / 2.0).round() as i64;
            (f, avg)
        })
        .collect();

    debug!(?raw, ?smoothed, "Counter-trend weights");

    memory.previous = smoothed.clone();
    smoothed
}
