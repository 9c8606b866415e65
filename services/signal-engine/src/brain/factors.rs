//! Counter-trend factor system
//!
//! Seven independent structural signs that the move being faded is running
//! out of steam. Each factor is a boolean test relative to the direction of
//! the primary signal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::brain::features::DerivedMetrics;
use crate::market::{Direction, MarketSnapshot, RecentWindow};

/// Everything a factor may look at
#[derive(Debug, Clone, Copy)]
pub struct FactorContext<'a> {
    pub snapshot: &'a MarketSnapshot,
    pub window: RecentWindow<'a>,
    pub metrics: &'a DerivedMetrics,
    /// Direction of the primary signal (the one being faded)
    pub direction: Direction,
}

impl<'a> FactorContext<'a> {
    pub fn impulse(&self) -> f64 {
        self.metrics.impulse(self.direction)
    }
}

/// Factor trait, one implementation per structural test
pub trait Factor {
    fn name(&self) -> &'static str;
    fn base_weight(&self) -> f64;
    fn evaluate(&self, ctx: &FactorContext<'_>) -> bool;
}

/// Available counter-trend factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CtFactor {
    #[serde(rename = "weakImpulse")]
    WeakImpulse,
    #[serde(rename = "weakTrend")]
    WeakTrend,
    #[serde(rename = "absorption")]
    Absorption,
    #[serde(rename = "htfExhaustion")]
    HtfExhaustion,
    #[serde(rename = "wickSignal")]
    WickSignal,
    #[serde(rename = "rsiDiv")]
    RsiDivergence,
    #[serde(rename = "structureShift")]
    StructureShift,
}

impl CtFactor {
    /// Evaluation and reporting order
    pub const ALL: [CtFactor; 7] = [
        CtFactor::WeakImpulse,
        CtFactor::WeakTrend,
        CtFactor::Absorption,
        CtFactor::HtfExhaustion,
        CtFactor::WickSignal,
        CtFactor::RsiDivergence,
        CtFactor::StructureShift,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CtFactor::WeakImpulse => "Weak impulse",
            CtFactor::WeakTrend => "Weak trend structure",
            CtFactor::Absorption => "Volume absorption",
            CtFactor::HtfExhaustion => "HTF exhaustion",
            CtFactor::WickSignal => "Wick rejection",
            CtFactor::RsiDivergence => "RSI divergence",
            CtFactor::StructureShift => "Micro-structure shift",
        }
    }
}

impl fmt::Display for CtFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn lt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a < b)
}

impl Factor for CtFactor {
    fn name(&self) -> &'static str {
        match self {
            CtFactor::WeakImpulse => "weakImpulse",
            CtFactor::WeakTrend => "weakTrend",
            CtFactor::Absorption => "absorption",
            CtFactor::HtfExhaustion => "htfExhaustion",
            CtFactor::WickSignal => "wickSignal",
            CtFactor::RsiDivergence => "rsiDiv",
            CtFactor::StructureShift => "structureShift",
        }
    }

    fn base_weight(&self) -> f64 {
        match self {
            CtFactor::WeakImpulse => 8.0,
            CtFactor::WeakTrend => 8.0,
            CtFactor::Absorption => 12.0,
            CtFactor::HtfExhaustion => 6.0,
            CtFactor::WickSignal => 7.0,
            CtFactor::RsiDivergence => 10.0,
            CtFactor::StructureShift => 6.0,
        }
    }

    fn evaluate(&self, ctx: &FactorContext<'_>) -> bool {
        let s = ctx.snapshot;
        let m = ctx.metrics;
        let long = ctx.direction == Direction::Long;

        match self {
            CtFactor::WeakImpulse => ctx.impulse() < 0.22,
            CtFactor::WeakTrend => m.trend_stability < 0.40,
            CtFactor::Absorption => {
                (long && m.volume_pressure < -0.1) || (!long && m.volume_pressure > 0.1)
            }
            CtFactor::HtfExhaustion => s.higher_tf.as_ref().is_some_and(|tf| {
                tf.atr_slope.is_some_and(|v| v < 0.0) || tf.momentum.is_some_and(|v| v < 0.0)
            }),
            CtFactor::WickSignal => {
                let Some(bar) = ctx.window.last() else {
                    return false;
                };
                let share = if m.volatility_regime > 2.0 { 0.35 } else { 0.25 };
                let wick = if long { bar.lower_wick() } else { bar.upper_wick() };
                wick > bar.range() * share
            }
            CtFactor::RsiDivergence => {
                if long {
                    lt(s.rsi, s.prev_rsi) && lt(s.prev_price, s.price)
                } else {
                    lt(s.prev_rsi, s.rsi) && lt(s.price, s.prev_price)
                }
            }
            CtFactor::StructureShift => {
                if long {
                    lt(s.prev_local_low, s.local_low)
                } else {
                    lt(s.local_high, s.prev_local_high)
                }
            }
        }
    }
}

/// Triggered factors in evaluation order
pub fn detect(ctx: &FactorContext<'_>) -> Vec<CtFactor> {
    CtFactor::ALL
        .into_iter()
        .filter(|f| f.evaluate(ctx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{Candle, TimeframeState};

    fn metrics() -> DerivedMetrics {
        DerivedMetrics {
            trend_stability: 0.6,
            impulse_long: 0.5,
            impulse_short: 0.5,
            retracement_risk: 0.5,
            volume_pressure: 0.0,
            volatility_regime: 1.0,
        }
    }

    fn context<'a>(
        snapshot: &'a MarketSnapshot,
        metrics: &'a DerivedMetrics,
        direction: Direction,
    ) -> FactorContext<'a> {
        FactorContext {
            snapshot,
            window: snapshot.recent(12),
            metrics,
            direction,
        }
    }

    #[test]
    fn test_nothing_triggers_on_neutral_input() {
        let snap = MarketSnapshot::default();
        let m = metrics();
        let ctx = FactorContext {
            snapshot: &snap,
            window: snap.recent(12),
            metrics: &m,
            direction: Direction::Long,
        };
        assert!(detect(&ctx).is_empty());
    }

    #[test]
    fn test_absorption_and_weak_impulse_long() {
        let snap = MarketSnapshot::default();
        let m = DerivedMetrics {
            impulse_long: 0.1,
            volume_pressure: -0.3,
            ..metrics()
        };
        let ctx = FactorContext {
            snapshot: &snap,
            window: snap.recent(12),
            metrics: &m,
            direction: Direction::Long,
        };
        assert_eq!(detect(&ctx), vec![CtFactor::WeakImpulse, CtFactor::Absorption]);

        let short = FactorContext {
            direction: Direction::Short,
            ..ctx
        };
        assert!(detect(&short).is_empty());
    }

    #[test]
    fn test_wick_threshold_widens_in_high_volatility() {
        let mut snap = MarketSnapshot::default();
        // lower wick 3 of range 10
        snap.candles = vec![Candle::new(5.0, 10.0, 0.0, 3.0, 1.0)];
        let calm = metrics();
        let wild = DerivedMetrics {
            volatility_regime: 2.2,
            ..metrics()
        };
        assert!(CtFactor::WickSignal.evaluate(&context(&snap, &calm, Direction::Long)));
        assert!(!CtFactor::WickSignal.evaluate(&context(&snap, &wild, Direction::Long)));
    }

    #[test]
    fn test_divergence_structure_and_htf() {
        let snap = MarketSnapshot {
            rsi: Some(60.0),
            prev_rsi: Some(65.0),
            price: Some(101.0),
            prev_price: Some(100.0),
            local_low: Some(95.0),
            prev_local_low: Some(94.0),
            higher_tf: Some(TimeframeState {
                trend: None,
                atr_slope: Some(0.1),
                momentum: Some(-0.2),
            }),
            ..Default::default()
        };
        let m = metrics();
        let ctx = FactorContext {
            snapshot: &snap,
            window: snap.recent(12),
            metrics: &m,
            direction: Direction::Long,
        };
        assert_eq!(
            detect(&ctx),
            vec![
                CtFactor::HtfExhaustion,
                CtFactor::RsiDivergence,
                CtFactor::StructureShift
            ]
        );
    }

    #[test]
    fn test_factor_names_match_serde() {
        for f in CtFactor::ALL {
            let json = serde_json::to_string(&f).unwrap();
            assert_eq!(json, format!("\"{}\"", f.name()));
        }
    }
}
