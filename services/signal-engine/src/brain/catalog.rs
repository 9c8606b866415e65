//! Signal catalog - declarative entry signal definitions
//!
//! Each definition carries three independent predicate stages evaluated
//! against the snapshot: setup, trigger and confirmation. A stage passes
//! when every condition it returns holds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::market::{Direction, MarketSnapshot, RangeState, TrendBias};

/// Bumped whenever definitions are added, removed or re-tuned
pub const CATALOG_VERSION: &str = "2024.3";

/// One predicate stage: a list of conditions that must all hold
pub type Predicate = fn(&MarketSnapshot) -> Vec<bool>;

/// Market context a signal is designed for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignalContext {
    TrendAdd,
    Reversal,
    HtfAdd,
    Range,
    Breakout,
    Breakdown,
    Pullback,
    Momentum,
    Volatility,
    LiquidityGrab,
    Sweep,
    Compression,
    Exhaustion,
    Imbalanced,
    /// Free-form tag with no scoring rules of its own
    Other(String),
}

impl SignalContext {
    pub fn as_str(&self) -> &str {
        match self {
            SignalContext::TrendAdd => "trend_add",
            SignalContext::Reversal => "reversal",
            SignalContext::HtfAdd => "htf_add",
            SignalContext::Range => "range",
            SignalContext::Breakout => "breakout",
            SignalContext::Breakdown => "breakdown",
            SignalContext::Pullback => "pullback",
            SignalContext::Momentum => "momentum",
            SignalContext::Volatility => "volatility",
            SignalContext::LiquidityGrab => "liquidity_grab",
            SignalContext::Sweep => "sweep",
            SignalContext::Compression => "compression",
            SignalContext::Exhaustion => "exhaustion",
            SignalContext::Imbalanced => "imbalanced",
            SignalContext::Other(tag) => tag,
        }
    }

    /// Fixed rationale phrase shown with every signal of this context
    pub fn reason(&self) -> &'static str {
        match self {
            SignalContext::TrendAdd => "Trend-following continuation setup",
            SignalContext::Reversal => "Mean-reversion / reversal setup",
            SignalContext::HtfAdd => "Higher timeframe confirmation",
            SignalContext::Range => "Range-based setup",
            SignalContext::Breakout => "Breakout continuation setup",
            SignalContext::Breakdown => "Breakdown continuation setup",
            SignalContext::Pullback => "Pullback entry within trend",
            SignalContext::Momentum => "Momentum acceleration setup",
            SignalContext::Volatility => "Volatility expansion setup",
            SignalContext::LiquidityGrab => "Liquidity grab reversal setup",
            SignalContext::Sweep => "Liquidity sweep setup",
            SignalContext::Compression => "Volatility compression setup",
            SignalContext::Exhaustion => "Trend exhaustion setup",
            SignalContext::Imbalanced => "Order-flow imbalance setup",
            SignalContext::Other(_) => "General market condition setup",
        }
    }
}

impl FromStr for SignalContext {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "trend_add" => SignalContext::TrendAdd,
            "reversal" => SignalContext::Reversal,
            "htf_add" => SignalContext::HtfAdd,
            "range" => SignalContext::Range,
            "breakout" => SignalContext::Breakout,
            "breakdown" => SignalContext::Breakdown,
            "pullback" => SignalContext::Pullback,
            "momentum" => SignalContext::Momentum,
            "volatility" => SignalContext::Volatility,
            "liquidity_grab" => SignalContext::LiquidityGrab,
            "sweep" => SignalContext::Sweep,
            "compression" => SignalContext::Compression,
            "exhaustion" => SignalContext::Exhaustion,
            "imbalanced" => SignalContext::Imbalanced,
            other => SignalContext::Other(other.to_string()),
        })
    }
}

impl fmt::Display for SignalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SignalContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SignalContext {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(tag.parse().unwrap_or_else(|never| match never {}))
    }
}

/// Furthest stage a definition reached for a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStage {
    /// Setup conditions not met
    Idle,
    /// Setup holds, waiting for the trigger
    SetupArmed,
    /// Setup and trigger hold, confirmation missing
    Triggered,
    /// All three stages hold
    Confirmed,
}

/// Static entry signal definition
#[derive(Clone)]
pub struct SignalDefinition {
    pub id: u32,
    pub direction: Direction,
    pub name: &'static str,
    /// 1 (lowest) to 10 (highest)
    pub priority: u8,
    pub context: SignalContext,
    pub setup: Predicate,
    pub trigger: Predicate,
    pub confirmation: Predicate,
}

impl SignalDefinition {
    /// Evaluate all three stages (every stage runs, none short-circuits)
    pub fn stage(&self, snapshot: &MarketSnapshot) -> SignalStage {
        let setup = all((self.setup)(snapshot));
        let trigger = all((self.trigger)(snapshot));
        let confirmation = all((self.confirmation)(snapshot));

        match (setup, trigger, confirmation) {
            (false, _, _) => SignalStage::Idle,
            (true, false, _) => SignalStage::SetupArmed,
            (true, true, false) => SignalStage::Triggered,
            (true, true, true) => SignalStage::Confirmed,
        }
    }

    pub fn passes(&self, snapshot: &MarketSnapshot) -> bool {
        self.stage(snapshot) == SignalStage::Confirmed
    }
}

impl fmt::Debug for SignalDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalDefinition")
            .field("id", &self.id)
            .field("direction", &self.direction)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("context", &self.context)
            .finish()
    }
}

fn all(conditions: Vec<bool>) -> bool {
    conditions.into_iter().all(|c| c)
}

// Comparisons against absent indicator values never hold.

fn gt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

fn ge(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a >= b)
}

fn lt(a: Option<f64>, b: Option<f64>) -> bool {
    gt(b, a)
}

fn le(a: Option<f64>, b: Option<f64>) -> bool {
    ge(b, a)
}

fn above(a: Option<f64>, level: f64) -> bool {
    gt(a, Some(level))
}

fn below(a: Option<f64>, level: f64) -> bool {
    lt(a, Some(level))
}

fn is_range(s: &MarketSnapshot) -> bool {
    s.range_state == Some(RangeState::Range)
}

/// The canonical catalog, ordered as the evaluator should break priority ties
pub fn default_catalog() -> Vec<SignalDefinition> {
    vec![
        // Trend continuation / add-on
        SignalDefinition {
            id: 2,
            direction: Direction::Long,
            name: "EMA Pullback Continuation",
            priority: 9,
            context: SignalContext::TrendAdd,
            setup: |s| vec![gt(s.ema8, s.ema21), gt(s.ema21, s.ema50), gt(s.ema50, s.ema200)],
            trigger: |s| vec![le(s.price, s.ema21)],
            confirmation: |s| vec![above(s.rsi, 50.0), gt(s.macd, s.macd_signal)],
        },
        SignalDefinition {
            id: 21,
            direction: Direction::Long,
            name: "Micro Pullback Continuation",
            priority: 8,
            context: SignalContext::TrendAdd,
            setup: |s| vec![gt(s.ema8, s.ema21), above(s.rsi, 50.0)],
            trigger: |s| vec![le(s.price, s.ema8)],
            confirmation: |s| vec![gt(s.macd, s.macd_signal)],
        },
        SignalDefinition {
            id: 12,
            direction: Direction::Short,
            name: "EMA Pullback Continuation (Downtrend)",
            priority: 9,
            context: SignalContext::TrendAdd,
            setup: |s| vec![lt(s.ema8, s.ema21), lt(s.ema21, s.ema50), lt(s.ema50, s.ema200)],
            trigger: |s| vec![ge(s.price, s.ema21)],
            confirmation: |s| vec![below(s.rsi, 50.0), lt(s.macd, s.macd_signal)],
        },
        // Reversals / mean reversion
        SignalDefinition {
            id: 1,
            direction: Direction::Long,
            name: "Bollinger Oversold Reversal",
            priority: 7,
            context: SignalContext::Reversal,
            setup: |s| vec![le(s.price, s.bollinger_lower), below(s.rsi, 40.0)],
            trigger: |s| vec![below(s.stochastic, 30.0)],
            confirmation: |s| vec![gt(s.macd, s.macd_signal), gt(s.volume, s.avg_volume)],
        },
        SignalDefinition {
            id: 11,
            direction: Direction::Short,
            name: "Bollinger Overbought Reversal",
            priority: 7,
            context: SignalContext::Reversal,
            setup: |s| vec![ge(s.price, s.bollinger_upper), above(s.rsi, 60.0)],
            trigger: |s| vec![above(s.stochastic, 70.0)],
            confirmation: |s| vec![lt(s.macd, s.macd_signal), gt(s.volume, s.avg_volume)],
        },
        // Higher timeframe add-ons
        SignalDefinition {
            id: 8,
            direction: Direction::Long,
            name: "HTF Bullish Alignment",
            priority: 8,
            context: SignalContext::HtfAdd,
            setup: |s| vec![s.higher_trend() == Some(TrendBias::Bull)],
            trigger: |s| vec![s.current_trend() == Some(TrendBias::Bull)],
            confirmation: |s| vec![gt(s.ema21, s.ema50)],
        },
        SignalDefinition {
            id: 18,
            direction: Direction::Short,
            name: "HTF Bearish Alignment",
            priority: 8,
            context: SignalContext::HtfAdd,
            setup: |s| vec![s.higher_trend() == Some(TrendBias::Bear)],
            trigger: |s| vec![s.current_trend() == Some(TrendBias::Bear)],
            confirmation: |s| vec![lt(s.ema21, s.ema50)],
        },
        // Range trading
        SignalDefinition {
            id: 7,
            direction: Direction::Long,
            name: "Range Low Bounce",
            priority: 6,
            context: SignalContext::Range,
            setup: |s| vec![is_range(s), le(s.price, s.bollinger_middle)],
            trigger: |s| vec![above(s.stochastic, 30.0)],
            confirmation: |s| vec![ge(s.volume, s.avg_volume)],
        },
        SignalDefinition {
            id: 17,
            direction: Direction::Short,
            name: "Range High Rejection",
            priority: 6,
            context: SignalContext::Range,
            setup: |s| vec![is_range(s), ge(s.price, s.bollinger_middle)],
            trigger: |s| vec![below(s.stochastic, 70.0)],
            confirmation: |s| vec![ge(s.volume, s.avg_volume)],
        },
        // Momentum
        SignalDefinition {
            id: 22,
            direction: Direction::Long,
            name: "Momentum Flip",
            priority: 6,
            context: SignalContext::Momentum,
            setup: |s| vec![below(s.rsi, 45.0)],
            trigger: |s| vec![above(s.rsi, 50.0)],
            confirmation: |s| vec![gt(s.macd, s.macd_signal)],
        },
        SignalDefinition {
            id: 27,
            direction: Direction::Short,
            name: "Momentum Breakdown",
            priority: 6,
            context: SignalContext::Momentum,
            setup: |s| vec![above(s.rsi, 55.0)],
            trigger: |s| vec![below(s.rsi, 50.0)],
            confirmation: |s| vec![lt(s.macd, s.macd_signal)],
        },
        // Volatility
        SignalDefinition {
            id: 19,
            direction: Direction::Short,
            name: "Volatility Compression Breakdown",
            priority: 6,
            context: SignalContext::Volatility,
            setup: |s| vec![lt(s.bollinger_width, s.bollinger_width_avg)],
            trigger: |s| vec![lt(s.price, s.bollinger_lower)],
            confirmation: |s| vec![gt(s.volume, s.avg_volume)],
        },
        // Counter-trend exhaustion against the higher timeframe
        SignalDefinition {
            id: 101,
            direction: Direction::Long,
            name: "Counter-Trend Long (HTF Bearish Exhaustion)",
            priority: 5,
            context: SignalContext::Other("counter_trend".to_string()),
            setup: |s| {
                vec![
                    s.higher_trend() == Some(TrendBias::Bear),
                    below(s.rsi, 30.0),
                    le(s.price, s.bollinger_lower),
                ]
            },
            trigger: |s| vec![above(s.stochastic, 20.0)],
            confirmation: |s| vec![gt(s.macd, s.macd_signal), gt(s.volume, s.avg_volume)],
        },
        SignalDefinition {
            id: 102,
            direction: Direction::Short,
            name: "Counter-Trend Short (HTF Bullish Exhaustion)",
            priority: 5,
            context: SignalContext::Other("counter_trend".to_string()),
            setup: |s| {
                vec![
                    s.higher_trend() == Some(TrendBias::Bull),
                    above(s.rsi, 70.0),
                    ge(s.price, s.bollinger_upper),
                ]
            },
            trigger: |s| vec![below(s.stochastic, 80.0)],
            confirmation: |s| vec![lt(s.macd, s.macd_signal), gt(s.volume, s.avg_volume)],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uptrend_pullback() -> MarketSnapshot {
        MarketSnapshot {
            price: Some(100.0),
            ema8: Some(103.0),
            ema21: Some(101.0),
            ema50: Some(98.0),
            ema200: Some(90.0),
            rsi: Some(55.0),
            macd: Some(1.2),
            macd_signal: Some(0.9),
            ..Default::default()
        }
    }

    fn find(id: u32) -> SignalDefinition {
        default_catalog().into_iter().find(|d| d.id == id).unwrap()
    }

    #[test]
    fn test_catalog_ids_are_unique() {
        let catalog = default_catalog();
        let mut ids: Vec<u32> = catalog.iter().map(|d| d.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), catalog.len());
        assert!(catalog.iter().all(|d| (1..=10).contains(&d.priority)));
    }

    #[test]
    fn test_stage_progression() {
        let def = find(2);
        let mut snap = uptrend_pullback();
        assert_eq!(def.stage(&snap), SignalStage::Confirmed);

        snap.macd = Some(0.5);
        assert_eq!(def.stage(&snap), SignalStage::Triggered);

        snap.price = Some(102.0);
        assert_eq!(def.stage(&snap), SignalStage::SetupArmed);

        snap.ema200 = Some(99.0);
        assert_eq!(def.stage(&snap), SignalStage::Idle);
    }

    #[test]
    fn test_missing_fields_never_pass() {
        let empty = MarketSnapshot::default();
        assert!(default_catalog().iter().all(|d| !d.passes(&empty)));
    }

    #[test]
    fn test_context_tags_round_trip() {
        for tag in ["trend_add", "liquidity_grab", "counter_trend"] {
            let ctx: SignalContext = tag.parse().unwrap();
            assert_eq!(ctx.as_str(), tag);
        }
        assert_eq!(
            SignalContext::Other("whatever".into()).reason(),
            "General market condition setup"
        );
    }
}
