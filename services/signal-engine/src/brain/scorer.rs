//! Confidence scorer
//!
//! Additive, context-sensitive confidence model with hard-stop overrides.
//! Integer terms use `floor` on each metric contribution before summing,
//! then the total is clamped to [5, 97].

use tracing::info;

use crate::brain::catalog::{SignalContext, SignalDefinition};
use crate::brain::config::{ImpulsePolicy, ScoringConfig};
use crate::brain::features::DerivedMetrics;
use crate::brain::signal::{Action, SignalResult};
use crate::market::Direction;

pub const MIN_CONFIDENCE: i64 = 5;
pub const MAX_CONFIDENCE: i64 = 97;

/// Global inputs shared by every signal of one evaluation
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    pub metrics: &'a DerivedMetrics,
    /// Global market strength score (0-100) if known
    pub market_strength: Option<f64>,
    pub composite_active: bool,
    pub config: &'a ScoringConfig,
}

/// `clamp((v - min) / (max - min), 0, 1)`
pub fn normalize(v: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span == 0.0 {
        return 0.5;
    }
    if !v.is_finite() {
        return 0.0;
    }
    ((v - min) / span).clamp(0.0, 1.0)
}

/// Impulse stop/warn pair for a context
pub fn impulse_thresholds(context: &SignalContext) -> (f64, f64) {
    match context {
        SignalContext::HtfAdd => (0.03, 0.10),
        SignalContext::TrendAdd => (0.05, 0.15),
        SignalContext::Reversal => (0.08, 0.20),
        SignalContext::Range => (0.02, 0.10),
        SignalContext::Momentum => (0.05, 0.15),
        SignalContext::Volatility => (0.04, 0.12),
        _ => (0.04, 0.18),
    }
}

fn context_bonus(context: &SignalContext) -> i64 {
    match context {
        SignalContext::TrendAdd => 12,
        SignalContext::Reversal => 8,
        SignalContext::HtfAdd => 10,
        _ => 0,
    }
}

/// Optional per-context adjustment and its conditional warning
fn context_adjustment(
    context: &SignalContext,
    m: &DerivedMetrics,
    impulse: f64,
) -> (i64, Option<&'static str>) {
    let warn = |cond: bool, text: &'static str| cond.then_some(text);
    match context {
        SignalContext::Breakout => (8, warn(impulse < 0.3, "Breakout impulse not confirmed")),
        SignalContext::Breakdown => (8, warn(impulse < 0.3, "Breakdown impulse not confirmed")),
        SignalContext::Pullback => (
            5,
            warn(m.retracement_risk > 1.2, "Pullback extended beyond typical depth"),
        ),
        SignalContext::Momentum => (7, warn(impulse < 0.15, "Momentum fading")),
        SignalContext::LiquidityGrab => (
            4,
            warn(m.volatility_regime > 2.0, "Liquidity grab in disorderly market"),
        ),
        SignalContext::Sweep => (5, None),
        SignalContext::Compression => (
            6,
            warn(m.volatility_regime > 1.5, "Compression already expanding"),
        ),
        SignalContext::Exhaustion => (
            4,
            warn(m.trend_stability > 0.85, "Exhaustion call against stable trend"),
        ),
        SignalContext::Imbalanced => (
            5,
            warn(m.volume_pressure.abs() < 0.2, "Imbalance not reflected in volume"),
        ),
        SignalContext::Volatility if m.volatility_regime > 2.0 => {
            (-6, Some("Volatility setup in extreme regime"))
        }
        _ => (0, None),
    }
}

/// Whether a reversal setup should be traded the other way
pub fn should_auto_flip(context: &SignalContext, m: &DerivedMetrics, impulse: f64) -> bool {
    *context == SignalContext::Reversal && m.trend_stability > 0.85 && impulse < 0.22
}

fn floor(v: f64) -> i64 {
    v.floor() as i64
}

/// Score one active signal
pub fn score(def: &SignalDefinition, input: &ScoringInput<'_>) -> SignalResult {
    let m = input.metrics;
    let cfg = input.config;
    let context = &def.context;

    // taken before any flip
    let impulse = m.impulse(def.direction);
    let vp = m.volume_pressure;

    let reasons = vec![context.reason().to_string()];
    let mut warnings: Vec<String> = Vec::new();
    let mut stops: Vec<String> = Vec::new();

    let flipped = should_auto_flip(context, m, impulse);
    let direction = if flipped {
        warnings.push("Auto-flip: strong dominant trend vs weak reversal impulse".to_string());
        def.direction.opposite()
    } else {
        def.direction
    };

    let (impulse_stop, impulse_warn) = impulse_thresholds(context);
    match cfg.impulse_policy {
        ImpulsePolicy::Warn => {
            if impulse < impulse_stop {
                warnings.push("Impulse weak for this context".to_string());
            }
        }
        ImpulsePolicy::HardStop => {
            if impulse < impulse_stop {
                stops.push("Impulse too weak for this context".to_string());
            } else if impulse < impulse_warn {
                warnings.push("Impulse weak for this context".to_string());
            }
        }
    }

    let weak_market = input.market_strength.is_some_and(|score| score < 20.0);

    // Hard stops
    if m.trend_stability < 0.08 {
        stops.push("Market structure unstable".to_string());
    }
    if m.volatility_regime > 2.3 {
        stops.push("Extreme volatility regime".to_string());
    }
    if m.retracement_risk > 1.95 {
        stops.push("Retracement risk extremely high".to_string());
    }
    if weak_market {
        stops.push("Weak global market environment".to_string());
    }
    match direction {
        Direction::Long if vp < -0.55 => stops.push("Strong sell-side dominance".to_string()),
        Direction::Short if vp > 0.55 => stops.push("Strong buy-side dominance".to_string()),
        _ => {}
    }

    // Soft warnings
    if m.retracement_risk > 1.5 {
        warnings.push("High retracement risk".to_string());
    }
    if weak_market {
        warnings.push("Weak global market environment".to_string());
    }
    if m.volatility_regime > 1.8 {
        warnings.push("Elevated volatility regime".to_string());
    }
    match direction {
        Direction::Long if vp < -0.4 => warnings.push("Sell pressure against long".to_string()),
        Direction::Short if vp > 0.4 => warnings.push("Buy pressure against short".to_string()),
        _ => {}
    }

    let mut conf: i64 = 40;
    conf += i64::from(def.priority) * 5;
    conf += context_bonus(context);
    conf += floor(normalize(m.trend_stability, 0.0, 1.5) * 20.0);
    conf += match direction {
        Direction::Long => floor(vp * 10.0),
        Direction::Short => floor(-vp * 10.0),
    };
    conf += floor(normalize(impulse, 0.0, 1.5) * 18.0);
    conf -= floor((normalize(m.volatility_regime, 0.5, 2.5) - 0.5).abs() * 10.0);
    if let Some(score) = input.market_strength {
        conf += floor(score * 0.10).min(10);
    }
    if input.composite_active {
        conf += 6;
    }

    if cfg.context_adjustments {
        let (adjust, warning) = context_adjustment(context, m, impulse);
        conf += adjust;
        if let Some(text) = warning {
            warnings.push(text.to_string());
        }
    }

    let confidence = conf.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE) as u8;

    let threshold = cfg.confidence_threshold;
    let action = if confidence >= threshold && stops.is_empty() {
        Action::Enter
    } else if confidence >= threshold {
        Action::Avoid
    } else {
        Action::Wait
    };

    info!(
        id = def.id,
        name = def.name,
        direction = %direction,
        confidence,
        action = action.as_str(),
        stops = stops.len(),
        "Signal scored"
    );

    SignalResult {
        id: def.id,
        name: def.name.to_string(),
        priority: def.priority,
        context: context.clone(),
        original_direction: def.direction,
        direction,
        flipped,
        confidence,
        action,
        reasons,
        warnings,
        stops,
    }
}
