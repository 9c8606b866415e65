//! Market strength estimator
//!
//! Scores the overall environment 0-100 from trend, momentum, volatility,
//! liquidity, structure and risk components. Used only when the upstream
//! collaborator did not supply a `marketStrength` summary.

use serde::{Deserialize, Serialize};

use super::snapshot::{MarketSnapshot, MarketStrength};

/// Thresholds the estimator normalises against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrengthThresholds {
    #[serde(default = "default_atr_low")]
    pub atr_low: f64,
    #[serde(default = "default_oi_high")]
    pub oi_high: f64,
    #[serde(default = "default_funding_squeeze")]
    pub funding_squeeze: f64,
}

impl Default for StrengthThresholds {
    fn default() -> Self {
        Self {
            atr_low: default_atr_low(),
            oi_high: default_oi_high(),
            funding_squeeze: default_funding_squeeze(),
        }
    }
}

fn default_atr_low() -> f64 { 400.0 }
fn default_oi_high() -> f64 { 90_000.0 }
fn default_funding_squeeze() -> f64 { 0.005 }

/// Dominant structure among the currently active setups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureBias {
    /// At least one trend-following or higher-timeframe setup
    Trending,
    /// Only range or reversal setups
    Ranging,
    None,
}

fn clamp01(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `x || fallback` for optional indicator values
fn nonzero_or(v: Option<f64>, fallback: f64) -> f64 {
    match v {
        Some(x) if x != 0.0 && x.is_finite() => x,
        _ => fallback,
    }
}

/// Estimate market strength from snapshot scalars
pub fn estimate(
    snapshot: &MarketSnapshot,
    thresholds: &StrengthThresholds,
    structure: StructureBias,
    composite_active: bool,
) -> MarketStrength {
    let atr = nonzero_or(snapshot.atr, 1.0);

    // Trend: EMA spread normalised by ATR plus MACD/signal separation
    let ema_spread = match (snapshot.ema8, snapshot.ema21) {
        (Some(fast), Some(slow)) => (fast - slow).abs() / atr,
        _ => 0.0,
    };
    let macd_trend = match (snapshot.macd, snapshot.macd_signal) {
        (Some(macd), Some(signal)) if macd != 0.0 && signal != 0.0 => {
            clamp01((macd - signal).abs() / nonzero_or(Some(signal.abs()), 1.0))
        }
        _ => 0.0,
    };
    let trend = clamp01(ema_spread * 0.6 + macd_trend * 0.4) * 25.0;

    // Momentum: distance of oscillators from their midpoints
    let rsi_norm = clamp01((nonzero_or(snapshot.rsi, 50.0) - 50.0).abs() / 30.0);
    let stoch_norm = clamp01((nonzero_or(snapshot.stochastic, 50.0) - 50.0).abs() / 50.0);
    let momentum = (rsi_norm + stoch_norm) / 2.0 * 20.0;

    let atr_norm = clamp01(
        snapshot.atr.unwrap_or(0.0) / nonzero_or(Some(thresholds.atr_low * 1.2), 1.0),
    );
    let volatility = atr_norm * 15.0;

    let vol_norm = clamp01(snapshot.volume.unwrap_or(0.0) / nonzero_or(snapshot.avg_volume, 1.0));
    let open_interest = snapshot.open_interest.unwrap_or(0.0);
    let oi_norm = clamp01(open_interest / nonzero_or(Some(thresholds.oi_high), 1.0));
    let liquidity = (vol_norm * 0.7 + oi_norm * 0.3) * 20.0;

    let structure_pts = match structure {
        StructureBias::Trending => 10.0,
        StructureBias::Ranging => 5.0,
        StructureBias::None => 0.0,
    };

    let mut risk = 10.0;
    if snapshot.funding.unwrap_or(0.0).abs() > thresholds.funding_squeeze {
        risk -= 5.0;
    }
    if open_interest > thresholds.oi_high * 1.2 {
        risk -= 5.0;
    }
    if composite_active {
        risk += 5.0;
    }

    let total = trend + momentum + volatility + liquidity + structure_pts + risk;
    let score = (clamp01(total / 100.0) * 100.0).round();

    MarketStrength::new(score)
}
