//! Feature extraction - derived market-state metrics
//!
//! Reduces a snapshot and its recent bar window to five bounded metrics.
//! Every denominator is guarded and every output is clamped, so missing or
//! degenerate inputs yield neutral values instead of errors.

use serde::Serialize;

use crate::market::{Candle, Direction, MarketSnapshot, RecentWindow};

/// Derived metrics for one evaluation cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub trend_stability: f64,
    pub impulse_long: f64,
    pub impulse_short: f64,
    pub retracement_risk: f64,
    pub volume_pressure: f64,
    pub volatility_regime: f64,
}

impl DerivedMetrics {
    pub fn impulse(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Long => self.impulse_long,
            Direction::Short => self.impulse_short,
        }
    }

    /// Clamp raw metrics into their documented ranges
    pub fn clamped(self) -> Self {
        Self {
            trend_stability: bounded(self.trend_stability, 0.01, 1.5),
            impulse_long: bounded(self.impulse_long, 0.01, 1.5),
            impulse_short: bounded(self.impulse_short, 0.01, 1.5),
            retracement_risk: bounded(self.retracement_risk, 0.01, 2.0),
            volume_pressure: if self.volume_pressure.is_finite() {
                self.volume_pressure.clamp(-1.0, 1.0)
            } else {
                0.0
            },
            volatility_regime: bounded(self.volatility_regime, 0.5, 2.5),
        }
    }
}

/// Clamp, sending NaN and infinities to the lower bound
fn bounded(v: f64, min: f64, max: f64) -> f64 {
    if v.is_finite() {
        v.clamp(min, max)
    } else {
        min
    }
}

/// `x || fallback`: absent, zero or non-finite values take the fallback
pub(crate) fn or_default(v: Option<f64>, fallback: f64) -> f64 {
    match v {
        Some(x) if x != 0.0 && x.is_finite() => x,
        _ => fallback,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Pearson correlation; 0 for fewer than two points or flat series
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let (mx, my) = (mean(xs), mean(ys));

    let mut num = 0.0;
    let mut dx = 0.0;
    let mut dy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        num += (x - mx) * (y - my);
        dx += (x - mx).powi(2);
        dy += (y - my).powi(2);
    }

    let den = (dx * dy).sqrt();
    num / if den == 0.0 { 1.0 } else { den }
}

/// Mean true range over consecutive bar pairs
///
/// With fewer than two bars the snapshot ATR is used, then 1. The mean
/// itself may be zero on flat bars.
pub fn estimate_atr(candles: &[Candle], fallback_atr: Option<f64>) -> f64 {
    if candles.len() < 2 {
        return fallback_atr.unwrap_or(1.0);
    }
    let ranges: Vec<f64> = candles
        .windows(2)
        .map(|pair| pair[1].true_range(pair[0].close))
        .collect();
    mean(&ranges)
}

/// Linearity of recent closes, or EMA separation when bars are scarce
pub fn trend_stability(window: &RecentWindow<'_>) -> f64 {
    let s = window.snapshot;
    let candles = window.candles;

    if candles.len() < 3 {
        let atr = or_default(s.atr, 1.0).max(1.0);
        let ema_diff = match s.price {
            Some(price) => (s.ema21.unwrap_or(price) - s.ema50.unwrap_or(price)).abs(),
            None => match (s.ema21, s.ema50) {
                (Some(a), Some(b)) => (a - b).abs(),
                _ => 0.0,
            },
        };
        let chop = s.chop_index.unwrap_or(0.5);
        return ema_diff / (atr * 8.0) * (1.0 - chop);
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let idx: Vec<f64> = (0..closes.len()).map(|i| i as f64).collect();
    let corr = pearson(&idx, &closes).abs();

    let bar_atrs: Vec<f64> = candles.iter().filter_map(|c| c.atr).collect();
    let avg_atr = if bar_atrs.is_empty() {
        or_default(s.atr, 1.0)
    } else {
        mean(&bar_atrs)
    };
    let atr_ratio = avg_atr / mean(&closes).max(1.0);
    let stability_from_atr = 1.0 / (1.0 + atr_ratio * 20.0);

    0.7 * corr + 0.3 * stability_from_atr
}

/// Directional body-to-range ratio of the newest bar scaled by log volume
pub fn impulse_quality(window: &RecentWindow<'_>, direction: Direction) -> f64 {
    let s = window.snapshot;
    let (open, high, low, close, volume) = match window.last() {
        Some(bar) => (bar.open, bar.high, bar.low, bar.close, bar.volume.unwrap_or(1.0)),
        None => {
            let price = s.price.unwrap_or(0.0);
            (
                s.open.unwrap_or(price),
                s.high.unwrap_or(price),
                s.low.unwrap_or(price),
                s.close.unwrap_or(price),
                s.volume.unwrap_or(1.0).max(1.0),
            )
        }
    };

    let range = (high - low).max(close.abs() * 0.001).max(1e-6);
    let body = match direction {
        Direction::Long => close - open,
        Direction::Short => open - close,
    };
    let body_ratio = body.max(0.0) / range;

    body_ratio * (volume.max(0.0) + 1.0).ln()
}

/// Distance to the nearer swing point in ATR units
pub fn retracement_risk(window: &RecentWindow<'_>) -> f64 {
    let s = window.snapshot;
    let price = match s.price.or_else(|| window.last().map(|c| c.close)) {
        Some(p) => p,
        None => return 0.5,
    };

    let reference = match (s.swing_high, s.swing_low) {
        (None, None) => return 0.5,
        (Some(h), None) => h,
        (None, Some(l)) => l,
        (Some(h), Some(l)) => {
            if (price - h).abs() <= (price - l).abs() {
                h
            } else {
                l
            }
        }
    };

    let atr = match s.atr {
        Some(a) if a != 0.0 && a.is_finite() => a.abs(),
        _ => or_default(Some(estimate_atr(window.candles, None)), 1.0),
    };

    (price - reference).abs() / atr
}

/// Net buy/sell volume balance in [-1, 1]
pub fn volume_pressure(window: &RecentWindow<'_>) -> f64 {
    let (buy, sell) = if window.has_candles() {
        window.candles.iter().fold((0.0, 0.0), |(buy, sell), c| {
            let v = c.volume.unwrap_or(0.0);
            if c.close > c.open {
                (buy + v, sell)
            } else if c.close < c.open {
                (buy, sell + v)
            } else {
                (buy + v / 2.0, sell + v / 2.0)
            }
        })
    } else {
        let s = window.snapshot;
        (s.buy_volume.unwrap_or(0.0), s.sell_volume.unwrap_or(0.0))
    };

    let total = buy + sell;
    if total <= 0.0 {
        return 0.0;
    }
    (buy - sell) / total
}

/// Dispersion of bar ranges, or ATR over its smoothed baseline
pub fn volatility_regime(window: &RecentWindow<'_>) -> f64 {
    if window.candles.len() >= 5 {
        let ranges: Vec<f64> = window.candles.iter().map(Candle::range).collect();
        let m = mean(&ranges);
        let var = ranges.iter().map(|r| (r - m).powi(2)).sum::<f64>() / (ranges.len() - 1) as f64;
        return var.sqrt() / m.max(1e-6);
    }

    let s = window.snapshot;
    let atr = or_default(s.atr, 1.0);
    let smooth = or_default(s.atr_smooth, atr);
    atr / smooth
}

/// Compute all five metrics for the snapshot's recent window
pub fn extract(snapshot: &MarketSnapshot, lookback: usize) -> DerivedMetrics {
    let window = snapshot.recent(lookback);

    DerivedMetrics {
        trend_stability: trend_stability(&window),
        impulse_long: impulse_quality(&window, Direction::Long),
        impulse_short: impulse_quality(&window, Direction::Short),
        retracement_risk: retracement_risk(&window),
        volume_pressure: volume_pressure(&window),
        volatility_regime: volatility_regime(&window),
    }
    .clamped()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .map(|&c| Candle::new(c - 0.5, c + 1.0, c - 1.0, c, 100.0))
            .collect()
    }

    #[test]
    fn test_empty_snapshot_is_neutral() {
        let m = extract(&MarketSnapshot::default(), 12);
        assert_eq!(m.trend_stability, 0.01);
        assert_eq!(m.impulse_long, 0.01);
        assert_eq!(m.impulse_short, 0.01);
        assert_eq!(m.retracement_risk, 0.5);
        assert_eq!(m.volume_pressure, 0.0);
        assert_eq!(m.volatility_regime, 1.0);
    }

    #[test]
    fn test_scalar_trend_stability_fallback() {
        let snap = MarketSnapshot {
            price: Some(100.0),
            atr: Some(2.0),
            ema21: Some(101.0),
            ema50: Some(99.0),
            ..Default::default()
        };
        let window = snap.recent(12);
        // |101 - 99| / (2 * 8) * (1 - 0.5)
        assert!((trend_stability(&window) - 0.0625).abs() < 1e-12);
    }

    #[test]
    fn test_linear_closes_are_stable() {
        let mut snap = MarketSnapshot::default();
        snap.candles = bars(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        let ts = trend_stability(&snap.recent(12));
        assert!(ts > 0.95, "ts = {ts}");
    }

    #[test]
    fn test_impulse_directional() {
        let mut snap = MarketSnapshot::default();
        snap.candles = vec![Candle::new(100.0, 110.0, 100.0, 110.0, (std::f64::consts::E) - 1.0)];
        let window = snap.recent(12);
        assert!((impulse_quality(&window, Direction::Long) - 1.0).abs() < 1e-12);
        assert_eq!(impulse_quality(&window, Direction::Short), 0.0);
    }

    #[test]
    fn test_doji_range_floor() {
        let mut snap = MarketSnapshot::default();
        snap.candles = vec![Candle::new(0.0, 0.0, 0.0, 0.0, 10.0)];
        let imp = impulse_quality(&snap.recent(12), Direction::Long);
        assert!(imp.is_finite());
        assert_eq!(imp, 0.0);
    }

    #[test]
    fn test_retracement_picks_nearer_swing() {
        let snap = MarketSnapshot {
            price: Some(100.0),
            atr: Some(2.0),
            swing_high: Some(103.0),
            swing_low: Some(90.0),
            ..Default::default()
        };
        assert_eq!(retracement_risk(&snap.recent(12)), 1.5);
    }

    #[test]
    fn test_volume_pressure_split_and_missing_volume() {
        let mut snap = MarketSnapshot::default();
        snap.candles = vec![
            Candle::new(1.0, 2.0, 0.5, 2.0, 30.0),
            Candle::new(2.0, 2.5, 0.5, 1.0, 10.0),
            Candle::new(1.0, 1.5, 0.5, 1.0, 20.0),
            Candle {
                volume: None,
                ..Candle::new(1.0, 3.0, 0.5, 2.5, 0.0)
            },
        ];
        // buy 30 + 10, sell 10 + 10
        let vp = volume_pressure(&snap.recent(12));
        assert!((vp - (40.0 - 20.0) / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_volume_pressure_from_scalars() {
        let snap = MarketSnapshot {
            buy_volume: Some(75.0),
            sell_volume: Some(25.0),
            ..Default::default()
        };
        assert_eq!(volume_pressure(&snap.recent(12)), 0.5);
    }

    #[test]
    fn test_volatility_regime_scalar_fallback() {
        let snap = MarketSnapshot {
            atr: Some(3.0),
            atr_smooth: Some(2.0),
            ..Default::default()
        };
        assert_eq!(volatility_regime(&snap.recent(12)), 1.5);
    }

    #[test]
    fn test_equal_ranges_have_low_regime() {
        let mut snap = MarketSnapshot::default();
        snap.candles = bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        assert_eq!(volatility_regime(&snap.recent(12)), 0.0);
        assert_eq!(extract(&snap, 12).volatility_regime, 0.5);
    }

    #[test]
    fn test_non_finite_maps_to_lower_bound() {
        let m = DerivedMetrics {
            trend_stability: f64::NAN,
            impulse_long: f64::INFINITY,
            impulse_short: 0.2,
            retracement_risk: f64::NAN,
            volume_pressure: f64::NAN,
            volatility_regime: f64::NEG_INFINITY,
        }
        .clamped();
        assert_eq!(m.trend_stability, 0.01);
        assert_eq!(m.impulse_long, 0.01);
        assert_eq!(m.retracement_risk, 0.01);
        assert_eq!(m.volume_pressure, 0.0);
        assert_eq!(m.volatility_regime, 0.5);
    }

    #[test]
    fn test_estimate_atr() {
        let candles = vec![
            Candle::new(10.0, 11.0, 9.0, 10.0, 1.0),
            Candle::new(10.0, 12.0, 10.0, 11.0, 1.0),
            Candle::new(11.0, 11.5, 8.0, 9.0, 1.0),
        ];
        // true ranges 2 and 3.5
        assert_eq!(estimate_atr(&candles, None), 2.75);
        assert_eq!(estimate_atr(&candles[..1], Some(4.0)), 4.0);
        assert_eq!(estimate_atr(&[], None), 1.0);
    }
}
