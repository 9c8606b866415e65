//! Market snapshot - flat indicator record produced by the indicator collaborator

use serde::{Deserialize, Serialize};

use super::candle::{self, Candle};

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// Trend label of a timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendBias {
    Bull,
    Bear,
    #[serde(other)]
    Neutral,
}

/// Range/trend classification from the upstream regime detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeState {
    Range,
    Trend,
    #[serde(other)]
    Unknown,
}

/// Summary of one timeframe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeState {
    #[serde(default)]
    pub trend: Option<TrendBias>,
    #[serde(default)]
    pub atr_slope: Option<f64>,
    #[serde(default)]
    pub momentum: Option<f64>,
}

/// Market strength label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrengthLabel {
    Weak,
    Normal,
    Strong,
    Explosive,
}

impl StrengthLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            StrengthLabel::Explosive
        } else if score >= 65.0 {
            StrengthLabel::Strong
        } else if score >= 45.0 {
            StrengthLabel::Normal
        } else {
            StrengthLabel::Weak
        }
    }
}

/// Global market strength (0-100)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStrength {
    pub score: f64,
    #[serde(default)]
    pub label: Option<StrengthLabel>,
}

impl MarketStrength {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            label: Some(StrengthLabel::from_score(score)),
        }
    }
}

/// Flat indicator record consumed by the engine
///
/// Every indicator is optional. Predicates comparing an absent value never
/// hold; the feature extractor substitutes fixed defaults instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,

    #[serde(rename = "Price", alias = "price")]
    pub price: Option<f64>,
    #[serde(rename = "Open")]
    pub open: Option<f64>,
    #[serde(rename = "High")]
    pub high: Option<f64>,
    #[serde(rename = "Low")]
    pub low: Option<f64>,
    #[serde(rename = "Close")]
    pub close: Option<f64>,

    #[serde(rename = "ATR")]
    pub atr: Option<f64>,
    #[serde(rename = "ATR_smooth")]
    pub atr_smooth: Option<f64>,

    #[serde(rename = "EMA8")]
    pub ema8: Option<f64>,
    #[serde(rename = "EMA21")]
    pub ema21: Option<f64>,
    #[serde(rename = "EMA50")]
    pub ema50: Option<f64>,
    #[serde(rename = "EMA200")]
    pub ema200: Option<f64>,

    #[serde(rename = "RSI")]
    pub rsi: Option<f64>,
    #[serde(rename = "prevRSI", alias = "RSI_prev")]
    pub prev_rsi: Option<f64>,
    #[serde(rename = "prevPrice", alias = "Price_prev")]
    pub prev_price: Option<f64>,
    #[serde(rename = "Stochastic")]
    pub stochastic: Option<f64>,
    #[serde(rename = "MACD")]
    pub macd: Option<f64>,
    #[serde(rename = "MACD_Signal")]
    pub macd_signal: Option<f64>,

    #[serde(rename = "Bollinger_L")]
    pub bollinger_lower: Option<f64>,
    #[serde(rename = "Bollinger_M")]
    pub bollinger_middle: Option<f64>,
    #[serde(rename = "Bollinger_U")]
    pub bollinger_upper: Option<f64>,
    #[serde(rename = "BollingerWidth")]
    pub bollinger_width: Option<f64>,
    #[serde(rename = "BW_avg")]
    pub bollinger_width_avg: Option<f64>,

    #[serde(rename = "VWAP")]
    pub vwap: Option<f64>,
    #[serde(rename = "keltnerLower")]
    pub keltner_lower: Option<f64>,
    #[serde(rename = "keltnerUpper")]
    pub keltner_upper: Option<f64>,

    pub volume: Option<f64>,
    #[serde(rename = "avgVolume")]
    pub avg_volume: Option<f64>,
    #[serde(rename = "buyVolume")]
    pub buy_volume: Option<f64>,
    #[serde(rename = "sellVolume")]
    pub sell_volume: Option<f64>,

    #[serde(rename = "chopIndex")]
    pub chop_index: Option<f64>,
    #[serde(rename = "SwingHigh")]
    pub swing_high: Option<f64>,
    #[serde(rename = "SwingLow")]
    pub swing_low: Option<f64>,
    #[serde(rename = "localLow")]
    pub local_low: Option<f64>,
    #[serde(rename = "prevLocalLow")]
    pub prev_local_low: Option<f64>,
    #[serde(rename = "localHigh")]
    pub local_high: Option<f64>,
    #[serde(rename = "prevLocalHigh")]
    pub prev_local_high: Option<f64>,

    #[serde(rename = "openInterest", alias = "OI")]
    pub open_interest: Option<f64>,
    #[serde(rename = "funding", alias = "Funding")]
    pub funding: Option<f64>,

    #[serde(rename = "higherTF")]
    pub higher_tf: Option<TimeframeState>,
    #[serde(rename = "currentTF")]
    pub current_tf: Option<TimeframeState>,
    #[serde(rename = "rangeState")]
    pub range_state: Option<RangeState>,

    /// Chronological bars, oldest first
    #[serde(
        alias = "klines",
        deserialize_with = "candle::deserialize_lenient",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub candles: Vec<Candle>,

    #[serde(rename = "marketStrength")]
    pub market_strength: Option<MarketStrength>,
    #[serde(rename = "compositeActive")]
    pub composite_active: bool,
}

impl MarketSnapshot {
    /// Tail of the bar history used by the feature extractor
    pub fn recent(&self, lookback: usize) -> RecentWindow<'_> {
        let start = self.candles.len().saturating_sub(lookback);
        RecentWindow {
            snapshot: self,
            candles: &self.candles[start..],
        }
    }

    /// Newest close, falling back to the scalar price fields
    pub fn last_close(&self) -> Option<f64> {
        self.candles
            .last()
            .map(|c| c.close)
            .or(self.price)
            .or(self.close)
    }

    pub fn higher_trend(&self) -> Option<TrendBias> {
        self.higher_tf.as_ref().and_then(|tf| tf.trend)
    }

    pub fn current_trend(&self) -> Option<TrendBias> {
        self.current_tf.as_ref().and_then(|tf| tf.trend)
    }
}

/// Snapshot scalars plus the most recent bars
#[derive(Debug, Clone, Copy)]
pub struct RecentWindow<'a> {
    pub snapshot: &'a MarketSnapshot,
    pub candles: &'a [Candle],
}

impl<'a> RecentWindow<'a> {
    pub fn last(&self) -> Option<&'a Candle> {
        self.candles.last()
    }

    pub fn has_candles(&self) -> bool {
        !self.candles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_indicator_names() {
        let snap: MarketSnapshot = serde_json::from_str(
            r#"{
                "Price": 100, "ATR": 2, "EMA8": 102, "MACD_Signal": 0.9,
                "RSI_prev": 55, "prevPrice": 99,
                "higherTF": {"trend": "bull", "atrSlope": -0.2},
                "rangeState": "range",
                "marketStrength": {"score": 42},
                "compositeActive": true
            }"#,
        )
        .unwrap();

        assert_eq!(snap.price, Some(100.0));
        assert_eq!(snap.macd_signal, Some(0.9));
        assert_eq!(snap.prev_rsi, Some(55.0));
        assert_eq!(snap.higher_trend(), Some(TrendBias::Bull));
        assert_eq!(snap.higher_tf.unwrap().atr_slope, Some(-0.2));
        assert_eq!(snap.range_state, Some(RangeState::Range));
        assert!(snap.composite_active);
        assert!(snap.candles.is_empty());
    }

    #[test]
    fn test_klines_alias_and_bad_bars_dropped() {
        let snap: MarketSnapshot = serde_json::from_str(
            r#"{"klines": [[0,"1","2","0.5","1.5","10"], {"open": 1}, "junk", {"Open":1,"High":2,"Low":1,"Close":2}]}"#,
        )
        .unwrap();
        assert_eq!(snap.candles.len(), 2);
    }

    #[test]
    fn test_recent_window_is_tail() {
        let mut snap = MarketSnapshot::default();
        snap.candles = (0..20)
            .map(|i| Candle::new(i as f64, i as f64 + 1.0, i as f64 - 1.0, i as f64, 1.0))
            .collect();

        let recent = snap.recent(12);
        assert_eq!(recent.candles.len(), 12);
        assert_eq!(recent.candles[0].close, 8.0);
        assert_eq!(recent.last().unwrap().close, 19.0);
        assert_eq!(snap.last_close(), Some(19.0));
    }

    #[test]
    fn test_unknown_trend_label_is_neutral() {
        let tf: TimeframeState = serde_json::from_str(r#"{"trend": "sideways"}"#).unwrap();
        assert_eq!(tf.trend, Some(TrendBias::Neutral));
    }
}
