//! Canonical OHLCV bar
//!
//! Upstream feeds deliver bars as PascalCase objects, lowercase objects or
//! exchange-style positional arrays (`[time, open, high, low, close, volume, ..]`)
//! with numbers or numeric strings. Everything is normalised here once so the
//! brain only ever sees [`Candle`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::EngineError;

/// Price bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBar")]
pub struct Candle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Per-bar ATR when the indicator collaborator attaches one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atr: Option<f64>,
}

impl Candle {
    pub fn new(open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time: None,
            open,
            high,
            low,
            close,
            volume: Some(volume),
            atr: None,
        }
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_atr(mut self, atr: f64) -> Self {
        self.atr = Some(atr);
        self
    }

    /// High minus low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.close.max(self.open)
    }

    pub fn lower_wick(&self) -> f64 {
        self.close.min(self.open) - self.low
    }

    /// True range against the previous bar's close
    pub fn true_range(&self, prev_close: f64) -> f64 {
        self.range()
            .max((self.high - prev_close).abs())
            .max((self.low - prev_close).abs())
    }
}

/// Any bar shape accepted from upstream
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawBar {
    // Arrays first: a derived struct visitor would otherwise accept short sequences
    Positional(Vec<Value>),
    Keyed(KeyedBar),
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct KeyedBar {
    #[serde(default, alias = "Time", alias = "openTime", alias = "timestamp")]
    time: Option<Value>,
    #[serde(default, alias = "Open")]
    open: Option<Value>,
    #[serde(default, alias = "High")]
    high: Option<Value>,
    #[serde(default, alias = "Low")]
    low: Option<Value>,
    #[serde(default, alias = "Close")]
    close: Option<Value>,
    #[serde(default, alias = "Volume")]
    volume: Option<Value>,
    #[serde(default, alias = "ATR")]
    atr: Option<Value>,
}

impl TryFrom<RawBar> for Candle {
    type Error = EngineError;

    fn try_from(raw: RawBar) -> Result<Self, Self::Error> {
        let (time, open, high, low, close, volume, atr) = match raw {
            RawBar::Positional(fields) => {
                let at = |i: usize| fields.get(i).and_then(number);
                (
                    fields.first().and_then(timestamp),
                    at(1),
                    at(2),
                    at(3),
                    at(4),
                    at(5),
                    None,
                )
            }
            RawBar::Keyed(bar) => (
                bar.time.as_ref().and_then(timestamp),
                bar.open.as_ref().and_then(number),
                bar.high.as_ref().and_then(number),
                bar.low.as_ref().and_then(number),
                bar.close.as_ref().and_then(number),
                bar.volume.as_ref().and_then(number),
                bar.atr.as_ref().and_then(number),
            ),
        };

        match (open, high, low, close) {
            (Some(open), Some(high), Some(low), Some(close)) => Ok(Candle {
                time,
                open,
                high,
                low,
                close,
                volume,
                atr,
            }),
            _ => Err(EngineError::InvalidBar(
                "open/high/low/close must all be finite numbers".to_string(),
            )),
        }
    }
}

/// Number or numeric string; non-finite values count as missing
fn number(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    v.is_finite().then_some(v)
}

/// Epoch milliseconds (number or string) or an RFC 3339 string
fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(ms) => DateTime::from_timestamp_millis(ms),
            Err(_) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
        },
        _ => None,
    }
}

/// Deserialize a bar list, dropping entries that cannot be normalised
pub(crate) fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Vec<Candle>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    let raw = raw.unwrap_or_default();
    let total = raw.len();

    let candles: Vec<Candle> = raw
        .into_iter()
        .filter_map(|value| {
            serde_json::from_value::<RawBar>(value)
                .map_err(EngineError::from)
                .and_then(Candle::try_from)
                .map_err(|e| debug!("Dropping bar: {}", e))
                .ok()
        })
        .collect();

    if candles.len() < total {
        tracing::warn!(
            dropped = total - candles.len(),
            kept = candles.len(),
            "Some bars could not be normalised"
        );
    }

    Ok(candles)
}
