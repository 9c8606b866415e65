//! Snapshot decoding from the shapes upstream feeds send, plus config files

use signal_engine::brain::{ImpulsePolicy, OutputFormat, WeightingMode};
use signal_engine::market::{RangeState, TrendBias};
use signal_engine::{load_snapshot, parse_snapshot, EngineConfig, EngineError};
use tempfile::tempdir;

#[test]
fn test_pascal_case_snapshot_with_klines() {
    let json = r#"{
        "symbol": "BTCUSDT",
        "Price": 100.8,
        "ATR": 1.5,
        "EMA21": 100.2,
        "EMA50": 99.1,
        "RSI": 61.0,
        "MACD_Signal": 0.4,
        "Bollinger_U": 104.0,
        "klines": [
            [1700000000000, "100.0", "101.0", "99.5", "100.5", "820.0"],
            [1700000060000, "100.5", "101.2", "100.1", "100.8", "910.0"],
            [1700000120000, "oops", "101.2", "100.1", "100.8", "910.0"]
        ],
        "marketStrength": { "score": 72.0 },
        "compositeActive": true
    }"#;

    let snap = parse_snapshot(json).unwrap();
    assert_eq!(snap.symbol.as_deref(), Some("BTCUSDT"));
    assert_eq!(snap.price, Some(100.8));
    assert_eq!(snap.macd_signal, Some(0.4));
    assert_eq!(snap.bollinger_upper, Some(104.0));
    // the bar with an unparseable open is dropped
    assert_eq!(snap.candles.len(), 2);
    assert_eq!(snap.candles[1].close, 100.8);
    assert_eq!(snap.candles[0].volume, Some(820.0));
    assert_eq!(snap.market_strength.as_ref().map(|m| m.score), Some(72.0));
    assert!(snap.composite_active);
    assert_eq!(snap.last_close(), Some(100.8));
}

#[test]
fn test_lowercase_aliases_and_keyed_bars() {
    let json = r#"{
        "price": 50.0,
        "RSI_prev": 44.0,
        "Price_prev": 49.0,
        "OI": 1200.0,
        "higherTF": { "trend": "bull", "atrSlope": -0.2 },
        "currentTF": { "trend": "flat" },
        "rangeState": "sideways",
        "candles": [
            { "open": "49.0", "high": 50.5, "low": 48.7, "close": 50.0, "volume": 10 },
            { "Open": 50.0, "High": 51.0, "Low": 49.9, "Close": 50.6, "ATR": 0.8 }
        ]
    }"#;

    let snap = parse_snapshot(json).unwrap();
    assert_eq!(snap.price, Some(50.0));
    assert_eq!(snap.prev_rsi, Some(44.0));
    assert_eq!(snap.prev_price, Some(49.0));
    assert_eq!(snap.open_interest, Some(1200.0));
    assert_eq!(snap.higher_trend(), Some(TrendBias::Bull));
    assert_eq!(snap.current_trend(), Some(TrendBias::Neutral));
    assert_eq!(snap.range_state, Some(RangeState::Unknown));
    assert_eq!(
        snap.higher_tf.as_ref().and_then(|tf| tf.atr_slope),
        Some(-0.2)
    );
    assert_eq!(snap.candles.len(), 2);
    assert_eq!(snap.candles[0].open, 49.0);
    assert_eq!(snap.candles[1].volume, None);
    assert_eq!(snap.candles[1].atr, Some(0.8));
}

#[test]
fn test_missing_fields_stay_absent() {
    let snap = parse_snapshot(r#"{"candles": null}"#).unwrap();
    assert!(snap.candles.is_empty());
    assert!(snap.price.is_none());
    assert!(snap.market_strength.is_none());
    assert!(!snap.composite_active);
}

#[test]
fn test_malformed_json_is_rejected() {
    let err = parse_snapshot("{ not json").unwrap_err();
    assert!(matches!(err, EngineError::Json(_)));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load_snapshot("/nonexistent/signal-engine/snapshot.json").unwrap_err();
    assert!(matches!(err, EngineError::Io(_)));
}

#[test]
fn test_load_snapshot_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, r#"{"Price": 12.5, "ATR": 0.3}"#).unwrap();

    let snap = load_snapshot(&path).unwrap();
    assert_eq!(snap.price, Some(12.5));
    assert_eq!(snap.atr, Some(0.3));
}

#[test]
fn test_config_file_overrides_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(
        &path,
        r#"
lookback_window = 20
output = "json"

[scoring]
impulse_policy = "hard_stop"

[counter_trend]
min_signals = 3
weighting = "static"
"#,
    )
    .unwrap();

    let cfg = EngineConfig::load_from(path.to_str().unwrap()).unwrap();
    assert_eq!(cfg.lookback_window, 20);
    assert_eq!(cfg.output, OutputFormat::Json);
    assert_eq!(cfg.scoring.impulse_policy, ImpulsePolicy::HardStop);
    assert_eq!(cfg.scoring.confidence_threshold, 58);
    assert_eq!(cfg.counter_trend.min_signals, 3);
    assert_eq!(cfg.counter_trend.weighting, WeightingMode::Static);
}

#[test]
fn test_config_file_with_bad_value_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "lookback_window = 0\n").unwrap();

    let err = EngineConfig::load_from(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, EngineError::InvalidConfig(_)));
}
