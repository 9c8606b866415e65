//! Counter-trend position presets
//!
//! Each mode is a set of risk-unit multipliers. Users pick a mode, the
//! detector turns it into concrete price levels around the last close.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::market::Direction;

/// Decimal places kept on plan levels
const LEVEL_DP: u32 = 6;

/// How far from price the plan places its levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    Aggressive,
    #[default]
    Balanced,
    Conservative,
}

/// Risk-unit multipliers for one mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanPreset {
    pub entry: f64,
    pub add: f64,
    pub confirm: f64,
    pub stop: f64,
    pub target: f64,
}

/// Get multipliers for a mode
pub fn get_preset(mode: PlanMode) -> PlanPreset {
    match mode {
        PlanMode::Aggressive => PlanPreset {
            entry: 0.5,
            add: 0.8,
            confirm: 0.1,
            stop: 1.6,
            target: 3.2,
        },
        PlanMode::Balanced => PlanPreset {
            entry: 0.3,
            add: 0.4,
            confirm: 0.2,
            stop: 1.2,
            target: 2.4,
        },
        PlanMode::Conservative => PlanPreset {
            entry: 0.15,
            add: 0.25,
            confirm: 0.3,
            stop: 0.9,
            target: 1.8,
        },
    }
}

/// What the plan recommends doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanAction {
    Enter,
    Wait,
    Watch,
}

/// Concrete levels for a counter-trend position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterTrendPlan {
    pub mode: PlanMode,
    pub direction: Direction,
    pub action: PlanAction,
    pub risk_unit: Decimal,
    pub entry: Decimal,
    pub add: Decimal,
    pub confirm: Decimal,
    pub stop: Decimal,
    pub target: Decimal,
}

fn level(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp(LEVEL_DP))
}

/// Build the level plan for a reversed position
///
/// Returns `None` only when a level cannot be represented as a decimal.
pub fn build_plan(
    mode: PlanMode,
    direction: Direction,
    action: PlanAction,
    last_close: f64,
    risk_unit: f64,
) -> Option<CounterTrendPlan> {
    let p = get_preset(mode);
    let r = risk_unit;

    let (entry, confirm) = match direction {
        Direction::Long => (last_close - r * p.entry, last_close + r * p.confirm),
        Direction::Short => (last_close + r * p.entry, last_close - r * p.confirm),
    };
    let (add, stop, target) = match direction {
        Direction::Long => (entry - r * p.add, entry - r * p.stop, entry + r * p.target),
        Direction::Short => (entry + r * p.add, entry + r * p.stop, entry - r * p.target),
    };

    Some(CounterTrendPlan {
        mode,
        direction,
        action,
        risk_unit: level(r)?,
        entry: level(entry)?,
        add: level(add)?,
        confirm: level(confirm)?,
        stop: level(stop)?,
        target: level(target)?,
    })
}

/// Plan action from counter-trend confidence and the primary signal's stops
pub fn plan_action(confidence: u8, watch_threshold: u8, primary_has_stops: bool) -> PlanAction {
    if confidence >= watch_threshold && !primary_has_stops {
        PlanAction::Enter
    } else if confidence >= watch_threshold.saturating_sub(6) {
        PlanAction::Wait
    } else {
        PlanAction::Watch
    }
}
