//! Entry signal results - output from the signal engine

use serde::Serialize;

use crate::brain::catalog::SignalContext;
use crate::brain::factors::CtFactor;
use crate::brain::features::DerivedMetrics;
use crate::brain::presets::CounterTrendPlan;
use crate::brain::weighting::WeightMap;
use crate::market::Direction;

/// Recommended action for a primary signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Enter,
    Avoid,
    Wait,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Enter => "ENTER",
            Action::Avoid => "AVOID",
            Action::Wait => "WAIT",
        }
    }
}

/// Recommended action for the counter-trend advisory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CounterTrendAction {
    Enter,
    Watch,
    Ignore,
}

impl CounterTrendAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterTrendAction::Enter => "ENTER",
            CounterTrendAction::Watch => "WATCH",
            CounterTrendAction::Ignore => "IGNORE",
        }
    }
}

/// Scored primary signal
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalResult {
    pub id: u32,
    pub name: String,
    pub priority: u8,
    pub context: SignalContext,
    /// Direction the catalog defines
    pub original_direction: Direction,
    /// Direction after auto-flip
    pub direction: Direction,
    pub flipped: bool,
    /// 5 to 97
    pub confidence: u8,
    pub action: Action,
    pub reasons: Vec<String>,
    pub warnings: Vec<String>,
    pub stops: Vec<String>,
}

impl SignalResult {
    pub fn has_hard_stops(&self) -> bool {
        !self.stops.is_empty()
    }

    pub fn is_actionable(&self) -> bool {
        self.action == Action::Enter
    }
}

/// Counter-trend advisory
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterTrendResult {
    pub active: bool,
    /// Direction being faded (the primary signal's)
    pub faded_direction: Direction,
    /// Proposed counter-trend direction
    pub direction: Direction,
    /// 5 to 97
    pub confidence: u8,
    pub action: CounterTrendAction,
    pub triggered_factors: Vec<CtFactor>,
    /// Weighted raw score (0 when the weighting stage was not reached)
    pub score: i64,
    #[serde(skip_serializing_if = "WeightMap::is_empty")]
    pub weights: WeightMap,
    /// Why it activated, or every reason it did not
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<CounterTrendPlan>,
}

impl CounterTrendResult {
    /// Inactive advisory carrying its failure reasons
    pub fn inactive(
        faded_direction: Direction,
        triggered_factors: Vec<CtFactor>,
        score: i64,
        weights: WeightMap,
        reasons: Vec<String>,
    ) -> Self {
        Self {
            active: false,
            faded_direction,
            direction: faded_direction.opposite(),
            confidence: 5,
            action: CounterTrendAction::Ignore,
            triggered_factors,
            score,
            weights,
            reasons,
            plan: None,
        }
    }
}

/// Combined engine output for one snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineOutput {
    /// In evaluator priority order
    pub signals: Vec<SignalResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_trend: Option<CounterTrendResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedMetrics>,
}

impl EngineOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Highest-priority signal
    pub fn primary(&self) -> Option<&SignalResult> {
        self.signals.first()
    }
}
