//! Signal evaluator
//!
//! Runs every catalog entry against the snapshot and keeps the fully
//! confirmed ones, highest priority first. Pure: no state, no clock.

use tracing::debug;

use crate::brain::catalog::{SignalDefinition, SignalStage};
use crate::market::MarketSnapshot;

/// Catalog entry that passed all three stages
#[derive(Debug, Clone, Copy)]
pub struct ActiveSignal<'a> {
    pub definition: &'a SignalDefinition,
    pub active: bool,
}

/// Confirmed definitions, stable-sorted by priority descending
pub fn evaluate<'a>(
    catalog: &'a [SignalDefinition],
    snapshot: &MarketSnapshot,
) -> Vec<ActiveSignal<'a>> {
    let mut active: Vec<ActiveSignal<'a>> = catalog
        .iter()
        .filter(|def| {
            let stage = def.stage(snapshot);
            match stage {
                SignalStage::Confirmed => true,
                SignalStage::SetupArmed | SignalStage::Triggered => {
                    debug!(id = def.id, name = def.name, ?stage, "Signal not confirmed");
                    false
                }
                SignalStage::Idle => false,
            }
        })
        .map(|definition| ActiveSignal {
            definition,
            active: true,
        })
        .collect();

    // Vec::sort_by is stable, ties keep catalog order
    active.sort_by(|a, b| b.definition.priority.cmp(&a.definition.priority));
    active
}
