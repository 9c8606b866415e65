//! Signal engine - single evaluation pass per market snapshot
//!
//! snapshot -> features -> evaluator -> scorer -> counter-trend detector.
//! The only state carried between calls is the caller's weight memory.

use tracing::debug;

use crate::brain::catalog::{default_catalog, SignalContext, SignalDefinition};
use crate::brain::config::EngineConfig;
use crate::brain::counter_trend::{self, CounterTrendInput};
use crate::brain::evaluator::{self, ActiveSignal};
use crate::brain::features;
use crate::brain::scorer::{self, ScoringInput};
use crate::brain::signal::EngineOutput;
use crate::brain::weighting::{WeightMemory, WeightMemoryStore};
use crate::market::strength::{self, StructureBias};
use crate::market::MarketSnapshot;

/// Memory key for snapshots without a symbol
pub const DEFAULT_SYMBOL: &str = "default";

/// Signal engine - evaluates snapshots against the catalog
pub struct SignalEngine {
    config: EngineConfig,
    catalog: Vec<SignalDefinition>,
}

impl SignalEngine {
    /// Create new engine with the default catalog
    pub fn new(config: EngineConfig) -> Self {
        Self::with_catalog(config, default_catalog())
    }

    pub fn with_catalog(config: EngineConfig, catalog: Vec<SignalDefinition>) -> Self {
        Self { config, catalog }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &[SignalDefinition] {
        &self.catalog
    }

    /// Evaluate one snapshot
    ///
    /// Never fails: missing inputs degrade to neutral defaults. An empty
    /// active list yields an empty output with no counter-trend block.
    pub fn evaluate(&self, snapshot: &MarketSnapshot, memory: &mut WeightMemory) -> EngineOutput {
        let active = evaluator::evaluate(&self.catalog, snapshot);
        if active.is_empty() {
            debug!("No active signals");
            return EngineOutput::empty();
        }

        let metrics = features::extract(snapshot, self.config.lookback_window);
        debug!(?metrics, "Derived metrics");

        let market_strength = self.market_strength(snapshot, &active);

        let scoring = ScoringInput {
            metrics: &metrics,
            market_strength,
            composite_active: snapshot.composite_active,
            config: &self.config.scoring,
        };
        let signals: Vec<_> = active
            .iter()
            .map(|a| scorer::score(a.definition, &scoring))
            .collect();

        let counter_trend = signals.first().map(|primary| {
            counter_trend::detect(
                &CounterTrendInput {
                    snapshot,
                    metrics: &metrics,
                    primary,
                    market_strength,
                    lookback: self.config.lookback_window,
                    config: &self.config.counter_trend,
                },
                memory,
            )
        });

        EngineOutput {
            signals,
            counter_trend,
            derived: Some(metrics),
        }
    }

    /// Evaluate using the memory kept for the snapshot's symbol
    pub fn evaluate_for_symbol(
        &self,
        snapshot: &MarketSnapshot,
        store: &mut WeightMemoryStore,
    ) -> EngineOutput {
        let symbol = snapshot.symbol.as_deref().unwrap_or(DEFAULT_SYMBOL);
        self.evaluate(snapshot, store.memory_for(symbol))
    }

    /// Supplied score, or an estimate when configured to derive one
    fn market_strength(
        &self,
        snapshot: &MarketSnapshot,
        active: &[ActiveSignal<'_>],
    ) -> Option<f64> {
        if let Some(ms) = &snapshot.market_strength {
            return Some(ms.score);
        }
        let cfg = &self.config.market_strength;
        if !cfg.derive_when_missing {
            return None;
        }

        let estimated = strength::estimate(
            snapshot,
            &cfg.thresholds,
            structure_bias(active),
            snapshot.composite_active,
        );
        debug!(score = estimated.score, label = ?estimated.label, "Estimated market strength");
        Some(estimated.score)
    }
}

fn structure_bias(active: &[ActiveSignal<'_>]) -> StructureBias {
    let contexts = || active.iter().map(|a| &a.definition.context);
    if contexts().any(|c| matches!(c, SignalContext::TrendAdd | SignalContext::HtfAdd)) {
        StructureBias::Trending
    } else if contexts().any(|c| matches!(c, SignalContext::Range | SignalContext::Reversal)) {
        StructureBias::Ranging
    } else {
        StructureBias::None
    }
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::signal::Action;
    use crate::market::{Direction, MarketStrength};

    fn pass(_: &MarketSnapshot) -> Vec<bool> {
        vec![true]
    }

    fn trivial(context: SignalContext, priority: u8) -> SignalDefinition {
        SignalDefinition {
            id: 900,
            direction: Direction::Long,
            name: "Trivial",
            priority,
            context,
            setup: pass,
            trigger: pass,
            confirmation: pass,
        }
    }

    #[test]
    fn test_empty_snapshot_produces_empty_output() {
        let engine = SignalEngine::default();
        let out = engine.evaluate(&MarketSnapshot::default(), &mut WeightMemory::new());
        assert!(out.is_empty());
        assert!(out.counter_trend.is_none());
        assert!(out.derived.is_none());
    }

    #[test]
    fn test_counter_trend_runs_for_primary() {
        let engine = SignalEngine::with_catalog(
            EngineConfig::default(),
            vec![trivial(SignalContext::Range, 3), trivial(SignalContext::TrendAdd, 5)],
        );
        let out = engine.evaluate(&MarketSnapshot::default(), &mut WeightMemory::new());
        assert_eq!(out.signals.len(), 2);
        assert_eq!(out.primary().unwrap().context, SignalContext::TrendAdd);
        let ct = out.counter_trend.unwrap();
        assert_eq!(ct.faded_direction, Direction::Long);
    }

    #[test]
    fn test_supplied_market_strength_wins() {
        let mut config = EngineConfig::default();
        config.market_strength.derive_when_missing = true;
        let engine = SignalEngine::with_catalog(config, vec![trivial(SignalContext::TrendAdd, 5)]);

        let snap = MarketSnapshot {
            market_strength: Some(MarketStrength::new(10.0)),
            ..Default::default()
        };
        let out = engine.evaluate(&snap, &mut WeightMemory::new());
        assert!(out.signals[0]
            .stops
            .contains(&"Weak global market environment".to_string()));
    }

    #[test]
    fn test_derived_market_strength_when_missing() {
        let mut config = EngineConfig::default();
        config.market_strength.derive_when_missing = true;
        let engine =
            SignalEngine::with_catalog(config, vec![trivial(SignalContext::Other("x".into()), 5)]);

        // empty snapshot estimates 10 (risk base only): weak market
        let out = engine.evaluate(&MarketSnapshot::default(), &mut WeightMemory::new());
        assert!(out.signals[0]
            .stops
            .contains(&"Weak global market environment".to_string()));
        assert_eq!(out.signals[0].action, Action::Avoid);
    }

    #[test]
    fn test_symbol_memories_are_separate() {
        let engine = SignalEngine::with_catalog(
            EngineConfig::default(),
            vec![trivial(SignalContext::TrendAdd, 5)],
        );
        let snap = MarketSnapshot {
            symbol: Some("BTCUSDT".into()),
            ..Default::default()
        };
        let mut store = WeightMemoryStore::new();
        engine.evaluate_for_symbol(&snap, &mut store);
        assert!(store.get("BTCUSDT").is_some());
        assert!(store.get(DEFAULT_SYMBOL).is_none());
    }
}
