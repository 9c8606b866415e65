//! Plain-text rendering of engine output

use std::fmt::Write;

use crate::brain::signal::{CounterTrendResult, EngineOutput, SignalResult};
use crate::brain::factors::Factor;

pub const NO_SIGNALS: &str = "No valid entry conditions detected";

/// Render the whole output; an empty signal list renders [`NO_SIGNALS`] only
pub fn render_text(output: &EngineOutput) -> String {
    if output.is_empty() {
        return NO_SIGNALS.to_string();
    }

    let mut out = String::new();
    for signal in &output.signals {
        render_signal(&mut out, signal);
    }
    if let Some(ct) = &output.counter_trend {
        render_counter_trend(&mut out, ct);
    }
    out.trim_end().to_string()
}

fn list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}:");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
}

fn render_signal(out: &mut String, s: &SignalResult) {
    let _ = writeln!(out, "{} | {} (priority {})", s.direction, s.name, s.priority);
    if s.flipped {
        let _ = writeln!(out, "Flipped from {}", s.original_direction);
    }
    let _ = writeln!(out, "Confidence: {}%", s.confidence);
    let _ = writeln!(out, "Action: {}", s.action.as_str());
    list(out, "Context", &s.reasons);
    list(out, "Why NOT entering", &s.stops);
    list(out, "Warnings", &s.warnings);
    out.push('\n');
}

fn render_counter_trend(out: &mut String, ct: &CounterTrendResult) {
    if !ct.active {
        let _ = writeln!(out, "COUNTER-TREND | inactive");
        list(out, "Reasons", &ct.reasons);
        return;
    }

    let _ = writeln!(out, "COUNTER-TREND | {}", ct.direction);
    let _ = writeln!(out, "Confidence: {}%", ct.confidence);
    let _ = writeln!(out, "Action: {}", ct.action.as_str());
    let factors: Vec<String> = ct
        .triggered_factors
        .iter()
        .map(|f| match ct.weights.get(f) {
            Some(w) => format!("{} ({}, weight {})", f.label(), f.name(), w),
            None => f.label().to_string(),
        })
        .collect();
    list(out, "Factors", &factors);
    let _ = writeln!(out, "Score: {}", ct.score);

    if let Some(plan) = &ct.plan {
        let _ = writeln!(
            out,
            "Plan ({:?}) | {}: {:?}",
            plan.mode, plan.direction, plan.action
        );
        let _ = writeln!(out, "Entry: {}", plan.entry);
        let _ = writeln!(out, "Add: {}", plan.add);
        let _ = writeln!(out, "Confirm: {}", plan.confirm);
        let _ = writeln!(out, "Stop: {}", plan.stop);
        let _ = writeln!(out, "Target: {}", plan.target);
    }
}
