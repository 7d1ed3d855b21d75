//! Replay a timed list of budget edits through [`BudgetTracker`] and report
//! when each category settled.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::tracker::{default_limits, BudgetPreset, BudgetTracker};
use crate::config::BudgetConfig;
use crate::error::CardFinanceError;
use crate::types::*;
use crate::CardFinanceResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BudgetAction {
    Set(Money),
    Increment,
    Decrement,
    Preset(BudgetPreset),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetEdit {
    /// Milliseconds since the start of the script
    pub at_ms: u64,
    /// Ignored for presets, required otherwise
    #[serde(default)]
    pub category: Option<String>,
    pub action: BudgetAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetScript {
    #[serde(default = "default_limits")]
    pub limits: BTreeMap<String, Money>,
    pub edits: Vec<BudgetEdit>,
    /// Stop the clock here; without it every timer is allowed to fire
    #[serde(default)]
    pub until_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedCommit {
    pub at_ms: u64,
    pub category: String,
    pub value: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetTimeline {
    pub commits: Vec<TimedCommit>,
    pub committed: BTreeMap<String, Money>,
    pub pending: BTreeMap<String, Money>,
    /// Categories still inside their quiet window when the clock stopped
    pub in_flight: Vec<String>,
}

fn elapsed_ms(origin: Instant, at: Instant) -> u64 {
    at.saturating_duration_since(origin).as_millis() as u64
}

/// Fire every timer due at or before `limit`, stamping each commit with its
/// own deadline rather than the time the loop caught up.
fn drain_until(tracker: &mut BudgetTracker, origin: Instant, limit: Option<Instant>, out: &mut Vec<TimedCommit>) {
    while let Some(deadline) = tracker.next_deadline() {
        if limit.is_some_and(|l| deadline > l) {
            break;
        }
        for commit in tracker.poll(deadline) {
            out.push(TimedCommit {
                at_ms: elapsed_ms(origin, deadline),
                category: commit.category,
                value: commit.value,
            });
        }
    }
}

fn required_category(edit: &BudgetEdit) -> CardFinanceResult<&str> {
    edit.category
        .as_deref()
        .ok_or_else(|| CardFinanceError::InvalidInput {
            field: "category".into(),
            reason: format!("edit at {}ms needs a category", edit.at_ms),
        })
}

pub fn simulate_edits(script: &BudgetScript) -> CardFinanceResult<ComputationOutput<BudgetTimeline>> {
    simulate_edits_with(&BudgetConfig::default(), script)
}

/// Edits are applied in time order; a timer that falls due at the same
/// instant as an edit fires before the edit is seen.
pub fn simulate_edits_with(
    config: &BudgetConfig,
    script: &BudgetScript,
) -> CardFinanceResult<ComputationOutput<BudgetTimeline>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let mut edits = script.edits.clone();
    edits.sort_by_key(|e| e.at_ms);

    let origin = start;
    let at = |ms: u64| origin + Duration::from_millis(ms);
    let mut tracker = BudgetTracker::new(script.limits.clone(), config.clone());
    let mut commits: Vec<TimedCommit> = Vec::new();

    for edit in &edits {
        if script.until_ms.is_some_and(|until| edit.at_ms > until) {
            warnings.push(format!("Edit at {}ms is after the stop time and was skipped", edit.at_ms));
            continue;
        }
        let now = at(edit.at_ms);
        drain_until(&mut tracker, origin, Some(now), &mut commits);
        match &edit.action {
            BudgetAction::Set(value) => {
                tracker.set_pending(required_category(edit)?, *value, now)?;
            }
            BudgetAction::Increment => {
                tracker.increment_pending(required_category(edit)?, now);
            }
            BudgetAction::Decrement => {
                tracker.decrement_pending(required_category(edit)?, now);
            }
            BudgetAction::Preset(preset) => tracker.apply_named_preset(*preset, now)?,
        }
    }

    drain_until(&mut tracker, origin, script.until_ms.map(at), &mut commits);

    let in_flight = tracker.in_flight();
    if !in_flight.is_empty() {
        warnings.push(format!(
            "{} categories had not settled when the clock stopped",
            in_flight.len()
        ));
    }
    let timeline = BudgetTimeline {
        commits,
        committed: tracker.committed().clone(),
        pending: tracker.pending().clone(),
        in_flight,
    };
    tracker.shutdown();

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Debounced commit: last edit per category settles after the quiet window",
        &serde_json::json!({
            "quiet_window_ms": config.quiet_window_ms,
            "step": config.step.to_string(),
            "floor": config.floor.to_string(),
            "edits": edits.len(),
            "until_ms": script.until_ms,
        }),
        warnings,
        elapsed,
        timeline,
    ))
}

/// Net change per category between the starting limits and the settled result.
pub fn committed_changes(script: &BudgetScript, timeline: &BudgetTimeline) -> BTreeMap<String, Money> {
    timeline
        .committed
        .iter()
        .filter_map(|(category, value)| {
            let before = script.limits.get(category).copied().unwrap_or(Decimal::ZERO);
            (before != *value).then(|| (category.clone(), *value - before))
        })
        .collect()
}
