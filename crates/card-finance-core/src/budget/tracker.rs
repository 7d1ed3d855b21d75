use log::{debug, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use super::debounce::{Debouncer, TimerHandle};
use crate::config::BudgetConfig;
use crate::error::CardFinanceError;
use crate::types::*;
use crate::CardFinanceResult;

/// Limits a fresh dashboard starts with.
pub fn default_limits() -> BTreeMap<String, Money> {
    BTreeMap::from([
        ("Food".to_string(), dec!(3000)),
        ("Shopping".to_string(), dec!(5000)),
        ("Groceries".to_string(), dec!(4000)),
        ("Travel".to_string(), dec!(10000)),
    ])
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPreset {
    Low,
    Medium,
    High,
}

impl BudgetPreset {
    pub fn multiplier(&self, config: &BudgetConfig) -> Decimal {
        match self {
            BudgetPreset::Low => config.preset_low,
            BudgetPreset::Medium => config.preset_medium,
            BudgetPreset::High => config.preset_high,
        }
    }
}

impl fmt::Display for BudgetPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BudgetPreset::Low => "low",
            BudgetPreset::Medium => "medium",
            BudgetPreset::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for BudgetPreset {
    type Err = CardFinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(BudgetPreset::Low),
            "medium" => Ok(BudgetPreset::Medium),
            "high" => Ok(BudgetPreset::High),
            other => Err(CardFinanceError::InvalidInput {
                field: "preset".into(),
                reason: format!("unknown preset '{other}' (expected low, medium or high)"),
            }),
        }
    }
}

/// A pending limit promoted to committed after its quiet window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetCommit {
    pub category: String,
    pub value: Money,
}

/// One row of the budget panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetUsage {
    pub category: String,
    pub spent: Money,
    /// Limit being edited; drives the progress bar and over-budget flag
    pub pending_limit: Money,
    /// Settled limit shown in the legend
    pub committed_limit: Option<Money>,
    pub pct: Decimal,
    pub over_budget: bool,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Per-category limits with an optimistic pending copy and a debounced
/// commit into the settled copy.
#[derive(Debug)]
pub struct BudgetTracker {
    committed: BTreeMap<String, Money>,
    pending: BTreeMap<String, Money>,
    timers: Debouncer<String>,
    config: BudgetConfig,
    shut_down: bool,
}

impl BudgetTracker {
    pub fn new(limits: BTreeMap<String, Money>, config: BudgetConfig) -> Self {
        Self {
            pending: limits.clone(),
            committed: limits,
            timers: Debouncer::new(config.quiet_window()),
            config,
            shut_down: false,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(default_limits(), BudgetConfig::default())
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    pub fn committed(&self) -> &BTreeMap<String, Money> {
        &self.committed
    }

    pub fn pending(&self) -> &BTreeMap<String, Money> {
        &self.pending
    }

    pub fn committed_limit(&self, category: &str) -> Option<Money> {
        self.committed.get(category).copied()
    }

    pub fn pending_limit(&self, category: &str) -> Option<Money> {
        self.pending.get(category).copied()
    }

    /// Categories whose pending edit has not settled yet.
    pub fn in_flight(&self) -> Vec<String> {
        self.timers.keys().cloned().collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Quiet window currently in force.
    pub fn quiet_window(&self) -> Duration {
        self.timers.window()
    }

    /// Record an edit. The pending value changes immediately; the commit
    /// timer for that category restarts, or is cancelled when the edit
    /// brings pending back to the committed value.
    pub fn set_pending(
        &mut self,
        category: &str,
        value: Money,
        now: Instant,
    ) -> CardFinanceResult<Option<TimerHandle>> {
        if value < Decimal::ZERO {
            return Err(CardFinanceError::InvalidInput {
                field: format!("budget.{category}"),
                reason: format!("limit cannot be negative (got {value})"),
            });
        }
        self.pending.insert(category.to_string(), value);
        Ok(self.reschedule(category, now))
    }

    pub fn increment_pending(&mut self, category: &str, now: Instant) -> Option<TimerHandle> {
        let next = (self.step_base(category) + self.config.step).max(self.config.floor);
        self.pending.insert(category.to_string(), next);
        self.reschedule(category, now)
    }

    pub fn decrement_pending(&mut self, category: &str, now: Instant) -> Option<TimerHandle> {
        let next = (self.step_base(category) - self.config.step).max(self.config.floor);
        self.pending.insert(category.to_string(), next);
        self.reschedule(category, now)
    }

    /// Scale every pending limit, rounding to whole units with the floor applied.
    pub fn apply_preset(&mut self, multiplier: Decimal, now: Instant) -> CardFinanceResult<()> {
        if multiplier <= Decimal::ZERO {
            return Err(CardFinanceError::InvalidInput {
                field: "multiplier".into(),
                reason: format!("must be positive (got {multiplier})"),
            });
        }
        let floor = self.config.floor;
        let categories: Vec<String> = self.pending.keys().cloned().collect();
        for category in categories {
            if let Some(v) = self.pending.get_mut(&category) {
                *v = round_currency(*v * multiplier).max(floor);
            }
            self.reschedule(&category, now);
        }
        Ok(())
    }

    pub fn apply_named_preset(&mut self, preset: BudgetPreset, now: Instant) -> CardFinanceResult<()> {
        let multiplier = preset.multiplier(&self.config);
        self.apply_preset(multiplier, now)
    }

    /// Commit every category whose quiet window has elapsed by `now`.
    /// Does nothing once the tracker is shut down.
    pub fn poll(&mut self, now: Instant) -> Vec<BudgetCommit> {
        if self.shut_down {
            return Vec::new();
        }
        let mut commits = Vec::new();
        for (category, _) in self.timers.due(now) {
            if let Some(value) = self.pending.get(&category).copied() {
                debug!("committing budget {category} = {value}");
                self.committed.insert(category.clone(), value);
                commits.push(BudgetCommit { category, value });
            }
        }
        commits
    }

    /// Panel rows for every budgeted category. Over-budget and the progress
    /// percentage compare spend against the pending limit.
    pub fn usage(&self, spent: &BTreeMap<String, Money>) -> Vec<BudgetUsage> {
        self.pending
            .iter()
            .map(|(category, &limit)| {
                let used = spent.get(category).copied().unwrap_or(Decimal::ZERO);
                BudgetUsage {
                    category: category.clone(),
                    spent: used,
                    pending_limit: limit,
                    committed_limit: self.committed_limit(category),
                    pct: progress_pct(used, limit),
                    over_budget: limit > Decimal::ZERO && used > limit,
                }
            })
            .collect()
    }

    /// Legend text, read from the committed limit.
    pub fn legend_label(&self, category: &str) -> String {
        match self.committed_limit(category) {
            Some(limit) if limit > Decimal::ZERO => format!("Budget {}", format_amount_label(limit)),
            _ => "No budget".to_string(),
        }
    }

    /// Cancel all outstanding timers. Later polls commit nothing.
    /// Drop every in-flight edit without committing it, returning the
    /// affected categories. Pending values are left as edited.
    pub fn discard_in_flight(&mut self) -> Vec<String> {
        let dropped = self.in_flight();
        if !dropped.is_empty() {
            debug!("discarding {} in-flight budget edits", dropped.len());
        }
        self.timers.clear();
        dropped
    }

    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        if !self.timers.is_empty() {
            warn!("dropping {} unsettled budget edits", self.timers.len());
        }
        self.timers.clear();
        self.shut_down = true;
    }

    fn step_base(&self, category: &str) -> Money {
        self.pending_limit(category).unwrap_or(self.config.floor)
    }

    fn reschedule(&mut self, category: &str, now: Instant) -> Option<TimerHandle> {
        let key = category.to_string();
        if self.shut_down {
            warn!("budget edit for {category} after shutdown will not be committed");
            return None;
        }
        if self.pending.get(category) == self.committed.get(category) {
            if self.timers.cancel(&key).is_some() {
                debug!("budget {category} back to its committed value; timer cancelled");
            }
            None
        } else {
            debug!("budget {category} edited; commit in {:?}", self.timers.window());
            Some(self.timers.schedule(key, now))
        }
    }
}

impl Drop for BudgetTracker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Stateless evaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetInput {
    #[serde(default = "default_limits")]
    pub limits: BTreeMap<String, Money>,
    /// In-progress edits; defaults to the committed limits
    #[serde(default)]
    pub pending: Option<BTreeMap<String, Money>>,
    #[serde(default)]
    pub spent: BTreeMap<String, Money>,
}

pub fn evaluate_budgets(input: &BudgetInput) -> CardFinanceResult<ComputationOutput<Vec<BudgetUsage>>> {
    evaluate_budgets_with(&BudgetConfig::default(), input)
}

pub fn evaluate_budgets_with(
    config: &BudgetConfig,
    input: &BudgetInput,
) -> CardFinanceResult<ComputationOutput<Vec<BudgetUsage>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if let Some((category, value)) = input.limits.iter().find(|(_, v)| **v < Decimal::ZERO) {
        return Err(CardFinanceError::InvalidInput {
            field: format!("limits.{category}"),
            reason: format!("limit cannot be negative (got {value})"),
        });
    }

    let mut tracker = BudgetTracker::new(input.limits.clone(), config.clone());
    if let Some(pending) = &input.pending {
        for (category, value) in pending {
            tracker.set_pending(category, *value, start)?;
        }
    }
    let unsettled = tracker.discard_in_flight();
    tracker.shutdown();

    for category in input.spent.keys() {
        if !tracker.pending().contains_key(category) {
            warnings.push(format!("Spend in {category} has no budget"));
        }
    }

    let usage = tracker.usage(&input.spent);
    let over = usage.iter().filter(|u| u.over_budget).count();
    if over > 0 {
        warnings.push(format!("{over} categories over budget"));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Spend compared against pending limits; legend reads committed limits",
        &serde_json::json!({
            "limits": input.limits.len(),
            "has_pending_edits": input.pending.is_some(),
            "unsettled_edits": unsettled,
            "quiet_window_ms": config.quiet_window_ms,
        }),
        warnings,
        elapsed,
        usage,
    ))
}
