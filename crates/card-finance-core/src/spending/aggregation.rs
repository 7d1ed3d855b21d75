use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::config::SpendingConfig;
use crate::error::CardFinanceError;
use crate::types::*;
use crate::CardFinanceResult;

/// Months shown by the six-month trend, ending at the reference month.
const SIX_MONTH_BUCKETS: u32 = 6;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpendRange {
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "90d")]
    Last90Days,
    #[serde(rename = "6m")]
    LastSixMonths,
}

impl SpendRange {
    /// Earliest date included in the window. "6m" is calendar-month
    /// subtraction (day clamped to the target month's length).
    pub fn cutoff(&self, now: NaiveDate) -> CardFinanceResult<NaiveDate> {
        let cutoff = match self {
            SpendRange::Last30Days => now.checked_sub_days(Days::new(30)),
            SpendRange::Last90Days => now.checked_sub_days(Days::new(90)),
            SpendRange::LastSixMonths => now.checked_sub_months(Months::new(6)),
        };
        cutoff.ok_or_else(|| CardFinanceError::DateError(format!("cannot compute {self} cutoff for {now}")))
    }
}

impl fmt::Display for SpendRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpendRange::Last30Days => "30d",
            SpendRange::Last90Days => "90d",
            SpendRange::LastSixMonths => "6m",
        };
        f.write_str(s)
    }
}

impl FromStr for SpendRange {
    type Err = CardFinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "30d" => Ok(SpendRange::Last30Days),
            "90d" => Ok(SpendRange::Last90Days),
            "6m" => Ok(SpendRange::LastSixMonths),
            other => Err(CardFinanceError::InvalidInput {
                field: "range".into(),
                reason: format!("expected one of 30d, 90d, 6m; got '{other}'"),
            }),
        }
    }
}

/// Category and/or merchant equality filter layered over the range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
}

impl SpendFilter {
    pub fn matches(&self, t: &Transaction) -> bool {
        self.category.as_ref().map_or(true, |c| &t.category == c)
            && self.merchant.as_ref().map_or(true, |m| &t.merchant == m)
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.merchant.is_none()
    }

    /// Selecting the active category clears it; anything else replaces it.
    pub fn toggle_category(&mut self, category: &str) {
        self.category = toggled(self.category.take(), category);
    }

    pub fn toggle_merchant(&mut self, merchant: &str) {
        self.merchant = toggled(self.merchant.take(), merchant);
    }
}

fn toggled(current: Option<String>, selected: &str) -> Option<String> {
    match current {
        Some(c) if c == selected => None,
        _ if selected.is_empty() => None,
        _ => Some(selected.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantTotal {
    pub merchant: String,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    /// First day of the calendar month
    pub month: NaiveDate,
    /// Short month name, e.g. "Oct"
    pub label: String,
    pub total: Money,
}

/// Derived view over a transaction list for one range and filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendWindow {
    pub range: SpendRange,
    pub range_cutoff: NaiveDate,
    /// Visible set, descending by total
    pub category_totals: Vec<CategoryTotal>,
    /// Visible set, descending, truncated to the top N
    pub merchant_totals: Vec<MerchantTotal>,
    /// Range-filtered set (ignores the category/merchant filter), ascending by month
    pub monthly_totals: Vec<MonthlyTotal>,
    pub visible_total: Money,
    pub visible_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendInput {
    pub transactions: Vec<Transaction>,
    pub range: SpendRange,
    pub reference_date: NaiveDate,
    #[serde(default)]
    pub filter: SpendFilter,
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Sum amounts per key, descending by sum. Ties keep first-seen order.
fn grouped_desc<'a>(
    transactions: impl Iterator<Item = &'a Transaction>,
    key: impl Fn(&Transaction) -> &str,
) -> Vec<(String, Money)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut sums: Vec<(String, Money)> = Vec::new();
    for t in transactions {
        let k = key(t);
        match index.get(k) {
            Some(&i) => sums[i].1 += t.amount,
            None => {
                index.insert(k.to_string(), sums.len());
                sums.push((k.to_string(), t.amount));
            }
        }
    }
    sums.sort_by(|a, b| b.1.cmp(&a.1));
    sums
}

pub fn category_totals(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    grouped_desc(transactions.iter(), |t| t.category.as_str())
        .into_iter()
        .map(|(category, total)| CategoryTotal { category, total })
        .collect()
}

pub fn merchant_totals(transactions: &[Transaction], top_n: usize) -> Vec<MerchantTotal> {
    grouped_desc(transactions.iter(), |t| t.merchant.as_str())
        .into_iter()
        .take(top_n)
        .map(|(merchant, total)| MerchantTotal { merchant, total })
        .collect()
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn monthly_entry(month: NaiveDate, total: Money) -> MonthlyTotal {
    MonthlyTotal {
        month,
        label: month.format("%b").to_string(),
        total,
    }
}

/// Calendar-month totals, ascending. For the six-month range the result is
/// exactly the six months ending at `now`, zero-filled.
pub fn monthly_totals(
    transactions: &[Transaction],
    range: SpendRange,
    now: NaiveDate,
) -> CardFinanceResult<Vec<MonthlyTotal>> {
    let mut by_month: HashMap<NaiveDate, Money> = HashMap::new();
    for t in transactions {
        *by_month.entry(month_start(t.date)).or_insert(Decimal::ZERO) += t.amount;
    }

    if range != SpendRange::LastSixMonths {
        let mut months: Vec<MonthlyTotal> = by_month
            .into_iter()
            .map(|(month, total)| monthly_entry(month, total))
            .collect();
        months.sort_by_key(|m| m.month);
        return Ok(months);
    }

    let current = month_start(now);
    (0..SIX_MONTH_BUCKETS)
        .rev()
        .map(|back| -> CardFinanceResult<MonthlyTotal> {
            let month = current.checked_sub_months(Months::new(back)).ok_or_else(|| {
                CardFinanceError::DateError(format!("cannot step {back} months back from {now}"))
            })?;
            let total = by_month.get(&month).copied().unwrap_or(Decimal::ZERO);
            Ok(monthly_entry(month, total))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

pub fn aggregate(
    transactions: &[Transaction],
    range: SpendRange,
    now: NaiveDate,
    filter: Option<&SpendFilter>,
) -> CardFinanceResult<SpendWindow> {
    aggregate_with(&SpendingConfig::default(), transactions, range, now, filter)
}

pub fn aggregate_with(
    config: &SpendingConfig,
    transactions: &[Transaction],
    range: SpendRange,
    now: NaiveDate,
    filter: Option<&SpendFilter>,
) -> CardFinanceResult<SpendWindow> {
    let range_cutoff = range.cutoff(now)?;

    let in_range: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.date >= range_cutoff)
        .cloned()
        .collect();

    let visible: Vec<Transaction> = match filter {
        Some(f) if !f.is_empty() => in_range.iter().filter(|t| f.matches(t)).cloned().collect(),
        _ => in_range.clone(),
    };

    let category_totals = category_totals(&visible);
    let visible_total = category_totals.iter().map(|c| c.total).sum();

    Ok(SpendWindow {
        range,
        range_cutoff,
        merchant_totals: merchant_totals(&visible, config.top_merchants),
        monthly_totals: monthly_totals(&in_range, range, now)?,
        category_totals,
        visible_total,
        visible_count: visible.len(),
    })
}

/// Aggregate spending, wrapped in the computation envelope.
pub fn aggregate_spending(input: &SpendInput) -> CardFinanceResult<ComputationOutput<SpendWindow>> {
    aggregate_spending_with(&SpendingConfig::default(), input)
}

pub fn aggregate_spending_with(
    config: &SpendingConfig,
    input: &SpendInput,
) -> CardFinanceResult<ComputationOutput<SpendWindow>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let future = input
        .transactions
        .iter()
        .filter(|t| t.date > input.reference_date)
        .count();
    if future > 0 {
        warnings.push(format!(
            "{future} transaction(s) dated after {} are included in the range",
            input.reference_date
        ));
    }

    let window = aggregate_with(
        config,
        &input.transactions,
        input.range,
        input.reference_date,
        Some(&input.filter),
    )?;

    if !input.filter.is_empty() && window.visible_count == 0 {
        warnings.push("Filter matches no transactions in the selected range".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Time-windowed spend aggregation",
        &serde_json::json!({
            "range": input.range.to_string(),
            "reference_date": input.reference_date.to_string(),
            "filter": input.filter,
            "top_merchants": config.top_merchants,
        }),
        warnings,
        elapsed,
        window,
    ))
}
