use serde_json::Value;

use super::cell;

/// Fields that carry the headline answer, in priority order.
const PRIORITY_KEYS: [&str; 8] = [
    "monthly_installment",
    "remaining",
    "visible_total",
    "total_payable",
    "total_interest",
    "commits",
    "pct",
    "confidence_score",
];

/// Print just the key answer value from the output.
///
/// Looks for well-known result fields in priority order, then falls back to
/// the first field. Array results print the first element's answer.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let target = match result_obj {
        Value::Array(items) => items.first().unwrap_or(result_obj),
        other => other,
    };

    if let Value::Object(map) = target {
        for key in &PRIORITY_KEYS {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", cell(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, cell(val));
            return;
        }
    }

    println!("{}", cell(target));
}
