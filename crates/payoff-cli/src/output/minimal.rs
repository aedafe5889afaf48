use serde_json::Value;

use super::{format_cell, result_of};

/// Result fields that best answer "when am I debt free?", in priority order.
const PRIORITY_KEYS: [&str; 8] = [
    "projected_payoff_date",
    "months_to_debt_free",
    "months_to_payoff",
    "total_interest_saved",
    "total_current_balance",
    "resulting_balance",
    "new_milestones",
    "recommendations",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    if let Value::Object(map) = result {
        // Amortization and record-payment nest their headline figures.
        let map = map
            .get("summary")
            .or_else(|| map.get("payment"))
            .and_then(|s| s.as_object())
            .unwrap_or(map);

        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key) {
                if !val.is_null() {
                    println!("{}", minimal_value(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, minimal_value(val));
            return;
        }
    }

    println!("{}", minimal_value(result));
}

fn minimal_value(value: &Value) -> String {
    match value {
        // Lists of milestones or recommendations: one headline per line.
        Value::Array(items) if items.iter().all(|v| v.is_object()) => items
            .iter()
            .filter_map(|v| {
                v.get("title")
                    .or_else(|| v.get("description"))
                    .map(format_cell)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => format_cell(value),
    }
}
