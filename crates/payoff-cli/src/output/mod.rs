pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Result fields that hold a month-by-month or item-by-item series. Table
/// and CSV output render the first one present as rows.
pub const SERIES_KEYS: [&str; 7] = [
    "rows",
    "schedule",
    "recommendations",
    "new_milestones",
    "plans",
    "payoff_events",
    "events",
];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The `result` object of an envelope, or the value itself.
pub fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// First series array found in a result object, with its key.
pub fn series_of(result: &Value) -> Option<(&'static str, &Vec<Value>)> {
    let map = result.as_object()?;
    SERIES_KEYS
        .iter()
        .find_map(|k| map.get(*k).and_then(|v| v.as_array()).map(|a| (*k, a)))
}

/// Render a scalar JSON value for a cell.
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) if arr.iter().all(|v| !v.is_object()) => {
            let items: Vec<String> = arr.iter().map(format_cell).collect();
            items.join(", ")
        }
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
