use serde_json::Value;

use super::{format_scalar, result_of, row_field};

/// Print just the key answer from the output.
///
/// Allocations print one `symbol weight` line per holding; other results
/// print the first well-known field present, then fall back to the first field.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    let priority_keys = ["portfolio_std", "target_std", "risk_percentage", "skipped_pairs"];

    if let Value::Object(map) = result {
        if let Some(Value::Array(rows)) = map.get("portfolio") {
            for row in rows {
                let symbol = row.get("symbol").map(format_scalar).unwrap_or_default();
                let weight = row.get("weight").map(format_scalar).unwrap_or_default();
                println!("{} {}", symbol, weight);
            }
            return;
        }

        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_scalar(val));
                    return;
                }
            }
        }

        if let Some((key, rows)) = row_field(map) {
            println!("{}: {} rows", key, rows.len());
            return;
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_scalar(val));
            return;
        }
    }

    println!("{}", format_scalar(result));
}
