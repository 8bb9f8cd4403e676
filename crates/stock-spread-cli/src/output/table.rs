use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_scalar, row_field};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_envelope(result, map),
            None => print_fields(map),
        },
        Value::Array(arr) => print_rows(arr),
        other => println!("{}", other),
    }
}

fn print_envelope(result: &Value, envelope: &Map<String, Value>) {
    if let Value::Object(res_map) = result {
        if let Some((_, rows)) = row_field(res_map) {
            print_rows(rows);
        }
        // Pairwise matrices sit at the top level or under an allocation's diagnostics.
        let diagnostics = res_map.get("diagnostics").and_then(Value::as_object);
        for name in ["covariance", "correlation"] {
            let matrix = res_map
                .get(name)
                .or_else(|| diagnostics.and_then(|d| d.get(name)));
            if let Some(matrix) = matrix {
                println!("{}:", name);
                print_matrix(matrix);
            }
        }

        // Remaining scalar fields.
        let scalars: Map<String, Value> = res_map
            .iter()
            .filter(|(_, v)| !v.is_array() && !v.is_object())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !scalars.is_empty() {
            print_fields(&scalars);
        }
    } else {
        print_fields(envelope);
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_cell(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            println!("{}", format_cell(item));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_cell).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}

/// Symbol-by-symbol grid of a pairwise matrix; undefined cells print as "-".
fn print_matrix(matrix: &Value) {
    let (Some(Value::Array(symbols)), Some(Value::Array(values))) =
        (matrix.get("symbols"), matrix.get("values"))
    else {
        return;
    };

    let mut builder = Builder::default();
    let mut header = vec![String::new()];
    header.extend(symbols.iter().map(format_scalar));
    builder.push_record(header);

    for (symbol, row) in symbols.iter().zip(values) {
        let mut record = vec![format_scalar(symbol)];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(|c| match c {
                Value::Null => "-".to_string(),
                other => format_scalar(other),
            }));
        }
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_cell).collect();
            items.join(", ")
        }
        other => format_scalar(other),
    }
}
