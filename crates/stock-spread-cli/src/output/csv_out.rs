use serde_json::Value;
use std::io;

use super::{format_scalar, result_of, row_field};

/// Write output as CSV to stdout.
///
/// Results with a row list (allocations, two-asset screens) become one CSV row
/// per entry; pairwise matrices become a symbol-by-symbol grid; anything else
/// is written as `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match result_of(value) {
        Value::Object(map) => {
            if let Some((_, rows)) = row_field(map) {
                write_rows(&mut wtr, rows);
            } else if let Some(matrix) = map.get("covariance") {
                write_matrix(&mut wtr, matrix);
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_scalar(val)]);
                }
            }
        }
        Value::Array(arr) => write_rows(&mut wtr, arr),
        other => {
            let _ = wtr.write_record([&format_scalar(other)]);
        }
    }

    let _ = wtr.flush();
}

fn write_rows(wtr: &mut csv::Writer<io::StdoutLock<'_>>, rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            let _ = wtr.write_record([&format_scalar(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let _ = wtr.write_record(&headers);
    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_scalar).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}

fn write_matrix(wtr: &mut csv::Writer<io::StdoutLock<'_>>, matrix: &Value) {
    let (Some(Value::Array(symbols)), Some(Value::Array(values))) =
        (matrix.get("symbols"), matrix.get("values"))
    else {
        return;
    };

    let mut header = vec![String::new()];
    header.extend(symbols.iter().map(format_scalar));
    let _ = wtr.write_record(&header);

    for (symbol, row) in symbols.iter().zip(values) {
        let mut record = vec![format_scalar(symbol)];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(format_scalar));
        }
        let _ = wtr.write_record(&record);
    }
}
