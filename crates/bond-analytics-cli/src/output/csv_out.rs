use serde_json::{Map, Value};
use std::io;

use super::{flatten, scalar};

/// Write output as CSV to stdout. A list result becomes one row per
/// element; anything else becomes `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Array(rows) => write_rows(&mut wtr, rows),
        Value::Object(_) => {
            let _ = wtr.write_record(["field", "value"]);
            for (key, val) in flatten(result) {
                let _ = wtr.write_record([key, scalar(&val)]);
            }
        }
        other => {
            let _ = wtr.write_record([scalar(other)]);
        }
    }

    let _ = wtr.flush();
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) {
    let flat: Vec<Map<String, Value>> = rows.iter().map(flatten).collect();
    let mut headers: Vec<String> = Vec::new();
    for row in &flat {
        for key in row.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    if headers.is_empty() {
        for item in rows {
            let _ = wtr.write_record([scalar(item)]);
        }
        return;
    }

    let _ = wtr.write_record(&headers);
    for row in &flat {
        let record: Vec<String> = headers
            .iter()
            .map(|h| row.get(h).map(scalar).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&record);
    }
}
