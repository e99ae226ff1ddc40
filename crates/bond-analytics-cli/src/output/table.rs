use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{flatten, scalar};

/// Render a computation envelope (or a bare value) as tables.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_envelope(result, map),
            None => print_fields(value),
        },
        Value::Array(arr) => print_rows(arr),
        _ => println!("{value}"),
    }
}

fn print_envelope(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Array(rows) => print_rows(rows),
        Value::Object(_) => print_fields(result),
        other => println!("{}", scalar(other)),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}

/// Two-column Field/Value table of a flattened object.
fn print_fields(value: &Value) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in flatten(value) {
        builder.push_record([key, cell(&val)]);
    }
    println!("{}", Table::from(builder));
}

/// One row per element: schedule events or batch results.
fn print_rows(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    let flat: Vec<Map<String, Value>> = arr.iter().map(flatten).collect();
    if flat.iter().all(Map::is_empty) {
        for item in arr {
            println!("{}", scalar(item));
        }
        return;
    }

    let mut headers: Vec<String> = Vec::new();
    for row in &flat {
        for key in row.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for row in &flat {
        builder.push_record(
            headers
                .iter()
                .map(|h| row.get(h).map(cell).unwrap_or_default()),
        );
    }
    println!("{}", Table::from(builder));
}

fn cell(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(", "),
        other => scalar(other),
    }
}
