pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("JSON serialization error: {e}"),
        },
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Flatten nested objects into dotted keys (`conclusion.valuation`) so
/// bond metrics and correlation diagnostics fit a two-column layout.
/// Arrays are kept as leaf values.
pub fn flatten(value: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    if let Value::Object(map) = value {
        flatten_into(&mut out, None, map);
    }
    out
}

fn flatten_into(out: &mut Map<String, Value>, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, val) in map {
        let full = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match val {
            Value::Object(inner) => flatten_into(out, Some(&full), inner),
            other => {
                out.insert(full, other.clone());
            }
        }
    }
}

/// Plain rendering of a leaf value.
pub fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
