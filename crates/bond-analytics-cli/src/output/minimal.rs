use serde_json::Value;

use super::scalar;

/// Fields that carry the answer, in order of preference.
const PRIORITY_KEYS: [&str; 7] = [
    "ytm",
    "recommendation",
    "fair_value",
    "current_yield",
    "undiscounted_total",
    "macaulay_duration",
    "ticker",
];

/// Print just the key answer: one line for a single result, one
/// `ticker: answer` line per element of a list result.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Array(items) => {
            for item in items {
                println!("{}", minimal_line(item));
            }
        }
        other => println!("{}", key_answer(other)),
    }
}

fn minimal_line(item: &Value) -> String {
    match item.get("ticker").and_then(Value::as_str) {
        Some(ticker) => {
            let answer = match (item.get("metrics"), item.get("error")) {
                (Some(m), _) if !m.is_null() => key_answer(m),
                (_, Some(Value::String(e))) => format!("error: {e}"),
                _ => key_answer(item),
            };
            format!("{ticker}: {answer}")
        }
        None => key_answer(item),
    }
}

fn key_answer(value: &Value) -> String {
    if let Value::Object(map) = value {
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
                return scalar(val);
            }
        }
        if let Some((key, val)) = map.iter().next() {
            return format!("{key}: {}", scalar(val));
        }
    }
    scalar(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ytm_wins() {
        let v = json!({"fair_value": "909.0909", "ytm": "5.2632"});
        assert_eq!(key_answer(&v), "5.2632");
    }

    #[test]
    fn test_batch_lines() {
        let ok = json!({"ticker": "A", "metrics": {"ytm": "7.5"}, "error": null});
        let failed = json!({"ticker": "B", "metrics": null, "error": "no price"});
        assert_eq!(minimal_line(&ok), "A: 7.5");
        assert_eq!(minimal_line(&failed), "B: error: no price");
    }
}
