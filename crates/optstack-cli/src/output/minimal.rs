use serde_json::Value;

const PRIORITY_KEYS: [&str; 5] = ["price", "delta", "gamma", "theta", "vega"];

/// Print the price and greeks on one line each, `name: value`.
///
/// Falls back to the first result field when none of the greeks are present.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result {
        let mut printed = false;
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
                println!("{}: {}", key, format_minimal(val));
                printed = true;
            }
        }
        if printed {
            return;
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(format_minimal)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
