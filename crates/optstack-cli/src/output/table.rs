use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Render a pricing envelope as tables: summary fields, then the spot profile.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(envelope) => match envelope.get("result") {
            Some(Value::Object(result)) => print_result(result, envelope),
            _ => print_fields(envelope),
        },
        Value::Array(rows) => print_rows(rows),
        _ => println!("{}", value),
    }
}

fn print_result(result: &Map<String, Value>, envelope: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in result.iter().filter(|(k, _)| k.as_str() != "profile") {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));

    if let Some(Value::Array(profile)) = result.get("profile") {
        println!("\nProfile:");
        print_rows(profile);
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(methodology)) = envelope.get("methodology") {
        println!("\nMethodology: {}", methodology);
    }
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        println!("(empty)");
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for row in rows.iter().filter_map(Value::as_object) {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| row.get(h.as_str()).map(format_value).unwrap_or_default())
            .collect();
        builder.push_record(cells);
    }
    println!("{}", Table::from(builder));
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
