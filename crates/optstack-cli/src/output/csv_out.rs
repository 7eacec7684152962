use serde_json::Value;
use std::io;

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write a pricing envelope as CSV.
///
/// When the result carries a spot profile, one row per profile point is
/// written. Otherwise array-valued fields (spot, price, greeks) are laid
/// out column-wise, one row per spot level.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => match map.get("profile") {
            Some(Value::Array(profile)) if !profile.is_empty() => {
                write_rows(&mut wtr, profile);
            }
            _ => write_columns(&mut wtr, map),
        },
        Value::Array(rows) => write_rows(&mut wtr, rows),
        _ => {
            let _ = wtr.write_record([format_csv_value(result)]);
        }
    }

    let _ = wtr.flush();
}

fn write_rows(wtr: &mut StdoutWriter<'_>, rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        return;
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let _ = wtr.write_record(&headers);
    for row in rows.iter().filter_map(Value::as_object) {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| row.get(*h).map(format_csv_value).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&cells);
    }
}

fn write_columns(wtr: &mut StdoutWriter<'_>, map: &serde_json::Map<String, Value>) {
    let columns: Vec<(&str, &Vec<Value>)> = map
        .iter()
        .filter_map(|(k, v)| v.as_array().map(|a| (k.as_str(), a)))
        .filter(|(k, _)| *k != "profile")
        .collect();

    if columns.is_empty() {
        let _ = wtr.write_record(["field", "value"]);
        for (key, val) in map {
            let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
        }
        return;
    }

    let headers: Vec<&str> = columns.iter().map(|(k, _)| *k).collect();
    let _ = wtr.write_record(&headers);
    let len = columns.iter().map(|(_, a)| a.len()).max().unwrap_or(0);
    for i in 0..len {
        let cells: Vec<String> = columns
            .iter()
            .map(|(_, a)| a.get(i).map(format_csv_value).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&cells);
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
