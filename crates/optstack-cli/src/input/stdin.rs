use serde_json::Value;
use std::io::{self, Read};

/// Read a piped JSON request. Returns None when stdin is a terminal or empty.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let request = buffer.trim();
    if request.is_empty() {
        return Ok(None);
    }
    tracing::debug!(bytes = request.len(), "read request from stdin");
    Ok(Some(serde_json::from_str(request)?))
}
