use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a pricing request from a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let resolved = resolve_path(path)?;
    tracing::debug!(path = %resolved.display(), "reading request file");
    let contents = fs::read_to_string(&resolved)
        .map_err(|e| format!("Failed to read '{}': {}", resolved.display(), e))?;
    let request = serde_json::from_str(&contents)
        .map_err(|e| format!("Invalid request in '{}': {}", resolved.display(), e))?;
    Ok(request)
}

fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let resolved = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !resolved.is_file() {
        return Err(format!("Request file not found: {}", resolved.display()).into());
    }
    Ok(resolved)
}
