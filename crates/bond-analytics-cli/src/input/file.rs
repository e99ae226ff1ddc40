use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a JSON or YAML file (chosen by extension) into a typed struct.
pub fn read_document<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let parsed = if is_yaml(&canonical) {
        serde_yaml::from_str(&contents).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&contents).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e).into())
}

/// Read an ISS payload file as untyped JSON.
pub fn read_json_value(path: &str) -> Result<Value, Box<dyn std::error::Error>> {
    read_document(path)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Resolve relative paths against the working directory and require a
/// regular file.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }
    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_extension_detection() {
        assert!(is_yaml(Path::new("bond.yaml")));
        assert!(is_yaml(Path::new("/tmp/bond.yml")));
        assert!(!is_yaml(Path::new("bond.json")));
        assert!(!is_yaml(Path::new("bond")));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = read_json_value("definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
