//! Reading and writing scan documents

use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value as JsonValue;

use crate::error::ScanError;

/// Write a JSON document with 4-space indentation
///
/// # Errors
/// Returns error if serialization or the write fails
pub fn write_json(path: &Path, value: &JsonValue) -> Result<(), ScanError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    std::fs::write(path, buffer).map_err(|source| ScanError::io(path, source))
}

/// Read a scan or coordinate document
///
/// Files ending in `.yaml` or `.yml` are parsed as YAML, anything else as
/// JSON.
///
/// # Errors
/// Returns error if the file cannot be read or parsed
pub fn read_document(path: &Path) -> Result<JsonValue, ScanError> {
    let text = std::fs::read_to_string(path).map_err(|source| ScanError::io(path, source))?;
    parse_document(&text, is_yaml(path))
}

/// Parse document text as YAML or JSON
///
/// # Errors
/// Returns error if the text does not parse
pub fn parse_document(text: &str, yaml: bool) -> Result<JsonValue, ScanError> {
    if yaml {
        Ok(serde_yaml::from_str(text)?)
    } else {
        Ok(serde_json::from_str(text)?)
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}
