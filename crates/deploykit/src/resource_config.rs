//! Resource config parsing.
//!
//! The payload is JSON of the form:
//!
//! ```text
//! {"entries": [{"type": "s3", "resource_name": "bucket", "region": "us-east-1"}]}
//! ```
//!
//! Structural problems (bad JSON, missing or empty `entries`) are parsing
//! errors. Entries missing `type` or `resource_name` are validation errors.

use crate::error::{Error, Result};
use crate::types::{ResourceConfig, ResourceEntry};
use serde_json::{Map, Value};

const ENTRIES_KEY: &str = "entries";
const TYPE_KEY: &str = "type";
const NAME_KEY: &str = "resource_name";

/// Parse a resource config payload.
pub fn parse(raw: &str) -> Result<ResourceConfig> {
    if raw.trim().is_empty() {
        return Err(Error::parsing("resource config is empty"));
    }

    let value: Value =
        serde_json::from_str(raw).map_err(|e| Error::parsing(format!("malformed JSON: {e}")))?;

    let Value::Object(mut root) = value else {
        return Err(Error::parsing("top-level value must be a JSON object"));
    };

    let entries = match root.remove(ENTRIES_KEY) {
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(Error::parsing("\"entries\" must be an array")),
        None => return Err(Error::parsing("missing \"entries\" key")),
    };

    if entries.is_empty() {
        return Err(Error::parsing("\"entries\" must contain at least one entry"));
    }

    let entries = entries
        .into_iter()
        .enumerate()
        .map(|(idx, value)| parse_entry(idx, value))
        .collect::<Result<Vec<_>>>()?;

    ResourceConfig::new(entries)
}

fn parse_entry(idx: usize, value: Value) -> Result<ResourceEntry> {
    let Value::Object(mut attributes) = value else {
        return Err(Error::parsing(format!("entry {} is not a JSON object", idx + 1)));
    };

    let resource_type = required_field(&mut attributes, TYPE_KEY, idx)?;
    let resource_name = required_field(&mut attributes, NAME_KEY, idx)?;

    Ok(ResourceEntry {
        resource_type,
        resource_name,
        attributes,
    })
}

/// Remove a required string field from an entry, trimmed.
///
/// Both fields end up in comma-joined, line-oriented outputs, so commas and
/// control characters are rejected.
fn required_field(attributes: &mut Map<String, Value>, key: &str, idx: usize) -> Result<String> {
    match attributes.remove(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => {
            let value = s.trim();
            if let Some(bad) = value.chars().find(|c| c.is_control() || *c == ',') {
                return Err(Error::validation(format!(
                    "entry {}: '{key}' contains forbidden character {bad:?}",
                    idx + 1
                )));
            }
            Ok(value.to_string())
        }
        Some(Value::String(_)) => Err(Error::validation(format!(
            "entry {}: '{key}' must not be empty",
            idx + 1
        ))),
        Some(_) => Err(Error::validation(format!(
            "entry {}: '{key}' must be a string",
            idx + 1
        ))),
        None => Err(Error::validation(format!(
            "entry {}: missing required field '{key}'",
            idx + 1
        ))),
    }
}
