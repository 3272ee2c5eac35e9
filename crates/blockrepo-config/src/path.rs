//! Dotted key paths into a configuration document.
//!
//! `"Addresses.API"` names the `API` field of the `Addresses` object. Segments
//! must be non-empty.

use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};

fn segments(key: &str) -> ConfigResult<Vec<&str>> {
    if key.is_empty() {
        return Err(ConfigError::InvalidKey {
            key: key.to_string(),
            reason: "empty key".into(),
        });
    }
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidKey {
            key: key.to_string(),
            reason: "empty path segment".into(),
        });
    }
    Ok(parts)
}

/// Look up the value at `key`.
pub fn lookup<'a>(doc: &'a Map<String, Value>, key: &str) -> ConfigResult<Option<&'a Value>> {
    let parts = segments(key)?;
    let (last, parents) = parts.split_last().expect("segments is never empty");
    let mut current = doc;
    for part in parents {
        match current.get(*part) {
            Some(Value::Object(next)) => current = next,
            _ => return Ok(None),
        }
    }
    Ok(current.get(*last))
}

/// Store `value` at `key`, creating intermediate objects as needed.
pub fn assign(doc: &mut Map<String, Value>, key: &str, value: Value) -> ConfigResult<()> {
    let parts = segments(key)?;
    let (last, parents) = parts.split_last().expect("segments is never empty");
    let mut current = doc;
    for (depth, part) in parents.iter().enumerate() {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(next) => next,
            _ => {
                return Err(ConfigError::InvalidKey {
                    key: key.to_string(),
                    reason: format!("{} is not an object", parts[..=depth].join(".")),
                })
            }
        };
    }
    current.insert(last.to_string(), value);
    Ok(())
}
