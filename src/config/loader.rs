use std::path::Path;

use serde_json::Value;

use crate::config::DeadlineConfig;
use crate::error::ConfigError;

const BUILTIN_V1: &str = include_str!("../../assets/config/deadlineqc_v1.json");

pub fn load_builtin() -> Result<DeadlineConfig, ConfigError> {
    let value = parse_value(BUILTIN_V1, "built-in v1")?;
    finish(value, "built-in v1")
}

/// Built-in defaults overlaid with the user's file, if any.
pub fn load(user: Option<&Path>) -> Result<DeadlineConfig, ConfigError> {
    let mut base = parse_value(BUILTIN_V1, "built-in v1")?;
    let Some(path) = user else {
        return finish(base, "built-in v1");
    };

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let source_name = path.display().to_string();
    let overlay = parse_value(&content, &source_name)?;
    if !overlay.is_object() {
        return Err(ConfigError::Parse {
            source_name,
            reason: "top-level value must be an object".to_string(),
        });
    }
    merge_values(&mut base, overlay);
    finish(base, &source_name)
}

/// Recursive object merge; non-object values in `overlay` replace `base`.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn parse_value(content: &str, source_name: &str) -> Result<Value, ConfigError> {
    serde_json::from_str(content).map_err(|e| ConfigError::Parse {
        source_name: source_name.to_string(),
        reason: e.to_string(),
    })
}

fn finish(value: Value, source_name: &str) -> Result<DeadlineConfig, ConfigError> {
    let config: DeadlineConfig =
        serde_json::from_value(value).map_err(|e| ConfigError::Parse {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })?;
    config.validate()?;
    Ok(config)
}
