//! Configuration loading and environment parsing.

use super::validation::validate_config;
use super::Config;
use serde_json::{Map, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_JSON_VAR: &str = "ROOM_RELAY_CONFIG_JSON";
const CONFIG_PATH_VAR: &str = "ROOM_RELAY_CONFIG_PATH";
const OVERRIDE_PREFIX: &str = "ROOM_RELAY__";

/// Load configuration with the following precedence (highest first):
/// 1) `ROOM_RELAY_CONFIG_JSON` env var containing raw JSON
/// 2) File pointed to by `ROOM_RELAY_CONFIG_PATH`
/// 3) `config.json` in the current working directory
/// 4) Defaults compiled into the binary
///
/// Individual fields can then be overridden with `ROOM_RELAY__` variables using `__` as the
/// nested separator, e.g. `ROOM_RELAY__PORT=8080` or `ROOM_RELAY__SERVER__OWNER_DEPARTURE=teardown`.
/// Read and parse failures are printed to stderr and the remaining sources still apply.
///
/// Validation failures are reported but not returned; `main` runs
/// [`validate_config`] again and aborts on error.
#[must_use]
pub fn load() -> Config {
    let defaults = Config::default();
    let mut merged =
        serde_json::to_value(&defaults).unwrap_or_else(|_| Value::Object(Map::new()));

    // Lowest precedence first so later sources overwrite earlier ones.
    merge_file_source(&mut merged, Path::new("config.json"));

    if let Ok(path) = env::var(CONFIG_PATH_VAR) {
        merge_file_source(&mut merged, &PathBuf::from(path));
    }

    if let Ok(json) = env::var(CONFIG_JSON_VAR) {
        if let Some(value) = parse_json_document(&json, CONFIG_JSON_VAR) {
            merge_values(&mut merged, value);
        }
    }

    apply_env_overrides(&mut merged, env::vars());

    let config = match serde_json::from_value::<Config>(merged) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to deserialize config; using defaults: {e}");
            defaults
        }
    };

    if let Err(e) = validate_config(&config) {
        eprintln!("Configuration validation error: {e}");
    }

    config
}

fn parse_json_document(raw: &str, label: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }

    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            eprintln!("Failed to parse config from {label}: {err}");
            None
        }
    }
}

fn merge_file_source(target: &mut Value, path: &Path) {
    if path.as_os_str().is_empty() || !path.exists() {
        return;
    }

    match fs::read_to_string(path) {
        Ok(contents) => {
            let label = format!("file {}", path.display());
            if let Some(value) = parse_json_document(&contents, &label) {
                merge_values(target, value);
            }
        }
        Err(err) => eprintln!("Failed to read config from {}: {err}", path.display()),
    }
}

/// Deep-merge `source` into `target`; objects merge key by key, anything else replaces.
fn merge_values(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn apply_env_overrides(root: &mut Value, vars: impl Iterator<Item = (String, String)>) {
    for (key, raw_value) in vars {
        let Some(stripped) = key.strip_prefix(OVERRIDE_PREFIX) else {
            continue;
        };

        let segments: Vec<String> = stripped
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();

        if segments.is_empty() {
            continue;
        }

        set_nested_value(root, &segments, parse_env_value(&raw_value));
    }
}

fn parse_env_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::String(String::new());
    }
    // Numbers, booleans and JSON literals parse as such; anything else stays a string.
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

fn set_nested_value(target: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(map) = target else {
        return;
    };

    if rest.is_empty() {
        map.insert(head.clone(), value);
    } else {
        let entry = map
            .entry(head.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        set_nested_value(entry, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overwrites_leaves_and_keeps_siblings() {
        let mut target = json!({ "port": 3000, "server": { "history_capacity": 50, "room_id_length": 7 } });
        merge_values(&mut target, json!({ "server": { "history_capacity": 10 } }));
        assert_eq!(
            target,
            json!({ "port": 3000, "server": { "history_capacity": 10, "room_id_length": 7 } })
        );
    }

    #[test]
    fn env_overrides_set_nested_fields() {
        let mut root = serde_json::to_value(Config::default()).unwrap();
        let vars = vec![
            ("ROOM_RELAY__PORT".to_string(), "8080".to_string()),
            (
                "ROOM_RELAY__SERVER__OWNER_DEPARTURE".to_string(),
                "teardown".to_string(),
            ),
            ("ROOM_RELAY__LOGGING__ENABLE_FILE_LOGGING".to_string(), "true".to_string()),
            ("UNRELATED".to_string(), "1".to_string()),
        ];
        apply_env_overrides(&mut root, vars.into_iter());

        let config: Config = serde_json::from_value(root).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.server.owner_departure,
            crate::protocol::OwnerDeparturePolicy::Teardown
        );
        assert!(config.logging.enable_file_logging);
    }

    #[test]
    fn env_values_parse_json_literals() {
        assert_eq!(parse_env_value("42"), json!(42));
        assert_eq!(parse_env_value("false"), json!(false));
        assert_eq!(parse_env_value("http://a,http://b"), json!("http://a,http://b"));
        assert_eq!(parse_env_value(""), json!(""));
    }
}
