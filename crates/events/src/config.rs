//! Handler configuration.
//!
//! Handlers are declared in the agent's pipeline configuration: a base section
//! shared by all handlers, then per-handler keys that override it. Values come
//! from conf files, so they are often strings even when they mean a number or
//! a flag; the typed accessors accept both forms.

use serde_json::{Map, Value};
use thiserror::Error;

/// Raw, untyped configuration section.
pub type ConfigMap = Map<String, Value>;

pub type ConfigResult<T> = Result<T, ConfigError>;

const DEFAULT_NAME: &str = "handler";

/// Accepted values of `log_level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config key '{key}' must not be empty")]
    Empty { key: String },

    #[error("config key '{key}': expected {expected}, found {found}")]
    InvalidValue {
        key: String,
        expected: &'static str,
        found: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, expected: &'static str, found: &Value) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            expected,
            found: found.to_string(),
        }
    }
}

/// Validated configuration of one handler.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerConfig {
    name: String,
    log_level: Option<String>,
    settings: ConfigMap,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            log_level: None,
            settings: ConfigMap::new(),
        }
    }
}

impl HandlerConfig {
    /// Merge `overrides` on top of `base` and validate the result.
    ///
    /// Keys present in both take the override's value.
    pub fn merge(base: &ConfigMap, overrides: &ConfigMap) -> ConfigResult<Self> {
        let mut merged = base.clone();
        merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self::from_map(merged)
    }

    pub fn from_map(settings: ConfigMap) -> ConfigResult<Self> {
        let name = match settings.get("name") {
            None => DEFAULT_NAME.to_string(),
            Some(Value::String(s)) if s.is_empty() => {
                return Err(ConfigError::Empty {
                    key: "name".to_string(),
                });
            }
            Some(Value::String(s)) => s.clone(),
            Some(other) => return Err(ConfigError::invalid("name", "a string", other)),
        };

        let log_level = match settings.get("log_level") {
            None => None,
            Some(Value::String(s)) => {
                let level = s.to_ascii_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(ConfigError::invalid(
                        "log_level",
                        "one of trace/debug/info/warn/error",
                        &Value::String(s.clone()),
                    ));
                }
                Some(level)
            }
            Some(other) => {
                return Err(ConfigError::invalid(
                    "log_level",
                    "one of trace/debug/info/warn/error",
                    other,
                ));
            }
        };

        Ok(Self {
            name,
            log_level,
            settings,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.settings
            .insert("name".to_string(), Value::String(name.clone()));
        self.name = name;
        self
    }

    /// Name used to tag this handler's log records.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Verbosity requested for this handler, lowercased.
    pub fn log_level(&self) -> Option<&str> {
        self.log_level.as_deref()
    }

    pub fn settings(&self) -> &ConfigMap {
        &self.settings
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    pub fn get_str(&self, key: &str) -> ConfigResult<Option<&str>> {
        match self.settings.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(ConfigError::invalid(key, "a string", other)),
        }
    }

    /// Flags accept booleans and the usual conf-file spellings
    /// (`true/false`, `yes/no`, `on/off`, `1/0`).
    pub fn get_bool(&self, key: &str) -> ConfigResult<Option<bool>> {
        let Some(value) = self.settings.get(key) else {
            return Ok(None);
        };
        match value {
            Value::Bool(b) => Ok(Some(*b)),
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Some(true)),
                "false" | "no" | "off" | "0" => Ok(Some(false)),
                _ => Err(ConfigError::invalid(key, "a boolean", value)),
            },
            Value::Number(n) => match n.as_u64() {
                Some(0) => Ok(Some(false)),
                Some(1) => Ok(Some(true)),
                _ => Err(ConfigError::invalid(key, "a boolean", value)),
            },
            _ => Err(ConfigError::invalid(key, "a boolean", value)),
        }
    }

    pub fn get_u64(&self, key: &str) -> ConfigResult<Option<u64>> {
        let Some(value) = self.settings.get(key) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(key, "an unsigned integer", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> ConfigMap {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn overrides_win_over_base() {
        let base = map(json!({"name": "base", "retry_delay": "30", "keep": true}));
        let overrides = map(json!({"retry_delay": 5, "queue": "oio"}));

        let conf = HandlerConfig::merge(&base, &overrides).unwrap();
        assert_eq!(conf.name(), "base");
        assert_eq!(conf.get_u64("retry_delay").unwrap(), Some(5));
        assert_eq!(conf.get_str("queue").unwrap(), Some("oio"));
        assert_eq!(conf.get_bool("keep").unwrap(), Some(true));
    }

    #[test]
    fn merge_does_not_touch_inputs() {
        let base = map(json!({"a": 1}));
        let overrides = map(json!({"a": 2}));
        let _ = HandlerConfig::merge(&base, &overrides).unwrap();
        assert_eq!(base.get("a"), Some(&json!(1)));
    }

    #[test]
    fn name_defaults_and_is_validated() {
        let conf = HandlerConfig::merge(&ConfigMap::new(), &ConfigMap::new()).unwrap();
        assert_eq!(conf, HandlerConfig::default());

        let err = HandlerConfig::from_map(map(json!({"name": ""}))).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Empty {
                key: "name".to_string()
            }
        );
        assert!(HandlerConfig::from_map(map(json!({"name": 3}))).is_err());
    }

    #[test]
    fn string_values_are_coerced() {
        let conf = HandlerConfig::from_map(map(json!({
            "enabled": "Yes",
            "disabled": "off",
            "timeout": " 12 ",
            "bad_flag": "maybe",
            "bad_number": "-1"
        })))
        .unwrap();

        assert_eq!(conf.get_bool("enabled").unwrap(), Some(true));
        assert_eq!(conf.get_bool("disabled").unwrap(), Some(false));
        assert_eq!(conf.get_u64("timeout").unwrap(), Some(12));
        assert_eq!(conf.get_u64("missing").unwrap(), None);
        assert!(conf.get_bool("bad_flag").is_err());
        assert!(conf.get_u64("bad_number").is_err());
        assert!(conf.get_str("timeout").is_ok());
        assert!(conf.get_str("nope").unwrap().is_none());
    }

    #[test]
    fn log_level_must_be_a_known_level() {
        let err = HandlerConfig::from_map(map(json!({"log_level": "loud"}))).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "log_level".to_string(),
                expected: "one of trace/debug/info/warn/error",
                found: "\"loud\"".to_string(),
            }
        );
        assert!(HandlerConfig::from_map(map(json!({"log_level": 5}))).is_err());

        let conf = HandlerConfig::from_map(map(json!({"log_level": "DEBUG"}))).unwrap();
        assert_eq!(conf.log_level(), Some("debug"));
        assert_eq!(HandlerConfig::default().log_level(), None);
    }

    #[test]
    fn invalid_log_level_in_overrides_fails_merge() {
        let base = map(json!({"log_level": "info"}));
        let overrides = map(json!({"log_level": "verbose"}));
        assert!(HandlerConfig::merge(&base, &overrides).is_err());
    }

    #[test]
    fn with_name_updates_settings() {
        let conf = HandlerConfig::default().with_name("indexer");
        assert_eq!(conf.name(), "indexer");
        assert_eq!(conf.get_str("name").unwrap(), Some("indexer"));
    }
}
