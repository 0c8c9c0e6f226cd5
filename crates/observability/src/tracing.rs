//! Tracing/logging initialization.
//!
//! The filter comes from `RUST_LOG` when set, otherwise from the configured
//! `log_level`. Agents log JSON by default so that job ids and error chains
//! stay machine-readable.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

impl ObservabilityConfig {
    /// Read `log_level` / `log_format` from a configuration section, ignoring
    /// every other key.
    pub fn from_settings(settings: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut relevant = Map::new();
        for key in ["log_level", "log_format"] {
            if let Some(v) = settings.get(key) {
                relevant.insert(key.to_string(), v.clone());
            }
        }
        serde_json::from_value(Value::Object(relevant))
    }

    fn configured_filter(&self) -> Result<EnvFilter, ParseError> {
        EnvFilter::try_new(&self.log_level)
    }

    /// Falls back to `info` when `log_level` does not parse; the parse error
    /// is handed back so it can be logged once a subscriber is installed.
    fn filter(&self) -> (EnvFilter, Option<ParseError>) {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return (filter, None);
        }
        match self.configured_filter() {
            Ok(filter) => (filter, None),
            Err(err) => (EnvFilter::new("info"), Some(err)),
        }
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(config: &ObservabilityConfig) {
    let (filter, invalid) = config.filter();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let installed = match config.log_format {
        LogFormat::Json => builder.json().with_target(false).try_init(),
        LogFormat::Text => builder.with_target(true).try_init(),
    };

    if let (Ok(()), Some(err)) = (installed, invalid) {
        ::tracing::warn!(
            log_level = %config.log_level,
            error = %err,
            "invalid log_level, falling back to info"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_known_keys_only() {
        let settings = match json!({"log_level": "debug", "log_format": "text", "queue": "oio"}) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        let config = ObservabilityConfig::from_settings(&settings).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = ObservabilityConfig::from_settings(&Map::new()).unwrap();
        assert_eq!(config, ObservabilityConfig::default());
    }

    #[test]
    fn unknown_format_is_rejected() {
        let settings = match json!({"log_format": "xml"}) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        assert!(ObservabilityConfig::from_settings(&settings).is_err());
    }

    #[test]
    fn log_level_directives_are_checked() {
        let bad = ObservabilityConfig {
            log_level: "sds_events=loud".to_string(),
            ..ObservabilityConfig::default()
        };
        assert!(bad.configured_filter().is_err());

        let good = ObservabilityConfig {
            log_level: "info,sds_events=debug".to_string(),
            ..ObservabilityConfig::default()
        };
        assert!(good.configured_filter().is_ok());
    }

    #[test]
    fn init_with_invalid_level_does_not_panic() {
        init(&ObservabilityConfig {
            log_level: "sds_events=loud".to_string(),
            log_format: LogFormat::Text,
        });
    }

    #[test]
    fn init_twice_is_harmless() {
        init(&ObservabilityConfig::default());
        init(&ObservabilityConfig {
            log_level: "warn".to_string(),
            log_format: LogFormat::Text,
        });
    }
}
