//! Runtime configuration.
//!
//! Configuration is per component definition: a [`RuntimeConfig`] handed to
//! [`Definition::with_config`](crate::component::Definition::with_config)
//! governs the hook checks of its instances and the notification depth of
//! the signals they create.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default limit on nested notification passes for one signal.
pub const DEFAULT_MAX_NOTIFY_DEPTH: usize = 32;

const ENV_MAX_NOTIFY_DEPTH: &str = "FILAMENT_MAX_NOTIFY_DEPTH";
const ENV_STRICT_HOOKS: &str = "FILAMENT_STRICT_HOOKS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How many notification passes of the same signal may be active at
    /// once before further writes are rejected.
    pub max_notify_depth: usize,

    /// Panic on hook-slot misuse instead of warning and re-initializing
    /// the slot.
    pub strict_hooks: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_notify_depth: DEFAULT_MAX_NOTIFY_DEPTH,
            strict_hooks: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read overrides from `FILAMENT_MAX_NOTIFY_DEPTH` and
    /// `FILAMENT_STRICT_HOOKS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_MAX_NOTIFY_DEPTH) {
            config.max_notify_depth = match value.trim().parse::<usize>() {
                Ok(depth) if depth > 0 => depth,
                _ => {
                    return Err(ConfigError::Env {
                        key: ENV_MAX_NOTIFY_DEPTH,
                        value,
                    })
                }
            };
        }

        if let Some(value) = lookup(ENV_STRICT_HOOKS) {
            config.strict_hooks = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::Env {
                        key: ENV_STRICT_HOOKS,
                        value,
                    })
                }
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = RuntimeConfig::from_json(r#"{ "strict_hooks": false }"#).unwrap();
        assert!(!config.strict_hooks);
        assert_eq!(config.max_notify_depth, DEFAULT_MAX_NOTIFY_DEPTH);
    }

    #[test]
    fn json_rejects_garbage() {
        assert!(matches!(
            RuntimeConfig::from_json("{ max_notify_depth: }"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("FILAMENT_MAX_NOTIFY_DEPTH", "4"),
            ("FILAMENT_STRICT_HOOKS", "off"),
        ]
        .into_iter()
        .collect();

        let config = RuntimeConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.max_notify_depth, 4);
        assert!(!config.strict_hooks);
    }

    #[test]
    fn lookup_rejects_zero_depth() {
        let err = RuntimeConfig::from_lookup(|key| {
            (key == "FILAMENT_MAX_NOTIFY_DEPTH").then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "FILAMENT_MAX_NOTIFY_DEPTH", .. }));
    }

    #[test]
    fn empty_lookup_is_default() {
        let config = RuntimeConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }
}
