//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Default `opa` executable, resolved through `PATH`.
pub const DEFAULT_BINARY: &str = "opa";

/// Default per-process timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a whole number of seconds, got `{value}`")]
    InvalidTimeout { var: &'static str, value: String },
}

/// How the `opa` binary is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaConfig {
    /// Executable path or name.
    pub binary: String,

    /// Timeout for each `opa` invocation; 0 disables it.
    pub timeout_secs: u64,

    /// Pass `--v0-compatible` so pre-1.0 Rego syntax is accepted.
    pub v0_compatible: bool,
}

impl Default for OpaConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            v0_compatible: false,
        }
    }
}

impl OpaConfig {
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_v0_compatible(mut self, v0_compatible: bool) -> Self {
        self.v0_compatible = v0_compatible;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - OPA_BINARY (optional, default: "opa")
    /// - OPASCAN_TIMEOUT_SECS (optional, default: 60)
    /// - OPASCAN_V0_COMPATIBLE (optional, default: "false")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let binary = lookup("OPA_BINARY")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BINARY.to_string());

        let timeout_secs = match lookup("OPASCAN_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout {
                    var: "OPASCAN_TIMEOUT_SECS",
                    value,
                })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let v0_compatible = lookup("OPASCAN_V0_COMPATIBLE")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        Ok(Self {
            binary,
            timeout_secs,
            v0_compatible,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = OpaConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, OpaConfig::default());
    }

    #[test]
    fn reads_all_variables() {
        let config = OpaConfig::from_lookup(lookup(&[
            ("OPA_BINARY", "/usr/local/bin/opa"),
            ("OPASCAN_TIMEOUT_SECS", " 15 "),
            ("OPASCAN_V0_COMPATIBLE", "TRUE"),
        ]))
        .unwrap();

        assert_eq!(config.binary, "/usr/local/bin/opa");
        assert_eq!(config.timeout_secs, 15);
        assert!(config.v0_compatible);
    }

    #[test]
    fn rejects_bad_timeout() {
        let err = OpaConfig::from_lookup(lookup(&[("OPASCAN_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidTimeout {
                var: "OPASCAN_TIMEOUT_SECS",
                value: "soon".to_string()
            }
        );
    }
}
