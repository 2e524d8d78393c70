//! Infrastructure configuration - things that cannot change at runtime.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filesystem paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// JSON inventory of rooms, their evaluator configuration and devices.
    /// Default: ~/.config/conductor/inventory.json
    #[serde(default = "PathsConfig::default_inventory")]
    pub inventory: PathBuf,
}

impl PathsConfig {
    fn default_inventory() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("conductor/inventory.json"))
            .unwrap_or_else(|| PathBuf::from("inventory.json"))
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            inventory: Self::default_inventory(),
        }
    }
}

/// Telemetry and observability configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// OTLP gRPC endpoint for OpenTelemetry. Empty disables export.
    /// Default: "" (disabled)
    #[serde(default)]
    pub otlp_endpoint: String,

    /// Log level (trace, debug, info, warn, error) or a full EnvFilter directive.
    /// Default: info,conductor=debug
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info,conductor=debug".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: String::new(),
            log_level: Self::default_log_level(),
        }
    }
}

/// Outbound device-protocol settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevicesConfig {
    /// Per-request timeout for a device command.
    /// Default: 5000
    #[serde(default = "DevicesConfig::default_timeout_ms")]
    pub timeout_ms: u64,

    /// Bearer token attached to device requests. Unset means no auth header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

impl DevicesConfig {
    fn default_timeout_ms() -> u64 {
        5000
    }
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            timeout_ms: Self::default_timeout_ms(),
            bearer_token: None,
        }
    }
}

/// Where state-change and error events go.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Event router URL. Empty means events are only logged.
    #[serde(default)]
    pub router_url: String,
}

/// All infrastructure configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfraConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub devices: DevicesConfig,

    #[serde(default)]
    pub events: EventsConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let infra = InfraConfig::default();
        assert_eq!(infra.devices.timeout_ms, 5000);
        assert!(infra.devices.bearer_token.is_none());
        assert!(infra.telemetry.otlp_endpoint.is_empty());
        assert_eq!(infra.telemetry.log_level, "info,conductor=debug");
        assert!(infra.paths.inventory.ends_with("inventory.json"));
    }
}
