//! Minimal configuration loading for conductor.
//!
//! # Configuration Philosophy
//!
//! Configuration is split into two categories:
//!
//! - **Infrastructure** (`InfraConfig`): Things that cannot change at
//!   runtime - inventory path, telemetry endpoint, device timeouts, event
//!   router.
//!
//! - **Bootstrap** (`BootstrapConfig`): Initial values that seed runtime
//!   state. Evaluator priorities land in the registry at startup; after that
//!   the registry and per-room configuration are the source of truth.
//!
//! # Usage
//!
//! ```rust,no_run
//! use roomconf::RoomConfig;
//!
//! let config = RoomConfig::load().expect("Failed to load config");
//!
//! println!("Inventory: {}", config.infra.paths.inventory.display());
//! println!("Device timeout: {}ms", config.infra.devices.timeout_ms);
//!
//! for (key, priority) in &config.bootstrap.priorities {
//!     println!("{} runs at priority {}", key, priority);
//! }
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/conductor/config.toml` (system)
//! 2. `~/.config/conductor/config.toml` (user)
//! 3. `./conductor.toml` (local override, or a path given on the CLI)
//! 4. Environment variables (`CONDUCTOR_*`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! inventory = "~/.config/conductor/inventory.json"
//!
//! [telemetry]
//! otlp_endpoint = "127.0.0.1:4317"
//! log_level = "info,conductor=debug"
//!
//! [devices]
//! timeout_ms = 5000
//!
//! [events]
//! router_url = "http://localhost:7000/event"
//!
//! [bootstrap.priorities]
//! PowerOnDefault = 1
//! StandbyDefault = 10
//! ```

pub mod bootstrap;
pub mod infra;
pub mod loader;

pub use bootstrap::{BootstrapConfig, PrioritiesConfig};
pub use infra::{DevicesConfig, EventsConfig, InfraConfig, PathsConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete conductor configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Infrastructure - cannot change at runtime.
    #[serde(flatten)]
    pub infra: InfraConfig,

    /// Bootstrap - seeds runtime state.
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl RoomConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/conductor/config.toml`
    /// 3. `~/.config/conductor/config.toml`
    /// 4. `./conductor.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides.
    ///
    /// If `config_path` is provided, it takes precedence over the local
    /// `./conductor.toml` override. System and user configs still load first.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = RoomConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            let file_config = loader::load_from_file(&path)?;
            config = loader::merge_configs(config, file_config);
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    pub fn device_timeout(&self) -> Duration {
        Duration::from_millis(self.infra.devices.timeout_ms)
    }

    /// Serialize config to TOML string.
    ///
    /// The bearer token is never written out.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# conductor configuration\n\n");

        output.push_str("[paths]\n");
        output.push_str(&format!(
            "inventory = \"{}\"\n",
            self.infra.paths.inventory.display()
        ));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "otlp_endpoint = \"{}\"\n",
            self.infra.telemetry.otlp_endpoint
        ));
        output.push_str(&format!(
            "log_level = \"{}\"\n",
            self.infra.telemetry.log_level
        ));

        output.push_str("\n[devices]\n");
        output.push_str(&format!("timeout_ms = {}\n", self.infra.devices.timeout_ms));
        if self.infra.devices.bearer_token.is_some() {
            output.push_str("# bearer_token is set\n");
        }

        output.push_str("\n[events]\n");
        output.push_str(&format!(
            "router_url = \"{}\"\n",
            self.infra.events.router_url
        ));

        output.push_str("\n[bootstrap.priorities]\n");
        for (key, priority) in &self.bootstrap.priorities {
            output.push_str(&format!("{} = {}\n", key, priority));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RoomConfig::default();
        assert_eq!(config.infra.devices.timeout_ms, 5000);
        assert_eq!(config.device_timeout(), Duration::from_secs(5));
        assert!(config.bootstrap.priorities.is_empty());
    }

    #[test]
    fn test_to_toml() {
        let mut config = RoomConfig::default();
        config.infra.devices.bearer_token = Some("hunter2".to_string());
        config
            .bootstrap
            .priorities
            .insert("PowerOnDefault".to_string(), 1);

        let toml = config.to_toml();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[devices]"));
        assert!(toml.contains("PowerOnDefault = 1"));
        assert!(!toml.contains("hunter2"));
    }

    #[test]
    fn test_to_toml_parses_back() {
        let mut config = RoomConfig::default();
        config.infra.events.router_url = "http://router".to_string();
        config
            .bootstrap
            .priorities
            .insert("MuteDefault".to_string(), 4);

        let parsed: RoomConfig = toml::from_str(&config.to_toml()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[devices]\ntimeout_ms = 1500").unwrap();

        let (config, sources) = RoomConfig::load_with_sources_from(Some(file.path())).unwrap();
        assert!(sources.files.iter().any(|p| p == file.path()));
        // An env override may legitimately win here; only check the file was read.
        if !sources
            .env_overrides
            .iter()
            .any(|k| k == "CONDUCTOR_DEVICE_TIMEOUT_MS")
        {
            assert_eq!(config.infra.devices.timeout_ms, 1500);
        }
    }
}
