//! Config file discovery, loading, and environment variable overlay.

use crate::{BootstrapConfig, ConfigError, InfraConfig, RoomConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/conductor/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("conductor/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("conductor.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<RoomConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml(&contents, path)
}

/// Parse config from a TOML string. Missing sections take their defaults.
pub(crate) fn parse_toml(contents: &str, path: &Path) -> Result<RoomConfig, ConfigError> {
    let mut config: RoomConfig =
        toml::from_str(contents).map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if let Some(raw) = config.infra.paths.inventory.to_str() {
        config.infra.paths.inventory = expand_path(raw);
    }

    Ok(config)
}

fn pick<T: PartialEq>(base: T, overlay: T, default: T) -> T {
    if overlay != default {
        overlay
    } else {
        base
    }
}

/// Merge two configs, with `overlay` taking precedence wherever it differs
/// from the compiled default.
pub fn merge_configs(base: RoomConfig, overlay: RoomConfig) -> RoomConfig {
    let defaults = InfraConfig::default();

    let mut priorities = base.bootstrap.priorities;
    priorities.extend(overlay.bootstrap.priorities);

    RoomConfig {
        infra: InfraConfig {
            paths: crate::infra::PathsConfig {
                inventory: pick(
                    base.infra.paths.inventory,
                    overlay.infra.paths.inventory,
                    defaults.paths.inventory,
                ),
            },
            telemetry: crate::infra::TelemetryConfig {
                otlp_endpoint: pick(
                    base.infra.telemetry.otlp_endpoint,
                    overlay.infra.telemetry.otlp_endpoint,
                    defaults.telemetry.otlp_endpoint,
                ),
                log_level: pick(
                    base.infra.telemetry.log_level,
                    overlay.infra.telemetry.log_level,
                    defaults.telemetry.log_level,
                ),
            },
            devices: crate::infra::DevicesConfig {
                timeout_ms: pick(
                    base.infra.devices.timeout_ms,
                    overlay.infra.devices.timeout_ms,
                    defaults.devices.timeout_ms,
                ),
                bearer_token: overlay
                    .infra
                    .devices
                    .bearer_token
                    .or(base.infra.devices.bearer_token),
            },
            events: crate::infra::EventsConfig {
                router_url: pick(
                    base.infra.events.router_url,
                    overlay.infra.events.router_url,
                    defaults.events.router_url,
                ),
            },
        },
        bootstrap: BootstrapConfig { priorities },
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut RoomConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, env::vars());
}

/// Apply overrides from an explicit set of `(name, value)` pairs.
pub fn apply_overrides_from<I>(config: &mut RoomConfig, sources: &mut ConfigSources, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut otel_endpoint = None;
    let mut rust_log = None;

    for (key, value) in vars {
        match key.as_str() {
            "CONDUCTOR_INVENTORY" => config.infra.paths.inventory = expand_path(&value),
            "CONDUCTOR_OTLP_ENDPOINT" => config.infra.telemetry.otlp_endpoint = value,
            "CONDUCTOR_LOG_LEVEL" => config.infra.telemetry.log_level = value,
            "CONDUCTOR_DEVICE_TIMEOUT_MS" => match value.parse() {
                Ok(ms) => config.infra.devices.timeout_ms = ms,
                Err(_) => continue,
            },
            "CONDUCTOR_BEARER_TOKEN" => config.infra.devices.bearer_token = Some(value),
            "CONDUCTOR_EVENT_ROUTER" => config.infra.events.router_url = value,
            // Standard variables lose to our own prefix; settle them after the loop.
            "OTEL_EXPORTER_OTLP_ENDPOINT" => {
                otel_endpoint = Some(value);
                continue;
            }
            "RUST_LOG" => {
                rust_log = Some(value);
                continue;
            }
            _ => {
                // Evaluator priorities (CONDUCTOR_PRIORITY_<KEY>)
                let Some(evaluator) = key.strip_prefix("CONDUCTOR_PRIORITY_") else {
                    continue;
                };
                let Ok(priority) = value.parse() else {
                    continue;
                };
                config
                    .bootstrap
                    .priorities
                    .insert(evaluator.to_string(), priority);
            }
        }
        sources.env_overrides.push(key);
    }

    if let Some(value) = otel_endpoint {
        if !sources.env_overrides.iter().any(|k| k == "CONDUCTOR_OTLP_ENDPOINT") {
            config.infra.telemetry.otlp_endpoint = value;
            sources
                .env_overrides
                .push("OTEL_EXPORTER_OTLP_ENDPOINT".to_string());
        }
    }
    if let Some(value) = rust_log {
        if !sources.env_overrides.iter().any(|k| k == "CONDUCTOR_LOG_LEVEL") {
            config.infra.telemetry.log_level = value;
            sources.env_overrides.push("RUST_LOG".to_string());
        }
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}
