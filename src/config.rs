//! Runtime configuration loading from environment variables.
//!
//! All configuration values are loaded from `MIRRORMEM_*` environment
//! variables with sensible defaults. Invalid values fall back to defaults
//! without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `MIRRORMEM_DISABLE` | unset | Disable management entirely (every call passes through) |
//! | `MIRRORMEM_DEVICE` | unset | Enable the device path at startup |
//! | `MIRRORMEM_TARGET` | host | Initial execution target (`host` or `device`) |
//! | `MIRRORMEM_ALT_BACKEND` | unset | Mark an alternate interop backend active |
//! | `MIRRORMEM_DEBUG` | unset | Print the colorized mode line on snapshot changes |
//! | `MIRRORMEM_MOCK_CAPACITY` | 268435456 | Mock device backend capacity (bytes) |
//! | `MIRRORMEM_LOG` | info | Log level filter |
//! | `MIRRORMEM_LOG_FORMAT` | json | Log output format (`json` or `pretty`) |
//! | `MIRRORMEM_LOG_FILE` | unset | Log file path (stderr when unset) |

use serde::Serialize;

use crate::device::MockBackendConfig;
use crate::manager::{ManagerConfig, Target};
use crate::telemetry::{LogConfig, LogFormat};

/// Effective runtime configuration summary (serializable).
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub managed: bool,
    pub device_enabled: bool,
    pub target: Target,
    pub alternate_backend: bool,
    pub trace_modes: bool,
    pub mock_capacity: usize,
    pub log_level: String,
    pub log_format: String,
}

/// All runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub manager: ManagerConfig,
    pub mock: MockBackendConfig,
    pub log: LogConfig,
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Boolean env flag: set to anything but `0`, `false`, or empty means on.
pub(crate) fn env_flag(key: &str) -> bool {
    match std::env::var(key) {
        Ok(val) => !matches!(val.as_str(), "" | "0" | "false"),
        Err(_) => false,
    }
}

/// Parse the execution target, returning `default` on missing or invalid.
fn parse_target(key: &str, default: Target) -> Target {
    match std::env::var(key) {
        Ok(val) => match val.to_ascii_lowercase().as_str() {
            "host" => Target::Host,
            "device" => Target::Device,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Load manager configuration from environment.
fn load_manager_config() -> ManagerConfig {
    ManagerConfig {
        managed: !env_flag("MIRRORMEM_DISABLE"),
        enable_device: env_flag("MIRRORMEM_DEVICE"),
        target: parse_target("MIRRORMEM_TARGET", Target::Host),
        alternate_backend: env_flag("MIRRORMEM_ALT_BACKEND"),
        trace_modes: env_flag("MIRRORMEM_DEBUG"),
    }
}

/// Load mock backend configuration from environment.
fn load_mock_config() -> MockBackendConfig {
    const DEFAULT_CAPACITY: usize = 256 * 1024 * 1024; // 256 MiB
    const MIN_CAPACITY: usize = 1024 * 1024; // floor: 1 MiB
    let capacity = parse_usize("MIRRORMEM_MOCK_CAPACITY", DEFAULT_CAPACITY);
    let capacity = capacity.max(MIN_CAPACITY);
    MockBackendConfig { capacity }
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> EnvConfig {
    EnvConfig {
        manager: load_manager_config(),
        mock: load_mock_config(),
        log: LogConfig::from_env(),
    }
}

impl EnvConfig {
    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            managed: self.manager.managed,
            device_enabled: self.manager.enable_device,
            target: self.manager.target,
            alternate_backend: self.manager.alternate_backend,
            trace_modes: self.manager.trace_modes,
            mock_capacity: self.mock.capacity,
            log_level: self.log.level.clone(),
            log_format: match self.log.format {
                LogFormat::Json => "json".to_string(),
                LogFormat::Pretty => "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serialize env-mutating tests to avoid cross-test pollution.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "MIRRORMEM_DISABLE",
        "MIRRORMEM_DEVICE",
        "MIRRORMEM_TARGET",
        "MIRRORMEM_ALT_BACKEND",
        "MIRRORMEM_DEBUG",
        "MIRRORMEM_MOCK_CAPACITY",
        "MIRRORMEM_LOG",
        "MIRRORMEM_LOG_FORMAT",
        "MIRRORMEM_LOG_FILE",
    ];

    fn clear_env_vars() {
        for k in ENV_KEYS {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn test_defaults_are_sensible() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        let cfg = load();
        assert!(cfg.manager.managed);
        assert!(!cfg.manager.enable_device);
        assert_eq!(cfg.manager.target, Target::Host);
        assert!(!cfg.manager.alternate_backend);
        assert!(!cfg.manager.trace_modes);
        assert_eq!(cfg.mock.capacity, 256 * 1024 * 1024);
        assert_eq!(cfg.log.level, "info");
        assert_eq!(cfg.log.format, LogFormat::Json);
        assert!(cfg.log.output_path.is_none());
    }

    #[test]
    fn test_env_vars_override_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("MIRRORMEM_DISABLE", "1");
        std::env::set_var("MIRRORMEM_DEVICE", "1");
        std::env::set_var("MIRRORMEM_TARGET", "device");
        std::env::set_var("MIRRORMEM_DEBUG", "1");
        std::env::set_var("MIRRORMEM_MOCK_CAPACITY", "134217728"); // 128 MiB
        std::env::set_var("MIRRORMEM_LOG", "mirrormem=trace");
        std::env::set_var("MIRRORMEM_LOG_FORMAT", "pretty");
        let cfg = load();
        assert!(!cfg.manager.managed);
        assert!(cfg.manager.enable_device);
        assert_eq!(cfg.manager.target, Target::Device);
        assert!(cfg.manager.trace_modes);
        assert_eq!(cfg.mock.capacity, 134_217_728);
        assert_eq!(cfg.log.level, "mirrormem=trace");
        assert_eq!(cfg.log.format, LogFormat::Pretty);
        clear_env_vars();
    }

    #[test]
    fn test_flag_zero_and_false_mean_off() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("MIRRORMEM_DEVICE", "0");
        assert!(!load().manager.enable_device);
        std::env::set_var("MIRRORMEM_DEVICE", "false");
        assert!(!load().manager.enable_device);
        std::env::set_var("MIRRORMEM_DEVICE", "yes");
        assert!(load().manager.enable_device);
        clear_env_vars();
    }

    #[test]
    fn test_invalid_target_falls_back_to_host() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("MIRRORMEM_TARGET", "gpu");
        let cfg = load();
        assert_eq!(cfg.manager.target, Target::Host);
        clear_env_vars();
    }

    #[test]
    fn test_mock_capacity_floor() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("MIRRORMEM_MOCK_CAPACITY", "0");
        let cfg = load();
        assert!(cfg.mock.capacity >= 1024 * 1024, "capacity must have floor");

        std::env::set_var("MIRRORMEM_MOCK_CAPACITY", "not_a_number");
        let cfg = load();
        assert_eq!(cfg.mock.capacity, 256 * 1024 * 1024);
        clear_env_vars();
    }

    #[test]
    fn test_effective_config_contains_all_fields() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        let cfg = load();
        let eff = cfg.effective_config();
        assert!(eff.managed);
        assert!(!eff.device_enabled);
        assert_eq!(eff.target, Target::Host);
        assert!(eff.mock_capacity > 0);
        assert_eq!(eff.log_level, "info");
        assert_eq!(eff.log_format, "json");
    }
}
