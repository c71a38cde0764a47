use crate::utils::scroller::{DEFAULT_SCROLL_LIMIT, DEFAULT_SCROLL_PADDING};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleType {
    Network,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub scroll_limit: usize,
    pub scroll_interval_ms: u64,
    pub scroll_padding: usize,
    pub state_poll_interval_ms: u64,
    pub refresh_interval_secs: u64,
    pub scan_interval_secs: u64,
    pub connect_timeout_secs: u64,
    pub settings_command: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            scroll_limit: DEFAULT_SCROLL_LIMIT,
            scroll_interval_ms: 200,
            scroll_padding: DEFAULT_SCROLL_PADDING,
            state_poll_interval_ms: 1000,
            refresh_interval_secs: 10,
            scan_interval_secs: 20,
            connect_timeout_secs: 30,
            settings_command: vec![
                "env".to_string(),
                "XDG_CURRENT_DESKTOP=GNOME".to_string(),
                "gnome-control-center".to_string(),
                "wifi".to_string(),
            ],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BarConfig {
    pub font: Option<String>,
    pub log_level: String,
    pub modules_left: Vec<ModuleType>,
    pub modules_center: Vec<ModuleType>,
    pub modules_right: Vec<ModuleType>,
    pub network: NetworkConfig,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            font: Some("Sans 10".to_string()),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            modules_left: vec![],
            modules_center: vec![],
            modules_right: vec![ModuleType::Network],
            network: NetworkConfig::default(),
        }
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().context("Could not determine config directory")?;
    path.push(env!("CARGO_PKG_NAME"));
    path.push("config.yaml");
    Ok(path)
}

/// Writes the default config when none exists. Returns whether it did.
fn ensure_config_exists(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        return Ok(false);
    }
    let config_dir = config_path
        .parent()
        .context("Config path has no parent directory")?;
    fs::create_dir_all(config_dir)
        .with_context(|| format!("Failed to create config directory {:?}", config_dir))?;

    let default_config = BarConfig::default();
    let yaml_string = serde_yaml::to_string(&default_config)
        .context("Failed to serialize default config to YAML")?;
    fs::write(config_path, yaml_string)
        .with_context(|| format!("Failed to write default config to {:?}", config_path))?;
    Ok(true)
}

fn read_config_at(config_path: &Path) -> Result<(BarConfig, bool)> {
    let created = ensure_config_exists(config_path)?;
    let contents = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
    let config = parse_config(&contents)
        .with_context(|| format!("Failed to parse YAML from config file: {:?}", config_path))?;
    Ok((config, created))
}

/// Result of reading the config file. It is read before the log subscriber
/// exists, so reporting waits for `into_config`.
pub struct ConfigLoad {
    path: Option<PathBuf>,
    outcome: Result<(BarConfig, bool)>,
}

impl ConfigLoad {
    pub fn log_level(&self) -> &str {
        match &self.outcome {
            Ok((config, _)) => &config.log_level,
            Err(_) => DEFAULT_LOG_LEVEL,
        }
    }

    /// Logs how the config was obtained and falls back to the default on error.
    pub fn into_config(self) -> BarConfig {
        match self.outcome {
            Ok((config, true)) => {
                info!("Config file not found, created default config at {:?}", self.path);
                config
            }
            Ok((config, false)) => {
                info!("Loaded config from: {:?}", self.path);
                config
            }
            Err(e) => {
                warn!("Failed to load or create config: {:?}. Using default.", e);
                BarConfig::default()
            }
        }
    }
}

pub fn read_config() -> ConfigLoad {
    match get_config_path() {
        Ok(path) => {
            let outcome = read_config_at(&path);
            ConfigLoad {
                path: Some(path),
                outcome,
            }
        }
        Err(e) => ConfigLoad {
            path: None,
            outcome: Err(e),
        },
    }
}

fn parse_config(contents: &str) -> Result<BarConfig> {
    Ok(serde_yaml::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_network_config() {
        let cfg = NetworkConfig::default();
        assert_eq!(cfg.scroll_limit, 20);
        assert_eq!(cfg.scroll_interval_ms, 200);
        assert_eq!(cfg.scroll_padding, 5);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let cfg = parse_config("network:\n  scroll_limit: 12\n").unwrap();
        assert_eq!(cfg.network.scroll_limit, 12);
        assert_eq!(cfg.network.scroll_interval_ms, 200);
        assert_eq!(cfg.modules_right, vec![ModuleType::Network]);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_module_names_are_kebab_case() {
        let cfg = parse_config("modules_left: [network]\nmodules_right: []\n").unwrap();
        assert_eq!(cfg.modules_left, vec![ModuleType::Network]);
        assert!(cfg.modules_right.is_empty());
    }

    #[test]
    fn test_unknown_module_is_rejected() {
        assert!(parse_config("modules_left: [battery]\n").is_err());
    }

    #[test]
    fn test_default_config_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&BarConfig::default()).unwrap();
        assert_eq!(parse_config(&yaml).unwrap(), BarConfig::default());
    }

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("kaneru-network-{}-{}", std::process::id(), name))
            .join("config.yaml")
    }

    #[test]
    fn test_first_read_creates_default_file() {
        let path = scratch_path("create");
        let _ = fs::remove_file(&path);

        let (config, created) = read_config_at(&path).unwrap();
        assert!(created);
        assert_eq!(config, BarConfig::default());

        let (_, created_again) = read_config_at(&path).unwrap();
        assert!(!created_again);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_load_keeps_configured_level_until_logging_starts() {
        let path = scratch_path("level");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "log_level: debug\n").unwrap();

        let load = ConfigLoad {
            path: Some(path.clone()),
            outcome: read_config_at(&path),
        };
        assert_eq!(load.log_level(), "debug");
        assert_eq!(load.into_config().log_level, "debug");
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_broken_file_falls_back_to_defaults() {
        let path = scratch_path("broken");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "modules_left: [\n").unwrap();

        let load = ConfigLoad {
            path: Some(path.clone()),
            outcome: read_config_at(&path),
        };
        assert_eq!(load.log_level(), "info");
        assert_eq!(load.into_config(), BarConfig::default());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
