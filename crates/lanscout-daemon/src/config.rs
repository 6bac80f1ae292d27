//! Configuration loading and validation

use anyhow::Result;
use lanscout_discovery::ScannerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScannerConfig,
}

/// Load configuration from file, falling back to defaults when absent
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("lanscout.toml")).unwrap();
        assert_eq!(config.scan.port, 8082);
        assert_eq!(config.scan.batch_size, 20);
        assert_eq!(config.scan.scan_timeout_ms, 15_000);
    }

    #[test]
    fn saved_default_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanscout.toml");
        save_default_config(&path).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.scan.probe_timeout_ms, 10_000);
        assert_eq!(config.scan.batch_delay_ms, 500);
        assert!(config.scan.validate().is_ok());
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanscout.toml");
        std::fs::write(
            &path,
            "[scan]\nport = 9000\ninterfaces = [\"eth0\"]\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.scan.port, 9000);
        assert_eq!(config.scan.interfaces, vec!["eth0".to_string()]);
        assert_eq!(config.scan.batch_size, 20);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanscout.toml");
        std::fs::write(&path, "[scan\nport = what").unwrap();
        assert!(load_config(&path).is_err());
    }
}
