// Refresh configuration (the only externally recognized option is the period)
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_REFRESH_PERIOD_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("refresh period must be greater than zero")]
    InvalidPeriod,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RefreshConfig {
    pub refresh_period_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            refresh_period_ms: DEFAULT_REFRESH_PERIOD_MS,
        }
    }
}

impl RefreshConfig {
    /// A zero period is treated as "not given".
    pub fn with_period_ms(period_ms: Option<u64>) -> Self {
        match period_ms {
            Some(ms) if ms > 0 => Self {
                refresh_period_ms: ms,
            },
            _ => Self::default(),
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.refresh_period_ms.max(1))
    }

    pub fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".chat_timestamps.json")
    }

    /// Loads from [`Self::config_path`], falling back to defaults on any problem.
    pub fn load() -> Self {
        let path = Self::config_path();
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!("Ignoring config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        if config.refresh_period_ms == 0 {
            return Err(ConfigError::InvalidPeriod);
        }
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_overrides() {
        assert_eq!(RefreshConfig::default().period(), Duration::from_millis(1000));
        assert_eq!(RefreshConfig::with_period_ms(Some(250)).refresh_period_ms, 250);
        assert_eq!(RefreshConfig::with_period_ms(Some(0)), RefreshConfig::default());
        assert_eq!(RefreshConfig::with_period_ms(None), RefreshConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let config = RefreshConfig::with_period_ms(Some(5000));
        config.save_to(&path).unwrap();
        assert_eq!(RefreshConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_field_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{}").unwrap();
        assert_eq!(RefreshConfig::load_from(&path).unwrap(), RefreshConfig::default());
    }

    #[test]
    fn test_rejects_zero_and_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        fs::write(&path, r#"{"refresh_period_ms": 0}"#).unwrap();
        assert!(matches!(RefreshConfig::load_from(&path), Err(ConfigError::InvalidPeriod)));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(RefreshConfig::load_from(&path), Err(ConfigError::Parse(_))));

        let missing = dir.path().join("missing.json");
        assert!(matches!(RefreshConfig::load_from(&missing), Err(ConfigError::Io(_))));
    }
}
