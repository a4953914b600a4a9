//! Configuration for the coherence simulator.
//!
//! These are the device settings a user adjusts between sessions. Range
//! enforcement happens here, not in the session engine.

use crate::clock::DEFAULT_TICK_INTERVAL;
use crate::core::{MAX_CHALLENGE_LEVEL, MIN_CHALLENGE_LEVEL};
use crate::signal::SignalMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shortest and longest breath pacer intervals, in seconds.
pub const MIN_PACER_SPEED: u32 = 1;
pub const MAX_PACER_SPEED: u32 = 30;

/// Main configuration for the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Difficulty tier used for new sessions (1-4)
    pub challenge_level: u8,

    /// Breath pacer interval in seconds (1-30)
    pub pacer_speed: u32,

    /// Waveform preset for the synthetic signal
    pub signal_mode: SignalMode,

    /// Time between session ticks
    #[serde(with = "duration_serde")]
    pub tick_interval: Duration,

    /// Path for storing session history
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coherence-sim");

        Self {
            challenge_level: 3,
            pacer_speed: 10,
            signal_mode: SignalMode::Normal,
            tick_interval: DEFAULT_TICK_INTERVAL,
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coherence-sim")
            .join("config.json")
    }

    /// Where kept session summaries are stored.
    pub fn history_path(&self) -> PathBuf {
        self.data_path.join("history.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Check that every setting is within the range the device allows.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CHALLENGE_LEVEL..=MAX_CHALLENGE_LEVEL).contains(&self.challenge_level) {
            return Err(ConfigError::OutOfRange(format!(
                "challenge level {} (expected {MIN_CHALLENGE_LEVEL}-{MAX_CHALLENGE_LEVEL})",
                self.challenge_level
            )));
        }
        if !(MIN_PACER_SPEED..=MAX_PACER_SPEED).contains(&self.pacer_speed) {
            return Err(ConfigError::OutOfRange(format!(
                "pacer speed {}s (expected {MIN_PACER_SPEED}-{MAX_PACER_SPEED})",
                self.pacer_speed
            )));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::OutOfRange("tick interval of 0ms".to_string()));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    OutOfRange(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::OutOfRange(e) => write!(f, "Setting out of range: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration, stored as whole milliseconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("coherence-sim-config-{}-{name}", std::process::id()))
            .join("config.json")
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.challenge_level, 3);
        assert_eq!(config.pacer_speed, 10);
        assert_eq!(config.signal_mode, SignalMode::Normal);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_ranges() {
        let mut config = Config::default();
        config.challenge_level = 0;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange(_))));

        config.challenge_level = 4;
        config.pacer_speed = 31;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange(_))));

        config.pacer_speed = 1;
        assert!(config.validate().is_ok());

        config.tick_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_config_path("roundtrip");
        let config = Config {
            challenge_level: 2,
            pacer_speed: 6,
            signal_mode: SignalMode::Low,
            tick_interval: Duration::from_millis(250),
            data_path: PathBuf::from("/tmp/coherence-sim-data"),
        };

        config.save_to(&path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"tick_interval\": 250"));
        assert!(raw.contains("\"signal_mode\": \"low\""));

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = temp_config_path("missing");
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let path = temp_config_path("malformed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::ParseError(_))));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_history_path() {
        let config = Config {
            data_path: PathBuf::from("/data"),
            ..Config::default()
        };
        assert_eq!(config.history_path(), PathBuf::from("/data/history.json"));
    }
}
