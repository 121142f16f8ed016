//! Decomp configuration.
//!
//! Loaded from `~/.decomp/config.toml`. Every key is optional; a missing file
//! means defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors that can occur while loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{key} must be greater than zero in {}", path.display())]
    ZeroDuration { key: &'static str, path: PathBuf },
}

/// Decomp configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Total playback budget with normal motion.
    pub total_duration_ms: u64,

    /// Total playback budget under reduced motion.
    pub reduced_motion_duration_ms: u64,

    /// Spacing of progress-clock frames.
    pub frame_interval_ms: u64,

    /// Force reduced motion regardless of the environment.
    pub reduced_motion: bool,

    /// Start playing as soon as the pipeline opens.
    pub auto_play: bool,

    /// Dataset played when none is named on the command line.
    pub default_dataset: String,

    /// `tracing` filter used when `DECOMP_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            total_duration_ms: 15_000,
            reduced_motion_duration_ms: 5_000,
            frame_interval_ms: 16,
            reduced_motion: false,
            auto_play: true,
            default_dataset: "swiftui-button".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load config from `~/.decomp/config.toml`, or defaults if there is none.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from a specific file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        for (key, value) in [
            ("total-duration-ms", config.total_duration_ms),
            ("reduced-motion-duration-ms", config.reduced_motion_duration_ms),
            ("frame-interval-ms", config.frame_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDuration {
                    key,
                    path: path.to_path_buf(),
                });
            }
        }

        Ok(config)
    }

    /// The config directory: `~/.decomp/`.
    pub fn dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".decomp"))
    }

    /// The config file path: `~/.decomp/config.toml`.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.total_duration_ms)
    }

    pub fn reduced_motion_duration(&self) -> Duration {
        Duration::from_millis(self.reduced_motion_duration_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "total-duration-ms = 9000\nreduced-motion = true\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.total_duration(), Duration::from_secs(9));
        assert!(config.reduced_motion);
        assert_eq!(config.frame_interval_ms, 16);
        assert_eq!(config.default_dataset, "swiftui-button");
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "total-duration-ms = \"soon\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn zero_duration_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "frame-interval-ms = 0").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ZeroDuration {
                key: "frame-interval-ms",
                ..
            })
        ));
    }
}
