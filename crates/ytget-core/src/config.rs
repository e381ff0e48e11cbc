//! Configuration management for ytget

use crate::error::ConfigError;
use crate::naming::CollisionPolicy;
use crate::selector::{SelectionMode, SelectionPolicy};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    pub output: OutputConfig,
    pub selection: SelectionConfig,
    pub network: NetworkConfig,
    pub temp: TempConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Path to FFmpeg binary (auto-detected if not set)
    pub ffmpeg: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory downloads are saved to
    pub directory: PathBuf,
    /// Append " - YouTube <id>" to file names
    pub append_id: bool,
    /// What to do when the file name is taken
    pub collision: CollisionPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Default selection policy
    pub policy: SelectionMode,
    /// Mux split video and audio streams
    pub combine: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// User agent sent with every request
    pub user_agent: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempConfig {
    /// Custom temp directory (uses system temp if not set)
    pub directory: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig { ffmpeg: None },
            output: OutputConfig {
                directory: PathBuf::from("."),
                append_id: false,
                collision: CollisionPolicy::Suffix,
            },
            selection: SelectionConfig {
                policy: SelectionMode::Interactive,
                combine: false,
            },
            network: NetworkConfig {
                user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0"
                    .to_string(),
                timeout_secs: 60,
            },
            temp: TempConfig { directory: None },
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Load from default config directory
        if let Some(config_dir) = dirs::config_dir() {
            let default_config = config_dir.join("ytget/config.toml");
            if default_config.exists() {
                figment = figment.merge(Toml::file(&default_config));
            }
        }

        // Load from specified config file
        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ConfigError::LoadError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment, e.g. YTGET_OUTPUT__APPEND_ID=true
        figment = figment.merge(Env::prefixed("YTGET_").split("__"));

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.network.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "network.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.network.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "network.user_agent must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Get FFmpeg path, auto-detecting if not configured
    pub fn ffmpeg_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.paths.ffmpeg {
            Ok(path.clone())
        } else {
            which::which("ffmpeg")
                .map_err(|_| ConfigError::InvalidValue("ffmpeg not found in PATH".to_string()))
        }
    }

    /// Get temp directory
    pub fn temp_dir(&self) -> PathBuf {
        self.temp.directory.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout_secs)
    }

    pub fn selection_policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            mode: self.selection.policy,
            combine_split_streams: self.selection.combine,
        }
    }
}
