//! Configuration file loading and parsing.

use crate::env::{vars, EnvError, Environment};
use crate::types::{BizlogConfig, LogSettings};
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the config directory.
pub const CONFIG_FILE: &str = "bizlog.yaml";

const PLACEHOLDER: &str = r"\$\{([^}:]+)(?::-([^}]*))?\}";

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },

    #[error(transparent)]
    Env(#[from] EnvError),
}

/// Configuration loader.
pub struct ConfigLoader {
    base_path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for the given directory.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            base_path: dir.as_ref().to_path_buf(),
        }
    }

    /// Create a loader for `BIZLOG_CONFIG_DIR`, or the current directory.
    pub fn from_env() -> Self {
        match Environment::get(vars::BIZLOG_CONFIG_DIR) {
            Some(dir) => Self::new(dir),
            None => Self::default(),
        }
    }

    /// Path of the config file this loader reads.
    pub fn path(&self) -> PathBuf {
        self.base_path.join(CONFIG_FILE)
    }

    /// Load configuration from `bizlog.yaml`, or defaults if the file is absent.
    pub fn load(&self) -> Result<BizlogConfig, ConfigError> {
        let config_path = self.path();

        if !config_path.exists() {
            return Ok(BizlogConfig::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let expanded = self.expand_env_vars(&contents)?;

        let config: BizlogConfig =
            serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        self.validate(&config)?;
        Ok(config)
    }

    /// Load the file, then apply `BIZLOG_*` environment overrides.
    pub fn load_with_overrides(&self) -> Result<BizlogConfig, ConfigError> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config)?;
        self.validate(&config)?;
        Ok(config)
    }

    /// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
    fn expand_env_vars(&self, content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(PLACEHOLDER).map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;

        let mut result = content.to_string();
        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let default = cap.get(2).map(|m| m.as_str());

            let value = match std::env::var(var_name) {
                Ok(v) => v,
                Err(_) => match default {
                    Some(d) => d.to_string(),
                    None => {
                        return Err(ConfigError::EnvVarNotFound {
                            var: var_name.to_string(),
                        })
                    }
                },
            };

            result = result.replace(&cap[0], &value);
        }

        Ok(result)
    }

    /// Validate configuration values.
    pub fn validate(&self, config: &BizlogConfig) -> Result<(), ConfigError> {
        if config.dispatcher.pool_size == 0 {
            return Err(ConfigError::ValidationError {
                message: "dispatcher.pool_size must be greater than 0".to_string(),
            });
        }

        if config.dispatcher.queue_capacity == 0 {
            return Err(ConfigError::ValidationError {
                message: "dispatcher.queue_capacity must be greater than 0".to_string(),
            });
        }

        let level = config.log.level.to_lowercase();
        if !LogSettings::LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!("log.level '{}' is not one of {:?}", config.log.level, LogSettings::LEVELS),
            });
        }

        let format = config.log.format.to_lowercase();
        if !LogSettings::FORMATS.contains(&format.as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!("log.format '{}' is not one of {:?}", config.log.format, LogSettings::FORMATS),
            });
        }

        Ok(())
    }

    /// Save configuration to `bizlog.yaml`.
    pub fn save(&self, config: &BizlogConfig) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.base_path)?;

        let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;

        std::fs::write(self.path(), yaml)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}

/// Apply `BIZLOG_POOL_SIZE`, `BIZLOG_QUEUE_CAPACITY` and the `BIZLOG_LOG_*`
/// variables on top of `config`.
pub fn apply_env_overrides(config: &mut BizlogConfig) -> Result<(), EnvError> {
    if let Some(size) = Environment::get_int(vars::BIZLOG_POOL_SIZE)? {
        config.dispatcher.pool_size = size;
    }
    if let Some(capacity) = Environment::get_int(vars::BIZLOG_QUEUE_CAPACITY)? {
        config.dispatcher.queue_capacity = capacity;
    }
    if let Some(level) = Environment::get(vars::BIZLOG_LOG_LEVEL) {
        config.log.level = level.trim().to_lowercase();
    }
    if let Some(format) = Environment::get(vars::BIZLOG_LOG_FORMAT) {
        config.log.format = format.trim().to_lowercase();
    }
    if let Some(file) = Environment::get(vars::BIZLOG_LOG_FILE) {
        config.log.file = Some(file.into());
    }
    Ok(())
}
