use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
const CONFIG_PATH_ENV_VAR: &str = "DSCHAT_CONFIG";
const PLACEHOLDER_API_KEY: &str = "your-deepseek-api-key-here";

const DEFAULT_MAX_TOKENS: u32 = 2000;
const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_HISTORY: usize = 10;

/// Validated application configuration, loaded once at startup and
/// read-only afterwards. `reload` in the REPL re-reads the prompt file
/// only, never this record.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub deepseek: DeepSeekConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeepSeekConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub system_prompt_file: PathBuf,
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

/// Config file location: `DSCHAT_CONFIG` if set and non-empty, otherwise
/// `config.json` in the working directory.
pub fn config_path() -> PathBuf {
    config_path_from(env::var(CONFIG_PATH_ENV_VAR).ok().as_deref())
}

fn config_path_from(raw: Option<&str>) -> PathBuf {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                ConfigError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                }
            }
        })?;

        let cfg = Self::from_json(&raw).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            source: err,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let api_key = self.deepseek.api_key.trim();
        if api_key.is_empty() || api_key == PLACEHOLDER_API_KEY {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }
}
