use crate::error::AppError;
use serde::Deserialize;
use std::{env, path::PathBuf};

pub const CONFIG_PATH_VAR: &str = "PHISHGUARD_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "phishguard.toml";
const ENV_PREFIX: &str = "PHISHGUARD";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: String,
    pub scaler_path: PathBuf,
    pub popular_domains_path: PathBuf,
    pub model: ModelConfig,
    pub reputation: ReputationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    Local,
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub backend: ModelBackend,
    /// Dense network weights, used by the local backend.
    pub weights_path: PathBuf,
    /// Model server URL, used by the remote backend.
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
}

/// Operator additions to the built-in reputation lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    pub extra_trusted: Vec<String>,
    pub extra_suspicious_tlds: Vec<String>,
    pub extra_shorteners: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            scaler_path: PathBuf::from("model/scaler.json"),
            popular_domains_path: PathBuf::from("data/top_domains_small.json"),
            model: ModelConfig::default(),
            reputation: ReputationConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::Local,
            weights_path: PathBuf::from("model/weights.json"),
            endpoint: None,
            timeout_ms: 2000,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file named by `PHISHGUARD_CONFIG` (if present),
    /// then `PHISHGUARD_*` environment variables (`__` separates sections).
    pub fn load() -> Result<Self, AppError> {
        let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self, AppError> {
        let settings = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Toml).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.model.backend == ModelBackend::Remote && self.model.endpoint.is_none() {
            return Err(AppError::InvalidInput(
                "model.endpoint is required for the remote backend".to_string(),
            ));
        }
        if self.model.timeout_ms == 0 {
            return Err(AppError::InvalidInput("model.timeout_ms must be positive".to_string()));
        }
        Ok(())
    }
}
