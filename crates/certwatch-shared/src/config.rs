//! Configuration management

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_API_TIMEOUT_SECS, DEFAULT_LOG_FILTER, DEFAULT_TOKEN_DIR,
};
use crate::error::AppError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiSettings,
    pub session: SessionSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    /// Directory holding the persisted token file.
    pub token_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load defaults, then `config/default`, then `config/{APP_ENV}`, then `CERTWATCH__*` env vars.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("CERTWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the client can't work with.
    pub fn validate(&self) -> Result<(), AppError> {
        let base_url = self.api.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AppError::InvalidSetting {
                key: "api.base_url",
                reason: format!("expected an http(s) URL, got {:?}", self.api.base_url),
            });
        }
        if self.api.timeout_seconds == 0 {
            return Err(AppError::InvalidSetting {
                key: "api.timeout_seconds",
                reason: "must be greater than zero".into(),
            });
        }
        if self.session.token_dir.trim().is_empty() {
            return Err(AppError::InvalidSetting {
                key: "session.token_dir",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("api.base_url", DEFAULT_API_BASE_URL)?
            .set_default("api.timeout_seconds", DEFAULT_API_TIMEOUT_SECS as i64)?
            .set_default("session.token_dir", DEFAULT_TOKEN_DIR)?
            .set_default("logging.filter", DEFAULT_LOG_FILTER)?
            .set_default("logging.json", false)
    }
}
