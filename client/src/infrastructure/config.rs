use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::application::captcha::CaptchaPolicy;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientConfig {
    pub api_base_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub download_dir: PathBuf,
    pub image_dir: PathBuf,
    #[serde(default)]
    pub captcha: CaptchaPolicy,
}

impl ClientConfig {
    /// Defaults, then `filing.toml` if present, then `FILING__*` variables.
    /// A `.env` file is folded into the environment first. Not validated.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_sources(Some("filing"))
    }

    pub fn from_sources(file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("download_dir", ".")?
            .set_default("image_dir", std::env::temp_dir().to_string_lossy().to_string())?;

        if let Some(name) = file {
            builder = builder.add_source(File::with_name(name).required(false));
        }

        Ok(builder
            .add_source(Environment::with_prefix("FILING").separator("__"))
            .build()?
            .try_deserialize()?)
    }

    /// Checked once command-line overrides are in place
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.api_base_url)
            .map_err(|e| ConfigError::Invalid(format!("api_base_url {}: {}", self.api_base_url, e)))?;
        if self.captcha.max_rounds == 0 {
            return Err(ConfigError::Invalid("captcha.max_rounds must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClientConfig {
        ClientConfig {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            username: None,
            password: None,
            download_dir: PathBuf::from("."),
            image_dir: PathBuf::from("/tmp"),
            captcha: CaptchaPolicy::default(),
        }
    }

    #[test]
    fn test_defaults_without_file() {
        let config = ClientConfig::from_sources(None).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.captcha, CaptchaPolicy::default());
    }

    #[test]
    fn test_invalid_file_values_load_unvalidated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("filing.toml"),
            "api_base_url = \"not a url\"\n[captcha]\nmax_rounds = 5\n",
        )
        .unwrap();
        let name = dir.path().join("filing");

        let config = ClientConfig::from_sources(name.to_str()).unwrap();
        assert_eq!(config.api_base_url, "not a url");
        assert_eq!(config.captcha.max_rounds, 5);
        assert_eq!(config.captcha.challenge_status, 501);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let mut config = sample();
        config.captcha.max_rounds = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let mut config = sample();
        config.api_base_url = "not a url".to_string();
        assert!(config.validate().is_err());
        assert!(sample().validate().is_ok());
    }
}
