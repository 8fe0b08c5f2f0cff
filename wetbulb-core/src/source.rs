use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt::Debug;
use thiserror::Error;

use crate::{Config, model::Observation, source::openweather::OpenWeatherSource};

pub mod openweather;

/// Why an observation could not be obtained for a city.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider responded with status {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Whether trying again later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Request(_) => true,
            FetchError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            FetchError::Malformed(_) => false,
        }
    }

    /// The provider could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Request(_))
    }
}

/// Something that can report current conditions for a named city.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch(&self, city: &str) -> Result<Observation, FetchError>;
}

/// Construct the OpenWeather source from config.
pub fn source_from_config(config: &Config) -> anyhow::Result<OpenWeatherSource> {
    source_with_key(config, config.api_key())
}

fn source_with_key(config: &Config, api_key: Option<String>) -> anyhow::Result<OpenWeatherSource> {
    let api_key = api_key.ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
             Hint: run `wetbulb configure` or set {}.",
            crate::config::API_KEY_ENV
        )
    })?;

    OpenWeatherSource::builder(api_key)
        .units(config.units)
        .base_url(config.base_url.clone())
        .timeout(config.timeout())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> FetchError {
        FetchError::Status {
            status: StatusCode::from_u16(code).unwrap(),
            message: "x".into(),
        }
    }

    #[test]
    fn transient_statuses() {
        assert!(status(429).is_transient());
        assert!(status(500).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(401).is_transient());
        assert!(!status(404).is_transient());
        assert!(!FetchError::Malformed("missing field".into()).is_transient());
    }

    #[test]
    fn status_is_not_transport() {
        assert!(!status(503).is_transport());
    }

    #[test]
    fn source_errors_when_no_api_key_resolves() {
        let cfg = Config::default();
        let err = source_with_key(&cfg, cfg.resolve_api_key(None)).unwrap_err();
        assert!(err.to_string().contains("No OpenWeather API key configured"));
    }

    #[test]
    fn source_from_config_works_when_key_set() {
        let cfg = Config {
            api_key: Some("KEY".into()),
            ..Config::default()
        };
        assert!(source_from_config(&cfg).is_ok());
    }
}
