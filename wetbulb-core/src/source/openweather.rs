use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::model::{Observation, Units};

use super::{FetchError, WeatherSource};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Current conditions from the OpenWeather `weather` endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherSource {
    api_key: String,
    units: Units,
    base_url: String,
    http: Client,
}

#[derive(Debug, Clone)]
pub struct OpenWeatherSourceBuilder {
    api_key: String,
    units: Units,
    base_url: String,
    timeout: Duration,
}

impl OpenWeatherSourceBuilder {
    pub fn units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> anyhow::Result<OpenWeatherSource> {
        let http = Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client for OpenWeather")?;

        Ok(OpenWeatherSource {
            api_key: self.api_key,
            units: self.units,
            base_url: self.base_url,
            http,
        })
    }
}

impl OpenWeatherSource {
    pub fn builder(api_key: impl Into<String>) -> OpenWeatherSourceBuilder {
        OpenWeatherSourceBuilder {
            api_key: api_key.into(),
            units: Units::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn units(&self) -> Units {
        self.units
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    dt: Option<i64>,
    main: OwMain,
}

#[derive(Debug, Deserialize)]
struct OwErrorResponse {
    message: String,
}

#[async_trait]
impl WeatherSource for OpenWeatherSource {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn fetch(&self, city: &str) -> Result<Observation, FetchError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        tracing::debug!(%status, bytes = body.len(), "OpenWeather responded");

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        parse_current(city, self.units, &body)
    }
}

fn parse_current(city: &str, units: Units, body: &str) -> Result<Observation, FetchError> {
    let parsed: OwCurrentResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    let observed_at = parsed.dt.and_then(unix_to_utc).unwrap_or_else(Utc::now);

    Ok(Observation {
        city: city.to_string(),
        temperature: units.to_celsius(parsed.main.temp),
        relative_humidity: parsed.main.humidity,
        observed_at,
    })
}

fn status_error(status: StatusCode, body: &str) -> FetchError {
    let message = serde_json::from_str::<OwErrorResponse>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| truncate_body(body));

    FetchError::Status { status, message }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
