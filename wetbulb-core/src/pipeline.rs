//! Batch processing of a city list into wet bulb results.
//!
//! Every city is fetched, validated and estimated independently. A failing
//! city is recorded in [`BatchReport::failures`] and skipped; it never aborts
//! the batch. Results always come back in the order the cities were given,
//! whatever the fetch concurrency.

use futures::{StreamExt, stream};
use std::time::Duration;
use thiserror::Error;

use crate::{
    estimator::InvalidInput,
    model::{Observation, ResultSet, WetBulbResult},
    source::{FetchError, WeatherSource},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Fetch attempts per city, including the first. Only transient
    /// failures are retried.
    pub max_attempts: u32,
    /// Delay before the first retry, doubled for every further one.
    pub backoff: Duration,
    /// Fetches allowed in flight at once.
    pub concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_millis(500),
            concurrency: 1,
        }
    }
}

impl PipelineOptions {
    /// Clamp attempt and concurrency counts to at least one.
    pub fn normalized(self) -> Self {
        Self {
            max_attempts: self.max_attempts.max(1),
            concurrency: self.concurrency.max(1),
            ..self
        }
    }
}

/// Why a single city was skipped.
#[derive(Debug, Error)]
pub enum CityError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
}

#[derive(Debug)]
pub struct CityFailure {
    /// Index of the city in the input list.
    pub position: usize,
    pub city: String,
    pub error: CityError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: ResultSet,
    pub failures: Vec<CityFailure>,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    /// True when every city failed because the provider could not be reached.
    pub fn source_unreachable(&self) -> bool {
        self.results.is_empty()
            && !self.failures.is_empty()
            && self
                .failures
                .iter()
                .all(|f| matches!(&f.error, CityError::Fetch(e) if e.is_transport()))
    }
}

#[derive(Debug)]
pub struct BatchPipeline<S> {
    source: S,
    options: PipelineOptions,
}

impl<S: WeatherSource> BatchPipeline<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, PipelineOptions::default())
    }

    pub fn with_options(source: S, options: PipelineOptions) -> Self {
        Self {
            source,
            options: options.normalized(),
        }
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch and estimate every city in `cities`.
    #[tracing::instrument(level = "info", skip_all, fields(cities = cities.len()))]
    pub async fn run<C>(&self, cities: &[C]) -> BatchReport
    where
        C: AsRef<str> + Sync,
    {
        let outcomes: Vec<_> = stream::iter(cities.iter().enumerate())
            .map(|(position, city)| async move {
                let city = city.as_ref();
                (position, city, self.process(city).await)
            })
            .buffered(self.options.concurrency)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for (position, city, outcome) in outcomes {
            match outcome {
                Ok(result) => {
                    tracing::debug!(city, wet_bulb = result.wet_bulb, "processed");
                    report.results.push(result);
                }
                Err(error) => {
                    tracing::warn!(city, position, %error, "skipping city");
                    report.failures.push(CityFailure {
                        position,
                        city: city.to_string(),
                        error,
                    });
                }
            }
        }

        tracing::info!(
            succeeded = report.results.len(),
            failed = report.failures.len(),
            "batch finished"
        );
        report
    }

    async fn process(&self, city: &str) -> Result<WetBulbResult, CityError> {
        let obs = self.fetch_with_retry(city).await?;
        Ok(WetBulbResult::from_observation(obs)?)
    }

    async fn fetch_with_retry(&self, city: &str) -> Result<Observation, FetchError> {
        let mut attempt = 1;
        let mut delay = self.options.backoff;

        loop {
            match self.source.fetch(city).await {
                Ok(obs) => return Ok(obs),
                Err(e) if e.is_transient() && attempt < self.options.max_attempts => {
                    tracing::debug!(city, attempt, ?delay, error = %e, "retrying fetch");
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
