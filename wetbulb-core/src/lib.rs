//! Core library for the `wetbulb` CLI.
//!
//! This crate defines:
//! - The wet bulb temperature estimator
//! - An abstraction over weather sources, with an OpenWeather implementation
//! - The batch pipeline that turns a city list into ordered results
//! - Configuration & credentials handling
//!
//! It is used by `wetbulb-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod estimator;
pub mod model;
pub mod pipeline;
pub mod source;

pub use config::Config;
pub use estimator::{InvalidInput, estimate};
pub use model::{CityList, Observation, ResultSet, Units, WetBulbResult};
pub use pipeline::{BatchPipeline, BatchReport, CityError, CityFailure, PipelineOptions};
pub use source::{FetchError, WeatherSource, openweather::OpenWeatherSource, source_from_config};
