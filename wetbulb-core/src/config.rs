use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    model::{CityList, Units},
    pipeline::PipelineOptions,
    source::openweather::DEFAULT_BASE_URL,
};

/// Environment variable that overrides the API key stored on disk.
pub const API_KEY_ENV: &str = "OPENWEATHERMAP_API_KEY";

/// Pipeline tuning as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fetch attempts per city, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub backoff_ms: u64,
    /// Number of fetches allowed in flight at once.
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let opts = PipelineOptions::default();
        Self {
            max_attempts: opts.max_attempts,
            backoff_ms: opts.backoff.as_millis() as u64,
            concurrency: opts.concurrency,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// units = "metric"
/// cities = ["Chennai", "Kochi"]
///
/// [pipeline]
/// max_attempts = 3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub units: Units,
    pub cities: CityList,
    pub base_url: String,
    pub timeout_secs: u64,
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            units: Units::default(),
            cities: CityList::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// API key from the environment, falling back to the config file.
    pub fn api_key(&self) -> Option<String> {
        self.resolve_api_key(std::env::var(API_KEY_ENV).ok().as_deref())
    }

    /// Pick `env_value` when it is non-blank, else the stored key.
    pub fn resolve_api_key(&self, env_value: Option<&str>) -> Option<String> {
        env_value
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.stored_api_key())
            .map(str::to_owned)
    }

    /// API key as written in the config file, ignoring the environment.
    pub fn stored_api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            max_attempts: self.pipeline.max_attempts,
            backoff: Duration::from_millis(self.pipeline.backoff_ms),
            concurrency: self.pipeline.concurrency,
        }
        .normalized()
    }

    /// Load config from the default location, or defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load config from `path`, or defaults if the file doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "wetbulb", "wetbulb")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_metric_and_initial_cities() {
        let cfg = Config::default();
        assert_eq!(cfg.units, Units::Metric);
        assert_eq!(cfg.cities, CityList::default());
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.pipeline_options(), PipelineOptions::default());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("KEY".into());
        cfg.units = Units::Imperial;
        cfg.cities.add("Mumbai");
        cfg.pipeline.max_attempts = 3;

        cfg.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded, cfg);
        assert!(loaded.cities.contains("Mumbai"));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "units = \"imperial\"\ncities = [\"Delhi\"]\n").unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.units, Units::Imperial);
        assert_eq!(cfg.cities.as_slice(), ["Delhi"]);
        assert_eq!(cfg.timeout_secs, 10);
        assert_eq!(cfg.pipeline, PipelineConfig::default());
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "units = \"kelvin\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn env_key_takes_precedence_over_file_key() {
        let cfg = Config {
            api_key: Some("FILEKEY".into()),
            ..Config::default()
        };
        assert_eq!(cfg.resolve_api_key(Some("ENVKEY")).as_deref(), Some("ENVKEY"));
    }

    #[test]
    fn blank_env_key_falls_back_to_file_key() {
        let cfg = Config {
            api_key: Some("FILEKEY".into()),
            ..Config::default()
        };
        assert_eq!(cfg.resolve_api_key(Some("   ")).as_deref(), Some("FILEKEY"));
        assert_eq!(cfg.resolve_api_key(Some("")).as_deref(), Some("FILEKEY"));
        assert_eq!(cfg.resolve_api_key(None).as_deref(), Some("FILEKEY"));
    }

    #[test]
    fn no_key_anywhere_resolves_to_none() {
        let cfg = Config::default();
        assert_eq!(cfg.resolve_api_key(None), None);
        assert_eq!(cfg.resolve_api_key(Some(" ")), None);
    }

    #[test]
    fn blank_stored_key_counts_as_missing() {
        let cfg = Config {
            api_key: Some("  ".into()),
            ..Config::default()
        };
        assert_eq!(cfg.stored_api_key(), None);
    }

    #[test]
    fn pipeline_options_are_normalized() {
        let cfg = Config {
            pipeline: PipelineConfig {
                max_attempts: 0,
                backoff_ms: 250,
                concurrency: 0,
            },
            ..Config::default()
        };
        let opts = cfg.pipeline_options();
        assert_eq!(opts.max_attempts, 1);
        assert_eq!(opts.concurrency, 1);
        assert_eq!(opts.backoff, Duration::from_millis(250));
    }
}
