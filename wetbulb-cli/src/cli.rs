use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use inquire::{Password, PasswordDisplayMode, Select};
use std::path::{Path, PathBuf};

use wetbulb_core::{BatchPipeline, CityList, Config, Units, estimate, source_from_config};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "wetbulb", version, about = "Wet bulb temperature for a list of cities")]
pub struct Cli {
    /// Use this config file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the OpenWeather API key and unit system.
    Configure,

    /// Show or edit the saved city list.
    Cities {
        #[command(subcommand)]
        action: CitiesCommand,
    },

    /// Fetch current conditions and compute wet bulb temperatures.
    Run {
        /// City to process; repeat for several. Defaults to the saved list.
        #[arg(long = "city")]
        cities: Vec<String>,

        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },

    /// Compute a wet bulb temperature from given values.
    Calc {
        /// Air temperature in °C.
        #[arg(allow_negative_numbers = true)]
        temperature: f64,

        /// Relative humidity in percent (0-100).
        #[arg(allow_negative_numbers = true)]
        humidity: f64,
    },
}

#[derive(Debug, Subcommand)]
pub enum CitiesCommand {
    /// Print the saved cities in processing order.
    List,
    /// Append a city if it isn't already in the list.
    Add { name: String },
    /// Remove a city from the list.
    Remove { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Json,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let path = self.config.as_deref();

        match self.command {
            Command::Configure => configure(path),
            Command::Cities { action } => cities(path, action),
            Command::Run { cities, format } => run(path, cities, format).await,
            Command::Calc {
                temperature,
                humidity,
            } => calc(temperature, humidity),
        }
    }
}

/// `--config` if given, otherwise the platform default location.
fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn save_config(config: &Config, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => config.save_to(path),
        None => config.save(),
    }
}

fn calc(temperature: f64, humidity: f64) -> anyhow::Result<()> {
    let tw = estimate(temperature, humidity)?;
    println!("{}", output::render_single(temperature, humidity, tw));
    Ok(())
}

fn configure(path: Option<&Path>) -> anyhow::Result<()> {
    let mut config = load_config(path)?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if api_key.trim().is_empty() {
        anyhow::bail!("API key must not be empty");
    }
    config.set_api_key(api_key.trim().to_string());

    let current = Units::all().iter().position(|u| *u == config.units).unwrap_or(0);
    config.units = Select::new("Units:", Units::all().to_vec())
        .with_starting_cursor(current)
        .prompt()
        .context("Failed to read unit system")?;

    save_config(&config, path)?;
    match path {
        Some(path) => println!("Saved configuration to {}", path.display()),
        None => println!("Saved configuration to {}", Config::config_file_path()?.display()),
    }
    Ok(())
}

fn cities(path: Option<&Path>, action: CitiesCommand) -> anyhow::Result<()> {
    let mut config = load_config(path)?;

    match action {
        CitiesCommand::List => {
            for city in config.cities.iter() {
                println!("{city}");
            }
        }
        CitiesCommand::Add { name } => {
            if config.cities.add(&name) {
                save_config(&config, path)?;
                println!("{} added to the list.", name.trim());
            } else if name.trim().is_empty() {
                anyhow::bail!("City name must not be empty");
            } else {
                println!("{} is already in the list.", name.trim());
            }
        }
        CitiesCommand::Remove { name } => {
            if config.cities.remove(&name) {
                save_config(&config, path)?;
                println!("{} removed from the list.", name.trim());
            } else {
                println!("{} is not in the list.", name.trim());
            }
        }
    }

    Ok(())
}

async fn run(path: Option<&Path>, cities: Vec<String>, format: Format) -> anyhow::Result<()> {
    let config = load_config(path)?;
    let source = source_from_config(&config)?;
    let pipeline = BatchPipeline::with_options(source, config.pipeline_options());

    let cities = if cities.is_empty() {
        config.cities.clone()
    } else {
        CityList::from(cities)
    };

    let report = pipeline.run(cities.as_slice()).await;

    match format {
        Format::Table => print!("{}", output::render_table(&report)),
        Format::Json => println!(
            "{}",
            serde_json::to_string_pretty(&output::JsonReport::from(&report))
                .context("Failed to serialize results")?
        ),
    }

    if report.source_unreachable() {
        tracing::error!(cities = report.attempted(), "OpenWeather unreachable for every city");
        anyhow::bail!(
            "Could not reach OpenWeather for any of the {} cities",
            report.attempted()
        );
    }

    Ok(())
}
