use serde::Serialize;
use std::fmt::Write;

use wetbulb_core::{BatchReport, ResultSet};

pub fn render_single(temperature: f64, humidity: f64, wet_bulb: f64) -> String {
    format!("T = {temperature:.1} °C, RH = {humidity:.0}% -> wet bulb {wet_bulb:.1} °C")
}

/// Results as an aligned table followed by a list of skipped cities.
pub fn render_table(report: &BatchReport) -> String {
    let mut out = String::new();

    if report.results.is_empty() {
        out.push_str("No results.\n");
    } else {
        let width = report
            .results
            .iter()
            .map(|r| r.city.chars().count())
            .max()
            .unwrap_or(0)
            .max("City".len());

        let _ = writeln!(
            out,
            "{:<width$}  {:>9}  {:>6}  {:>13}  {}",
            "City", "Temp (°C)", "RH (%)", "Wet bulb (°C)", "Observed (UTC)"
        );
        for r in &report.results {
            let _ = writeln!(
                out,
                "{:<width$}  {:>9.1}  {:>6.0}  {:>13.1}  {}",
                r.city,
                r.temperature,
                r.relative_humidity,
                r.wet_bulb,
                r.observed_at.format("%Y-%m-%d %H:%M"),
            );
        }
    }

    if !report.failures.is_empty() {
        let _ = writeln!(out, "\nSkipped {} of {}:", report.failures.len(), report.attempted());
        for f in &report.failures {
            let _ = writeln!(out, "  - {}: {}", f.city, f.error);
        }
    }

    out
}

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub results: &'a ResultSet,
    pub failures: Vec<JsonFailure<'a>>,
}

#[derive(Debug, Serialize)]
pub struct JsonFailure<'a> {
    pub position: usize,
    pub city: &'a str,
    pub error: String,
}

impl<'a> From<&'a BatchReport> for JsonReport<'a> {
    fn from(report: &'a BatchReport) -> Self {
        Self {
            results: &report.results,
            failures: report
                .failures
                .iter()
                .map(|f| JsonFailure {
                    position: f.position,
                    city: &f.city,
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}
