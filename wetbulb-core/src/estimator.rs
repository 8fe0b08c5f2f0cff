//! Wet bulb temperature from dry bulb temperature and relative humidity.
//!
//! Uses Stull's (2011) empirical fit. The fit was derived for sea-level
//! pressure and is most accurate for `5% <= rh <= 99%` and `-20 °C <= T <= 50 °C`;
//! outside that band it still returns a finite value but accuracy degrades.

use thiserror::Error;

/// Rejected estimator arguments.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidInput {
    #[error("invalid input: relative humidity {0}% is outside 0..=100")]
    HumidityOutOfRange(f64),

    #[error("invalid input: temperature is not a finite number ({0})")]
    NonFiniteTemperature(f64),

    #[error("invalid input: relative humidity is not a finite number ({0})")]
    NonFiniteHumidity(f64),
}

/// Lowest accepted relative humidity, in percent.
pub const MIN_HUMIDITY: f64 = 0.0;

/// Highest accepted relative humidity, in percent.
pub const MAX_HUMIDITY: f64 = 100.0;

/// Estimate the wet bulb temperature in °C.
///
/// `temperature` is the air temperature in °C and `relative_humidity` is in
/// percent. Humidity must lie in `0..=100` and both values must be finite.
///
/// ```
/// let tw = wetbulb_core::estimate(30.0, 70.0).unwrap();
/// assert!((tw - 25.6).abs() < 0.05);
/// ```
pub fn estimate(temperature: f64, relative_humidity: f64) -> Result<f64, InvalidInput> {
    validate(temperature, relative_humidity)?;

    let t = temperature;
    let rh = relative_humidity;

    let tw = t * (0.152 * (rh + 8.3136).sqrt()).atan() + (t + rh).atan() - (rh - 1.6763).atan()
        + 0.00391838 * rh.powf(1.5) * (0.0231 * rh).atan()
        - 4.686;

    Ok(tw)
}

fn validate(temperature: f64, relative_humidity: f64) -> Result<(), InvalidInput> {
    if !temperature.is_finite() {
        return Err(InvalidInput::NonFiniteTemperature(temperature));
    }
    if !relative_humidity.is_finite() {
        return Err(InvalidInput::NonFiniteHumidity(relative_humidity));
    }
    if !(MIN_HUMIDITY..=MAX_HUMIDITY).contains(&relative_humidity) {
        return Err(InvalidInput::HumidityOutOfRange(relative_humidity));
    }
    Ok(())
}
