use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::estimator::{InvalidInput, estimate};

/// Unit system requested from the weather provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub const fn all() -> &'static [Units] {
        &[Units::Metric, Units::Imperial]
    }

    /// Convert a temperature reported in these units to °C.
    pub fn to_celsius(&self, value: f64) -> f64 {
        match self {
            Units::Metric => value,
            Units::Imperial => (value - 32.0) * 5.0 / 9.0,
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            _ => Err(anyhow::anyhow!("Unknown units '{value}'. Supported units: metric, imperial.")),
        }
    }
}

/// One temperature/humidity reading for a city. Temperature is always in °C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub city: String,
    pub temperature: f64,
    pub relative_humidity: f64,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WetBulbResult {
    pub city: String,
    pub temperature: f64,
    pub relative_humidity: f64,
    pub wet_bulb: f64,
    pub observed_at: DateTime<Utc>,
}

impl WetBulbResult {
    pub fn from_observation(obs: Observation) -> Result<Self, InvalidInput> {
        let wet_bulb = estimate(obs.temperature, obs.relative_humidity)?;

        Ok(Self {
            city: obs.city,
            temperature: obs.temperature,
            relative_humidity: obs.relative_humidity,
            wet_bulb,
            observed_at: obs.observed_at,
        })
    }
}

/// Successfully processed cities, in the order they were requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultSet(Vec<WetBulbResult>);

impl ResultSet {
    pub(crate) fn push(&mut self, result: WetBulbResult) {
        self.0.push(result);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WetBulbResult> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[WetBulbResult] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a WetBulbResult;
    type IntoIter = std::slice::Iter<'a, WetBulbResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ordered list of city names to process.
///
/// Owned by the caller and passed to the pipeline on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityList(Vec<String>);

impl CityList {
    pub fn new(cities: Vec<String>) -> Self {
        Self(cities)
    }

    /// Append `city` unless an identical name is already present.
    ///
    /// Returns `true` if the list changed.
    pub fn add(&mut self, city: &str) -> bool {
        let city = city.trim();
        if city.is_empty() || self.contains(city) {
            return false;
        }
        self.0.push(city.to_string());
        true
    }

    /// Remove every entry equal to `city`. Returns `true` if anything was removed.
    pub fn remove(&mut self, city: &str) -> bool {
        let city = city.trim();
        let before = self.0.len();
        self.0.retain(|c| c != city);
        self.0.len() != before
    }

    pub fn contains(&self, city: &str) -> bool {
        self.0.iter().any(|c| c == city)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Default for CityList {
    fn default() -> Self {
        Self(
            [
                "Chennai",
                "Bangalore",
                "Hyderabad",
                "Kochi",
                "Coimbatore",
                "Puducherry",
                "Alappuzha",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        )
    }
}

impl From<Vec<String>> for CityList {
    fn from(cities: Vec<String>) -> Self {
        Self::new(cities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(city: &str, temperature: f64, relative_humidity: f64) -> Observation {
        Observation {
            city: city.to_string(),
            temperature,
            relative_humidity,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn result_carries_observation_fields() {
        let o = obs("Kochi", 30.0, 70.0);
        let at = o.observed_at;
        let r = WetBulbResult::from_observation(o).unwrap();

        assert_eq!(r.city, "Kochi");
        assert_eq!(r.temperature, 30.0);
        assert_eq!(r.relative_humidity, 70.0);
        assert_eq!(r.wet_bulb, estimate(30.0, 70.0).unwrap());
        assert_eq!(r.observed_at, at);
    }

    #[test]
    fn result_rejects_invalid_humidity() {
        let err = WetBulbResult::from_observation(obs("X", 30.0, 120.0)).unwrap_err();
        assert_eq!(err, InvalidInput::HumidityOutOfRange(120.0));
    }

    #[test]
    fn city_list_add_is_append_if_absent() {
        let mut list = CityList::new(vec!["Chennai".into()]);

        assert!(list.add("Mumbai"));
        assert!(!list.add("Mumbai"));
        assert!(!list.add("  Chennai "));
        assert_eq!(list.as_slice(), ["Chennai", "Mumbai"]);
    }

    #[test]
    fn city_list_refuses_blank_names() {
        let mut list = CityList::new(Vec::new());
        assert!(!list.add(""));
        assert!(!list.add("   "));
        assert!(list.is_empty());
    }

    #[test]
    fn city_list_remove() {
        let mut list = CityList::new(vec!["A".into(), "B".into(), "A".into()]);
        assert!(list.remove("A"));
        assert!(!list.remove("A"));
        assert_eq!(list.as_slice(), ["B"]);
    }

    #[test]
    fn city_list_from_vec_keeps_duplicates_in_order() {
        let list = CityList::from(vec!["A".to_string(), "B".to_string(), "A".to_string()]);
        assert_eq!(list.as_slice(), ["A", "B", "A"]);
    }

    #[test]
    fn default_city_list_has_initial_cities() {
        let list = CityList::default();
        assert_eq!(list.len(), 7);
        assert_eq!(list.iter().next().map(String::as_str), Some("Chennai"));
        assert!(list.contains("Alappuzha"));
    }

    #[test]
    fn units_roundtrip_and_conversion() {
        for u in Units::all() {
            assert_eq!(Units::try_from(u.as_str()).unwrap(), *u);
        }
        assert!(Units::try_from("kelvin").is_err());
        assert_eq!(Units::Metric.to_celsius(21.5), 21.5);
        assert!((Units::Imperial.to_celsius(212.0) - 100.0).abs() < 1.0e-9);
        assert!((Units::Imperial.to_celsius(32.0)).abs() < 1.0e-9);
    }

    #[test]
    fn result_set_serializes_as_array() {
        let mut set = ResultSet::default();
        set.push(WetBulbResult::from_observation(obs("A", 30.0, 70.0)).unwrap());

        let json = serde_json::to_value(&set).unwrap();
        let arr = json.as_array().expect("array");
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0]["city"], "A");
        assert!(arr[0]["wet_bulb"].is_number());
    }
}
