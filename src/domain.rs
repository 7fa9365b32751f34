use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::LifermapError;

/// eBird-style region code: `US`, `US-CO`, `US-CO-013`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionCode(String);

impl RegionCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RegionCode {
    type Err = LifermapError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let mut segments = normalized.split('-');
        let country = segments.next().unwrap_or_default();
        let country_ok = country.len() == 2 && country.chars().all(|ch| ch.is_ascii_alphabetic());
        let rest_ok = segments.clone().all(|segment| {
            !segment.is_empty()
                && segment.len() <= 3
                && segment.chars().all(|ch| ch.is_ascii_alphanumeric())
        });
        if !country_ok || !rest_ok || segments.count() > 2 {
            return Err(LifermapError::InvalidRegionCode(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// eBird species code: lowercase alphanumeric, letter-initial (`norcar`, `rufhum2`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeciesCode(String);

impl SpeciesCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpeciesCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SpeciesCode {
    type Err = LifermapError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        let starts_with_letter = normalized
            .chars()
            .next()
            .map(|ch| ch.is_ascii_lowercase())
            .unwrap_or(false);
        let is_valid = starts_with_letter
            && normalized.len() <= 12
            && normalized.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !is_valid {
            return Err(LifermapError::InvalidSpeciesCode(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// One logical batched fetch unit: a region on a single date.
///
/// Canonical text form is `REGION/YYYY/MM/DD`, which is also the serde
/// representation so keys survive a round trip through JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueryKey {
    pub region: RegionCode,
    pub date: NaiveDate,
}

impl QueryKey {
    pub fn new(region: RegionCode, date: NaiveDate) -> Self {
        Self { region, date }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.date.format("%Y/%m/%d"))
    }
}

impl FromStr for QueryKey {
    type Err = LifermapError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (region, date) = value
            .split_once('/')
            .ok_or_else(|| LifermapError::InvalidQueryKey(value.to_string()))?;
        let date = NaiveDate::parse_from_str(date, "%Y/%m/%d")
            .map_err(|_| LifermapError::InvalidQueryKey(value.to_string()))?;
        Ok(Self {
            region: region.parse()?,
            date,
        })
    }
}

impl TryFrom<String> for QueryKey {
    type Error = LifermapError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QueryKey> for String {
    fn from(key: QueryKey) -> Self {
        key.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Deterministic bin key: `"40.1235,-105.5"` style, trailing zeros trimmed
    /// so the same coordinate always derives the same key.
    pub fn key(&self) -> String {
        format!("{},{}", trim_axis(self.lat), trim_axis(self.lng))
    }
}

fn trim_axis(value: f64) -> String {
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        return "0".to_string();
    }
    text.to_string()
}

/// One point observation as returned by the sightings API. Set once at fetch
/// time, never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(rename = "speciesCode")]
    pub species: SpeciesCode,
    #[serde(rename = "comName")]
    pub common_name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "locName")]
    pub location_name: String,
    #[serde(rename = "obsDt", with = "obs_dt")]
    pub observed_on: NaiveDate,
    #[serde(rename = "howMany", default)]
    pub how_many: Option<u32>,
}

impl Observation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// eBird serializes `obsDt` as `"2024-01-15 09:30"`; only the date part is
/// meaningful for aggregation.
mod obs_dt {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format("%Y-%m-%d"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let date_part = raw.split_whitespace().next().unwrap_or(&raw);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(de::Error::custom)
    }
}
