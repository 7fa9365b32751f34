use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::batch::WantedIdSet;
use crate::domain::{QueryKey, RegionCode, SpeciesCode};
use crate::error::LifermapError;
use crate::retry::RetryPolicy;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub regions: Vec<RegionEntry>,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default)]
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RegionEntry {
    Shorthand(String),
    Detailed(RegionEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RegionEntryObject {
    pub region: String,
    /// Species codes to keep for this region; empty means keep everything.
    #[serde(default)]
    pub species: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RegionRequest {
    pub region: RegionCode,
    pub species: Vec<SpeciesCode>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub regions: Vec<RegionRequest>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl ResolvedConfig {
    /// Region × date cross product, one query key per fetch unit, in config
    /// order for progress totals.
    pub fn query_keys(&self) -> Vec<QueryKey> {
        let mut keys = Vec::new();
        for request in &self.regions {
            let mut date = self.start;
            while date <= self.end {
                keys.push(QueryKey::new(request.region.clone(), date));
                let Some(next) = date.succ_opt() else { break };
                date = next;
            }
        }
        keys
    }

    pub fn wanted(&self) -> WantedIdSet {
        let mut wanted = WantedIdSet::new();
        for request in &self.regions {
            if request.species.is_empty() {
                continue;
            }
            let mut date = self.start;
            while date <= self.end {
                wanted.insert(
                    QueryKey::new(request.region.clone(), date),
                    request.species.clone(),
                );
                let Some(next) = date.succ_opt() else { break };
                date = next;
            }
        }
        wanted
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, LifermapError> {
        Self::load(path).and_then(Self::resolve_config)
    }

    pub fn load(path: Option<&str>) -> Result<Config, LifermapError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("lifermap.json"),
        };

        if path.is_none() && !config_path.exists() {
            return Err(LifermapError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| LifermapError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| LifermapError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, LifermapError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let regions = config
            .regions
            .into_iter()
            .map(|entry| match entry {
                RegionEntry::Shorthand(value) => Ok(RegionRequest {
                    region: value.parse()?,
                    species: Vec::new(),
                }),
                RegionEntry::Detailed(obj) => Ok(RegionRequest {
                    region: obj.region.parse()?,
                    species: obj
                        .species
                        .iter()
                        .map(|code| code.parse())
                        .collect::<Result<Vec<_>, LifermapError>>()?,
                }),
            })
            .collect::<Result<Vec<_>, LifermapError>>()?;

        let end = config.end.unwrap_or_else(today);
        let start = config
            .start
            .unwrap_or_else(|| end - chrono::Days::new(6));
        if start > end {
            return Err(LifermapError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let retry = RetryPolicy {
            retries: config.retries.unwrap_or(RetryPolicy::default().retries),
            delay: config
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(RetryPolicy::default().delay),
        };

        Ok(ResolvedConfig {
            schema_version,
            regions,
            start,
            end,
            concurrency: config.concurrency.unwrap_or(4),
            retry,
        })
    }
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Starter config written by `lifermap init`.
pub fn starter_config() -> Config {
    Config {
        schema_version: Some(1),
        regions: vec![RegionEntry::Shorthand("US-CO".to_string())],
        start: None,
        end: None,
        concurrency: Some(4),
        retries: Some(3),
        retry_delay_ms: Some(500),
    }
}
