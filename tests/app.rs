use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::NaiveDate;

use lifermap::app::App;
use lifermap::batch::NoopProgress;
use lifermap::config::{RegionRequest, ResolvedConfig};
use lifermap::domain::{Observation, QueryKey};
use lifermap::ebird::SightingsClient;
use lifermap::error::LifermapError;
use lifermap::retry::{DiagnosticSink, NoopDiagnostics, RetryPolicy};

fn observation(species: &str, lat: f64, lng: f64, label: &str) -> Observation {
    Observation {
        species: species.parse().unwrap(),
        common_name: species.to_string(),
        lat,
        lng,
        location_name: label.to_string(),
        observed_on: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        how_many: Some(1),
    }
}

fn config(regions: Vec<RegionRequest>, start: NaiveDate, end: NaiveDate) -> ResolvedConfig {
    ResolvedConfig {
        schema_version: 1,
        regions,
        start,
        end,
        concurrency: 2,
        retry: RetryPolicy {
            retries: 1,
            delay: Duration::from_millis(1),
        },
    }
}

struct MapClient {
    responses: HashMap<String, Vec<Observation>>,
}

impl SightingsClient for MapClient {
    fn fetch_observations(&self, key: &QueryKey) -> Result<Vec<Observation>, LifermapError> {
        match self.responses.get(&key.to_string()) {
            Some(items) => Ok(items.clone()),
            None => Err(LifermapError::EbirdHttp("no route".to_string())),
        }
    }
}

struct CountingDiagnostics {
    failures: Mutex<usize>,
}

impl DiagnosticSink for CountingDiagnostics {
    fn attempt_failed(&self, _attempt: u32, _error: &LifermapError) {
        *self.failures.lock().unwrap() += 1;
    }
}

#[test]
fn end_to_end_fetch_and_binning() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();

    let mut responses = HashMap::new();
    // Two observations share a coordinate; the first key's label wins.
    responses.insert(
        "US-CO/2024/01/15".to_string(),
        vec![
            observation("norcar", 40.0, -105.0, "Sawhill Ponds"),
            observation("amecro", 41.0, -106.0, "Lone Spot"),
        ],
    );
    responses.insert(
        "US-CO/2024/01/16".to_string(),
        vec![
            observation("dowwoo", 40.0, -105.0, "Renamed Ponds"),
            observation("dowwoo", 40.0, -105.0, "Renamed Ponds"),
        ],
    );
    let client = MapClient { responses };
    let app = App::new(client);

    let config = config(
        vec![RegionRequest {
            region: "US-CO".parse().unwrap(),
            species: Vec::new(),
        }],
        start,
        end,
    );
    let outcome = app.run(&config, &NoopProgress, &NoopDiagnostics);

    assert_eq!(outcome.report.total_keys, 2);
    assert_eq!(outcome.report.total_observations, 4);
    assert_eq!(outcome.report.keys[0].observations, 2);
    assert_eq!(outcome.report.keys[1].observations, 2);

    // Bins ascend by count; the dense shared-coordinate bin comes last and
    // keeps the label of the first observation that created it.
    assert_eq!(outcome.bins.len(), 2);
    assert_eq!(outcome.bins[0].observations.len(), 1);
    assert_eq!(outcome.bins[1].key, "40,-105");
    assert_eq!(outcome.bins[1].observations.len(), 3);
    assert_eq!(outcome.bins[1].label, "Sawhill Ponds");
}

#[test]
fn failed_keys_degrade_to_empty_reports() {
    let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    let client = MapClient {
        responses: HashMap::new(),
    };
    let app = App::new(client);
    let diagnostics = CountingDiagnostics {
        failures: Mutex::new(0),
    };

    let config = config(
        vec![RegionRequest {
            region: "US-CO".parse().unwrap(),
            species: Vec::new(),
        }],
        date,
        date,
    );
    let outcome = app.run(&config, &NoopProgress, &diagnostics);

    assert_eq!(outcome.report.total_keys, 1);
    assert_eq!(outcome.report.total_observations, 0);
    assert_eq!(outcome.report.keys[0].observations, 0);
    assert!(outcome.bins.is_empty());
    // One attempt plus one retry went through the diagnostic sink.
    assert_eq!(*diagnostics.failures.lock().unwrap(), 2);
}

#[test]
fn wanted_species_narrow_the_batch() {
    let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    let mut responses = HashMap::new();
    responses.insert(
        "US-CO/2024/01/15".to_string(),
        vec![
            observation("norcar", 40.0, -105.0, "Sawhill Ponds"),
            observation("amecro", 40.0, -105.0, "Sawhill Ponds"),
        ],
    );
    let client = MapClient { responses };
    let app = App::new(client);

    let config = config(
        vec![RegionRequest {
            region: "US-CO".parse().unwrap(),
            species: vec!["norcar".parse().unwrap()],
        }],
        date,
        date,
    );
    let outcome = app.run(&config, &NoopProgress, &NoopDiagnostics);

    assert_eq!(outcome.report.total_observations, 1);
    assert_eq!(outcome.bins.len(), 1);
    assert_eq!(outcome.bins[0].observations[0].species.as_str(), "norcar");
}
