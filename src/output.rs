use std::io::{self, Write};

use serde::Serialize;
use serde_json::{Value, json};

use crate::aggregate::LocationBin;
use crate::app::FetchOutcome;
use crate::batch::ProgressSink;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_outcome(outcome: &FetchOutcome) -> io::Result<()> {
        Self::print_json(outcome)
    }

    pub fn print_geojson(bins: &[LocationBin]) -> io::Result<()> {
        Self::print_json(&bins_to_geojson(bins))
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn progress(&self, _completed: usize, _total: usize) {}
}

/// Textual progress indicator for interactive runs.
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn progress(&self, completed: usize, total: usize) {
        eprintln!("fetched {completed}/{total}");
    }
}

/// FeatureCollection hand-off for the map rendering collaborator: one Point
/// feature per bin, GeoJSON positions in `[lng, lat]` order.
pub fn bins_to_geojson(bins: &[LocationBin]) -> Value {
    let features: Vec<Value> = bins
        .iter()
        .map(|bin| {
            let species: Vec<&str> = bin
                .observations
                .iter()
                .map(|obs| obs.species.as_str())
                .collect();
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [bin.coord.lng, bin.coord.lat],
                },
                "properties": {
                    "key": bin.key,
                    "label": bin.label,
                    "count": bin.observations.len(),
                    "species": species,
                },
            })
        })
        .collect();
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}
