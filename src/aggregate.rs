use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{Coordinate, Observation};

/// Aggregation bucket for one map location. Created on the first observation
/// at its key; later observations only append. Bins live for a single
/// rendering pass and are rebuilt from scratch on re-filtering.
#[derive(Debug, Clone, Serialize)]
pub struct LocationBin {
    pub key: String,
    pub coord: Coordinate,
    pub label: String,
    pub observations: Vec<Observation>,
}

/// Groups observations by `key_fn`. The representative coordinate and label
/// come from the first observation seen at each key; later observations at
/// the same key never overwrite them.
pub fn aggregate<F>(items: Vec<Observation>, key_fn: F) -> HashMap<String, LocationBin>
where
    F: Fn(&Observation) -> String,
{
    let mut bins: HashMap<String, LocationBin> = HashMap::new();
    for obs in items {
        let key = key_fn(&obs);
        let bin = bins.entry(key.clone()).or_insert_with(|| LocationBin {
            key,
            coord: obs.coordinate(),
            label: obs.location_name.clone(),
            observations: Vec::new(),
        });
        bin.observations.push(obs);
    }
    bins
}

/// Default grouping: exact coordinate key (`"40.123,-105.5"`).
pub fn aggregate_by_coordinate(items: Vec<Observation>) -> HashMap<String, LocationBin> {
    aggregate(items, |obs| obs.coordinate().key())
}

/// Rebuilds the display list for one rendering pass: each bin's observations
/// filtered against `predicate`, bins left empty dropped, output sorted
/// ascending by observation count so high-density bins render last (on top
/// of overlapping markers). Pure and repeatable, so the UI can re-invoke it
/// on every filter-control change.
pub fn filter_bins<'a, I, P>(bins: I, predicate: P) -> Vec<LocationBin>
where
    I: IntoIterator<Item = &'a LocationBin>,
    P: Fn(&Observation) -> bool,
{
    let mut display: Vec<LocationBin> = bins
        .into_iter()
        .filter_map(|bin| {
            let observations: Vec<Observation> = bin
                .observations
                .iter()
                .filter(|obs| predicate(obs))
                .cloned()
                .collect();
            if observations.is_empty() {
                return None;
            }
            Some(LocationBin {
                key: bin.key.clone(),
                coord: bin.coord,
                label: bin.label.clone(),
                observations,
            })
        })
        .collect();
    display.sort_by(|a, b| {
        a.observations
            .len()
            .cmp(&b.observations.len())
            .then_with(|| a.key.cmp(&b.key))
    });
    display
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn obs(species: &str, lat: f64, lng: f64, label: &str, year: i32) -> Observation {
        Observation {
            species: species.parse().unwrap(),
            common_name: species.to_string(),
            lat,
            lng,
            location_name: label.to_string(),
            observed_on: NaiveDate::from_ymd_opt(year, 6, 1).unwrap(),
            how_many: Some(1),
        }
    }

    #[test]
    fn first_observation_wins_label_and_coordinate() {
        let items = vec![
            obs("norcar", 1.0, 1.0, "A", 2024),
            obs("amecro", 1.0, 1.0, "B", 2024),
        ];
        let bins = aggregate_by_coordinate(items);
        assert_eq!(bins.len(), 1);
        let bin = &bins["1,1"];
        assert_eq!(bin.label, "A");
        assert_eq!(bin.observations.len(), 2);
    }

    #[test]
    fn distinct_coordinates_get_distinct_bins() {
        let items = vec![
            obs("norcar", 1.0, 1.0, "A", 2024),
            obs("norcar", 2.0, 2.0, "B", 2024),
        ];
        let bins = aggregate_by_coordinate(items);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins["2,2"].label, "B");
    }

    #[test]
    fn repeated_aggregation_is_deterministic() {
        let items = vec![
            obs("norcar", 40.123450, -105.5, "Sawhill", 2024),
            obs("amecro", 40.123450, -105.5, "Other", 2023),
        ];
        let first = aggregate_by_coordinate(items.clone());
        let second = aggregate_by_coordinate(items);
        assert_eq!(
            first.keys().collect::<Vec<_>>(),
            second.keys().collect::<Vec<_>>()
        );
        assert_eq!(first["40.12345,-105.5"].label, "Sawhill");
    }

    #[test]
    fn filter_drops_emptied_bins_and_sorts_by_count() {
        let items = vec![
            obs("norcar", 1.0, 1.0, "A", 2024),
            obs("norcar", 1.0, 1.0, "A", 2024),
            obs("amecro", 2.0, 2.0, "B", 2024),
            obs("dowwoo", 3.0, 3.0, "C", 2019),
        ];
        let bins = aggregate_by_coordinate(items);
        let display = filter_bins(bins.values(), |obs| obs.observed_on.format("%Y").to_string() == "2024");
        assert_eq!(display.len(), 2);
        // Ascending by count: the single-observation bin first.
        assert_eq!(display[0].key, "2,2");
        assert_eq!(display[1].key, "1,1");
    }

    #[test]
    fn filtering_twice_matches_filtering_once() {
        let items = vec![
            obs("norcar", 1.0, 1.0, "A", 2024),
            obs("amecro", 1.0, 1.0, "A", 2023),
            obs("dowwoo", 2.0, 2.0, "B", 2024),
        ];
        let bins = aggregate_by_coordinate(items);
        let predicate =
            |obs: &Observation| obs.observed_on >= NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let once = filter_bins(bins.values(), predicate);
        let twice = filter_bins(&once, predicate);
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.key, b.key);
            assert_eq!(a.observations, b.observations);
        }
    }
}
