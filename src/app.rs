use serde::Serialize;

use crate::aggregate::{self, LocationBin};
use crate::batch::{BatchCoordinator, ProgressSink};
use crate::config::ResolvedConfig;
use crate::domain::{Observation, QueryKey};
use crate::ebird::SightingsClient;
use crate::retry::DiagnosticSink;

/// Per-key summary, in submission order. A zero count covers both "nothing
/// observed" and "retries exhausted"; the batch contract deliberately does
/// not distinguish them.
#[derive(Debug, Clone, Serialize)]
pub struct KeyReport {
    pub key: QueryKey,
    pub observations: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub total_keys: usize,
    pub total_observations: usize,
    pub keys: Vec<KeyReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub report: FetchReport,
    /// Display-ordered bins: ascending by observation count so dense bins
    /// render last.
    pub bins: Vec<LocationBin>,
}

pub struct App<C: SightingsClient> {
    client: C,
}

impl<C: SightingsClient> App<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Runs one full batch: expand config into query keys, fetch them under
    /// the concurrency bound, aggregate every observation into location
    /// bins.
    pub fn run(
        &self,
        config: &ResolvedConfig,
        progress: &dyn ProgressSink,
        diagnostics: &dyn DiagnosticSink,
    ) -> FetchOutcome {
        let queries = config.query_keys();
        let wanted = config.wanted();

        tracing::info!(
            keys = queries.len(),
            concurrency = config.concurrency,
            "batch.start"
        );
        let coordinator = BatchCoordinator::new(&self.client, config.retry, config.concurrency);
        let mut results = coordinator.fetch_all(&queries, &wanted, progress, diagnostics);

        // Flatten in submission order so bin labels are deterministic
        // (first observation wins the label).
        let mut keys = Vec::with_capacity(queries.len());
        let mut all_observations: Vec<Observation> = Vec::new();
        for key in &queries {
            let items = results.remove(key).unwrap_or_default();
            keys.push(KeyReport {
                key: key.clone(),
                observations: items.len(),
            });
            all_observations.extend(items);
        }

        let total_observations = all_observations.len();
        let bins_by_key = aggregate::aggregate_by_coordinate(all_observations);
        let bins = aggregate::filter_bins(bins_by_key.values(), |_| true);

        tracing::info!(
            observations = total_observations,
            bins = bins.len(),
            "batch.done"
        );
        FetchOutcome {
            report: FetchReport {
                total_keys: queries.len(),
                total_observations,
                keys,
            },
            bins,
        }
    }
}
