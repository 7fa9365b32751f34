use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::{Observation, QueryKey, SpeciesCode};
use crate::ebird::SightingsClient;
use crate::limiter::ConcurrencyLimiter;
use crate::retry::{DiagnosticSink, RetryPolicy, run_with_retry};

/// Per-key filter: only observations of these species survive. A key with no
/// entry passes through unfiltered.
pub type WantedIdSet = HashMap<QueryKey, Vec<SpeciesCode>>;

/// Invoked with `(completed, total)` after each key settles. Settlement
/// order follows completion, not submission, so consumers must not assume
/// FIFO.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, completed: usize, total: usize);
}

pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn progress(&self, _completed: usize, _total: usize) {}
}

/// Drives one retried, concurrency-limited fetch per query key.
///
/// The batch contract is total: `fetch_all` always returns an entry for
/// every input key, and a key whose retries are exhausted maps to an empty
/// vector rather than being omitted. No fetch error escapes the batch.
pub struct BatchCoordinator<'a, C: SightingsClient> {
    client: &'a C,
    policy: RetryPolicy,
    limiter: ConcurrencyLimiter,
}

impl<'a, C: SightingsClient> BatchCoordinator<'a, C> {
    pub fn new(client: &'a C, policy: RetryPolicy, concurrency: usize) -> Self {
        Self {
            client,
            policy,
            limiter: ConcurrencyLimiter::new(concurrency),
        }
    }

    pub fn fetch_all(
        &self,
        queries: &[QueryKey],
        wanted: &WantedIdSet,
        progress: &dyn ProgressSink,
        diagnostics: &dyn DiagnosticSink,
    ) -> HashMap<QueryKey, Vec<Observation>> {
        let total = queries.len();
        let completed = AtomicUsize::new(0);

        let tasks: Vec<_> = queries
            .iter()
            .map(|key| {
                let key = key.clone();
                let wanted_species = wanted.get(&key).map(Vec::as_slice);
                let completed = &completed;
                move || {
                    let items = run_with_retry(
                        || {
                            let raw = self.client.fetch_observations(&key)?;
                            Ok(filter_wanted(raw, wanted_species))
                        },
                        self.policy,
                        diagnostics,
                    );
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress.progress(done, total);
                    (key, items)
                }
            })
            .collect();

        self.limiter.run(tasks).into_iter().collect()
    }
}

fn filter_wanted(raw: Vec<Observation>, wanted: Option<&[SpeciesCode]>) -> Vec<Observation> {
    match wanted {
        Some(species) => raw
            .into_iter()
            .filter(|obs| species.contains(&obs.species))
            .collect(),
        None => raw,
    }
}
