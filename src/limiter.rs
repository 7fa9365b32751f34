use std::collections::VecDeque;
use std::sync::Mutex;
use std::thread;

/// Runs a batch of deferred tasks with at most `max_concurrent` in flight.
///
/// Results come back slot-for-slot in submission order regardless of
/// completion order. Completion is determined by joining every worker
/// thread, never by inspecting partial result length, so a batch can only
/// return once every slot is filled. Tasks are expected to resolve rather
/// than panic; error handling is composed around each task before it is
/// handed to the limiter.
///
/// All batch state lives inside a single `run` call, so one limiter value
/// can drive independent batches without cross-batch interference.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyLimiter {
    max_concurrent: usize,
}

impl ConcurrencyLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn run<T, F>(&self, tasks: Vec<F>) -> Vec<T>
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        let total = tasks.len();
        if total == 0 {
            return Vec::new();
        }

        let queue: Mutex<VecDeque<(usize, F)>> =
            Mutex::new(tasks.into_iter().enumerate().collect());
        let slots: Mutex<Vec<Option<T>>> = Mutex::new((0..total).map(|_| None).collect());
        let workers = self.max_concurrent.min(total);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let next = queue
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .pop_front();
                        let Some((index, task)) = next else {
                            break;
                        };
                        let outcome = task();
                        slots
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())[index] =
                            Some(outcome);
                    }
                });
            }
        });

        slots
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .into_iter()
            .map(|slot| slot.expect("every worker joined, so every slot is filled"))
            .collect()
    }
}
