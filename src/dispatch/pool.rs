//! Bounded worker pool that drives one retrying fetch per batch.

use crate::client::http::FrequencyClient;
use crate::client::record::FrequencyRecord;
use crate::dispatch::batch::Batch;
use crate::runtime::telemetry::RunTelemetry;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Terminal result for one dispatched batch. Failures are permanent: the
/// fetcher has already exhausted its retries or hit a malformed body.
#[derive(Debug)]
pub enum BatchOutcome {
    Fulfilled {
        batch: usize,
        records: Vec<FrequencyRecord>,
    },
    Failed {
        batch: usize,
        error: anyhow::Error,
    },
}

impl BatchOutcome {
    pub fn batch(&self) -> usize {
        match self {
            BatchOutcome::Fulfilled { batch, .. } | BatchOutcome::Failed { batch, .. } => *batch,
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, BatchOutcome::Fulfilled { .. })
    }
}

/// Everything a run produced: one outcome per dispatched batch, plus whether
/// every batch was dispatched and succeeded.
#[derive(Debug)]
pub struct DispatchOutcomes {
    outcomes: Vec<BatchOutcome>,
    complete: bool,
}

impl DispatchOutcomes {
    pub fn outcomes(&self) -> &[BatchOutcome] {
        &self.outcomes
    }

    pub fn complete(&self) -> bool {
        self.complete
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.is_fulfilled())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Flattens the records of every fulfilled batch, consuming the outcomes.
    pub fn into_records(self) -> Vec<FrequencyRecord> {
        self.outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                BatchOutcome::Fulfilled { records, .. } => Some(records),
                BatchOutcome::Failed { .. } => None,
            })
            .flatten()
            .collect()
    }
}

/// Runs fetches over all batches with at most `workers` in flight at once.
///
/// The pending counter is advisory (logging only) and scoped to one call of
/// [`DispatchPool::run`]. Cancellation stops handing out new batches; batches
/// already in flight run to completion.
pub struct DispatchPool {
    client: Arc<dyn FrequencyClient>,
    workers: usize,
    telemetry: Arc<RunTelemetry>,
    cancellation: CancellationToken,
}

impl DispatchPool {
    pub fn new(
        client: Arc<dyn FrequencyClient>,
        workers: usize,
        telemetry: Arc<RunTelemetry>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            client,
            workers: workers.max(1),
            telemetry,
            cancellation,
        }
    }

    /// Dispatches every batch and blocks until all workers have drained,
    /// success or failure. No background work survives the return.
    pub async fn run(&self, batches: Vec<Batch>) -> DispatchOutcomes {
        let total = batches.len();
        if total == 0 {
            return DispatchOutcomes {
                outcomes: Vec::new(),
                complete: true,
            };
        }

        let pending = Arc::new(AtomicUsize::new(total));
        let queue = Arc::new(Mutex::new(VecDeque::from(batches)));
        let collected = Arc::new(Mutex::new(Vec::with_capacity(total)));

        let worker_count = self.workers.min(total);
        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let client = self.client.clone();
            let telemetry = self.telemetry.clone();
            let cancellation = self.cancellation.clone();
            let pending = pending.clone();
            let queue = queue.clone();
            let collected = collected.clone();

            handles.push(tokio::spawn(async move {
                worker_loop(
                    worker_id,
                    client,
                    telemetry,
                    cancellation,
                    pending,
                    queue,
                    collected,
                )
                .await;
            }));
        }

        let mut worker_failed = false;
        for (worker_id, handle) in handles.into_iter().enumerate() {
            if let Err(err) = handle.await {
                tracing::error!(worker = worker_id, error = %err, "dispatch worker panicked");
                worker_failed = true;
            }
        }

        let outcomes = match Arc::try_unwrap(collected) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()),
            // All workers are joined, so the Arc is unique; this arm is
            // unreachable but keeps the path panic-free.
            Err(shared) => {
                let mut guard = shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                std::mem::take(&mut *guard)
            }
        };

        let complete = !worker_failed
            && outcomes.len() == total
            && outcomes.iter().all(BatchOutcome::is_fulfilled);

        DispatchOutcomes { outcomes, complete }
    }
}

async fn worker_loop(
    worker_id: usize,
    client: Arc<dyn FrequencyClient>,
    telemetry: Arc<RunTelemetry>,
    cancellation: CancellationToken,
    pending: Arc<AtomicUsize>,
    queue: Arc<Mutex<VecDeque<Batch>>>,
    collected: Arc<Mutex<Vec<BatchOutcome>>>,
) {
    loop {
        if cancellation.is_cancelled() {
            tracing::info!(worker = worker_id, "cancellation requested; exiting worker loop");
            break;
        }

        let batch = match queue.lock() {
            Ok(mut guard) => guard.pop_front(),
            Err(_) => break,
        };
        let Some(batch) = batch else {
            break;
        };

        let started = Instant::now();
        let result = client.fetch_batch(&batch).await;
        let remaining = pending.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(records) => {
                telemetry.record_batch_success(records.len() as u64);
                tracing::info!(
                    worker = worker_id,
                    batch = batch.index(),
                    keys = batch.len(),
                    records = records.len(),
                    elapsed_ms,
                    remaining,
                    "batch annotated"
                );
                BatchOutcome::Fulfilled {
                    batch: batch.index(),
                    records,
                }
            }
            Err(error) => {
                telemetry.record_batch_failure();
                tracing::warn!(
                    worker = worker_id,
                    batch = batch.index(),
                    keys = batch.len(),
                    elapsed_ms,
                    remaining,
                    error = %error,
                    "batch failed permanently"
                );
                BatchOutcome::Failed {
                    batch: batch.index(),
                    error,
                }
            }
        };

        if let Ok(mut guard) = collected.lock() {
            guard.push(outcome);
        }
    }
}
