use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Rolling counters for one annotation run, read for the summary line.
#[derive(Default, Debug)]
pub struct RunTelemetry {
    batches_succeeded: AtomicU64,
    batches_failed: AtomicU64,
    records_fetched: AtomicU64,
}

impl RunTelemetry {
    pub fn record_batch_success(&self, records: u64) {
        self.batches_succeeded.fetch_add(1, Ordering::Relaxed);
        self.records_fetched.fetch_add(records, Ordering::Relaxed);
    }

    pub fn record_batch_failure(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            batches_succeeded: self.batches_succeeded.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            records_fetched: self.records_fetched.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub batches_succeeded: u64,
    pub batches_failed: u64,
    pub records_fetched: u64,
}
