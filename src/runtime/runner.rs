use crate::client::http::{AlfaClient, FrequencyClient};
use crate::dispatch::batch::partition;
use crate::dispatch::pool::DispatchPool;
use crate::runtime::config::AnnotatorConfig;
use crate::runtime::telemetry::RunTelemetry;
use crate::table::merge::merge_records;
use crate::table::tsv::Table;
use crate::table::variant::extract_unique_keys;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// What one annotation run did, for callers that want more than logs.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rows: usize,
    pub unique_keys: usize,
    pub total_batches: usize,
    pub batches_succeeded: usize,
    pub batches_failed: usize,
    pub records_fetched: usize,
    pub complete: bool,
    pub elapsed: Duration,
}

/// Coordinates one run: read table, extract identifiers, dispatch batches,
/// merge whatever succeeded, write the augmented table.
///
/// A run with permanently failed batches still writes partial annotations and
/// returns `Ok` with `complete = false`; only input and output-write failures
/// are fatal.
pub struct Annotator {
    config: AnnotatorConfig,
    shutdown: CancellationToken,
}

impl Annotator {
    pub fn new(config: AnnotatorConfig) -> Self {
        Self::with_cancellation_token(config, CancellationToken::new())
    }

    pub fn with_cancellation_token(config: AnnotatorConfig, shutdown: CancellationToken) -> Self {
        Self { config, shutdown }
    }

    /// Returns a clone of the run's shutdown token so callers can wire their
    /// own signal handling. Cancelling it stops dispatching new batches;
    /// in-flight batches finish and their results are still merged.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let client = AlfaClient::with_cancellation(
            self.config.endpoint_url(),
            self.config.client_options(),
            self.shutdown.clone(),
        )?;
        self.run_with_client(Arc::new(client)).await
    }

    /// Same as [`Annotator::run`] with an injected lookup client.
    pub async fn run_with_client(&self, client: Arc<dyn FrequencyClient>) -> Result<RunSummary> {
        let started = Instant::now();

        let input = std::fs::read_to_string(self.config.input_path())
            .with_context(|| format!("failed to read input table {}", self.config.input_path()))?;
        let mut table = Table::parse(&input)
            .with_context(|| format!("failed to parse input table {}", self.config.input_path()))?;
        let keys = extract_unique_keys(&table)?;

        tracing::info!(
            rows = table.row_count(),
            unique_keys = keys.len(),
            "extracted unique identifiers from input table"
        );

        let rows = table.row_count();
        let unique_keys = keys.len();
        let batches = partition(keys, self.config.batch_capacity());
        let total_batches = batches.len();

        let telemetry = Arc::new(RunTelemetry::default());
        let pool = DispatchPool::new(
            client,
            self.config.worker_count(),
            telemetry.clone(),
            self.shutdown.clone(),
        );

        tracing::info!(
            batches = total_batches,
            capacity = self.config.batch_capacity(),
            workers = self.config.worker_count(),
            "dispatching lookup batches"
        );
        let outcomes = pool.run(batches).await;

        let complete = outcomes.complete();
        let records = outcomes.into_records();

        merge_records(&mut table, &records)?;
        std::fs::write(self.config.output_path(), table.to_tsv()).with_context(|| {
            format!(
                "failed to write output table {}",
                self.config.output_path()
            )
        })?;

        let snapshot = telemetry.snapshot();
        let summary = RunSummary {
            rows,
            unique_keys,
            total_batches,
            batches_succeeded: snapshot.batches_succeeded as usize,
            batches_failed: snapshot.batches_failed as usize,
            records_fetched: snapshot.records_fetched as usize,
            complete,
            elapsed: started.elapsed(),
        };

        if summary.complete {
            tracing::info!(
                batches = summary.total_batches,
                succeeded = summary.batches_succeeded,
                records = summary.records_fetched,
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "annotation run complete"
            );
        } else {
            tracing::warn!(
                batches = summary.total_batches,
                succeeded = summary.batches_succeeded,
                failed = summary.batches_failed,
                records = summary.records_fetched,
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "annotation run completed with failed batches; output holds partial annotations"
            );
        }

        Ok(summary)
    }
}
