use alfaquery::{init_tracing, Annotator, AnnotatorConfig};
use anyhow::Result;
use clap::Parser;
use std::time::Duration;

/// Annotates a tab-separated variant table with ALFA population allele
/// frequencies fetched from the Crowdseq lookup service.
#[derive(Debug, Parser)]
#[command(name = "alfaquery", version, about)]
struct Cli {
    /// Path to the TSV file for processing.
    #[arg(short = 'i', long = "input")]
    input: String,

    /// Path to the result TSV file.
    #[arg(short = 'o', long = "output")]
    output: String,

    /// Lookup-service endpoint URL.
    #[arg(long)]
    endpoint: Option<String>,

    /// Identifiers per remote request.
    #[arg(long = "batch-size")]
    batch_size: Option<usize>,

    /// Maximum batches in flight at once (default: parallelism - 1).
    #[arg(long)]
    workers: Option<usize>,

    /// Attempts per batch before recording a permanent failure.
    #[arg(long)]
    retries: Option<usize>,

    /// Delay before the first retry, in milliseconds.
    #[arg(long = "initial-backoff-ms")]
    initial_backoff_ms: Option<u64>,

    /// Upper bound on the retry delay, in milliseconds.
    #[arg(long = "max-backoff-ms")]
    max_backoff_ms: Option<u64>,

    /// Per-request HTTP timeout, in seconds.
    #[arg(long = "timeout-secs")]
    timeout_secs: Option<u64>,
}

impl Cli {
    fn into_config(self) -> Result<AnnotatorConfig> {
        let mut builder = AnnotatorConfig::builder()
            .input_path(self.input)
            .output_path(self.output);

        if let Some(endpoint) = self.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if let Some(capacity) = self.batch_size {
            builder = builder.batch_capacity(capacity);
        }
        if let Some(workers) = self.workers {
            builder = builder.worker_count(workers);
        }
        if let Some(retries) = self.retries {
            builder = builder.max_attempts(retries);
        }
        if let Some(millis) = self.initial_backoff_ms {
            builder = builder.initial_backoff(Duration::from_millis(millis));
        }
        if let Some(millis) = self.max_backoff_ms {
            builder = builder.max_backoff(Duration::from_millis(millis));
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }

        builder.build()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Cli::parse().into_config()?;
    let annotator = Annotator::new(config);

    let token = annotator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received; finishing in-flight batches before exit");
            token.cancel();
        }
    });

    // Degraded runs (some batches permanently failed) still exit zero; the
    // runner has already written partial annotations and logged the summary.
    annotator.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_flags() {
        let cli = Cli::parse_from([
            "alfaquery",
            "-i",
            "in.tsv",
            "-o",
            "out.tsv",
            "--batch-size",
            "100",
            "--retries",
            "3",
        ]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.input_path(), "in.tsv");
        assert_eq!(config.batch_capacity(), 100);
        assert_eq!(config.max_attempts(), 3);
    }

    #[test]
    fn rejects_invalid_overrides() {
        let cli = Cli::parse_from(["alfaquery", "-i", "in.tsv", "-o", "out.tsv", "--workers", "0"]);
        assert!(cli.into_config().is_err());
    }
}
