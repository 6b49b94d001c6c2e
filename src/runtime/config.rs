use crate::client::http::DEFAULT_ENDPOINT_URL;
use crate::client::options::{
    ClientOptions, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF,
    DEFAULT_REQUEST_TIMEOUT,
};
use crate::dispatch::batch::DEFAULT_BATCH_CAPACITY;
use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Runtime configuration for one annotation run.
///
/// All instances must be constructed via [`AnnotatorConfig::builder`] or
/// [`AnnotatorConfig::new`] so invariants are validated before any consumer
/// observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatorConfig {
    input_path: String,
    output_path: String,
    endpoint_url: String,
    batch_capacity: usize,
    worker_count: usize,
    max_attempts: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
    request_timeout: Duration,
}

pub struct AnnotatorConfigParams {
    pub input_path: String,
    pub output_path: String,
    pub endpoint_url: String,
    pub batch_capacity: usize,
    pub worker_count: usize,
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub request_timeout: Duration,
}

/// One fewer worker than the machine's parallel capacity, never below one.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

impl AnnotatorConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> AnnotatorConfigBuilder {
        AnnotatorConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    ///
    /// Prefer [`AnnotatorConfig::builder`] when many values use defaults.
    pub fn new(params: AnnotatorConfigParams) -> Result<Self> {
        let AnnotatorConfigParams {
            input_path,
            output_path,
            endpoint_url,
            batch_capacity,
            worker_count,
            max_attempts,
            initial_backoff,
            max_backoff,
            request_timeout,
        } = params;

        let config = Self {
            input_path: input_path.trim().to_owned(),
            output_path: output_path.trim().to_owned(),
            endpoint_url: endpoint_url.trim().to_owned(),
            batch_capacity,
            worker_count,
            max_attempts,
            initial_backoff,
            max_backoff,
            request_timeout,
        };

        config.validate()?;
        Ok(config)
    }

    /// Path of the tab-separated input table.
    pub fn input_path(&self) -> &str {
        &self.input_path
    }

    /// Path the augmented table is written to.
    pub fn output_path(&self) -> &str {
        &self.output_path
    }

    /// Full lookup-service URL (including scheme).
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Identifiers per remote request.
    pub fn batch_capacity(&self) -> usize {
        self.batch_capacity
    }

    /// Maximum batches in flight at once.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Attempts per batch before a permanent failure is recorded.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Per-request HTTP timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Client tunables derived from this configuration.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            request_timeout: self.request_timeout,
            max_attempts: self.max_attempts,
            initial_backoff: self.initial_backoff,
            max_backoff: self.max_backoff,
        }
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        ensure_not_empty(&self.input_path, "input_path")?;
        ensure_not_empty(&self.output_path, "output_path")?;
        validate_url(&self.endpoint_url)?;

        if self.batch_capacity == 0 {
            bail!("batch_capacity must be greater than 0");
        }

        if self.worker_count == 0 {
            bail!("worker_count must be greater than 0");
        }

        self.client_options().validate()
    }
}

#[derive(Debug, Default, Clone)]
pub struct AnnotatorConfigBuilder {
    input_path: Option<String>,
    output_path: Option<String>,
    endpoint_url: Option<String>,
    batch_capacity: Option<usize>,
    worker_count: Option<usize>,
    max_attempts: Option<usize>,
    initial_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl AnnotatorConfigBuilder {
    pub fn input_path(mut self, path: impl Into<String>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    pub fn output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    pub fn batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = Some(capacity);
        self
    }

    pub fn worker_count(mut self, workers: usize) -> Self {
        self.worker_count = Some(workers);
        self
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = Some(backoff);
        self
    }

    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = Some(backoff);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<AnnotatorConfig> {
        let params = AnnotatorConfigParams {
            input_path: self.input_path.context("input_path is required")?,
            output_path: self.output_path.context("output_path is required")?,
            endpoint_url: self
                .endpoint_url
                .unwrap_or_else(|| DEFAULT_ENDPOINT_URL.to_owned()),
            batch_capacity: self.batch_capacity.unwrap_or(DEFAULT_BATCH_CAPACITY),
            worker_count: self.worker_count.unwrap_or_else(default_worker_count),
            max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            initial_backoff: self.initial_backoff.unwrap_or(DEFAULT_INITIAL_BACKOFF),
            max_backoff: self.max_backoff.unwrap_or(DEFAULT_MAX_BACKOFF),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        };

        AnnotatorConfig::new(params)
    }
}

fn ensure_not_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{field} cannot be empty");
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<()> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("endpoint_url must start with http:// or https://");
    }
    Ok(())
}
