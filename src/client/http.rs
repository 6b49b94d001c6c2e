//! HTTP client for the frequency lookup service. Houses the `AlfaClient`,
//! the `FetchError` taxonomy, and the `FrequencyClient` trait consumed by the
//! dispatch pool.

use crate::client::options::ClientOptions;
use crate::client::record::FrequencyRecord;
use crate::client::retry::{retry_with_backoff, RetryBackoff, RetryDisposition};
use crate::dispatch::batch::Batch;
use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use reqwest::header::ACCEPT;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

/// Default lookup endpoint.
pub const DEFAULT_ENDPOINT_URL: &str = "https://cs-api.davelab.org/alfa/filtered-results/";

#[derive(Debug)]
pub enum FetchError {
    /// Non-success HTTP status. Retryable.
    Status { code: u16 },
    /// Connection failure or timeout. Retryable.
    Transport { message: String },
    /// 2xx response whose body is not a well-formed record array. Permanent.
    MalformedBody { message: String },
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::MalformedBody { .. })
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Status { code } => write!(f, "service responded with HTTP {code}"),
            FetchError::Transport { message } => write!(f, "request failed: {message}"),
            FetchError::MalformedBody { message } => {
                write!(f, "service returned a malformed body: {message}")
            }
        }
    }
}

impl std::error::Error for FetchError {}

/// One remote lookup per batch, retries included. Object-safe so tests can
/// substitute the dispatch pool's client.
pub trait FrequencyClient: Send + Sync {
    fn fetch_batch<'a>(&'a self, batch: &'a Batch) -> BoxFuture<'a, Result<Vec<FrequencyRecord>>>;
}

/// reqwest-backed client for the ALFA filtered-results endpoint.
#[derive(Debug, Clone)]
pub struct AlfaClient {
    endpoint_url: String,
    http: reqwest::Client,
    options: ClientOptions,
    cancellation: CancellationToken,
}

impl FrequencyClient for AlfaClient {
    fn fetch_batch<'a>(&'a self, batch: &'a Batch) -> BoxFuture<'a, Result<Vec<FrequencyRecord>>> {
        Box::pin(self.fetch_batch(batch))
    }
}

impl AlfaClient {
    pub fn new(endpoint_url: impl Into<String>, options: ClientOptions) -> Result<Self> {
        Self::with_cancellation(endpoint_url, options, CancellationToken::new())
    }

    pub fn with_cancellation(
        endpoint_url: impl Into<String>,
        options: ClientOptions,
        cancellation: CancellationToken,
    ) -> Result<Self> {
        options.validate()?;
        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|err| anyhow!("failed to build HTTP client: {err}"))?;

        Ok(Self {
            endpoint_url: endpoint_url.into(),
            http,
            options,
            cancellation,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint_url
    }

    /// Fetches frequency records for one batch, retrying transport errors and
    /// non-success statuses with exponential backoff. Malformed success
    /// bodies abort immediately; either way the error is returned to the
    /// caller rather than raised past it.
    pub async fn fetch_batch(&self, batch: &Batch) -> Result<Vec<FrequencyRecord>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let config = RetryBackoff::new(
            self.options.initial_backoff,
            self.options.max_backoff,
            self.options.max_attempts,
        )
        .with_cancellation(&self.cancellation);

        let batch_index = batch.index();
        retry_with_backoff(
            config,
            |attempt| async move {
                let records = self.post_filter_once(batch).await?;
                tracing::debug!(
                    batch = batch_index,
                    attempt,
                    records = records.len(),
                    "filtered-results request completed"
                );
                Ok(records)
            },
            |attempt, backoff, err, will_retry| {
                if will_retry {
                    tracing::warn!(
                        batch = batch_index,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "filtered-results request failed; retrying"
                    );
                } else {
                    tracing::error!(
                        batch = batch_index,
                        attempt,
                        error = %err,
                        "filtered-results request exhausted retries"
                    );
                }
            },
            |err| match err.downcast_ref::<FetchError>() {
                Some(fetch_error) if !fetch_error.is_retryable() => RetryDisposition::Abort,
                _ => RetryDisposition::Retry,
            },
        )
        .await
    }

    async fn post_filter_once(&self, batch: &Batch) -> Result<Vec<FrequencyRecord>> {
        let response = self
            .http
            .post(&self.endpoint_url)
            .header(ACCEPT, "application/json")
            .json(&json!({ "filter": batch.keys() }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
            }
            .into());
        }

        let body = response.text().await.map_err(transport_error)?;
        parse_records(&body)
    }
}

fn transport_error(err: reqwest::Error) -> anyhow::Error {
    FetchError::Transport {
        message: err.to_string(),
    }
    .into()
}

/// Parses a success body into records. Any shape mismatch is permanent.
fn parse_records(body: &str) -> Result<Vec<FrequencyRecord>> {
    let elements: Vec<Value> = serde_json::from_str(body).map_err(|err| FetchError::MalformedBody {
        message: format!("expected a JSON array: {err}"),
    })?;

    elements
        .into_iter()
        .map(|element| {
            FrequencyRecord::from_value(element).map_err(|err| {
                FetchError::MalformedBody {
                    message: format!("bad record element: {err}"),
                }
                .into()
            })
        })
        .collect()
}
