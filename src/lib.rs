pub mod client;
pub mod dispatch;
pub mod runtime;
pub mod table;

pub use client::http::{AlfaClient, FetchError, FrequencyClient, DEFAULT_ENDPOINT_URL};
pub use client::options::ClientOptions;
pub use client::record::{FrequencyRecord, POPULATION_CODES};
pub use dispatch::batch::{partition, Batch, DEFAULT_BATCH_CAPACITY};
pub use dispatch::pool::{BatchOutcome, DispatchOutcomes, DispatchPool};
pub use runtime::config::{AnnotatorConfig, AnnotatorConfigBuilder, AnnotatorConfigParams};
pub use runtime::runner::{Annotator, RunSummary};
pub use runtime::telemetry::{init_tracing, RunTelemetry, TelemetrySnapshot};
pub use table::merge::{merge_records, OUTPUT_COLUMN_PREFIX};
pub use table::tsv::{Table, TableError};
pub use table::variant::{extract_unique_keys, normalize_key, VARIANT_KEY_COLUMN};
