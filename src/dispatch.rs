//! Batching and bounded-concurrency dispatch:
//! - `batch`: fixed-capacity partitioning of identifiers
//! - `pool`: worker pool collecting one outcome per batch

pub mod batch;
pub mod pool;
