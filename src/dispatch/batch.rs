//! Fixed-capacity batching of normalized identifiers.

/// Default identifiers per remote request.
pub const DEFAULT_BATCH_CAPACITY: usize = 500;

/// An ordered group of identifiers dispatched in one remote request.
/// Immutable once created; owned by a single fetch for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    index: usize,
    keys: Vec<String>,
}

impl Batch {
    pub fn new(index: usize, keys: Vec<String>) -> Self {
        Self { index, keys }
    }

    /// Position of this batch in dispatch order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Splits `keys` into batches of exactly `capacity` identifiers (the last
/// batch may be shorter), preserving input order. Zero keys yields zero
/// batches. Batches close strictly at capacity, never one past it.
///
/// Callers must guarantee `capacity > 0`; the config layer validates this.
pub fn partition(keys: Vec<String>, capacity: usize) -> Vec<Batch> {
    debug_assert!(capacity > 0, "batch capacity must be positive");

    let mut batches = Vec::with_capacity(keys.len().div_ceil(capacity.max(1)));
    let mut current = Vec::with_capacity(capacity.min(keys.len()));

    for key in keys {
        current.push(key);
        if current.len() == capacity {
            batches.push(Batch::new(batches.len(), std::mem::take(&mut current)));
        }
    }

    if !current.is_empty() {
        batches.push(Batch::new(batches.len(), current));
    }

    batches
}
