//! The query and aggregation layer of a sharded log-and-metrics store.
//!
//! A request names a filter (and, for aggregations, a bucket width). The
//! analyst works out which shards of the hash-partitioned dataset can hold
//! matching records, runs a map/reduce [`Algorithm`] on the node that owns
//! each shard, and merges the partial results into a single response.

use std::sync::Arc;

use bytes::Bytes;

pub mod cmd;
pub mod filesystem;
pub mod mapreduce;
pub mod network;
pub mod pb;
pub mod utils;
pub mod workload;

/////////////////////////////////////////////////////////////////////////////
// MapReduce algorithm types
/////////////////////////////////////////////////////////////////////////////

/// The output of a map function.
///
/// `Ok(None)` means the record was filtered out and contributes nothing to
/// the reduction. Records that cannot be decoded are reported as errors.
pub type MapOutput = anyhow::Result<Option<KeyValue>>;

/// Projects one raw stored record into a reduction key and value.
///
/// Implementations are pure and may be invoked from many tasks at once.
pub trait Mapper: Send + Sync {
    fn map(&self, value: Bytes) -> MapOutput;
}

/// Combines every value that shares a reduction key.
pub trait Reducer: Send + Sync {
    fn reduce(&self, values: Box<dyn Iterator<Item = Bytes> + '_>) -> anyhow::Result<Vec<Bytes>>;
}

/// A map reduce pipeline, built fresh for every request.
#[derive(Clone)]
pub struct Algorithm {
    pub mapper: Arc<dyn Mapper>,
    pub reducer: Arc<dyn Reducer>,
}

impl Algorithm {
    pub fn new(mapper: impl Mapper + 'static, reducer: impl Reducer + 'static) -> Self {
        Self {
            mapper: Arc::new(mapper),
            reducer: Arc::new(reducer),
        }
    }

    /// Reduces `values` and keeps the first output, if any.
    pub fn reduce_one(&self, values: Vec<Bytes>) -> anyhow::Result<Option<Bytes>> {
        let reduced = self.reducer.reduce(Box::new(values.into_iter()))?;
        Ok(reduced.into_iter().next())
    }
}

/////////////////////////////////////////////////////////////////////////////
// Key-value pairs
/////////////////////////////////////////////////////////////////////////////

/// A single key-value pair emitted by a [`Mapper`].
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct KeyValue {
    /// The reduction key.
    pub key: String,
    /// The value.
    pub value: Bytes,
}

impl KeyValue {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: impl Into<String>, value: Bytes) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Get the key of this key-value pair.
    #[inline]
    pub fn key(&self) -> String {
        self.key.clone()
    }

    /// Consumes the key-value pair and returns the value.
    #[inline]
    pub fn into_value(self) -> Bytes {
        self.value
    }
}
