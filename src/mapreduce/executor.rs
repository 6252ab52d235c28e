//! The shard-local half of a map/reduce: read every record of one shard,
//! map it, then pre-reduce per key before the partial is shipped back to
//! the coordinating analyst.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use itertools::Itertools;
use tracing::debug;

use super::{FileSource, Results};
use crate::workload::Registry;
use crate::{Algorithm, KeyValue};

/// Runs a named algorithm against a single local shard.
#[tonic::async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, file: &str, alg: &str, meta: &[u8]) -> Result<Results>;
}

pub struct LocalExecutor {
    fs: Arc<dyn FileSource>,
    registry: Registry,
}

impl LocalExecutor {
    pub fn new(fs: Arc<dyn FileSource>, registry: Registry) -> Self {
        Self { fs, registry }
    }
}

#[tonic::async_trait]
impl Executor for LocalExecutor {
    async fn execute(&self, file: &str, alg_name: &str, meta: &[u8]) -> Result<Results> {
        let alg = self.registry.build(alg_name, meta)?;
        let mut reader = self.fs.reader(file).await?;

        let mut pairs = Vec::new();
        let mut records = 0usize;
        while let Some(record) = reader.read().await? {
            records += 1;
            if let Some(kv) = alg
                .mapper
                .map(record)
                .with_context(|| format!("mapping record {records} of {file}"))?
            {
                pairs.push(kv);
            }
        }
        debug!(file, alg = alg_name, records, mapped = pairs.len(), "mapped shard");

        pre_reduce(&alg, pairs)
    }
}

/// Groups mapped pairs by key and reduces each group.
///
/// The sort is stable so a group's values keep the order they were read in.
pub fn pre_reduce(alg: &Algorithm, mut pairs: Vec<KeyValue>) -> Result<Results> {
    pairs.sort_by(|a, b| a.key.cmp(&b.key));

    let mut results = HashMap::new();
    for (key, group) in &pairs.into_iter().chunk_by(KeyValue::key) {
        let iter = group.map(KeyValue::into_value);
        let reduced = alg
            .reducer
            .reduce(Box::new(iter))
            .with_context(|| format!("reducing key `{key}`"))?;
        if let Some(value) = reduced.into_iter().next() {
            results.insert(key, value.to_vec());
        }
    }
    Ok(results)
}
