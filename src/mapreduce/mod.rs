//! Distributed map/reduce over the shards a route can live in.
//!
//! [`MapReduce`] is the coordinator side: it asks the [`FileSource`] which
//! shards are in range, fans one intra `Execute` out per shard and merges
//! the partial results with the algorithm's reducer. The [`executor`]
//! module is the other half, run on the analyst co-located with a shard.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use futures::future::try_join_all;
use tracing::{debug, info};

use crate::filesystem::ShardReader;
use crate::workload::Registry;
use crate::Algorithm;

pub mod executor;

pub use executor::{Executor, LocalExecutor};

/// Reduced results keyed by reduction key.
pub type Results = HashMap<String, Vec<u8>>;

/// Locates shards and opens them for reading.
#[tonic::async_trait]
pub trait FileSource: Send + Sync {
    /// Shards that may hold `route`, mapped to the intra address of the
    /// analyst that should process each one.
    async fn files(&self, route: &str) -> Result<HashMap<String, String>>;

    async fn reader(&self, file: &str) -> Result<ShardReader>;
}

/// Runs an algorithm against one shard on a remote analyst.
#[tonic::async_trait]
pub trait Dispatcher: Send + Sync {
    async fn execute(&self, file: &str, alg: &str, node: &str, meta: &[u8]) -> Result<Results>;
}

/// Computes a full, cluster-wide result for a routing key.
#[tonic::async_trait]
pub trait Calculator: Send + Sync {
    async fn calculate(&self, route: &str, alg: &str, meta: &[u8]) -> Result<Results>;
}

pub struct MapReduce {
    fs: Arc<dyn FileSource>,
    network: Arc<dyn Dispatcher>,
    registry: Registry,
}

impl MapReduce {
    pub fn new(fs: Arc<dyn FileSource>, network: Arc<dyn Dispatcher>, registry: Registry) -> Self {
        Self {
            fs,
            network,
            registry,
        }
    }
}

#[tonic::async_trait]
impl Calculator for MapReduce {
    async fn calculate(&self, route: &str, alg_name: &str, meta: &[u8]) -> Result<Results> {
        // Built up front so a bad request never reaches the cluster.
        let alg = self.registry.build(alg_name, meta)?;
        let files = self.fs.files(route).await?;
        info!(route, alg = alg_name, shards = files.len(), "dispatching");

        let partials = try_join_all(files.iter().map(|(file, node)| async move {
            self.network
                .execute(file, alg_name, node, meta)
                .await
                .with_context(|| format!("executing `{alg_name}` for {file} on {node}"))
        }))
        .await?;

        merge(&alg, partials)
    }
}

/// Folds every partial result into one map, reducing values that share a
/// key. Keys whose reduction comes out empty are dropped.
pub fn merge(alg: &Algorithm, partials: Vec<Results>) -> Result<Results> {
    let mut grouped: HashMap<String, Vec<Bytes>> = HashMap::new();
    for partial in partials {
        for (key, value) in partial {
            grouped.entry(key).or_default().push(Bytes::from(value));
        }
    }

    let mut merged = Results::with_capacity(grouped.len());
    for (key, values) in grouped {
        let reduced = alg
            .reduce_one(values)
            .with_context(|| format!("reducing key `{key}`"))?;
        match reduced {
            Some(value) => {
                merged.insert(key, value.to_vec());
            }
            None => debug!(%key, "dropping empty reduction"),
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pb::v1::{analyst_filter, AggregateInfo, AnalystFilter, CounterFilter, QueryInfo};
    use crate::utils::{f64_from_bytes, f64_to_bytes};
    use crate::workload::{AGGREGATION, TIMERANGE};
    use crate::{MapOutput, Mapper, Reducer};
    use anyhow::{anyhow, bail};
    use prost::Message;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockFileSource {
        files: HashMap<String, String>,
        fail: bool,
    }

    #[tonic::async_trait]
    impl FileSource for MockFileSource {
        async fn files(&self, _route: &str) -> Result<HashMap<String, String>> {
            if self.fail {
                bail!("some-error");
            }
            Ok(self.files.clone())
        }

        async fn reader(&self, _file: &str) -> Result<ShardReader> {
            Err(anyhow!("not used"))
        }
    }

    #[derive(Default)]
    struct MockDispatcher {
        results: HashMap<String, Result<Results, String>>,
        calls: Mutex<Vec<(String, String, String, Vec<u8>)>>,
    }

    #[tonic::async_trait]
    impl Dispatcher for MockDispatcher {
        async fn execute(&self, file: &str, alg: &str, node: &str, meta: &[u8]) -> Result<Results> {
            self.calls
                .lock()
                .unwrap()
                .push((file.into(), alg.into(), node.into(), meta.to_vec()));
            match self.results.get(file) {
                Some(Ok(results)) => Ok(results.clone()),
                Some(Err(msg)) => Err(anyhow!("{msg}")),
                None => Ok(Results::new()),
            }
        }
    }

    fn counter_meta() -> Vec<u8> {
        AggregateInfo {
            query: Some(QueryInfo {
                filter: Some(AnalystFilter {
                    source_id: "some-id".into(),
                    time_range: None,
                    envelopes: Some(analyst_filter::Envelopes::Counter(CounterFilter::default())),
                }),
            }),
            bucket_width_ns: 5,
        }
        .encode_to_vec()
    }

    fn floats(pairs: &[(&str, f64)]) -> Results {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), f64_to_bytes(*v).to_vec()))
            .collect()
    }

    fn files(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(f, n)| (f.to_string(), n.to_string()))
            .collect()
    }

    fn calculator(fs: MockFileSource, network: Arc<MockDispatcher>) -> MapReduce {
        MapReduce::new(Arc::new(fs), network, Registry::default())
    }

    #[tokio::test]
    async fn dispatches_every_file_to_its_node() {
        let network = Arc::new(MockDispatcher::default());
        let fs = MockFileSource {
            files: files(&[("file-a", "node-a"), ("file-b", "node-b")]),
            ..Default::default()
        };
        let meta = counter_meta();

        calculator(fs, network.clone())
            .calculate("some-id", AGGREGATION, &meta)
            .await
            .unwrap();

        let mut calls = network.calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(
            calls,
            vec![
                ("file-a".into(), AGGREGATION.into(), "node-a".into(), meta.clone()),
                ("file-b".into(), AGGREGATION.into(), "node-b".into(), meta),
            ]
        );
    }

    #[tokio::test]
    async fn merges_partials_with_the_reducer() {
        let network = Arc::new(MockDispatcher {
            results: [
                ("file-a".to_string(), Ok(floats(&[("0", 1.0), ("5", 2.0)]))),
                ("file-b".to_string(), Ok(floats(&[("5", 3.0)]))),
            ]
            .into_iter()
            .collect(),
            ..Default::default()
        });
        let fs = MockFileSource {
            files: files(&[("file-a", "node-a"), ("file-b", "node-b")]),
            ..Default::default()
        };

        let results = calculator(fs, network)
            .calculate("some-id", AGGREGATION, &counter_meta())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(f64_from_bytes(&results["0"]).unwrap(), 1.0);
        assert_eq!(f64_from_bytes(&results["5"]).unwrap(), 5.0);
    }

    #[tokio::test]
    async fn any_failed_shard_fails_the_request() {
        let network = Arc::new(MockDispatcher {
            results: [
                ("file-a".to_string(), Ok(floats(&[("0", 1.0)]))),
                ("file-b".to_string(), Err("some-error".to_string())),
            ]
            .into_iter()
            .collect(),
            ..Default::default()
        });
        let fs = MockFileSource {
            files: files(&[("file-a", "node-a"), ("file-b", "node-b")]),
            ..Default::default()
        };

        let err = calculator(fs, network)
            .calculate("some-id", AGGREGATION, &counter_meta())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("some-error"));
    }

    #[tokio::test]
    async fn file_source_errors_are_returned() {
        let network = Arc::new(MockDispatcher::default());
        let fs = MockFileSource {
            fail: true,
            ..Default::default()
        };

        let err = calculator(fs, network.clone())
            .calculate("some-id", TIMERANGE, &counter_meta())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("some-error"));
        assert!(network.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_algorithms_never_reach_the_cluster() {
        let network = Arc::new(MockDispatcher::default());
        let fs = MockFileSource {
            files: files(&[("file-a", "node-a")]),
            ..Default::default()
        };

        let err = calculator(fs, network.clone())
            .calculate("some-id", "unknown", &counter_meta())
            .await
            .unwrap_err();
        assert!(err.is::<crate::workload::BuildError>());
        assert!(format!("{err:#}").contains("unknown alg"));
        assert!(network.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_files_in_range_gives_an_empty_result() {
        let network = Arc::new(MockDispatcher::default());
        let results = calculator(MockFileSource::default(), network)
            .calculate("some-id", TIMERANGE, &counter_meta())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    struct Nothing;

    impl Mapper for Nothing {
        fn map(&self, _value: Bytes) -> MapOutput {
            Ok(None)
        }
    }

    impl Reducer for Nothing {
        fn reduce(&self, _values: Box<dyn Iterator<Item = Bytes> + '_>) -> Result<Vec<Bytes>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn empty_reductions_are_dropped() {
        let alg = Algorithm::new(Nothing, Nothing);
        let merged = merge(&alg, vec![floats(&[("0", 1.0)])]).unwrap();
        assert!(merged.is_empty());
    }
}
