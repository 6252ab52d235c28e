//! Shard discovery and remote shard reads.
//!
//! The scheduler knows which shards exist and which storage node leads
//! each one. [`FileSystem`] narrows that list down to the shards a routing
//! key can live in and translates storage node addresses into the intra
//! address of the analyst running next to them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use tonic::transport::Channel;
use tonic::Status;
use tracing::{debug, warn};

use crate::mapreduce::FileSource;
use crate::pb::storage::node_client::NodeClient as GrpcNodeClient;
use crate::pb::storage::scheduler_client::SchedulerClient as GrpcSchedulerClient;
use crate::pb::storage::{BufferInfo, ClusterInfo, ListInfo, ReadDataPacket};

pub mod hasher;
pub mod route_filter;

pub use hasher::{RouteHasher, StringHasher};
pub use route_filter::{RangeName, RouteFilter};

/// Packets streamed back from a storage node.
pub type PacketStream = BoxStream<'static, Result<ReadDataPacket, Status>>;

/// The scheduler's view of the cluster.
#[tonic::async_trait]
pub trait SchedulerClient: Send + Sync {
    async fn list_cluster_info(&self) -> Result<Vec<ClusterInfo>>;
}

/// Streams a shard's raw records from a storage node.
#[tonic::async_trait]
pub trait NodeClient: Send + Sync {
    async fn read(&self, file: &str) -> Result<PacketStream>;
}

#[tonic::async_trait]
impl SchedulerClient for GrpcSchedulerClient<Channel> {
    async fn list_cluster_info(&self) -> Result<Vec<ClusterInfo>> {
        let mut client = self.clone();
        let resp = GrpcSchedulerClient::list_cluster_info(&mut client, ListInfo::default())
            .await
            .map_err(|status| anyhow!("scheduler: {}", status.message()))?;
        Ok(resp.into_inner().info)
    }
}

#[tonic::async_trait]
impl NodeClient for GrpcNodeClient<Channel> {
    async fn read(&self, file: &str) -> Result<PacketStream> {
        let mut client = self.clone();
        let request = BufferInfo {
            name: file.to_string(),
            start_index: 0,
        };
        let resp = GrpcNodeClient::read(&mut client, request)
            .await
            .map_err(|status| anyhow!("storage node: {}", status.message()))?;
        Ok(resp.into_inner().boxed())
    }
}

/// Pull-style reader over one shard's records.
pub struct ShardReader {
    file: String,
    rx: PacketStream,
}

impl ShardReader {
    pub fn new(file: impl Into<String>, rx: PacketStream) -> Self {
        Self {
            file: file.into(),
            rx,
        }
    }

    /// Returns the next raw record, or `None` once the shard is exhausted.
    ///
    /// A node that ends the stream with an `EOF` status is treated the same
    /// as one that simply closes it.
    pub async fn read(&mut self) -> Result<Option<Bytes>> {
        match self.rx.next().await {
            None => Ok(None),
            Some(Ok(packet)) => Ok(Some(Bytes::from(packet.message))),
            Some(Err(status)) if status.message() == "EOF" => Ok(None),
            Some(Err(status)) => Err(anyhow!(
                "reading {} failed: {}",
                self.file,
                status.message()
            )),
        }
    }
}

pub struct FileSystem {
    filter: RouteFilter,
    scheduler: Arc<dyn SchedulerClient>,
    node: Arc<dyn NodeClient>,
    to_analyst: HashMap<String, String>,
    timeout: Duration,
}

impl FileSystem {
    pub fn new(
        filter: RouteFilter,
        scheduler: Arc<dyn SchedulerClient>,
        node: Arc<dyn NodeClient>,
        to_analyst: HashMap<String, String>,
        timeout: Duration,
    ) -> Self {
        Self {
            filter,
            scheduler,
            node,
            to_analyst,
            timeout,
        }
    }

    /// Every shard the scheduler knows about, mapped to the storage node that
    /// leads it. Fetched fresh on every call.
    pub async fn list(&self) -> Result<HashMap<String, String>> {
        let infos = tokio::time::timeout(self.timeout, self.scheduler.list_cluster_info())
            .await
            .context("listing cluster info timed out")??;

        let mut files = HashMap::with_capacity(infos.len());
        for info in infos {
            let owner = if info.leader.is_empty() {
                info.nodes.first().map(|n| n.uri.clone())
            } else {
                Some(info.leader)
            };
            match owner {
                Some(node) => {
                    files.insert(info.name, node);
                }
                None => warn!(file = %info.name, "dropping shard without nodes"),
            }
        }

        if files.is_empty() {
            bail!("no shards known");
        }
        Ok(files)
    }

    fn translate(&self, node: &str) -> Result<String> {
        self.to_analyst
            .get(node)
            .cloned()
            .ok_or_else(|| anyhow!("no analyst known for storage node {node}"))
    }
}

#[tonic::async_trait]
impl FileSource for FileSystem {
    async fn files(&self, route: &str) -> Result<HashMap<String, String>> {
        let mut files = self.list().await?;
        let known = files.len();
        self.filter.filter(route, &mut files);
        debug!(route, known, in_range = files.len(), "filtered shards");

        files
            .into_iter()
            .map(|(file, node)| Ok((file, self.translate(&node)?)))
            .collect()
    }

    async fn reader(&self, file: &str) -> Result<ShardReader> {
        let rx = tokio::time::timeout(self.timeout, self.node.read(file))
            .await
            .with_context(|| format!("opening {file} timed out"))??;
        Ok(ShardReader::new(file, rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pb::storage::NodeInfo;
    use std::sync::Mutex;

    struct FixedHasher(u64);

    impl RouteHasher for FixedHasher {
        fn hash_string(&self, _s: &str) -> u64 {
            self.0
        }
    }

    #[derive(Default)]
    struct MockScheduler {
        infos: Option<Vec<ClusterInfo>>,
    }

    #[tonic::async_trait]
    impl SchedulerClient for MockScheduler {
        async fn list_cluster_info(&self) -> Result<Vec<ClusterInfo>> {
            self.infos.clone().ok_or_else(|| anyhow!("some-error"))
        }
    }

    struct HungScheduler;

    #[tonic::async_trait]
    impl SchedulerClient for HungScheduler {
        async fn list_cluster_info(&self) -> Result<Vec<ClusterInfo>> {
            std::future::pending().await
        }
    }

    #[derive(Default)]
    struct MockNode {
        packets: Vec<Result<ReadDataPacket, Status>>,
        reads: Mutex<Vec<String>>,
    }

    #[tonic::async_trait]
    impl NodeClient for MockNode {
        async fn read(&self, file: &str) -> Result<PacketStream> {
            self.reads.lock().unwrap().push(file.to_string());
            Ok(futures::stream::iter(self.packets.clone()).boxed())
        }
    }

    fn name(low: u64, high: u64) -> String {
        serde_json::to_string(&RangeName { low, high, term: 0 }).unwrap()
    }

    fn info(name: String, leader: &str, nodes: &[&str]) -> ClusterInfo {
        ClusterInfo {
            name,
            leader: leader.into(),
            nodes: nodes.iter().map(|uri| NodeInfo { uri: uri.to_string() }).collect(),
        }
    }

    fn fs(scheduler: MockScheduler, node: MockNode) -> FileSystem {
        let translate = [
            ("some-node-name-1", "translated-1"),
            ("some-node-name-2", "translated-2"),
            ("some-node-name-3", "translated-3"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        FileSystem::new(
            RouteFilter::new(Arc::new(FixedHasher(99))),
            Arc::new(scheduler),
            Arc::new(node),
            translate,
            Duration::from_secs(1),
        )
    }

    fn packet(message: &[u8]) -> Result<ReadDataPacket, Status> {
        Ok(ReadDataPacket {
            message: message.to_vec(),
            index: 0,
        })
    }

    #[tokio::test]
    async fn returns_translated_files_within_range() {
        let scheduler = MockScheduler {
            infos: Some(vec![
                info(name(0, 99), "some-node-name-1", &["some-node-name-1", "some-node-name-2"]),
                info(name(99, 199), "", &["some-node-name-3", "some-node-name-1"]),
                info(name(100, 199), "some-node-name-2", &[]),
            ]),
        };

        let files = fs(scheduler, MockNode::default()).files("some-route").await.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[&name(0, 99)], "translated-1");
        assert_eq!(files[&name(99, 199)], "translated-3");
    }

    #[tokio::test]
    async fn untranslatable_nodes_are_an_error() {
        let scheduler = MockScheduler {
            infos: Some(vec![info(name(0, 199), "unknown-node", &[])]),
        };

        let err = fs(scheduler, MockNode::default()).files("some-route").await.unwrap_err();
        assert!(err.to_string().contains("unknown-node"));
    }

    #[tokio::test]
    async fn scheduler_errors_are_returned() {
        let err = fs(MockScheduler::default(), MockNode::default())
            .list()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("some-error"));
    }

    #[tokio::test]
    async fn a_hung_scheduler_times_out() {
        let fs = FileSystem::new(
            RouteFilter::new(Arc::new(FixedHasher(99))),
            Arc::new(HungScheduler),
            Arc::new(MockNode::default()),
            HashMap::new(),
            Duration::from_millis(50),
        );

        let err = fs.files("some-route").await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(err.chain().any(|cause| cause.is::<tokio::time::error::Elapsed>()));

        let status = crate::network::to_status(err);
        assert_eq!(status.code(), tonic::Code::DeadlineExceeded);
    }

    #[tokio::test]
    async fn an_empty_cluster_is_an_error() {
        let scheduler = MockScheduler {
            infos: Some(Vec::new()),
        };

        let err = fs(scheduler, MockNode::default()).list().await.unwrap_err();
        assert!(err.to_string().contains("no shards known"));
    }

    #[tokio::test]
    async fn reads_until_the_stream_ends() {
        let node = MockNode {
            packets: vec![packet(b"some-data"), packet(b"more-data")],
            ..Default::default()
        };
        let node = Arc::new(node);
        let fs = FileSystem::new(
            RouteFilter::new(Arc::new(StringHasher)),
            Arc::new(MockScheduler::default()),
            node.clone(),
            HashMap::new(),
            Duration::from_secs(1),
        );

        let mut reader = fs.reader("some-file").await.unwrap();
        assert_eq!(reader.read().await.unwrap(), Some(Bytes::from("some-data")));
        assert_eq!(reader.read().await.unwrap(), Some(Bytes::from("more-data")));
        assert_eq!(reader.read().await.unwrap(), None);
        assert_eq!(*node.reads.lock().unwrap(), vec!["some-file".to_string()]);
    }

    #[tokio::test]
    async fn converts_an_eof_status_to_end_of_stream() {
        let node = MockNode {
            packets: vec![packet(b"some-data"), Err(Status::out_of_range("EOF"))],
            ..Default::default()
        };
        let mut reader = fs(MockScheduler::default(), node)
            .reader("some-file")
            .await
            .unwrap();

        assert!(reader.read().await.unwrap().is_some());
        assert_eq!(reader.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn other_stream_errors_are_returned() {
        let node = MockNode {
            packets: vec![Err(Status::unavailable("some-error"))],
            ..Default::default()
        };
        let mut reader = fs(MockScheduler::default(), node)
            .reader("some-file")
            .await
            .unwrap();

        let err = reader.read().await.unwrap_err();
        assert!(err.to_string().contains("some-file"));
    }
}
