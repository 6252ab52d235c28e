//! gRPC plumbing: the public and intra-cluster servers, and the
//! [`Network`] dispatcher the coordinator uses to reach other analysts.

use std::time::Duration;

use anyhow::{Context, Result};
use dashmap::DashMap;
use tokio::time::error::Elapsed;
use tonic::transport::{Channel, Endpoint};
use tonic::Status;
use tracing::{debug, error};

use crate::mapreduce::{Dispatcher, Results};
use crate::pb::intra::analyst_client::AnalystClient;
use crate::pb::intra::ExecuteInfo;
use crate::workload::BuildError;

pub mod intra;
pub mod server;

pub use intra::IntraService;
pub use server::AnalystService;

/// Sends intra `Execute` calls to the analyst that owns a shard.
///
/// Connections are opened lazily and kept for the life of the process,
/// keyed by address.
pub struct Network {
    clients: DashMap<String, AnalystClient<Channel>>,
    timeout: Duration,
}

impl Network {
    pub fn new(timeout: Duration) -> Self {
        Self {
            clients: DashMap::new(),
            timeout,
        }
    }

    fn client(&self, addr: &str) -> Result<AnalystClient<Channel>> {
        if let Some(client) = self.clients.get(addr) {
            return Ok(client.clone());
        }

        let channel = Endpoint::from_shared(format!("http://{addr}"))
            .with_context(|| format!("invalid analyst address `{addr}`"))?
            .connect_lazy();
        debug!(addr, "opened analyst connection");

        let client = self
            .clients
            .entry(addr.to_string())
            .or_insert_with(|| AnalystClient::new(channel));
        Ok(client.clone())
    }
}

#[tonic::async_trait]
impl Dispatcher for Network {
    async fn execute(&self, file: &str, alg: &str, node: &str, meta: &[u8]) -> Result<Results> {
        let mut client = self.client(node)?;
        let request = ExecuteInfo {
            file: file.to_string(),
            alg: alg.to_string(),
            meta: meta.to_vec(),
        };

        let resp = tokio::time::timeout(self.timeout, client.execute(request))
            .await
            .with_context(|| format!("execute on {node} timed out"))??;
        Ok(resp.into_inner().result)
    }
}

/// Converts an internal failure into the status returned to a caller.
pub(crate) fn to_status(err: anyhow::Error) -> Status {
    let msg = format!("{err:#}");
    if err.chain().any(|cause| cause.is::<BuildError>()) {
        return Status::invalid_argument(msg);
    }
    if err.chain().any(|cause| cause.is::<Elapsed>()) {
        return Status::deadline_exceeded(msg);
    }
    error!("{msg}");
    Status::internal(msg)
}
