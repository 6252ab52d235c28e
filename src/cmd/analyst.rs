use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Address the public Analyst API listens on
    #[clap(long, env = "ADDR", default_value = "127.0.0.1:50051")]
    pub addr: SocketAddr,
    /// Address the intra-cluster Analyst API listens on
    #[clap(long, env = "INTRA_ADDR", default_value = "127.0.0.1:50052")]
    pub intra_addr: SocketAddr,
    /// The storage node running next to this analyst
    #[clap(long, env = "STORAGE_NODE_ADDR")]
    pub storage_node_addr: String,
    /// The storage scheduler
    #[clap(long, env = "SCHEDULER_ADDR")]
    pub scheduler_addr: String,
    /// Every storage node address, as reported by the scheduler
    #[clap(long, env = "STORAGE_NODE_LIST", value_delimiter = ',')]
    pub storage_node_list: Vec<String>,
    /// The intra address of the analyst next to each storage node, in the
    /// same order as the storage node list
    #[clap(long, env = "INTRA_ANALYST_LIST", value_delimiter = ',')]
    pub intra_analyst_list: Vec<String>,
    /// Timeout applied to every outgoing RPC, in milliseconds
    #[clap(long, env = "RPC_TIMEOUT_MS", default_value_t = 5000)]
    pub rpc_timeout_ms: u64,
}

impl Args {
    /// Pairs every storage node with the analyst running next to it.
    pub fn to_analyst(&self) -> Result<HashMap<String, String>> {
        if self.storage_node_list.len() != self.intra_analyst_list.len() {
            bail!(
                "storage node list and intra analyst list differ in length ({} != {})",
                self.storage_node_list.len(),
                self.intra_analyst_list.len()
            );
        }
        Ok(self
            .storage_node_list
            .iter()
            .cloned()
            .zip(self.intra_analyst_list.iter().cloned())
            .collect())
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}
