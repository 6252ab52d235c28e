use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tonic::transport::{Channel, Endpoint, Server};
use tracing::info;

use mranalyst::cmd::{analyst::Args, init_tracing};
use mranalyst::filesystem::{FileSystem, RouteFilter, StringHasher};
use mranalyst::mapreduce::{LocalExecutor, MapReduce};
use mranalyst::network::{AnalystService, IntraService, Network};
use mranalyst::pb::intra::analyst_server::AnalystServer as IntraServer;
use mranalyst::pb::storage::node_client::NodeClient;
use mranalyst::pb::storage::scheduler_client::SchedulerClient;
use mranalyst::pb::v1::analyst_server::AnalystServer;
use mranalyst::workload::Registry;

fn lazy(addr: &str) -> Result<Channel> {
    let endpoint = Endpoint::from_shared(format!("http://{addr}"))
        .with_context(|| format!("invalid address `{addr}`"))?;
    Ok(endpoint.connect_lazy())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let timeout = args.rpc_timeout();

    let scheduler = SchedulerClient::new(lazy(&args.scheduler_addr)?);
    let node = NodeClient::new(lazy(&args.storage_node_addr)?);
    let fs = Arc::new(FileSystem::new(
        RouteFilter::new(Arc::new(StringHasher)),
        Arc::new(scheduler),
        Arc::new(node),
        args.to_analyst()?,
        timeout,
    ));

    let registry = Registry::default();
    let network = Arc::new(Network::new(timeout));
    let calculator = Arc::new(MapReduce::new(fs.clone(), network, registry.clone()));
    let executor = Arc::new(LocalExecutor::new(fs, registry));

    info!(
        addr = %args.addr,
        intra_addr = %args.intra_addr,
        scheduler = %args.scheduler_addr,
        storage_node = %args.storage_node_addr,
        "analyst starting"
    );

    let public = Server::builder()
        .add_service(AnalystServer::new(AnalystService::new(calculator)))
        .serve(args.addr);
    let intra = Server::builder()
        .add_service(IntraServer::new(IntraService::new(executor)))
        .serve(args.intra_addr);

    tokio::try_join!(public, intra).context("analyst server failed")?;
    Ok(())
}
