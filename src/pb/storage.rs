//! Client-side view of the sharded storage layer: the scheduler that knows
//! the cluster topology and the nodes that serve shard contents.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListInfo {
    #[prost(string, repeated, tag = "1")]
    pub names: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListResponse {
    #[prost(message, repeated, tag = "1")]
    pub info: Vec<ClusterInfo>,
}

/// A shard and the nodes replicating it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClusterInfo {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub leader: String,
    #[prost(message, repeated, tag = "3")]
    pub nodes: Vec<NodeInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeInfo {
    #[prost(string, tag = "1")]
    pub uri: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BufferInfo {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(uint64, tag = "2")]
    pub start_index: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadDataPacket {
    #[prost(bytes = "vec", tag = "1")]
    pub message: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub index: u64,
}

include!(concat!(env!("OUT_DIR"), "/storage.v1.Scheduler.rs"));
include!(concat!(env!("OUT_DIR"), "/storage.v1.Node.rs"));
