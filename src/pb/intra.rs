//! The intra-cluster `analyst.intra.Analyst` service.

use std::collections::HashMap;

/// Run one algorithm against one shard file.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecuteInfo {
    #[prost(string, tag = "1")]
    pub file: String,
    #[prost(string, tag = "2")]
    pub alg: String,
    #[prost(bytes = "vec", tag = "3")]
    pub meta: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecuteResponse {
    #[prost(map = "string, bytes", tag = "1")]
    pub result: HashMap<String, Vec<u8>>,
}

include!(concat!(env!("OUT_DIR"), "/analyst.intra.Analyst.rs"));
