use std::env;
use std::error::Error;

use tonic_build::manual::{Builder, Method, Service};

const CODEC: &str = "tonic::codec::ProstCodec";

fn unary(name: &str, route: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(input)
        .output_type(output)
        .codec_path(CODEC)
        .build()
}

fn main() -> Result<(), Box<dyn Error>> {
    // Message types live in src/pb; only the service stubs are generated here.
    let out_dir = env::var("OUT_DIR")?;

    let analyst = Service::builder()
        .name("Analyst")
        .package("analyst.v1")
        .method(unary(
            "query",
            "Query",
            "crate::pb::v1::QueryInfo",
            "crate::pb::v1::QueryResponse",
        ))
        .method(unary(
            "aggregate",
            "Aggregate",
            "crate::pb::v1::AggregateInfo",
            "crate::pb::v1::AggregateResponse",
        ))
        .build();

    let intra = Service::builder()
        .name("Analyst")
        .package("analyst.intra")
        .method(unary(
            "execute",
            "Execute",
            "crate::pb::intra::ExecuteInfo",
            "crate::pb::intra::ExecuteResponse",
        ))
        .build();

    let scheduler = Service::builder()
        .name("Scheduler")
        .package("storage.v1")
        .method(unary(
            "list_cluster_info",
            "ListClusterInfo",
            "crate::pb::storage::ListInfo",
            "crate::pb::storage::ListResponse",
        ))
        .build();

    let node = Service::builder()
        .name("Node")
        .package("storage.v1")
        .method(
            Method::builder()
                .name("read")
                .route_name("Read")
                .input_type("crate::pb::storage::BufferInfo")
                .output_type("crate::pb::storage::ReadDataPacket")
                .codec_path(CODEC)
                .server_streaming()
                .build(),
        )
        .build();

    Builder::new()
        .build_client(true)
        .build_server(true)
        .out_dir(&out_dir)
        .compile(&[analyst, intra, scheduler, node]);

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
