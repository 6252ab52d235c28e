//! Wire types for the analyst and the collaborators it talks to.
//!
//! Messages are declared with `prost` derives. The gRPC service stubs are
//! generated by `build.rs` and pulled in by each submodule.

pub mod intra;
pub mod loggregator;
pub mod storage;
pub mod v1;
