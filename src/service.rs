//! Wire-facing worker RPC surface.
//!
//! The worker process is an external black box (spec §1): all this
//! module owns is the generated protobuf/gRPC bindings for its
//! bidirectional `Execute` stream. Domain-level conversions live in
//! [`crate::operation`].

pub mod proto {
    tonic::include_proto!("workload");
}

pub use proto::worker_client::WorkerClient;
pub use proto::{execute_response::Status, ExecuteCommand, ExecuteResponse};
