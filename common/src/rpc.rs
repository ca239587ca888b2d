//! gRPC surface between the coordinator and its workers.
//!
//! NOTE: The service stubs in [`coordinator`] are generated by `build.rs` and
//!       refer to the messages below by path. If you rename or move a message,
//!       update `build.rs` accordingly.

/// A worker polling for its next task.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AssignmentRequest {
    #[prost(string, tag = "1")]
    pub worker_id: String,
}

/// The task handed out, if any.
///
/// An empty `work_type` means there is nothing to do right now and the
/// worker should poll again later. For reduce tasks, `file` carries the
/// partition index.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AssignmentReply {
    #[prost(string, tag = "1")]
    pub file: String,
    #[prost(string, tag = "2")]
    pub work_type: String,
    #[prost(uint32, tag = "3")]
    pub n_reduce: u32,
    /// Every task is done; the worker may exit.
    #[prost(bool, tag = "4")]
    pub job_done: bool,
}

/// Completion report for the task currently leased to `worker_id`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DoneRequest {
    #[prost(string, tag = "1")]
    pub worker_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DoneReply {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StatusRequest {}

/// Completion probe.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StatusReply {
    #[prost(bool, tag = "1")]
    pub done: bool,
    #[prost(uint32, tag = "2")]
    pub maps_done: u32,
    #[prost(uint32, tag = "3")]
    pub maps_total: u32,
    #[prost(uint32, tag = "4")]
    pub reduces_done: u32,
    #[prost(uint32, tag = "5")]
    pub reduces_total: u32,
}

pub mod coordinator {
    include!(concat!(env!("OUT_DIR"), "/coordinator.Coordinator.rs"));
}

pub use coordinator::coordinator_client::CoordinatorClient;
pub use coordinator::coordinator_server::{Coordinator, CoordinatorServer};

impl AssignmentReply {
    /// Reply telling the worker to poll again later.
    pub fn no_work(job_done: bool) -> Self {
        Self {
            job_done,
            ..Default::default()
        }
    }
}
