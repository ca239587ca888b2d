use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::debug;

use common::rpc::{
    AssignmentReply, AssignmentRequest, Coordinator, DoneReply, DoneRequest, StatusReply,
    StatusRequest,
};
use common::{WorkType, WorkerId};

use crate::registry::TaskRegistry;
use crate::task::Assignment;

/// gRPC front end of the task registry.
///
/// Every handler completes from in-memory state; none waits for work to
/// appear.
#[derive(Debug, Clone)]
pub struct MRCoordinator {
    registry: Arc<TaskRegistry>,
}

impl MRCoordinator {
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }
}

fn to_reply(assignment: Assignment) -> AssignmentReply {
    match assignment {
        Assignment::Map { file, n_reduce } => AssignmentReply {
            file,
            work_type: WorkType::Map.as_str().to_owned(),
            n_reduce,
            job_done: false,
        },
        Assignment::Reduce { partition, n_reduce } => AssignmentReply {
            file: partition.to_string(),
            work_type: WorkType::Reduce.as_str().to_owned(),
            n_reduce,
            job_done: false,
        },
        Assignment::NoWork { job_done } => AssignmentReply::no_work(job_done),
    }
}

#[tonic::async_trait]
impl Coordinator for MRCoordinator {
    /// Worker polls for work.
    async fn assignment(
        &self,
        request: Request<AssignmentRequest>,
    ) -> Result<Response<AssignmentReply>, Status> {
        let worker = WorkerId::from(request.into_inner().worker_id);
        let assignment = self.registry.next_assignment(&worker).await;
        debug!(worker = %worker, ?assignment, "poll");

        Ok(Response::new(to_reply(assignment)))
    }

    /// Worker finished the map task it was leased.
    async fn done_map(&self, request: Request<DoneRequest>) -> Result<Response<DoneReply>, Status> {
        let worker = WorkerId::from(request.into_inner().worker_id);
        self.registry.report_map_done(&worker).await;

        Ok(Response::new(DoneReply {}))
    }

    /// Worker finished the reduce task it was leased.
    async fn done_reduce(
        &self,
        request: Request<DoneRequest>,
    ) -> Result<Response<DoneReply>, Status> {
        let worker = WorkerId::from(request.into_inner().worker_id);
        self.registry.report_reduce_done(&worker).await;

        Ok(Response::new(DoneReply {}))
    }

    /// Completion probe.
    async fn status(&self, _: Request<StatusRequest>) -> Result<Response<StatusReply>, Status> {
        let progress = self.registry.progress().await;

        Ok(Response::new(StatusReply {
            done: progress.is_done(),
            maps_done: progress.maps_done,
            maps_total: progress.maps_total,
            reduces_done: progress.reduces_done,
            reduces_total: progress.reduces_total,
        }))
    }
}
