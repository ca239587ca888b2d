use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use tokio::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tonic::Request;
use tracing::{debug, info, warn};

use common::layout::Layout;
use common::rpc::{AssignmentReply, AssignmentRequest, CoordinatorClient, DoneRequest};
use common::{WorkType, WorkerId, Workload};

use crate::{map, reduce};

/// Tunables of the worker loop.
#[derive(Clone)]
pub struct WorkerConfig {
    /// Where inputs are read from and intermediate/output files written to.
    pub layout: Layout,

    /// The application to run.
    pub workload: Workload,

    /// Auxiliary argument passed to every map and reduce call.
    pub aux: Bytes,

    /// Delay before polling again when there is no work or the coordinator
    /// could not be reached.
    pub poll_interval: Duration,

    /// Consecutive failed polls after which the coordinator is assumed gone.
    pub max_failed_polls: u32,
}

/// What a single iteration of the worker loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Executed and reported a map task over this file.
    Mapped(String),

    /// Executed and reported a reduce task for this partition.
    Reduced(u32),

    /// No task available yet.
    Idle,

    /// The coordinator reported every task done.
    Finished,

    /// The poll did not reach the coordinator.
    Unreachable,
}

/// Lazily connected client; connection failures surface on each call.
pub fn connect(address: &str) -> Result<CoordinatorClient<Channel>> {
    let endpoint = Endpoint::from_shared(address.to_owned())
        .with_context(|| format!("invalid coordinator address `{}`", address))?;
    Ok(CoordinatorClient::new(endpoint.connect_lazy()))
}

pub struct MRWorker {
    id: WorkerId,
    client: CoordinatorClient<Channel>,
    config: WorkerConfig,
}

impl MRWorker {
    pub fn new(id: WorkerId, client: CoordinatorClient<Channel>, config: WorkerConfig) -> Self {
        Self { id, client, config }
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    /// Poll, execute and report until the job is done.
    ///
    /// Task failures are returned as errors; the coordinator hands the task
    /// to someone else once this worker's lease runs out.
    pub async fn run(&mut self) -> Result<()> {
        let mut failed_polls = 0;

        loop {
            match self.step().await? {
                Step::Finished => {
                    info!(worker = %self.id, "Job is done, exiting");
                    return Ok(());
                }
                Step::Unreachable => {
                    failed_polls += 1;
                    if failed_polls >= self.config.max_failed_polls {
                        warn!(
                            worker = %self.id,
                            "Coordinator unreachable after {} attempts, assuming the job is over",
                            failed_polls
                        );
                        return Ok(());
                    }
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Step::Idle => {
                    failed_polls = 0;
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Step::Mapped(_) | Step::Reduced(_) => failed_polls = 0,
            }
        }
    }

    /// One iteration of the loop: poll once and run whatever was handed out.
    pub async fn step(&mut self) -> Result<Step> {
        let request = Request::new(AssignmentRequest {
            worker_id: self.id.to_string(),
        });
        let reply = match self.client.assignment(request).await {
            Ok(reply) => reply.into_inner(),
            Err(status) => {
                warn!(worker = %self.id, "Assignment call failed: {}", status.message());
                return Ok(Step::Unreachable);
            }
        };

        self.execute(reply).await
    }

    async fn execute(&mut self, reply: AssignmentReply) -> Result<Step> {
        if reply.job_done {
            return Ok(Step::Finished);
        }
        if reply.work_type.is_empty() {
            debug!(worker = %self.id, "No work yet");
            return Ok(Step::Idle);
        }

        match reply.work_type.parse::<WorkType>()? {
            WorkType::Map => {
                let (id, config) = (self.id.clone(), self.config.clone());
                let (file, n_reduce) = (reply.file.clone(), reply.n_reduce);
                tokio::task::spawn_blocking(move || {
                    map::perform_map(
                        &id,
                        &file,
                        n_reduce,
                        &config.layout,
                        config.workload,
                        config.aux,
                    )
                })
                .await??;

                self.report(WorkType::Map).await;
                Ok(Step::Mapped(reply.file))
            }
            WorkType::Reduce => {
                let partition: u32 = reply
                    .file
                    .parse()
                    .map_err(|_| anyhow!("invalid reduce partition `{}`", reply.file))?;
                let config = self.config.clone();
                tokio::task::spawn_blocking(move || {
                    reduce::perform_reduce(partition, &config.layout, config.workload, config.aux)
                })
                .await??;

                self.report(WorkType::Reduce).await;
                Ok(Step::Reduced(partition))
            }
        }
    }

    /// Report completion. A lost report only costs a re-execution once the
    /// lease expires, so failures are logged and otherwise ignored.
    async fn report(&mut self, work_type: WorkType) {
        let request = Request::new(DoneRequest {
            worker_id: self.id.to_string(),
        });
        let result = match work_type {
            WorkType::Map => self.client.done_map(request).await.map(|_| ()),
            WorkType::Reduce => self.client.done_reduce(request).await.map(|_| ()),
        };

        if let Err(status) = result {
            warn!(worker = %self.id, %work_type, "Completion report failed: {}", status.message());
        }
    }
}
