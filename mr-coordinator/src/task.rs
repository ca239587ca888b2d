use common::WorkerId;
use tokio::time::{Duration, Instant};

/// Lifecycle of a single map or reduce task.
///
/// `Done` is terminal: nothing moves a task out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting to be handed out.
    Pending,

    /// Leased to `owner` since `since`.
    Assigned { owner: WorkerId, since: Instant },

    /// Completion was reported.
    Done,
}

impl TaskState {
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskState::Pending)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskState::Done)
    }

    pub fn is_owned_by(&self, worker: &WorkerId) -> bool {
        matches!(self, TaskState::Assigned { owner, .. } if owner == worker)
    }

    /// Whether the lease on an assigned task has run out at `now`.
    pub fn lease_expired(&self, now: Instant, lease: Duration) -> bool {
        match self {
            TaskState::Assigned { since, .. } => now.saturating_duration_since(*since) > lease,
            _ => false,
        }
    }

    /// Hand a pending task to `owner`.
    pub fn assign(&mut self, owner: WorkerId, now: Instant) {
        debug_assert!(self.is_pending());
        *self = TaskState::Assigned { owner, since: now };
    }

    /// Return an assigned task to the pending pool. No-op otherwise.
    pub fn reclaim(&mut self) -> Option<WorkerId> {
        if let TaskState::Assigned { owner, .. } = self {
            let owner = owner.clone();
            *self = TaskState::Pending;
            Some(owner)
        } else {
            None
        }
    }

    pub fn complete(&mut self) {
        *self = TaskState::Done;
    }
}

/// One map task per input file.
#[derive(Debug, Clone)]
pub struct MapTask {
    pub file: String,
    pub state: TaskState,
}

impl MapTask {
    pub fn new(file: String) -> Self {
        Self {
            file,
            state: TaskState::Pending,
        }
    }
}

/// One reduce task per partition index.
#[derive(Debug, Clone)]
pub struct ReduceTask {
    pub partition: u32,
    pub state: TaskState,
}

impl ReduceTask {
    pub fn new(partition: u32) -> Self {
        Self {
            partition,
            state: TaskState::Pending,
        }
    }
}

/// Outcome of a worker poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Map { file: String, n_reduce: u32 },
    Reduce { partition: u32, n_reduce: u32 },

    /// Nothing to hand out. `job_done` tells whether any work remains.
    NoWork { job_done: bool },
}
