use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use common::WorkerId;

use crate::task::{Assignment, MapTask, ReduceTask, TaskState};

/// How long a worker may hold a task without reporting completion.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(10);

/// Task counts backing the status probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub maps_done: u32,
    pub maps_total: u32,
    pub reduces_done: u32,
    pub reduces_total: u32,
}

impl Progress {
    pub fn is_done(&self) -> bool {
        self.maps_done == self.maps_total && self.reduces_done == self.reduces_total
    }
}

/// Authoritative state of every task in the job.
///
/// All access goes through the registry's methods, each of which holds the
/// lock only for the in-memory update.
#[derive(Debug)]
pub struct TaskRegistry {
    tasks: Mutex<Tasks>,
}

impl TaskRegistry {
    /// Create one map task per input file and `n_reduce` reduce tasks.
    pub fn new(files: Vec<String>, n_reduce: u32, lease: Duration) -> Self {
        Self {
            tasks: Mutex::new(Tasks::new(files, n_reduce, lease)),
        }
    }

    /// Pick the next task for `worker`, reclaiming expired leases first.
    pub async fn next_assignment(&self, worker: &WorkerId) -> Assignment {
        let mut tasks = self.tasks.lock().await;
        let now = Instant::now();
        tasks.reclaim_expired(now);
        tasks.next_assignment(worker, now)
    }

    /// Mark the map task leased to `worker` as done.
    ///
    /// Returns whether a task changed state. Reports from workers without a
    /// live map lease are ignored.
    pub async fn report_map_done(&self, worker: &WorkerId) -> bool {
        self.tasks.lock().await.report_map_done(worker)
    }

    /// Mark the reduce task leased to `worker` as done.
    pub async fn report_reduce_done(&self, worker: &WorkerId) -> bool {
        self.tasks.lock().await.report_reduce_done(worker)
    }

    /// Whether every task is done. Reclaims expired leases first.
    pub async fn is_job_done(&self) -> bool {
        let mut tasks = self.tasks.lock().await;
        tasks.reclaim_expired(Instant::now());
        tasks.is_done()
    }

    /// Return every task whose lease has run out to the pending pool.
    ///
    /// Returns the number of tasks reclaimed.
    pub async fn reclaim_expired_leases(&self) -> usize {
        self.tasks.lock().await.reclaim_expired(Instant::now())
    }

    /// Like [`Self::next_assignment`], also returning the task counts observed
    /// under the same lock, right after the assignment was made.
    #[cfg(test)]
    async fn next_assignment_with_progress(&self, worker: &WorkerId) -> (Assignment, Progress) {
        let mut tasks = self.tasks.lock().await;
        let now = Instant::now();
        tasks.reclaim_expired(now);
        let assignment = tasks.next_assignment(worker, now);
        (assignment, tasks.progress())
    }

    /// Current task counts. Reclaims expired leases first.
    pub async fn progress(&self) -> Progress {
        let mut tasks = self.tasks.lock().await;
        tasks.reclaim_expired(Instant::now());
        tasks.progress()
    }
}

#[derive(Debug)]
struct Tasks {
    maps: Vec<MapTask>,
    reduces: Vec<ReduceTask>,
    n_reduce: u32,
    lease: Duration,
}

impl Tasks {
    fn new(files: Vec<String>, n_reduce: u32, lease: Duration) -> Self {
        Self {
            maps: files.into_iter().map(MapTask::new).collect(),
            reduces: (0..n_reduce).map(ReduceTask::new).collect(),
            n_reduce,
            lease,
        }
    }

    fn maps_done(&self) -> bool {
        self.maps.iter().all(|task| task.state.is_done())
    }

    fn is_done(&self) -> bool {
        self.maps_done() && self.reduces.iter().all(|task| task.state.is_done())
    }

    fn next_assignment(&mut self, worker: &WorkerId, now: Instant) -> Assignment {
        // A worker runs one task at a time; polling again abandons any lease it
        // still holds (e.g. when the reply carrying it was lost).
        self.release_leases_of(worker);

        if let Some(task) = self.maps.iter_mut().find(|task| task.state.is_pending()) {
            task.state.assign(worker.clone(), now);
            info!(worker = %worker, file = %task.file, "assigned map task");
            return Assignment::Map {
                file: task.file.clone(),
                n_reduce: self.n_reduce,
            };
        }

        // Phase barrier: reduce work waits for every map task to be done.
        if !self.maps_done() {
            return Assignment::NoWork { job_done: false };
        }

        if let Some(task) = self.reduces.iter_mut().find(|task| task.state.is_pending()) {
            task.state.assign(worker.clone(), now);
            info!(worker = %worker, partition = task.partition, "assigned reduce task");
            return Assignment::Reduce {
                partition: task.partition,
                n_reduce: self.n_reduce,
            };
        }

        Assignment::NoWork {
            job_done: self.is_done(),
        }
    }

    fn report_map_done(&mut self, worker: &WorkerId) -> bool {
        match self.maps.iter_mut().find(|task| task.state.is_owned_by(worker)) {
            Some(task) => {
                task.state.complete();
                info!(worker = %worker, file = %task.file, "map task done");
                true
            }
            None => {
                debug!(worker = %worker, "ignoring map report from worker without a lease");
                false
            }
        }
    }

    fn report_reduce_done(&mut self, worker: &WorkerId) -> bool {
        match self.reduces.iter_mut().find(|task| task.state.is_owned_by(worker)) {
            Some(task) => {
                task.state.complete();
                info!(worker = %worker, partition = task.partition, "reduce task done");
                true
            }
            None => {
                debug!(worker = %worker, "ignoring reduce report from worker without a lease");
                false
            }
        }
    }

    fn release_leases_of(&mut self, worker: &WorkerId) {
        for task in &mut self.maps {
            if task.state.is_owned_by(worker) {
                task.state.reclaim();
                warn!(worker = %worker, file = %task.file, "worker polled again, map task is pending again");
            }
        }

        for task in &mut self.reduces {
            if task.state.is_owned_by(worker) {
                task.state.reclaim();
                warn!(worker = %worker, partition = task.partition, "worker polled again, reduce task is pending again");
            }
        }
    }

    fn reclaim_expired(&mut self, now: Instant) -> usize {
        let lease = self.lease;
        let mut reclaimed = 0;

        for task in &mut self.maps {
            if task.state.lease_expired(now, lease) {
                if let Some(owner) = task.state.reclaim() {
                    warn!(worker = %owner, file = %task.file, "map lease expired, task is pending again");
                    reclaimed += 1;
                }
            }
        }

        for task in &mut self.reduces {
            if task.state.lease_expired(now, lease) {
                if let Some(owner) = task.state.reclaim() {
                    warn!(worker = %owner, partition = task.partition, "reduce lease expired, task is pending again");
                    reclaimed += 1;
                }
            }
        }

        reclaimed
    }

    fn progress(&self) -> Progress {
        Progress {
            maps_done: count_done(self.maps.iter().map(|task| &task.state)),
            maps_total: self.maps.len() as u32,
            reduces_done: count_done(self.reduces.iter().map(|task| &task.state)),
            reduces_total: self.reduces.len() as u32,
        }
    }
}

fn count_done<'a>(states: impl Iterator<Item = &'a TaskState>) -> u32 {
    states.filter(|state| state.is_done()).count() as u32
}
