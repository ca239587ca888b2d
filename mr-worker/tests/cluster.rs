//! Runs a real coordinator server on an ephemeral port against in-process
//! workers sharing a temporary working directory.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tonic::Request;

use common::codec::decode_all;
use common::layout::Layout;
use common::rpc::{AssignmentRequest, DoneRequest, StatusRequest};
use common::{KeyValue, WorkerId};
use mr_coordinator::core::MRCoordinator;
use mr_coordinator::registry::{TaskRegistry, DEFAULT_LEASE};
use mr_worker::core::{connect, MRWorker, Step, WorkerConfig};
use mr_worker::map;

struct Cluster {
    address: String,
    registry: Arc<TaskRegistry>,
    shutdown: CancellationToken,
    server: JoinHandle<anyhow::Result<()>>,
}

impl Cluster {
    async fn start(files: &[&str], n_reduce: u32, lease: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());

        let files = files.iter().map(|file| file.to_string()).collect();
        let registry = Arc::new(TaskRegistry::new(files, n_reduce, lease));
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(mr_coordinator::serve(
            listener,
            MRCoordinator::new(registry.clone()),
            shutdown.clone(),
        ));

        Self {
            address,
            registry,
            shutdown,
            server,
        }
    }

    fn worker(&self, dir: &Path, workload: &str, aux: &str) -> MRWorker {
        self.worker_with_id(WorkerId::generate(), dir, workload, aux)
    }

    fn worker_with_id(&self, id: WorkerId, dir: &Path, workload: &str, aux: &str) -> MRWorker {
        let config = WorkerConfig {
            layout: Layout::new(dir),
            workload: workload::try_named(workload).unwrap(),
            aux: Bytes::from(aux.to_owned()),
            poll_interval: Duration::from_millis(20),
            max_failed_polls: 50,
        };
        MRWorker::new(id, connect(&self.address).unwrap(), config)
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.server.await.unwrap().unwrap();
    }
}

fn write_inputs(dir: &Path, inputs: &[(&str, &str)]) {
    for (name, contents) in inputs {
        fs::write(dir.join(name), contents).unwrap();
    }
}

/// Every output line across all `mr-out-*` files, sorted.
fn merged_output(dir: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for path in Layout::new(dir).output_files().unwrap() {
        lines.extend(fs::read_to_string(path).unwrap().lines().map(str::to_owned));
    }
    lines.sort();
    lines
}

fn intermediate_records(dir: &Path, n_reduce: u32) -> Vec<KeyValue> {
    let layout = Layout::new(dir);
    let mut records = Vec::new();
    for partition in 0..n_reduce {
        for path in layout.intermediate_files(partition).unwrap() {
            records.extend(decode_all(BufReader::new(File::open(path).unwrap())).unwrap());
        }
    }
    records
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn word_count_end_to_end() {
    let dir = tempfile::TempDir::new().unwrap();
    write_inputs(dir.path(), &[("pg-a.txt", "a b a"), ("pg-b.txt", "b c")]);
    let cluster = Cluster::start(&["pg-a.txt", "pg-b.txt"], 2, DEFAULT_LEASE).await;

    let mut w1 = cluster.worker(dir.path(), "wc", "");
    let mut w2 = cluster.worker(dir.path(), "wc", "");
    let (r1, r2) = tokio::join!(w1.run(), w2.run());
    r1.unwrap();
    r2.unwrap();

    assert_eq!(merged_output(dir.path()), ["a 2", "b 2", "c 1"]);
    assert_eq!(Layout::new(dir.path()).output_files().unwrap().len(), 2);
    assert!(cluster.registry.is_job_done().await);

    let status = connect(&cluster.address)
        .unwrap()
        .status(Request::new(StatusRequest {}))
        .await
        .unwrap()
        .into_inner();
    assert!(status.done);
    assert_eq!((status.maps_done, status.reduces_done), (2, 2));

    cluster.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn crashed_worker_task_is_reassigned() {
    let dir = tempfile::TempDir::new().unwrap();
    write_inputs(dir.path(), &[("pg-a.txt", "a b a"), ("pg-b.txt", "b c")]);
    let cluster = Cluster::start(&["pg-a.txt", "pg-b.txt"], 2, Duration::from_millis(300)).await;

    // Takes the first map task and is never heard from again.
    let taken = connect(&cluster.address)
        .unwrap()
        .assignment(Request::new(AssignmentRequest {
            worker_id: "crashed".into(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!((taken.work_type.as_str(), taken.file.as_str()), ("map", "pg-a.txt"));

    let mut survivor = cluster.worker(dir.path(), "wc", "");
    survivor.run().await.unwrap();

    assert!(cluster.registry.is_job_done().await);
    assert_eq!(merged_output(dir.path()), ["a 2", "b 2", "c 1"]);

    cluster.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lost_assignment_reply_is_handed_out_again() {
    let dir = tempfile::TempDir::new().unwrap();
    write_inputs(dir.path(), &[("a.txt", "a a"), ("b.txt", "b")]);
    let cluster = Cluster::start(&["a.txt", "b.txt"], 1, Duration::from_millis(300)).await;

    // The coordinator hands out a.txt but the worker never sees the reply.
    let lost = connect(&cluster.address)
        .unwrap()
        .assignment(Request::new(AssignmentRequest {
            worker_id: "w".into(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(lost.file, "a.txt");

    // The same worker polls again and must not finish a.txt by accident.
    let mut worker = cluster.worker_with_id(WorkerId::from("w"), dir.path(), "wc", "");
    worker.run().await.unwrap();

    assert!(cluster.registry.is_job_done().await);
    assert_eq!(merged_output(dir.path()), ["a 2", "b 1"]);

    cluster.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_worker_duplicates_are_tolerated() {
    let dir = tempfile::TempDir::new().unwrap();
    write_inputs(dir.path(), &[("notes.txt", "foo 1\nbar\nfoo 2\n")]);
    let cluster = Cluster::start(&["notes.txt"], 2, Duration::from_millis(200)).await;
    let mut slow_client = connect(&cluster.address).unwrap();

    let taken = slow_client
        .assignment(Request::new(AssignmentRequest {
            worker_id: "slow".into(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(taken.file, "notes.txt");

    tokio::time::sleep(Duration::from_millis(400)).await;

    // The lease ran out, so the same task goes to a second worker.
    let mut fast = cluster.worker(dir.path(), "grep", "foo");
    assert_eq!(fast.step().await.unwrap(), Step::Mapped("notes.txt".into()));

    // The slow worker finishes anyway and commits its own copy.
    map::perform_map(
        &WorkerId::from("slow"),
        "notes.txt",
        taken.n_reduce,
        &Layout::new(dir.path()),
        workload::try_named("grep").unwrap(),
        Bytes::from("foo"),
    )
    .unwrap();
    slow_client
        .done_map(Request::new(DoneRequest {
            worker_id: "slow".into(),
        }))
        .await
        .unwrap();

    let records = intermediate_records(dir.path(), 2);
    let distinct = records.iter().cloned().collect::<HashSet<_>>();
    assert_eq!(records.len(), 4);
    assert_eq!(
        distinct,
        HashSet::from([
            KeyValue::new("foo 1", "notes.txt"),
            KeyValue::new("foo 2", "notes.txt"),
        ])
    );

    fast.run().await.unwrap();

    assert_eq!(merged_output(dir.path()), ["foo 1 notes.txt", "foo 2 notes.txt"]);
    assert!(cluster.registry.is_job_done().await);

    cluster.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_task_is_retried_by_another_worker() {
    let dir = tempfile::TempDir::new().unwrap();
    let cluster = Cluster::start(&["late.txt"], 1, Duration::from_millis(200)).await;

    // Input is not there yet: the task fails and the worker gives up.
    let mut first = cluster.worker(dir.path(), "wc", "");
    assert!(first.run().await.is_err());
    assert!(!cluster.registry.is_job_done().await);

    write_inputs(dir.path(), &[("late.txt", "x y x")]);
    let mut second = cluster.worker(dir.path(), "wc", "");
    second.run().await.unwrap();

    assert_eq!(merged_output(dir.path()), ["x 2", "y 1"]);

    cluster.stop().await;
}

#[tokio::test]
async fn worker_exits_when_coordinator_is_gone() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = WorkerConfig {
        layout: Layout::new(dir.path()),
        workload: workload::try_named("wc").unwrap(),
        aux: Bytes::new(),
        poll_interval: Duration::from_millis(10),
        max_failed_polls: 3,
    };
    let mut worker = MRWorker::new(
        WorkerId::generate(),
        connect("http://127.0.0.1:1").unwrap(),
        config,
    );

    assert_eq!(worker.step().await.unwrap(), Step::Unreachable);
    worker.run().await.unwrap();
}
