use anyhow::anyhow;
use bytes::Bytes;
use clap::Parser;
use tokio::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::layout::Layout;
use common::WorkerId;
use mr_worker::args::Args;
use mr_worker::core::{connect, MRWorker, WorkerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let workload = workload::try_named(&args.workload).ok_or_else(|| {
        anyhow!(
            "The workload `{}` is not a known workload (known: {})",
            args.workload,
            workload::names().collect::<Vec<_>>().join(", ")
        )
    })?;

    let config = WorkerConfig {
        layout: Layout::new(args.dir),
        workload,
        aux: Bytes::from(args.args.join(" ")),
        poll_interval: Duration::from_millis(args.poll_ms),
        max_failed_polls: args.max_failed_polls,
    };

    let client = connect(&args.address)?;
    let mut worker = MRWorker::new(WorkerId::generate(), client, config);
    info!("Worker started (ID={})", worker.id());

    worker.run().await?;

    Ok(())
}
