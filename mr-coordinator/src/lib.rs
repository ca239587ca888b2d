//! Coordinator side of the MapReduce cluster: the task registry, the
//! scheduler that hands tasks to polling workers, and its gRPC service.

pub mod args;
pub mod core;
pub mod registry;
pub mod task;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::time::Duration;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::info;

use common::layout;
use common::rpc::CoordinatorServer;

use crate::core::MRCoordinator;
use crate::registry::TaskRegistry;

/// Reject input names that would be mistaken for intermediate or output files.
pub fn check_inputs(files: &[String]) -> anyhow::Result<()> {
    if let Some(file) = files.iter().find(|file| layout::is_reserved_name(file)) {
        anyhow::bail!(
            "input `{}` clashes with the mr-<partition>-<worker> / mr-out-<partition> naming",
            file
        );
    }
    Ok(())
}

/// Serve `coordinator` on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    coordinator: MRCoordinator,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    info!("CoordinatorServer listening on {}", listener.local_addr()?);

    Server::builder()
        .add_service(CoordinatorServer::new(coordinator))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
            shutdown.cancelled().await
        })
        .await?;

    Ok(())
}

/// Cancel `shutdown` once every task is done, `linger` after the fact.
///
/// Each check doubles as a lease sweep, so expired tasks are reclaimed even
/// while no worker is polling.
pub async fn watch_job(
    registry: Arc<TaskRegistry>,
    check_every: Duration,
    linger: Duration,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(check_every);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if registry.is_job_done().await {
                    info!("All tasks are done, shutting down in {:?}", linger);
                    tokio::time::sleep(linger).await;
                    shutdown.cancel();
                    return;
                }
            }
            _ = shutdown.cancelled() => return,
        }
    }
}
