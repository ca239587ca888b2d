use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mr_coordinator::args::Args;
use mr_coordinator::core::MRCoordinator;
use mr_coordinator::registry::TaskRegistry;

const CHECK_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Retrieve server configuration from command line.
    let args = Args::parse();
    mr_coordinator::check_inputs(&args.files)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!(
        files = args.files.len(),
        n_reduce = args.n_reduce,
        lease_secs = args.lease_secs,
        "Starting coordinator"
    );
    let registry = Arc::new(TaskRegistry::new(
        args.files,
        args.n_reduce,
        Duration::from_secs(args.lease_secs),
    ));

    let shutdown = CancellationToken::new();

    tokio::spawn(mr_coordinator::watch_job(
        registry.clone(),
        CHECK_INTERVAL,
        Duration::from_secs(args.linger_secs),
        shutdown.clone(),
    ));

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, shutting down");
                ctrl_c.cancel();
            }
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }
    });

    mr_coordinator::serve(listener, MRCoordinator::new(registry), shutdown).await?;

    Ok(())
}
