use clap::Parser;
use tokio::time::Duration;

mod args;
use args::{Args, Commands};

mod core;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Status => core::status(&args.address).await?,
        Commands::Wait { interval } => {
            core::wait(&args.address, Duration::from_secs(interval)).await?
        }
    }

    Ok(())
}
