use anyhow::{Context, Result};
use tokio::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tonic::Request;

use common::rpc::{CoordinatorClient, StatusReply, StatusRequest};

async fn client(address: &str) -> Result<CoordinatorClient<Channel>> {
    let channel = Endpoint::from_shared(address.to_owned())?
        .connect()
        .await
        .with_context(|| format!("cannot reach coordinator at {}", address))?;
    Ok(CoordinatorClient::new(channel))
}

async fn probe(client: &mut CoordinatorClient<Channel>) -> Result<StatusReply> {
    Ok(client
        .status(Request::new(StatusRequest {}))
        .await?
        .into_inner())
}

fn print_status(status: &StatusReply) {
    println!("[Status]");
    println!("map:    {}/{}", status.maps_done, status.maps_total);
    println!("reduce: {}/{}", status.reduces_done, status.reduces_total);
    println!("done:   {}", status.done);
}

pub async fn status(address: &str) -> Result<()> {
    let mut client = client(address).await?;
    print_status(&probe(&mut client).await?);

    Ok(())
}

pub async fn wait(address: &str, interval: Duration) -> Result<()> {
    let mut client = client(address).await?;

    loop {
        let status = probe(&mut client).await?;
        if status.done {
            print_status(&status);
            return Ok(());
        }
        tokio::time::sleep(interval).await;
    }
}
