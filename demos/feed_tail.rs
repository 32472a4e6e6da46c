//! Feed tail
//!
//! Subscribes to the channels given on the command line and prints every
//! update until Ctrl-C. Timings come from `PUBSOCK_*_MS` environment
//! variables.
//!
//! Run with: cargo run --example feed_tail -- wss://feed.example.com/ws trades quotes

use pubsock::{ClientBuilder, ClientOptions, Notification};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .ok_or("usage: feed_tail <url> <channel>...")?;
    let channels: Vec<String> = args.collect();

    let client = ClientBuilder::new(url)
        .options(ClientOptions::from_env()?)
        .on_open(|_| async { tracing::info!("Feed open") })
        .on_close(|_| async { tracing::info!("Feed closed") })
        .connect()?;

    client.subscribe(channels)?;

    let mut events = client.events();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(Notification::Update(update)) => println!("{}", update),
                Ok(Notification::Error(e)) => tracing::warn!(error = %e, "Feed error"),
                Ok(Notification::Close) => break,
                Ok(Notification::Open) => {}
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "Event stream lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                client.close()?;
            }
        }
    }

    Ok(())
}
