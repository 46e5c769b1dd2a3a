//! Doodlefest host entry point: drives one local session over stdio.

use std::sync::Arc;

use doodlefest_core::clock::SystemClock;
use doodlefest_host::config::HostConfig;
use doodlefest_host::error::AppError;
use doodlefest_host::protocol::{Outbound, handle_line};
use doodlefest_host::registry::SessionRegistry;
use doodlefest_session::domain::controller::Vantage;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber. Stdout carries the protocol, so logs go
    // to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    tracing::info!("Starting Doodlefest host");

    let config = HostConfig::from_env()?;
    let registry = SessionRegistry::new(config, Arc::new(SystemClock));
    let host = registry.create(Vantage::Referee, true)?;
    tracing::info!(session_id = %host.session_id(), "Session ready");

    // One writer owns stdout so replies and events never interleave mid-line.
    let (lines, mut outgoing) = mpsc::channel::<String>(config.event_buffer);
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = outgoing.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<(), std::io::Error>(())
    });

    let mut events = host.subscribe();
    let event_lines = lines.clone();
    let forwarder = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let line = Outbound::Event { event }.to_line()?;
                    if event_lines.send(line).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        Ok::<(), serde_json::Error>(())
    });

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = input.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = handle_line(&host, &line).to_line()?;
        if lines.send(reply).await.is_err() {
            break;
        }
    }

    tracing::info!("Input closed, shutting down");
    // Dropping the last handle closes the event channel; the forwarder
    // drains what is buffered and stops.
    registry.remove(host.session_id())?;
    drop(host);
    forwarder.await??;
    drop(lines);
    writer.await??;

    Ok(())
}
