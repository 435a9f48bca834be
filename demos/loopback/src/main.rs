//! Loopback demo: a server and a client transport in one process.
//!
//! The client plays the console. Every period it sends a heartbeat
//! counter (descriptor 0) and a frame of twelve axis values
//! (descriptor 1). The server logs what it gets and echoes each heartbeat
//! back, which the client logs in turn.
//!
//! ```text
//! RUST_LOG=debug cargo run -p loopback -- --rounds 5 --period-ms 200
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use urtx::prelude::*;

const HEARTBEAT: Descriptor = Descriptor(0);
const AXES: Descriptor = Descriptor(1);

#[derive(Parser, Debug)]
#[command(name = "loopback", version, about = "urtx client/server loopback demo")]
struct Args {
    /// Address the server listens on; port 0 picks a free one
    #[arg(long, default_value = "127.0.0.1:0")]
    host: String,

    /// Number of send cycles before the client hangs up
    #[arg(long, default_value_t = 10)]
    rounds: u32,

    /// Time between send cycles
    #[arg(long, default_value_t = 100)]
    period_ms: u64,
}

/// Twelve axis values for one cycle: a triangle wave per axis, phase
/// shifted so every axis reads differently.
fn axes(round: u32) -> Vec<i64> {
    (0..12)
        .map(|axis| {
            let phase = (i64::from(round) * 1000 + axis * 2500) % 20_000;
            if phase < 10_000 { phase * 3 - 15_000 } else { 45_000 - phase * 3 }
        })
        .collect()
}

/// Starts the server's accept and waits until it is listening.
async fn start_server(
    server: &Arc<ServerTransport>,
    host: String,
) -> Result<(SocketAddr, tokio::task::JoinHandle<Result<(), ConnectionError>>), UrtxError> {
    let mut bound = server.link().bound_addr();
    let mut accept = tokio::spawn({
        let server = Arc::clone(server);
        async move { server.connect(host).await }
    });

    let addr = loop {
        if let Some(addr) = *bound.borrow_and_update() {
            break addr;
        }
        tokio::select! {
            _ = bound.changed() => {}
            joined = &mut accept => {
                // The accept ended before listening, so binding failed.
                return Err(match joined {
                    Ok(Err(e)) => e.into(),
                    _ => ConnectionError::NotConnected.into(),
                });
            }
        }
    };
    Ok((addr, accept))
}

#[tokio::main]
async fn main() -> Result<(), UrtxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let period = Duration::from_millis(args.period_ms.max(1));

    let server = Arc::new(TransportBuilder::new().build_server()?);
    let client = TransportBuilder::new().build_client()?;

    // Server side: log everything, queue heartbeats for the echo.
    let (echo_tx, mut echo_rx) = mpsc::unbounded_channel();
    server.on_package(|package| {
        tracing::debug!(descriptor = %package.descriptor(), "server: package");
    })?;
    server.on_descriptor(HEARTBEAT, move |package| {
        let _ = echo_tx.send(package.into_fields());
    })?;
    server.on_descriptor(AXES, |package| {
        tracing::info!(axes = ?package.fields(), "server: axes");
    })?;

    // Client side: log the echoes.
    client.on_descriptor(HEARTBEAT, |package| {
        tracing::info!(beat = package.fields()[0], "client: echo");
    })?;

    let (addr, accept) = start_server(&server, args.host).await?;
    client.connect(addr).await?;
    match accept.await {
        Ok(result) => result?,
        Err(e) => {
            tracing::error!(error = %e, "accept task failed");
            return Err(ConnectionError::NotConnected.into());
        }
    }
    tracing::info!(%addr, rounds = args.rounds, ?period, "linked");

    let echo = tokio::spawn({
        let server = Arc::clone(&server);
        async move {
            while let Some(fields) = echo_rx.recv().await {
                if let Err(e) = server.send_package(HEARTBEAT, &fields).await {
                    tracing::warn!(error = %e, "server: echo failed");
                    break;
                }
            }
        }
    });

    let mut ticker = tokio::time::interval(period);
    for round in 0..args.rounds {
        ticker.tick().await;
        client.send_package(HEARTBEAT, &[i64::from(round)]).await?;
        client.send_package(AXES, &axes(round)).await?;
    }

    // Let the last echo come back before hanging up.
    ticker.tick().await;
    client.disconnect().await;

    let mut state = server.watch_state();
    let _ = tokio::time::timeout(
        Duration::from_secs(1),
        state.wait_for(|s| *s == ConnectionState::Disconnected),
    )
    .await;
    tracing::info!(server = %server.state(), client = %client.state(), "done");

    echo.abort();
    Ok(())
}
