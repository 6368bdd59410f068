// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Weave Node
//!
//! Entry point for the `weave-node` binary. Parses CLI arguments, initializes
//! logging, binds the peer transport and runs the gossip engine until
//! Ctrl+C or SIGTERM.
//!
//! - `run` starts the node
//! - `version` prints build version information

mod cli;
mod gossip;
mod logging;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::watch;

use weave_protocol::NetworkTransport;

use cli::{Commands, WeaveNodeCli};
use gossip::Gossip;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = WeaveNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Binds the transport, then serves and gossips until a shutdown signal.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_DIRECTIVE, args.log_format);

    let transport = NetworkTransport::tcp(
        args.listen,
        args.advertise,
        args.max_pool,
        Duration::from_millis(args.timeout_ms),
    )
    .await
    .with_context(|| format!("failed to bind peer transport on {}", args.listen))?;

    let gossip = Arc::new(Gossip::new(
        Arc::new(transport.clone()),
        args.peers.clone(),
        args.window,
    ));

    tracing::info!(
        listen = %args.listen,
        advertise = %gossip.local(),
        peers = ?args.peers,
        window = args.window,
        "starting weave-node"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let serve = tokio::spawn(Arc::clone(&gossip).serve(transport.consumer()));
    let rounds = tokio::spawn(
        Arc::clone(&gossip).run(Duration::from_millis(args.interval_ms), shutdown_rx),
    );

    shutdown_signal().await;
    tracing::info!("shutdown signal received, closing transport");

    let _ = shutdown_tx.send(true);
    transport.close().context("failed to close transport")?;
    if let Err(e) = rounds.await {
        tracing::error!("gossip loop panicked: {}", e);
    }
    if let Err(e) = serve.await {
        tracing::error!("serve loop panicked: {}", e);
    }

    tracing::info!(known = ?gossip.known(), "weave-node stopped");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("weave-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed that branch never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
