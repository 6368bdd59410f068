//! # CLI Interface
//!
//! Defines the command-line argument structure for `weave-node` using
//! `clap` derive. Supports two subcommands: `run` and `version`.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

/// Weave gossip node.
///
/// Joins a set of peers over TCP, appends local events on a fixed cadence
/// and syncs them with every peer each round.
#[derive(Parser, Debug)]
#[command(
    name = "weave-node",
    about = "Weave gossip node",
    version,
    propagate_version = true
)]
pub struct WeaveNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Weave node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node and gossip with its peers.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Address to bind the peer listener on.
    #[arg(long, short = 'l', env = "WEAVE_LISTEN", default_value = "127.0.0.1:1337")]
    pub listen: SocketAddr,

    /// Address peers should dial to reach us.
    ///
    /// Required when `--listen` binds an unspecified address such as
    /// `0.0.0.0`.
    #[arg(long, env = "WEAVE_ADVERTISE")]
    pub advertise: Option<SocketAddr>,

    /// Peer to gossip with. Repeat for several peers.
    #[arg(long = "peer", short = 'p', env = "WEAVE_PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Idle connections kept per peer.
    #[arg(long, env = "WEAVE_MAX_POOL", default_value_t = weave_protocol::config::DEFAULT_MAX_POOL)]
    pub max_pool: usize,

    /// I/O deadline for outbound calls, in milliseconds. 0 disables it.
    #[arg(long, env = "WEAVE_TIMEOUT_MS", default_value_t = 1_000)]
    pub timeout_ms: u64,

    /// Recent local events kept for peers that fall behind.
    #[arg(long, env = "WEAVE_WINDOW", default_value_t = 64)]
    pub window: usize,

    /// Time between gossip rounds, in milliseconds.
    #[arg(long, env = "WEAVE_INTERVAL_MS", default_value_t = 1_000)]
    pub interval_ms: u64,

    /// Log output format.
    #[arg(long, env = "WEAVE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}
