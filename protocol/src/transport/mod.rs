//! # Transport Module
//!
//! Peer-to-peer RPC plumbing for the node. Typed requests travel over
//! pooled physical connections supplied by a pluggable stream layer.
//!
//! ## Layout
//!
//! ```text
//! stream.rs   StreamLayer trait and the Conn wrapper
//! tcp.rs      TCP stream layer
//! memory.rs   in-process stream layer (duplex pipes)
//! codec.rs    length-prefixed bincode framing
//! rpc.rs      Rpc envelope, reply handle, consumer, sync payloads
//! pool.rs     per-target LIFO pool of idle outbound connections
//! network.rs  NetworkTransport: accept loop, handlers, outbound calls
//! ```
//!
//! ## Design Decisions
//!
//! - Inbound calls are handed to the consumer as message-passing envelopes
//!   with a one-shot reply channel. The consumer never sees a connection.
//! - Shutdown is a single `watch` channel observed by every inbound wait.
//!   Outbound calls are bounded by their I/O deadline instead.
//! - The pool lock is held for push/pop only, never across I/O.

pub mod codec;
pub mod memory;
pub mod network;
mod pool;
pub mod rpc;
pub mod stream;
pub mod tcp;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::Result;

pub use memory::{MemoryNetwork, MemoryStreamLayer};
pub use network::NetworkTransport;
pub use rpc::{
    Command, Consumer, Response, Rpc, RpcResponse, RpcType, SyncRequest, SyncResponse, WireEvent,
};
pub use stream::{AsyncStream, BoxedStream, Conn, StreamLayer};
pub use tcp::TcpStreamLayer;

/// What the gossip engine needs from a transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Inbound calls awaiting a reply.
    fn consumer(&self) -> Consumer;

    /// Address peers use to reach us.
    fn local_addr(&self) -> String;

    /// Sends a sync request to `target` and waits for the reply.
    async fn sync(&self, target: &str, args: &SyncRequest) -> Result<SyncResponse>;

    /// Shuts the transport down.
    fn close(&self) -> Result<()>;
}

/// Resolves once `rx` observes `true`, or its sender is gone.
pub(crate) async fn signaled(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}
