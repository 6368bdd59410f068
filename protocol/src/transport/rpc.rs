//! # RPC Envelopes
//!
//! Types that cross the boundary between the transport and whoever consumes
//! inbound calls. Each inbound frame becomes one [`Rpc`]: the decoded
//! [`Command`] plus a single-use reply handle. The consumer pulls envelopes
//! off the shared [`Consumer`] channel and answers each exactly once with
//! [`Rpc::respond`].
//!
//! ```text
//! connection handler ──Rpc──> dispatch channel ──> consumer
//!          ^                                          │
//!          └────────────── oneshot RpcResponse ───────┘
//! ```
//!
//! The sync payloads are opaque to the transport; their meaning belongs to
//! the gossip engine that consumes them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch, Mutex};

use crate::error::TransportError;
use crate::transport::signaled;

// ---------------------------------------------------------------------------
// Request Tags
// ---------------------------------------------------------------------------

/// One-byte tag that opens every request frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RpcType {
    /// Gossip sync; the body is a [`SyncRequest`].
    Sync = 0,
}

impl From<RpcType> for u8 {
    fn from(rpc_type: RpcType) -> Self {
        rpc_type as u8
    }
}

impl TryFrom<u8> for RpcType {
    type Error = TransportError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(RpcType::Sync),
            other => Err(TransportError::UnknownRpcType(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Sync Payloads
// ---------------------------------------------------------------------------

/// An event as shipped between peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEvent {
    /// Position of the event in its creator's stream.
    pub index: u64,
    /// Address of the node that created the event.
    pub creator: String,
    /// Encoded event body.
    pub body: Vec<u8>,
}

/// "Here is what I know; send me what I am missing."
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Address of the requesting node.
    pub from: String,
    /// Number of events seen per creator.
    pub known: BTreeMap<String, u64>,
}

/// Reply to a [`SyncRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Address of the responding node.
    pub from: String,
    /// Set when the responder could not serve everything that was asked for.
    pub sync_limit: bool,
    /// Events the requester has not seen, oldest first.
    pub events: Vec<WireEvent>,
    /// Number of events the responder has seen per creator.
    pub known: BTreeMap<String, u64>,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A decoded inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Sync(SyncRequest),
}

impl Command {
    pub fn rpc_type(&self) -> RpcType {
        match self {
            Command::Sync(_) => RpcType::Sync,
        }
    }
}

/// A response value produced by the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Sync(SyncResponse),
}

/// What the consumer hands back for one [`Rpc`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcResponse {
    pub response: Option<Response>,
    pub error: Option<String>,
}

impl RpcResponse {
    /// A successful reply.
    pub fn ok(response: Response) -> Self {
        Self {
            response: Some(response),
            error: None,
        }
    }

    /// A failed reply. The caller sees `message` as its error.
    pub fn err(message: impl fmt::Display) -> Self {
        Self {
            response: None,
            error: Some(message.to_string()),
        }
    }
}

/// One inbound call awaiting a reply.
pub struct Rpc {
    pub command: Command,
    reply: oneshot::Sender<RpcResponse>,
}

impl Rpc {
    pub(crate) fn new(command: Command) -> (Self, oneshot::Receiver<RpcResponse>) {
        let (reply, rx) = oneshot::channel();
        (Self { command, reply }, rx)
    }

    /// Sends the reply back to the connection handler.
    ///
    /// Returns `false` if the handler is gone (peer hung up or the transport
    /// shut down), in which case the reply is dropped.
    pub fn respond(self, response: RpcResponse) -> bool {
        self.reply.send(response).is_ok()
    }
}

impl fmt::Debug for Rpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rpc")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Consumer
// ---------------------------------------------------------------------------

/// Receiving side of the dispatch channel.
///
/// Clones share one queue, so several workers can drain it; each `Rpc` is
/// delivered to exactly one of them.
#[derive(Clone)]
pub struct Consumer {
    rx: Arc<Mutex<mpsc::Receiver<Rpc>>>,
    shutdown: watch::Receiver<bool>,
}

impl Consumer {
    pub(crate) fn new(rx: mpsc::Receiver<Rpc>, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(rx)),
            shutdown,
        }
    }

    /// Waits for the next inbound call.
    ///
    /// Returns `None` once the transport is closed or dropped, even with
    /// calls still queued: their handlers have already given up on them.
    pub async fn recv(&self) -> Option<Rpc> {
        tokio::select! {
            biased;
            _ = signaled(self.shutdown.clone()) => None,
            rpc = async { self.rx.lock().await.recv().await } => rpc,
        }
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").finish_non_exhaustive()
    }
}
