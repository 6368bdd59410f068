//! # Gossip Engine
//!
//! Keeps this node's own events in a [`RollingList`] and exchanges them with
//! peers over a [`Transport`].
//!
//! ## Rounds
//!
//! Every interval the node appends one local event and then calls `sync` on
//! all peers at once. The request carries `known`: for each peer, how many of
//! that peer's events we have already received. The peer answers with
//! everything after that point.
//!
//! ## Serving
//!
//! Inbound `Sync` calls are answered from the rolling window. If the events
//! a caller asks for were already compacted away, the reply starts at the
//! oldest cached event and sets `sync_limit` so the caller knows it has a
//! gap.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use weave_protocol::transport::{
    Command, Consumer, Response, RpcResponse, SyncRequest, SyncResponse, Transport, WireEvent,
};
use weave_protocol::{RollingList, RollingListError};

/// Gossip state shared by the serve loop and the round loop.
pub struct Gossip {
    transport: Arc<dyn Transport>,
    local: String,
    peers: Vec<String>,
    events: RwLock<RollingList<WireEvent>>,
    known: RwLock<BTreeMap<String, u64>>,
}

impl Gossip {
    pub fn new(transport: Arc<dyn Transport>, peers: Vec<String>, window: usize) -> Self {
        let local = transport.local_addr();
        Self {
            transport,
            local,
            peers,
            events: RwLock::new(RollingList::new(window)),
            known: RwLock::new(BTreeMap::new()),
        }
    }

    /// Address this node advertises to peers.
    pub fn local(&self) -> &str {
        &self.local
    }

    /// Appends a local event and returns it.
    pub fn record_local(&self, body: Vec<u8>) -> WireEvent {
        let mut events = self.events.write();
        let event = WireEvent {
            index: events.total() as u64,
            creator: self.local.clone(),
            body,
        };
        events.add(event.clone());
        event
    }

    /// Number of events seen from each peer so far.
    pub fn known(&self) -> BTreeMap<String, u64> {
        self.known.read().clone()
    }

    /// Builds the reply to a sync request from the rolling window.
    pub fn answer(&self, req: &SyncRequest) -> SyncResponse {
        let events = self.events.read();
        let from = req.known.get(&self.local).copied().unwrap_or(0) as usize;

        let (slice, sync_limit) = match events.items_from(from) {
            Ok(slice) => (slice, false),
            Err(RollingListError::TooLate { oldest, .. }) => {
                debug!(peer = %req.from, requested = from, oldest, "requested events rolled away");
                (events.items_from(oldest).unwrap_or(&[]), true)
            }
            // The caller claims more than we ever produced; nothing to send.
            Err(RollingListError::NotFound { .. }) => (&[][..], false),
        };

        SyncResponse {
            from: self.local.clone(),
            sync_limit,
            events: slice.to_vec(),
            known: self.known(),
        }
    }

    /// Folds a peer's reply into `known`.
    fn absorb(&self, peer: &str, resp: &SyncResponse) -> usize {
        let fresh = resp
            .events
            .iter()
            .filter(|e| e.creator == resp.from)
            .map(|e| e.index + 1)
            .max();

        let mut known = self.known.write();
        let seen = known.entry(peer.to_string()).or_insert(0);
        let before = *seen;
        if let Some(next) = fresh {
            *seen = (*seen).max(next);
        }
        if resp.sync_limit {
            warn!(%peer, "peer window rolled past our position, events were skipped");
        }
        (*seen - before) as usize
    }

    /// Runs one round: sync with every peer concurrently.
    ///
    /// Returns how many peers answered successfully.
    pub async fn round(&self) -> usize {
        let req = SyncRequest {
            from: self.local.clone(),
            known: self.known(),
        };

        let calls = self.peers.iter().map(|peer| {
            let req = &req;
            async move { (peer, self.transport.sync(peer, req).await) }
        });

        let mut ok = 0;
        for (peer, result) in join_all(calls).await {
            match result {
                Ok(resp) => {
                    let fresh = self.absorb(peer, &resp);
                    debug!(%peer, fresh, limited = resp.sync_limit, "synced");
                    ok += 1;
                }
                Err(err) => debug!(%peer, error = %err, "sync failed"),
            }
        }
        ok
    }

    /// Answers inbound calls until the transport closes.
    pub async fn serve(self: Arc<Self>, consumer: Consumer) {
        while let Some(rpc) = consumer.recv().await {
            let reply = match &rpc.command {
                Command::Sync(req) => RpcResponse::ok(Response::Sync(self.answer(req))),
            };
            if !rpc.respond(reply) {
                debug!("caller went away before the reply");
            }
        }
        debug!("consumer closed, serve loop exiting");
    }

    /// Adds a local event and gossips every `interval` until `shutdown`.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(local = %self.local, peers = self.peers.len(), "gossip loop starting");
        let mut ticker = tokio::time::interval(interval);
        let mut seq = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    info!("gossip loop shutting down");
                    return;
                }
            }
            if *shutdown.borrow() {
                return;
            }

            let event = self.record_local(format!("{}#{seq}", self.local).into_bytes());
            seq += 1;
            let answered = self.round().await;
            debug!(index = event.index, answered, "gossip round complete");
        }
    }
}
