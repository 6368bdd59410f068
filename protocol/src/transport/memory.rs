//! In-process stream layer.
//!
//! A [`MemoryNetwork`] is a registry of named listeners. Dialing an address
//! creates a `tokio::io::duplex` pipe and queues the far end on the
//! listener's backlog. Useful for tests and for running several nodes in
//! one process without touching the OS network stack.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use crate::config::{MEMORY_BACKLOG, MEMORY_PIPE_CAPACITY};
use crate::error::{Result, TransportError};
use crate::transport::signaled;
use crate::transport::stream::{Conn, StreamLayer};

type Registry = Arc<Mutex<HashMap<String, mpsc::Sender<Conn>>>>;

/// Shared namespace that memory stream layers bind into and dial through.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    listeners: Registry,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener under `addr`.
    pub fn bind(&self, addr: impl Into<String>) -> Result<MemoryStreamLayer> {
        let addr = addr.into();
        let (tx, rx) = mpsc::channel(MEMORY_BACKLOG);
        {
            let mut listeners = self.listeners.lock();
            if listeners.contains_key(&addr) {
                return Err(TransportError::AddressInUse(addr));
            }
            listeners.insert(addr.clone(), tx);
        }
        let (closed, _) = watch::channel(false);
        Ok(MemoryStreamLayer {
            addr,
            listeners: Arc::clone(&self.listeners),
            backlog: tokio::sync::Mutex::new(rx),
            closed,
            dials: AtomicU64::new(0),
        })
    }
}

/// A listener/dialer living on a [`MemoryNetwork`].
pub struct MemoryStreamLayer {
    addr: String,
    listeners: Registry,
    backlog: tokio::sync::Mutex<mpsc::Receiver<Conn>>,
    closed: watch::Sender<bool>,
    dials: AtomicU64,
}

impl MemoryStreamLayer {
    /// Number of successful outbound dials so far.
    pub fn dials(&self) -> u64 {
        self.dials.load(Ordering::Relaxed)
    }
}

fn listener_closed() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, "listener closed")
}

#[async_trait]
impl StreamLayer for MemoryStreamLayer {
    async fn accept(&self) -> io::Result<Conn> {
        let closed = self.closed.subscribe();
        if *closed.borrow() {
            return Err(listener_closed());
        }
        let mut backlog = self.backlog.lock().await;
        tokio::select! {
            conn = backlog.recv() => conn.ok_or_else(listener_closed),
            _ = signaled(closed) => Err(listener_closed()),
        }
    }

    async fn dial(&self, address: &str, _timeout: Duration) -> io::Result<Conn> {
        let listener = self
            .listeners
            .lock()
            .get(address)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    format!("no listener at {address}"),
                )
            })?;

        let (local, remote) = tokio::io::duplex(MEMORY_PIPE_CAPACITY);
        listener
            .try_send(Conn::new(remote, address, self.addr.clone()))
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    format!("listener at {address} is not accepting"),
                )
            })?;
        self.dials.fetch_add(1, Ordering::Relaxed);
        Ok(Conn::new(local, self.addr.clone(), address))
    }

    fn close(&self) -> io::Result<()> {
        self.listeners.lock().remove(&self.addr);
        self.closed.send_replace(true);
        Ok(())
    }

    fn addr(&self) -> String {
        self.addr.clone()
    }
}
