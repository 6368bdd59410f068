//! TCP stream layer.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::error::{Result, TransportError};
use crate::transport::signaled;
use crate::transport::stream::{Conn, StreamLayer};

/// Plain TCP listener and dialer.
///
/// `close` drops the listening socket, so later dials to this address are
/// refused and the port can be bound again.
pub struct TcpStreamLayer {
    listener: Mutex<Option<Arc<TcpListener>>>,
    local: SocketAddr,
    advertise: SocketAddr,
    closed: watch::Sender<bool>,
}

impl TcpStreamLayer {
    /// Binds `bind_addr`.
    ///
    /// Peers are told to dial `advertise`, or the bound address when none is
    /// given. Either way it must be a concrete IP, not `0.0.0.0` or `::`.
    pub async fn bind(bind_addr: SocketAddr, advertise: Option<SocketAddr>) -> Result<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        let local = listener.local_addr()?;
        let advertise = advertise.unwrap_or(local);
        if advertise.ip().is_unspecified() {
            return Err(TransportError::NotAdvertisable(advertise));
        }
        let (closed, _) = watch::channel(false);
        Ok(Self {
            listener: Mutex::new(Some(Arc::new(listener))),
            local,
            advertise,
            closed,
        })
    }

    /// The address the listener was bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }
}

fn listener_closed() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, "listener closed")
}

fn wrap(stream: TcpStream) -> io::Result<Conn> {
    stream.set_nodelay(true)?;
    let local = stream.local_addr()?;
    let remote = stream.peer_addr()?;
    Ok(Conn::new(stream, local.to_string(), remote.to_string()))
}

#[async_trait]
impl StreamLayer for TcpStreamLayer {
    async fn accept(&self) -> io::Result<Conn> {
        let closed = self.closed.subscribe();
        // Cloned out so the lock is not held across the await. The clone is
        // released as soon as the close signal fires.
        let listener = self.listener.lock().clone().ok_or_else(listener_closed)?;
        tokio::select! {
            biased;
            _ = signaled(closed) => Err(listener_closed()),
            accepted = listener.accept() => wrap(accepted?.0),
        }
    }

    async fn dial(&self, address: &str, timeout: Duration) -> io::Result<Conn> {
        let stream = if timeout.is_zero() {
            TcpStream::connect(address).await?
        } else {
            tokio::time::timeout(timeout, TcpStream::connect(address))
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("dial {address} timed out after {timeout:?}"),
                    )
                })??
        };
        wrap(stream)
    }

    fn close(&self) -> io::Result<()> {
        let listener = self.listener.lock().take();
        self.closed.send_replace(true);
        drop(listener);
        Ok(())
    }

    fn addr(&self) -> String {
        self.advertise.to_string()
    }
}
