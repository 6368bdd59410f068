//! Stream layer abstraction.
//!
//! The network transport never touches sockets directly. It asks a
//! [`StreamLayer`] to accept inbound connections and dial outbound ones,
//! and treats whatever comes back as an opaque duplex byte stream. TCP,
//! TLS-wrapped TCP, and in-memory pipes all plug in here.

use std::fmt;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Any duplex byte stream the transport can frame RPCs over.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> AsyncStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Type-erased stream as handed out by a stream layer.
pub type BoxedStream = Box<dyn AsyncStream>;

/// One physical connection plus the addresses of both ends.
pub struct Conn {
    stream: BoxedStream,
    local_addr: String,
    remote_addr: String,
}

impl Conn {
    pub fn new<S: AsyncStream>(
        stream: S,
        local_addr: impl Into<String>,
        remote_addr: impl Into<String>,
    ) -> Self {
        Self {
            stream: Box::new(stream),
            local_addr: local_addr.into(),
            remote_addr: remote_addr.into(),
        }
    }

    pub fn local_addr(&self) -> &str {
        &self.local_addr
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    /// Gives up the addresses and returns the raw stream.
    pub fn into_stream(self) -> BoxedStream {
        self.stream
    }
}

impl fmt::Debug for Conn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conn")
            .field("local_addr", &self.local_addr)
            .field("remote_addr", &self.remote_addr)
            .finish_non_exhaustive()
    }
}

/// Low-level listener/dialer used by the network transport.
#[async_trait]
pub trait StreamLayer: Send + Sync + 'static {
    /// Waits for the next inbound connection.
    ///
    /// After [`close`](StreamLayer::close) this must return an error rather
    /// than block forever.
    async fn accept(&self) -> io::Result<Conn>;

    /// Opens an outbound connection. A zero `timeout` means no limit.
    async fn dial(&self, address: &str, timeout: Duration) -> io::Result<Conn>;

    /// Stops accepting. Idempotent.
    fn close(&self) -> io::Result<()>;

    /// The address peers should dial to reach this layer.
    fn addr(&self) -> String;
}

#[async_trait]
impl<S: StreamLayer> StreamLayer for std::sync::Arc<S> {
    async fn accept(&self) -> io::Result<Conn> {
        (**self).accept().await
    }

    async fn dial(&self, address: &str, timeout: Duration) -> io::Result<Conn> {
        (**self).dial(address, timeout).await
    }

    fn close(&self) -> io::Result<()> {
        (**self).close()
    }

    fn addr(&self) -> String {
        (**self).addr()
    }
}
