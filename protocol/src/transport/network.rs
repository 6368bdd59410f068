//! # Network Transport
//!
//! Bidirectional RPC engine on top of a [`StreamLayer`].
//!
//! ## Inbound
//!
//! One background task accepts connections and spawns a handler per
//! connection. A handler reads one request frame at a time, hands the
//! decoded [`Rpc`] to the consumer through the shared dispatch channel,
//! waits for the reply, writes it back and flushes. Commands on a single
//! connection are strictly sequential; concurrency comes from having many
//! connections. Reading, dispatching and waiting for the reply all race
//! the shutdown signal, and shutdown wins.
//!
//! ## Outbound
//!
//! [`NetworkTransport::sync`] checks a connection out of the pool (or dials
//! a new one), writes the request, and decodes the error string and the
//! response value. A connection goes back to the pool only after a complete
//! round trip. Any I/O, decode, or deadline failure closes it, since the
//! stream may be out of step with the peer.
//!
//! ## Shutdown
//!
//! [`NetworkTransport::close`] flips a flag, fires a `watch` signal observed
//! by every inbound wait, the accept loop and the [`Consumer`], closes the
//! stream layer, and closes the pool. Idle pooled connections are dropped
//! and calls still in flight cannot put theirs back. It is idempotent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info_span, Instrument};

use crate::config::{TransportConfig, ACCEPT_BACKOFF, DEFAULT_TIMEOUT_SCALE};
use crate::error::{Result, TransportError};
use crate::transport::codec;
use crate::transport::pool::{ConnPool, NetConn};
use crate::transport::rpc::{Consumer, Rpc, RpcResponse, RpcType, SyncRequest, SyncResponse};
use crate::transport::signaled;
use crate::transport::stream::{Conn, StreamLayer};
use crate::transport::tcp::TcpStreamLayer;
use crate::transport::Transport;

/// Reply sent to the peer when the consumer drops an `Rpc` unanswered.
const DROPPED_RPC: &str = "rpc dropped without a response";

/// Network-based [`Transport`].
///
/// Cheap to clone; clones share the same listener, pool and consumer.
#[derive(Clone)]
pub struct NetworkTransport {
    inner: Arc<Inner>,
}

struct Inner {
    pool: ConnPool,
    consume_tx: mpsc::Sender<Rpc>,
    consumer: Consumer,
    shutdown: Mutex<bool>,
    shutdown_tx: watch::Sender<bool>,
    stream: Box<dyn StreamLayer>,
    timeout: Duration,
    next_conn_id: AtomicU64,
}

impl NetworkTransport {
    /// Creates a transport over `stream` and starts accepting connections.
    ///
    /// `max_pool` bounds the idle connections kept per target; `timeout` is
    /// the I/O deadline for outbound calls, stretched for large requests
    /// (zero disables it). Must be called from within a Tokio runtime.
    pub fn new<S: StreamLayer>(stream: S, max_pool: usize, timeout: Duration) -> Self {
        // Capacity 1 is the closest Tokio gets to a rendezvous channel.
        let (consume_tx, consume_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let inner = Arc::new(Inner {
            pool: ConnPool::new(max_pool),
            consume_tx,
            consumer: Consumer::new(consume_rx, shutdown_rx),
            shutdown: Mutex::new(false),
            shutdown_tx,
            stream: Box::new(stream),
            timeout,
            next_conn_id: AtomicU64::new(0),
        });

        let span = info_span!("transport", local = %inner.stream.addr());
        tokio::spawn(listen(Arc::clone(&inner)).instrument(span));

        Self { inner }
    }

    /// Same as [`new`](Self::new), with pool size and timeout from `config`.
    pub fn with_config<S: StreamLayer>(stream: S, config: &TransportConfig) -> Self {
        Self::new(stream, config.max_pool, config.timeout())
    }

    /// Binds a TCP stream layer and builds a transport on it.
    pub async fn tcp(
        bind_addr: std::net::SocketAddr,
        advertise: Option<std::net::SocketAddr>,
        max_pool: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let stream = TcpStreamLayer::bind(bind_addr, advertise).await?;
        Ok(Self::new(stream, max_pool, timeout))
    }

    /// Stops the transport. Safe to call more than once.
    pub fn close(&self) -> Result<()> {
        let mut shutdown = self.inner.shutdown.lock();
        if !*shutdown {
            *shutdown = true;
            self.inner.shutdown_tx.send_replace(true);
            if let Err(err) = self.inner.stream.close() {
                debug!(error = %err, "failed to close stream layer");
            }
        }
        drop(shutdown);

        for conn in self.inner.pool.drain() {
            conn.release();
        }
        Ok(())
    }

    /// Receiving side of the inbound dispatch channel.
    pub fn consumer(&self) -> Consumer {
        self.inner.consumer.clone()
    }

    /// Address peers use to reach this transport.
    pub fn local_addr(&self) -> String {
        self.inner.stream.addr()
    }

    /// Non-blocking check of the shutdown signal.
    pub fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown()
    }

    /// Idle pooled connections currently held for `target`.
    pub fn pooled_conns(&self, target: &str) -> usize {
        self.inner.pool.idle(target)
    }

    /// Sends a sync request to `target` and waits for the reply.
    pub async fn sync(&self, target: &str, args: &SyncRequest) -> Result<SyncResponse> {
        self.generic_rpc(target, RpcType::Sync, args).await
    }

    /// One request/response round trip on a pooled or fresh connection.
    pub async fn generic_rpc<Req, Resp>(
        &self,
        target: &str,
        rpc_type: RpcType,
        args: &Req,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        if self.is_shutdown() {
            return Err(TransportError::Shutdown);
        }

        let timeout = scaled_timeout(self.inner.timeout, bincode::serialized_size(args)?);
        let mut conn = self.get_conn(target, timeout).await.map_err(|err| {
            debug!(%target, ?timeout, error = %err, "failed to acquire connection");
            err
        })?;

        let outcome = if timeout.is_zero() {
            round_trip(&mut conn, rpc_type, args).await
        } else {
            let deadline = Instant::now() + timeout;
            debug!(conn_id = conn.id(), ?timeout, "setting connection deadline");
            match tokio::time::timeout_at(deadline, round_trip(&mut conn, rpc_type, args)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(TransportError::Timeout(timeout)),
            }
        };

        match outcome {
            Ok((rpc_error, body)) => {
                debug!(conn_id = conn.id(), "returning reusable connection to pool");
                self.return_conn(conn);
                if !rpc_error.is_empty() {
                    debug!(%target, error = %rpc_error, "rpc error");
                    return Err(TransportError::Remote(rpc_error));
                }
                body.ok_or(TransportError::MissingResponse)
            }
            Err(err) => {
                debug!(conn_id = conn.id(), %target, error = %err, "rpc failed, closing connection");
                conn.release();
                Err(err)
            }
        }
    }

    async fn get_conn(&self, target: &str, timeout: Duration) -> Result<NetConn> {
        if let Some(conn) = self.inner.pool.take(target) {
            return Ok(conn);
        }

        let conn = self.inner.stream.dial(target, timeout).await?;
        let id = self.inner.next_conn_id.fetch_add(1, Ordering::Relaxed);
        debug!(conn_id = id, %target, "dialed new connection");
        Ok(NetConn::new(id, target, conn))
    }

    fn return_conn(&self, conn: NetConn) {
        if let Some(rejected) = self.inner.pool.put(conn) {
            rejected.release();
        }
    }
}

impl Inner {
    fn is_shutdown(&self) -> bool {
        *self.shutdown_tx.borrow()
    }
}

#[async_trait]
impl Transport for NetworkTransport {
    fn consumer(&self) -> Consumer {
        NetworkTransport::consumer(self)
    }

    fn local_addr(&self) -> String {
        NetworkTransport::local_addr(self)
    }

    async fn sync(&self, target: &str, args: &SyncRequest) -> Result<SyncResponse> {
        NetworkTransport::sync(self, target, args).await
    }

    fn close(&self) -> Result<()> {
        NetworkTransport::close(self)
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Stretches `base` by one unit per [`DEFAULT_TIMEOUT_SCALE`] bytes of request.
fn scaled_timeout(base: Duration, payload_len: u64) -> Duration {
    let units = 1 + payload_len / DEFAULT_TIMEOUT_SCALE as u64;
    base.saturating_mul(u32::try_from(units).unwrap_or(u32::MAX))
}

async fn round_trip<Req, Resp>(
    conn: &mut NetConn,
    rpc_type: RpcType,
    args: &Req,
) -> Result<(String, Option<Resp>)>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    debug!(conn_id = conn.id(), ?rpc_type, "sending rpc");
    codec::write_request(&mut conn.writer, rpc_type, args).await?;
    conn.writer.flush().await?;
    codec::read_response(&mut conn.reader).await
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

async fn listen(inner: Arc<Inner>) {
    let shutdown = inner.shutdown_tx.subscribe();
    loop {
        let accepted = tokio::select! {
            biased;
            _ = signaled(shutdown.clone()) => return,
            accepted = inner.stream.accept() => accepted,
        };

        match accepted {
            Ok(conn) => {
                debug!(node = %conn.local_addr(), from = %conn.remote_addr(), "accepted connection");
                tokio::spawn(handle_conn(Arc::clone(&inner), conn).in_current_span());
            }
            Err(err) => {
                if inner.is_shutdown() {
                    return;
                }
                error!(error = %err, "failed to accept connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

async fn handle_conn(inner: Arc<Inner>, conn: Conn) {
    let from = conn.remote_addr().to_string();
    let (r, w) = tokio::io::split(conn.into_stream());
    let mut reader = BufReader::new(r);
    let mut writer = BufWriter::new(w);

    loop {
        match handle_command(&inner, &mut reader, &mut writer).await {
            Ok(()) => {}
            Err(TransportError::ConnectionClosed) => return,
            Err(TransportError::Shutdown) => {
                debug!(%from, "dropping connection on shutdown");
                return;
            }
            Err(err) => {
                error!(%from, error = %err, "failed to decode incoming command");
                return;
            }
        }
        if let Err(err) = writer.flush().await {
            error!(%from, error = %err, "failed to flush response");
            return;
        }
    }
}

async fn handle_command<R, W>(inner: &Inner, reader: &mut R, writer: &mut W) -> Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let shutdown = inner.shutdown_tx.subscribe();
    let command = tokio::select! {
        biased;
        _ = signaled(shutdown.clone()) => return Err(TransportError::Shutdown),
        command = codec::read_command(reader) => command?,
    };
    let (rpc, reply) = Rpc::new(command);

    tokio::select! {
        biased;
        _ = signaled(shutdown.clone()) => return Err(TransportError::Shutdown),
        sent = inner.consume_tx.send(rpc) => sent.map_err(|_| TransportError::Shutdown)?,
    }

    let resp = tokio::select! {
        biased;
        _ = signaled(shutdown) => return Err(TransportError::Shutdown),
        resp = reply => resp.unwrap_or_else(|_| RpcResponse::err(DROPPED_RPC)),
    };

    codec::write_response(writer, resp).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::{MemoryNetwork, MemoryStreamLayer};
    use crate::transport::rpc::{Command, Response, WireEvent};
    use tokio::task::JoinHandle;

    fn transport(
        net: &MemoryNetwork,
        addr: &str,
        max_pool: usize,
        timeout: Duration,
    ) -> (NetworkTransport, Arc<MemoryStreamLayer>) {
        let layer = Arc::new(net.bind(addr).unwrap());
        (
            NetworkTransport::new(Arc::clone(&layer), max_pool, timeout),
            layer,
        )
    }

    /// Answers every inbound sync with `handler`, after an optional delay.
    fn serve<F>(server: &NetworkTransport, delay: Duration, handler: F) -> JoinHandle<()>
    where
        F: Fn(SyncRequest) -> RpcResponse + Send + Sync + 'static,
    {
        let consumer = server.consumer();
        let handler = Arc::new(handler);
        tokio::spawn(async move {
            while let Some(rpc) = consumer.recv().await {
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let Command::Sync(req) = rpc.command.clone();
                    rpc.respond(handler(req));
                });
            }
        })
    }

    fn echo(req: SyncRequest) -> RpcResponse {
        RpcResponse::ok(Response::Sync(SyncResponse {
            from: "server".into(),
            sync_limit: false,
            events: vec![WireEvent {
                index: 0,
                creator: req.from.clone(),
                body: req.from.into_bytes(),
            }],
            known: req.known,
        }))
    }

    fn request(from: &str) -> SyncRequest {
        SyncRequest {
            from: from.into(),
            ..SyncRequest::default()
        }
    }

    #[tokio::test]
    async fn sync_round_trip_pools_the_connection() {
        let net = MemoryNetwork::new();
        let (server, _) = transport(&net, "server", 2, Duration::from_secs(1));
        let (client, layer) = transport(&net, "client", 2, Duration::from_secs(1));
        serve(&server, Duration::ZERO, echo);

        let resp = client.sync("server", &request("client")).await.unwrap();
        assert_eq!(resp.from, "server");
        assert_eq!(resp.events[0].body, b"client");
        assert_eq!(client.pooled_conns("server"), 1);
        assert_eq!(layer.dials(), 1);
    }

    #[tokio::test]
    async fn sequential_calls_reuse_one_connection() {
        let net = MemoryNetwork::new();
        let (server, _) = transport(&net, "server", 2, Duration::from_secs(1));
        let (client, layer) = transport(&net, "client", 2, Duration::from_secs(1));
        serve(&server, Duration::ZERO, echo);

        for i in 0..10 {
            let resp = client.sync("server", &request(&format!("c{i}"))).await.unwrap();
            assert_eq!(resp.events[0].creator, format!("c{i}"));
        }
        assert_eq!(layer.dials(), 1);
        assert_eq!(client.pooled_conns("server"), 1);
    }

    #[tokio::test]
    async fn concurrent_calls_dial_separately_and_respect_pool_cap() {
        let net = MemoryNetwork::new();
        let (server, _) = transport(&net, "server", 1, Duration::from_secs(1));
        let (client, layer) = transport(&net, "client", 1, Duration::from_secs(1));
        serve(&server, Duration::from_millis(50), echo);

        let (req_a, req_b) = (request("a"), request("b"));
        let (a, b) = tokio::join!(
            client.sync("server", &req_a),
            client.sync("server", &req_b)
        );
        assert_eq!(a.unwrap().events[0].creator, "a");
        assert_eq!(b.unwrap().events[0].creator, "b");
        assert_eq!(layer.dials(), 2);
        assert_eq!(client.pooled_conns("server"), 1);
    }

    #[tokio::test]
    async fn application_error_keeps_connection_pooled() {
        let net = MemoryNetwork::new();
        let (server, _) = transport(&net, "server", 2, Duration::from_secs(1));
        let (client, layer) = transport(&net, "client", 2, Duration::from_secs(1));
        serve(&server, Duration::ZERO, |_| RpcResponse::err("unknown peer"));

        let err = client.sync("server", &request("client")).await.unwrap_err();
        assert!(matches!(err, TransportError::Remote(ref msg) if msg == "unknown peer"));
        assert_eq!(client.pooled_conns("server"), 1);

        // The stream is still in step: the next call reuses it.
        let err = client.sync("server", &request("client")).await.unwrap_err();
        assert!(err.is_application());
        assert_eq!(layer.dials(), 1);
    }

    #[tokio::test]
    async fn empty_reply_is_missing_response() {
        let net = MemoryNetwork::new();
        let (server, _) = transport(&net, "server", 2, Duration::from_secs(1));
        let (client, _) = transport(&net, "client", 2, Duration::from_secs(1));
        serve(&server, Duration::ZERO, |_| RpcResponse {
            response: None,
            error: None,
        });

        let err = client.sync("server", &request("client")).await.unwrap_err();
        assert!(matches!(err, TransportError::MissingResponse));
        assert_eq!(client.pooled_conns("server"), 1);
    }

    #[tokio::test]
    async fn dropped_rpc_is_reported_to_the_caller() {
        let net = MemoryNetwork::new();
        let (server, _) = transport(&net, "server", 2, Duration::from_secs(1));
        let (client, _) = transport(&net, "client", 2, Duration::from_secs(1));
        let consumer = server.consumer();
        tokio::spawn(async move {
            while let Some(rpc) = consumer.recv().await {
                drop(rpc);
            }
        });

        let err = client.sync("server", &request("client")).await.unwrap_err();
        assert!(matches!(err, TransportError::Remote(ref msg) if msg == DROPPED_RPC));
    }

    #[tokio::test]
    async fn broken_stream_is_not_pooled() {
        let net = MemoryNetwork::new();
        let mute = Arc::new(net.bind("mute").unwrap());
        let (client, _) = transport(&net, "client", 2, Duration::from_secs(1));
        {
            let mute = Arc::clone(&mute);
            tokio::spawn(async move {
                while let Ok(conn) = mute.accept().await {
                    drop(conn);
                }
            });
        }

        let err = client.sync("mute", &request("client")).await.unwrap_err();
        assert!(matches!(err, TransportError::Io(_)), "{err:?}");
        assert_eq!(client.pooled_conns("mute"), 0);
    }

    #[tokio::test]
    async fn deadline_discards_the_connection() {
        let net = MemoryNetwork::new();
        let silent = Arc::new(net.bind("silent").unwrap());
        let (client, layer) = transport(&net, "client", 2, Duration::from_millis(50));
        {
            let silent = Arc::clone(&silent);
            tokio::spawn(async move {
                let mut held = Vec::new();
                while let Ok(conn) = silent.accept().await {
                    held.push(conn);
                }
            });
        }

        let err = client.sync("silent", &request("client")).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)), "{err:?}");
        assert_eq!(client.pooled_conns("silent"), 0);

        // The next call dials afresh rather than reusing a stale stream.
        let _ = client.sync("silent", &request("client")).await;
        assert_eq!(layer.dials(), 2);
    }

    #[tokio::test]
    async fn dial_failure_is_returned() {
        let net = MemoryNetwork::new();
        let (client, _) = transport(&net, "client", 2, Duration::from_secs(1));
        let err = client.sync("nobody", &request("client")).await.unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_drains_the_pool() {
        let net = MemoryNetwork::new();
        let (server, _) = transport(&net, "server", 2, Duration::from_secs(1));
        let (client, _) = transport(&net, "client", 2, Duration::from_secs(1));
        serve(&server, Duration::ZERO, echo);

        client.sync("server", &request("client")).await.unwrap();
        assert_eq!(client.pooled_conns("server"), 1);

        assert!(!client.is_shutdown());
        client.close().unwrap();
        client.close().unwrap();
        assert!(client.is_shutdown());
        assert_eq!(client.pooled_conns("server"), 0);
    }

    #[tokio::test]
    async fn sync_after_close_fails_immediately() {
        let net = MemoryNetwork::new();
        let (server, _) = transport(&net, "server", 2, Duration::ZERO);
        let (client, layer) = transport(&net, "client", 2, Duration::ZERO);
        serve(&server, Duration::ZERO, echo);

        client.close().unwrap();
        let err = client.sync("server", &request("client")).await.unwrap_err();
        assert!(matches!(err, TransportError::Shutdown));
        assert_eq!(layer.dials(), 0);
    }

    #[tokio::test]
    async fn shutdown_preempts_a_pending_reply() {
        let net = MemoryNetwork::new();
        let (server, _) = transport(&net, "server", 2, Duration::ZERO);
        let (client, _) = transport(&net, "client", 2, Duration::ZERO);

        // Take the call but never answer it.
        let consumer = server.consumer();
        let (taken_tx, taken_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let rpc = consumer.recv().await;
            let _ = taken_tx.send(());
            tokio::time::sleep(Duration::from_secs(60)).await;
            drop(rpc);
        });

        let call = {
            let client = client.clone();
            tokio::spawn(async move { client.sync("server", &request("client")).await })
        };
        taken_rx.await.unwrap();
        server.close().unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), call)
            .await
            .expect("sync must not hang after the peer shuts down")
            .unwrap();
        assert!(matches!(result, Err(TransportError::Io(_))));
        assert_eq!(client.pooled_conns("server"), 0);
    }

    #[tokio::test]
    async fn closed_transport_stops_accepting() {
        let net = MemoryNetwork::new();
        let (server, _) = transport(&net, "server", 2, Duration::ZERO);
        let (client, _) = transport(&net, "client", 2, Duration::ZERO);
        server.close().unwrap();

        let err = client.sync("server", &request("client")).await.unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[tokio::test]
    async fn config_sets_pool_size() {
        let net = MemoryNetwork::new();
        let (server, _) = transport(&net, "server", 2, Duration::from_secs(1));
        serve(&server, Duration::from_millis(20), echo);
        let config = TransportConfig {
            max_pool: 0,
            timeout_ms: 500,
        };
        let client = NetworkTransport::with_config(net.bind("client").unwrap(), &config);

        client.sync("server", &request("client")).await.unwrap();
        assert_eq!(client.pooled_conns("server"), 0);
    }

    #[test]
    fn deadline_grows_with_request_size() {
        let base = Duration::from_millis(100);
        let scale = DEFAULT_TIMEOUT_SCALE as u64;
        assert_eq!(scaled_timeout(base, 0), base);
        assert_eq!(scaled_timeout(base, scale - 1), base);
        assert_eq!(scaled_timeout(base, scale), base * 2);
        assert_eq!(scaled_timeout(base, 3 * scale + 7), base * 4);
        assert!(scaled_timeout(Duration::ZERO, 10 * scale).is_zero());
    }

    #[tokio::test]
    async fn consumer_sees_end_of_stream_after_close() {
        let net = MemoryNetwork::new();
        let (server, _) = transport(&net, "server", 2, Duration::ZERO);
        let consumer = server.consumer();

        let waiting = tokio::spawn(async move { consumer.recv().await });
        tokio::task::yield_now().await;
        server.close().unwrap();

        let next = tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .expect("recv must return once the transport is closed")
            .unwrap();
        assert!(next.is_none());
        assert!(server.consumer().recv().await.is_none());
    }

    #[tokio::test]
    async fn call_finishing_after_close_is_not_pooled() {
        let net = MemoryNetwork::new();
        let (server, _) = transport(&net, "server", 2, Duration::from_secs(1));
        let (client, _) = transport(&net, "client", 2, Duration::from_secs(1));
        serve(&server, Duration::from_millis(50), echo);

        let call = {
            let client = client.clone();
            tokio::spawn(async move { client.sync("server", &request("client")).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.close().unwrap();

        // The round trip itself completes; only the pooling is refused.
        let resp = call.await.unwrap().unwrap();
        assert_eq!(resp.from, "server");
        assert_eq!(client.pooled_conns("server"), 0);
    }

    #[tokio::test]
    async fn works_through_the_transport_trait() {
        let net = MemoryNetwork::new();
        let (server, _) = transport(&net, "server", 2, Duration::from_secs(1));
        let (client, _) = transport(&net, "client", 2, Duration::from_secs(1));
        serve(&server, Duration::ZERO, echo);

        let client: Arc<dyn Transport> = Arc::new(client);
        assert_eq!(client.local_addr(), "client");
        let resp = client.sync("server", &request("client")).await.unwrap();
        assert_eq!(resp.from, "server");
        client.close().unwrap();
    }
}
