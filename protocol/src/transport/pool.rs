//! Outbound connection pool.
//!
//! Idle connections are kept per target address in a LIFO stack: the one
//! most recently returned is the next one handed out, so a burst of calls
//! reuses the warmest socket and the rest age out. The lock only guards the
//! map; connections are dropped (closed) after it is released.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tokio::io::{BufReader, BufWriter, ReadHalf, WriteHalf};
use tracing::trace;

use crate::transport::stream::{BoxedStream, Conn};

/// An outbound connection together with its buffered halves.
///
/// Owned by at most one call at a time. Dropping it closes the stream.
pub struct NetConn {
    id: u64,
    target: String,
    pub(crate) reader: BufReader<ReadHalf<BoxedStream>>,
    pub(crate) writer: BufWriter<WriteHalf<BoxedStream>>,
}

impl NetConn {
    pub(crate) fn new(id: u64, target: impl Into<String>, conn: Conn) -> Self {
        let (r, w) = tokio::io::split(conn.into_stream());
        Self {
            id,
            target: target.into(),
            reader: BufReader::new(r),
            writer: BufWriter::new(w),
        }
    }

    /// Process-unique id, assigned when the connection was dialed.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Closes the connection.
    pub(crate) fn release(self) {
        trace!(conn_id = self.id, target = %self.target, "releasing connection");
    }
}

impl fmt::Debug for NetConn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetConn")
            .field("id", &self.id)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Idle connections keyed by target address.
pub(crate) struct ConnPool {
    state: Mutex<PoolState>,
    max_pool: usize,
}

#[derive(Default)]
struct PoolState {
    conns: HashMap<String, Vec<NetConn>>,
    closed: bool,
}

impl ConnPool {
    pub(crate) fn new(max_pool: usize) -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            max_pool,
        }
    }

    /// Pops the most recently returned connection for `target`.
    pub(crate) fn take(&self, target: &str) -> Option<NetConn> {
        let mut state = self.state.lock();
        let stack = state.conns.get_mut(target)?;
        let conn = stack.pop();
        if stack.is_empty() {
            state.conns.remove(target);
        }
        conn
    }

    /// Offers a connection back to the pool.
    ///
    /// Accepted only while the pool is open and the target's stack has room.
    /// A rejected connection is handed back so the caller can close it
    /// outside the lock.
    pub(crate) fn put(&self, conn: NetConn) -> Option<NetConn> {
        let mut state = self.state.lock();
        if state.closed {
            return Some(conn);
        }
        let stack = state.conns.entry(conn.target.clone()).or_default();
        if stack.len() < self.max_pool {
            trace!(conn_id = conn.id, target = %conn.target, "pooling connection");
            stack.push(conn);
            None
        } else {
            if stack.is_empty() {
                state.conns.remove(&conn.target);
            }
            Some(conn)
        }
    }

    /// Number of idle connections for `target`.
    pub(crate) fn idle(&self, target: &str) -> usize {
        self.state.lock().conns.get(target).map_or(0, Vec::len)
    }

    /// Closes the pool and returns every idle connection.
    ///
    /// Later `put`s are rejected, so nothing can be pooled after this.
    pub(crate) fn drain(&self) -> Vec<NetConn> {
        let conns = {
            let mut state = self.state.lock();
            state.closed = true;
            std::mem::take(&mut state.conns)
        };
        conns.into_values().flatten().collect()
    }
}
