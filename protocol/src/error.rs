//! # Transport Errors
//!
//! A single error enum for everything the network transport can report.
//! Variants fall into a handful of buckets, and the bucket decides what
//! happens to the connection involved:
//!
//! - **Shutdown**: the transport was closed underneath the operation.
//! - **I/O and decode failures** (`Io`, `Codec`, `FrameTooLarge`,
//!   `Timeout`): fatal to the connection, never to the transport.
//! - **Protocol failures** (`UnknownRpcType`): the peer sent a tag we do
//!   not speak. The connection is torn down.
//! - **Application failures** (`Remote`, `MissingResponse`): the round trip
//!   completed cleanly, the remote handler just said no. The connection is
//!   healthy and goes back into the pool.

use std::net::SocketAddr;
use std::time::Duration;

/// Errors produced by the network transport and its stream layers.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The transport has been closed.
    #[error("transport shutdown")]
    Shutdown,

    /// Underlying socket or pipe failure (dial, accept, read, write, flush).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// A length prefix announced a value larger than we are willing to buffer.
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge { size: usize, max: usize },

    /// The peer sent a request tag this transport does not understand.
    #[error("unknown rpc type {0}")]
    UnknownRpcType(u8),

    /// The peer closed the stream cleanly between two commands.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// The I/O deadline for an outbound call elapsed.
    #[error("rpc timed out after {0:?}")]
    Timeout(Duration),

    /// The remote handler answered with a non-empty error string.
    #[error("{0}")]
    Remote(String),

    /// The remote answered with neither an error nor a response value.
    #[error("remote returned an empty response")]
    MissingResponse,

    /// The advertise address cannot be dialed by other peers.
    #[error("local bind address {0} is not advertisable")]
    NotAdvertisable(SocketAddr),

    /// An in-memory address was bound twice.
    #[error("address {0} is already bound")]
    AddressInUse(String),
}

impl TransportError {
    /// Returns `true` if the error left the connection's stream in a known,
    /// consistent state, so the connection may be pooled again.
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::MissingResponse)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_message_is_stable() {
        assert_eq!(TransportError::Shutdown.to_string(), "transport shutdown");
    }

    #[test]
    fn unknown_rpc_type_names_the_tag() {
        assert_eq!(
            TransportError::UnknownRpcType(7).to_string(),
            "unknown rpc type 7"
        );
    }

    #[test]
    fn remote_error_is_passed_through_verbatim() {
        let err = TransportError::Remote("no such event".into());
        assert_eq!(err.to_string(), "no such event");
        assert!(err.is_application());
    }

    #[test]
    fn io_errors_are_not_application_errors() {
        let err = TransportError::from(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe",
        ));
        assert!(!err.is_application());
        assert!(!TransportError::Shutdown.is_application());
    }
}
