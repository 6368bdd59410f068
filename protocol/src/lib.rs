// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Weave Protocol
//!
//! The plumbing a Weave node uses to talk to its peers and to remember what
//! it has recently gossiped.
//!
//! - **transport**: `NetworkTransport`, a bidirectional RPC engine over a
//!   pluggable stream layer (TCP, in-memory, or anything that yields a duplex
//!   byte stream). Frames typed requests, pools outbound connections per
//!   peer, hands inbound calls to a consumer, and shuts down cleanly.
//! - **common**: `RollingList`, a bounded window over an ever-growing,
//!   globally indexed event stream.
//! - **config**: wire limits, pool and timeout defaults.
//! - **error**: the transport error taxonomy.
//!
//! What the sync payloads *mean* is up to the gossip engine consuming them.

pub mod common;
pub mod config;
pub mod error;
pub mod transport;

pub use common::{RollingList, RollingListError};
pub use config::TransportConfig;
pub use error::{Result, TransportError};
pub use transport::{NetworkTransport, Transport};
