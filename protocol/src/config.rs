//! # Transport Configuration & Constants
//!
//! Every tunable number the transport and its stream layers rely on lives
//! here. Values are fixed at construction time; there is no runtime
//! reconfiguration.

use std::time::Duration;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Wire Limits
// ---------------------------------------------------------------------------

/// Outbound deadlines grow by one timeout unit per this many request bytes.
pub const DEFAULT_TIMEOUT_SCALE: usize = 256 * 1024;

/// Upper bound on a single encoded value. A length prefix above this is
/// treated as a corrupt stream rather than an allocation request.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Pooling & Timing
// ---------------------------------------------------------------------------

/// Idle outbound connections kept per target when no value is configured.
pub const DEFAULT_MAX_POOL: usize = 3;

/// I/O deadline applied to each outbound round trip by default.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after a failed `accept` before trying again.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(5);

/// Capacity of each direction of an in-memory pipe.
pub const MEMORY_PIPE_CAPACITY: usize = 64 * 1024;

/// Pending dials an in-memory listener will queue before refusing.
pub const MEMORY_BACKLOG: usize = 128;

// ---------------------------------------------------------------------------
// TransportConfig
// ---------------------------------------------------------------------------

/// Construction-time settings for a `NetworkTransport`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Maximum idle connections retained per target address.
    pub max_pool: usize,
    /// I/O deadline for outbound calls in milliseconds. `0` disables it.
    pub timeout_ms: u64,
}

impl TransportConfig {
    /// The configured deadline as a `Duration` (zero means none).
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_pool: DEFAULT_MAX_POOL,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
        }
    }
}
