//! # Node Logging
//!
//! One `tracing` subscriber for the whole process, writing to stderr.
//!
//! Transport background work (the accept loop and every connection handler)
//! runs inside a `transport{local=<addr>}` span, so interleaved lines from
//! several peers stay attributable. Gossip rounds log per peer at `debug`;
//! set `RUST_LOG=weave_node=debug` to watch them.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "weave_node=info,weave_protocol=info";

/// How log lines are rendered, selected with `--log-format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Colored lines with file and line, for a terminal.
    Pretty,
    /// One JSON object per line, span fields included.
    Json,
}

/// `RUST_LOG` if set and valid, otherwise `fallback`.
fn filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Installs the global subscriber. Panics if one is already set.
pub fn init_logging(fallback: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(filter(fallback));

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true),
            )
            .init(),
    }

    tracing::debug!(?format, "logging initialized");
}
