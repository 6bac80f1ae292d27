//! Callback surface between the engine and its consumer

use std::net::Ipv4Addr;

/// Receives scan results and the diagnostic log stream.
///
/// Implemented by the presentation layer. The three terminal callbacks are
/// mutually exclusive and fire at most once per session; the log stream is
/// best-effort and may arrive at any frequency. The orchestrator holds the
/// sink behind an `Arc` and never outlives the scan it reports on.
pub trait ResultSink: Send + Sync {
    /// A candidate answered HTTP 200; the session is over.
    fn on_device_found(&self, address: Ipv4Addr);

    /// The global scan timer fired before any probe succeeded.
    fn on_timeout(&self);

    /// Every candidate on every interface was probed without success.
    fn on_exhausted(&self);

    /// Append-only diagnostic log line.
    fn on_log_message(&self, message: &str);
}
