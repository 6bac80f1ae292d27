//! Tracing-backed ResultSink implementation

use lanscout_discovery::ResultSink;
use std::net::Ipv4Addr;
use tracing::{info, warn};

/// Forwards the engine's log stream and terminal callbacks to tracing.
pub struct ConsoleSink;

impl ResultSink for ConsoleSink {
    fn on_device_found(&self, address: Ipv4Addr) {
        info!(address = %address, "Device found");
    }

    fn on_timeout(&self) {
        warn!("Scan timed out with no device found");
    }

    fn on_exhausted(&self) {
        warn!("Scanned every candidate without finding a device");
    }

    fn on_log_message(&self, message: &str) {
        info!("{}", message);
    }
}
