//! lanscout Discovery - finds a service-bearing host on the local network
//!
//! The engine probes candidate IPv4 addresses over HTTP until one answers:
//! - Interface enumeration and local address resolution
//! - Lazy candidate planning around the local address (/24 LAN, /16 tunnel)
//! - Batched concurrent probing with first-match-wins semantics and a
//!   global scan timeout

pub mod iface;
pub mod probe;
pub mod scanner;
pub mod sink;
pub mod subnet;

pub use iface::{InterfaceProvider, SystemInterfaces};
pub use probe::{HttpProber, Probe};
pub use scanner::{ConfigError, ScanOrchestrator, ScanPhase, ScannerConfig};
pub use sink::ResultSink;
pub use subnet::{plan_candidates, CandidateRange, InterfaceClass};
