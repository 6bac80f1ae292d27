//! Scan orchestration: batched concurrent probing with first-match-wins

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::iface::InterfaceProvider;
use crate::probe::Probe;
use crate::sink::ResultSink;
use crate::subnet::{plan_candidates, CandidateRange, InterfaceClass};

/// Scanner tunables. Every knob is externally settable so tests can run
/// against small synthetic ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Interface names eligible as scan origins.
    #[serde(default = "default_interfaces")]
    pub interfaces: Vec<String>,
    /// Interfaces whose candidate space is planned as a /16 instead of a /24.
    #[serde(default = "default_tunnel_interfaces")]
    pub tunnel_interfaces: Vec<String>,
    /// Service port probed on every candidate.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-probe HTTP timeout in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Candidates dispatched per batch; bounds outstanding connections.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Delay between batches in milliseconds; throttles connection bursts.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    /// Global scan timeout in milliseconds.
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interfaces: default_interfaces(),
            tunnel_interfaces: default_tunnel_interfaces(),
            port: default_port(),
            probe_timeout_ms: default_probe_timeout_ms(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            scan_timeout_ms: default_scan_timeout_ms(),
        }
    }
}

fn default_interfaces() -> Vec<String> {
    ["en0", "eth0", "wlan0", "bridge100", "utun0", "utun1"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_tunnel_interfaces() -> Vec<String> {
    ["utun0", "utun1", "tun0"].into_iter().map(String::from).collect()
}

fn default_port() -> u16 {
    8082
}

fn default_probe_timeout_ms() -> u64 {
    10_000
}

fn default_batch_size() -> usize {
    20
}

fn default_batch_delay_ms() -> u64 {
    500
}

fn default_scan_timeout_ms() -> u64 {
    15_000
}

/// Rejected scanner tunables.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
    #[error("probe timeout ({probe_ms} ms) must be shorter than the scan timeout ({scan_ms} ms)")]
    ProbeTimeoutTooLong { probe_ms: u64, scan_ms: u64 },
}

impl ScannerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.probe_timeout_ms >= self.scan_timeout_ms {
            return Err(ConfigError::ProbeTimeoutTooLong {
                probe_ms: self.probe_timeout_ms,
                scan_ms: self.scan_timeout_ms,
            });
        }
        Ok(())
    }

    fn classify(&self, interface: &str) -> InterfaceClass {
        if self.tunnel_interfaces.iter().any(|t| t == interface) {
            InterfaceClass::Tunnel
        } else {
            InterfaceClass::Lan
        }
    }
}

/// Lifecycle of one scan session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Scanning,
    Found(Ipv4Addr),
    TimedOut,
    Exhausted,
    /// Abandoned by a restart or an explicit cancel; emits no terminal
    /// callback.
    Cancelled,
}

impl ScanPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanPhase::Found(_) | ScanPhase::TimedOut | ScanPhase::Exhausted | ScanPhase::Cancelled
        )
    }
}

struct SessionState {
    scanning: bool,
    device_found: bool,
    timed_out: bool,
    pending_interfaces: usize,
    current_batch: usize,
}

/// Shared state of one discovery attempt.
///
/// Every transition takes the lock, decides, releases, and only then talks
/// to the sink: callbacks never run inside the critical section, and each
/// terminal transition can be won by exactly one caller. `device_found` and
/// `timed_out` can never both be true because each is only set by the call
/// that flips `scanning` off.
struct ScanSession {
    state: Mutex<SessionState>,
    phase_tx: watch::Sender<ScanPhase>,
    sink: Arc<dyn ResultSink>,
}

impl ScanSession {
    fn new(pending_interfaces: usize, sink: Arc<dyn ResultSink>) -> (Arc<Self>, watch::Receiver<ScanPhase>) {
        let (phase_tx, phase_rx) = watch::channel(ScanPhase::Idle);
        phase_tx.send_replace(ScanPhase::Scanning);
        let session = Arc::new(Self {
            state: Mutex::new(SessionState {
                scanning: true,
                device_found: false,
                timed_out: false,
                pending_interfaces,
                current_batch: 0,
            }),
            phase_tx,
            sink,
        });
        (session, phase_rx)
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_scanning(&self) -> bool {
        self.lock_state().scanning
    }

    fn set_batch_index(&self, index: usize) {
        self.lock_state().current_batch = index;
    }

    /// Attempt the `Scanning -> Found` transition. Only the winning caller
    /// reports the device; late successes get `false` and are discarded.
    fn mark_found(&self, address: Ipv4Addr) -> bool {
        {
            let mut state = self.lock_state();
            if !state.scanning {
                return false;
            }
            state.scanning = false;
            state.device_found = true;
        }
        let _ = self.phase_tx.send(ScanPhase::Found(address));
        info!(address = %address, "Device found");
        self.sink.on_log_message(&format!("Device found at {}", address));
        self.sink.on_device_found(address);
        true
    }

    /// Attempt the `Scanning -> TimedOut` transition.
    fn mark_timed_out(&self) -> bool {
        {
            let mut state = self.lock_state();
            if !state.scanning {
                return false;
            }
            state.scanning = false;
            state.timed_out = true;
        }
        let _ = self.phase_tx.send(ScanPhase::TimedOut);
        info!("Scan timed out");
        self.sink.on_log_message("No devices found");
        self.sink.on_timeout();
        true
    }

    /// Attempt the `Scanning -> Exhausted` transition.
    fn mark_exhausted(&self) -> bool {
        {
            let mut state = self.lock_state();
            if !state.scanning {
                return false;
            }
            state.scanning = false;
        }
        let _ = self.phase_tx.send(ScanPhase::Exhausted);
        info!("All candidates probed, no device found");
        self.sink.on_log_message("No devices found");
        self.sink.on_exhausted();
        true
    }

    /// One interface ran out of candidates; the last one to finish while the
    /// session is still scanning ends it as exhausted.
    fn interface_finished(&self) {
        let last = {
            let mut state = self.lock_state();
            state.pending_interfaces = state.pending_interfaces.saturating_sub(1);
            state.scanning && state.pending_interfaces == 0
        };
        if last {
            self.mark_exhausted();
        }
    }

    /// Abandon the session without a terminal callback.
    fn cancel(&self) {
        {
            let mut state = self.lock_state();
            if !state.scanning {
                return;
            }
            state.scanning = false;
            debug!(batch = state.current_batch, "Scan session cancelled");
        }
        let _ = self.phase_tx.send(ScanPhase::Cancelled);
    }
}

/// Coordinates one discovery session across all eligible interfaces.
///
/// Interfaces are scanned concurrently, each in fixed-size probe batches
/// with an inter-batch delay; the first successful probe anywhere wins and
/// cooperatively cancels the rest. An independent global timer bounds the
/// whole session.
pub struct ScanOrchestrator {
    config: ScannerConfig,
    interfaces: Arc<dyn InterfaceProvider>,
    prober: Arc<dyn Probe>,
    sink: Arc<dyn ResultSink>,
    active: tokio::sync::Mutex<Option<ActiveScan>>,
}

struct ActiveScan {
    session: Arc<ScanSession>,
    tasks: Vec<JoinHandle<()>>,
}

impl ScanOrchestrator {
    pub fn new(
        config: ScannerConfig,
        interfaces: Arc<dyn InterfaceProvider>,
        prober: Arc<dyn Probe>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            config,
            interfaces,
            prober,
            sink,
            active: tokio::sync::Mutex::new(None),
        }
    }

    /// Start a fresh session, cancelling any scan already in flight. The
    /// abandoned session emits no further callbacks.
    ///
    /// Returns a receiver that tracks the new session's phase; await a
    /// terminal phase to learn the outcome.
    pub async fn start_scan(&self) -> watch::Receiver<ScanPhase> {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            previous.session.cancel();
            for task in previous.tasks {
                task.abort();
            }
        }

        let plans = self.plan_interfaces();
        let (session, phase_rx) = ScanSession::new(plans.len(), Arc::clone(&self.sink));

        if plans.is_empty() {
            self.sink.on_log_message("No eligible interfaces to scan");
            session.mark_exhausted();
            *active = Some(ActiveScan {
                session,
                tasks: Vec::new(),
            });
            return phase_rx;
        }

        let mut tasks = Vec::with_capacity(plans.len() + 1);
        for (name, range) in plans {
            info!(interface = %name, candidates = range.remaining(), "Scanning interface");
            tasks.push(tokio::spawn(scan_interface(
                Arc::clone(&session),
                Arc::clone(&self.prober),
                Arc::clone(&self.sink),
                self.config.clone(),
                name,
                range,
            )));
        }

        let scan_timeout = Duration::from_millis(self.config.scan_timeout_ms);
        let timer_session = Arc::clone(&session);
        tasks.push(tokio::spawn(async move {
            sleep(scan_timeout).await;
            timer_session.mark_timed_out();
        }));

        *active = Some(ActiveScan { session, tasks });
        phase_rx
    }

    /// Abandon the current session, if any, without a terminal callback.
    pub async fn cancel(&self) {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            previous.session.cancel();
            for task in previous.tasks {
                task.abort();
            }
        }
    }

    pub async fn is_scanning(&self) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|scan| scan.session.is_scanning())
            .unwrap_or(false)
    }

    /// Resolve each eligible interface to a candidate range. Interfaces
    /// without a usable IPv4 address contribute nothing to the scan.
    fn plan_interfaces(&self) -> Vec<(String, CandidateRange)> {
        let mut plans = Vec::new();
        for name in self.interfaces.eligible_interfaces(&self.config.interfaces) {
            let Some(local) = self.interfaces.local_address(&name) else {
                self.sink
                    .on_log_message(&format!("No IPv4 address on interface {}", name));
                continue;
            };
            self.sink
                .on_log_message(&format!("IP address for interface {}: {}", name, local));

            let range = plan_candidates(&local.to_string(), self.config.classify(&name));
            if range.remaining() == 0 {
                continue;
            }
            plans.push((name, range));
        }
        plans
    }
}

/// Batch loop for one interface's candidate space.
async fn scan_interface(
    session: Arc<ScanSession>,
    prober: Arc<dyn Probe>,
    sink: Arc<dyn ResultSink>,
    config: ScannerConfig,
    name: String,
    mut candidates: CandidateRange,
) {
    let probe_timeout = Duration::from_millis(config.probe_timeout_ms);
    let batch_delay = Duration::from_millis(config.batch_delay_ms);
    let mut batch_index = 0usize;

    loop {
        if !session.is_scanning() {
            return;
        }

        // validate() rejects a zero batch size; the max(1) keeps an
        // unvalidated config from spinning here forever.
        let batch: Vec<Ipv4Addr> = candidates.by_ref().take(config.batch_size.max(1)).collect();
        if batch.is_empty() {
            debug!(interface = %name, batches = batch_index, "Candidate space exhausted");
            session.interface_finished();
            return;
        }

        session.set_batch_index(batch_index);
        debug!(interface = %name, batch = batch_index, size = batch.len(), "Dispatching batch");

        let mut probes = JoinSet::new();
        for address in batch {
            sink.on_log_message(&format!("Probing {}...", address));
            let prober = Arc::clone(&prober);
            let port = config.port;
            probes.spawn(async move { (address, prober.probe(address, port, probe_timeout).await) });
        }

        // The batch is complete when every probe has been joined, whatever
        // order they land in. A success returns immediately: dropping the
        // set abandons the batch's in-flight probes, and mark_found ignores
        // any caller that lost the transition.
        while let Some(joined) = probes.join_next().await {
            let Ok((address, success)) = joined else {
                continue;
            };
            if success {
                session.mark_found(address);
                return;
            }
            if session.is_scanning() {
                sink.on_log_message(&format!("Failed to connect to {}", address));
            }
        }

        if !session.is_scanning() {
            return;
        }
        batch_index += 1;
        sleep(batch_delay).await;
    }
}
