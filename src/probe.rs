//! TCP reachability probing
//!
//! Every record of a batch gets exactly one probe. A record with a port is
//! dialed once with the full timeout; a port-less record tries
//! [`FALLBACK_PORTS`] in order, each with a quarter of the timeout, and keeps
//! the first port that answers.
//!
//! All probes of a batch are spawned at once. The shared [`AdmissionGate`]
//! keeps at most `max_concurrency` of them dialing; the rest wait for a slot.
//! Outcomes are written back only after the whole batch has finished, so the
//! record list never exposes a half-probed state.

use crate::config::ProbeConfig;
use crate::gate::AdmissionGate;
use crate::record::{Record, Validity};
use crate::validation::parse_ipv4;
use async_trait::async_trait;
use std::io;
use std::net::SocketAddrV4;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Ports tried, in order, for records listed without one
pub const FALLBACK_PORTS: [u16; 4] = [443, 80, 8080, 1080];

/// Classified probe failure
///
/// The `Display` text is what ends up in [`Record::validation_error`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The connect attempt exceeded its deadline
    #[error("timeout")]
    Timeout,

    /// The peer actively rejected the connection
    #[error("connection refused")]
    Refused,

    /// No route to the network
    #[error("network unreachable")]
    NetworkUnreachable,

    /// No route to the host
    #[error("host unreachable")]
    HostUnreachable,

    /// Connection reset during the handshake
    #[error("connection reset")]
    Reset,

    /// Local address could not be bound
    #[error("address unavailable")]
    AddrUnavailable,

    /// Blocked by local policy
    #[error("permission denied")]
    PermissionDenied,

    /// The record's address could not be dialed at all
    #[error("invalid address")]
    InvalidAddress,

    /// The admission gate was closed before the probe got a slot
    #[error("admission closed")]
    AdmissionClosed,

    /// The probe task panicked or was aborted
    #[error("probe task failed")]
    TaskFailed,

    /// Any other transport failure
    #[error("{0}")]
    Other(String),
}

impl ProbeError {
    /// Classifies an I/O error returned by a connect attempt
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => ProbeError::Timeout,
            io::ErrorKind::ConnectionRefused => ProbeError::Refused,
            io::ErrorKind::NetworkUnreachable => ProbeError::NetworkUnreachable,
            io::ErrorKind::HostUnreachable => ProbeError::HostUnreachable,
            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                ProbeError::Reset
            }
            io::ErrorKind::AddrNotAvailable => ProbeError::AddrUnavailable,
            io::ErrorKind::PermissionDenied => ProbeError::PermissionDenied,
            io::ErrorKind::InvalidInput => ProbeError::InvalidAddress,
            kind => ProbeError::Other(kind.to_string()),
        }
    }
}

/// Opens connections on behalf of the prober
///
/// The prober enforces timeouts itself; implementations only need to attempt
/// the connection and report how it went.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// Attempt one connection to `addr`
    async fn dial(&self, addr: SocketAddrV4) -> io::Result<()>;
}

#[async_trait]
impl<T: Dialer + ?Sized> Dialer for Arc<T> {
    async fn dial(&self, addr: SocketAddrV4) -> io::Result<()> {
        (**self).dial(addr).await
    }
}

/// Plain TCP connect; the stream is closed as soon as it is established
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, addr: SocketAddrV4) -> io::Result<()> {
        let _stream = TcpStream::connect(addr).await?;
        Ok(())
    }
}

/// Result of probing one record
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// A connection was established on `port`
    Reachable {
        /// Port that answered
        port: u16,
        /// Connect time in milliseconds, rounded to two decimals
        latency_ms: f64,
    },
    /// No attempt succeeded; carries the last attempt's error
    Unreachable {
        /// Classified failure
        error: ProbeError,
    },
}

impl ProbeOutcome {
    /// Writes the outcome onto the record's validation fields
    ///
    /// A reachable outcome also sets the port, which gives port-less records
    /// the fallback port that answered.
    pub fn apply(self, record: &mut Record) {
        match self {
            ProbeOutcome::Reachable { port, latency_ms } => {
                record.valid = Validity::Reachable;
                record.port = Some(port);
                record.latency_ms = Some(latency_ms);
                record.validation_error = None;
            }
            ProbeOutcome::Unreachable { error } => {
                record.valid = Validity::Unreachable;
                record.latency_ms = None;
                record.validation_error = Some(error.to_string());
            }
        }
    }

    /// True for [`ProbeOutcome::Reachable`]
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable { .. })
    }
}

/// Totals of one probe batch
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSummary {
    /// Records probed
    pub total: usize,
    /// Records that answered
    pub reachable: usize,
    /// Records that did not
    pub unreachable: usize,
    /// Wall time of the whole batch
    pub elapsed: Duration,
}

fn round_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

/// Bounded-concurrency reachability prober
///
/// # Example
///
/// ```no_run
/// use ip_harvest::{ProbeConfig, Prober, Record};
///
/// # async fn example() {
/// let mut records = vec![Record::new("1.1.1.1", Some(443), "manual", "cloudflare")];
/// let prober = Prober::new(ProbeConfig::default());
/// let summary = prober.probe_all(&mut records).await;
/// println!("{}/{} reachable", summary.reachable, summary.total);
/// # }
/// ```
#[derive(Debug)]
pub struct Prober<D = TcpDialer> {
    dialer: Arc<D>,
    gate: AdmissionGate,
    config: ProbeConfig,
}

impl Prober<TcpDialer> {
    /// Create a prober dialing real TCP connections
    pub fn new(config: ProbeConfig) -> Self {
        Self::with_dialer(config, TcpDialer)
    }
}

impl<D: Dialer> Prober<D> {
    /// Create a prober with a custom dialer
    pub fn with_dialer(config: ProbeConfig, dialer: D) -> Self {
        Self {
            dialer: Arc::new(dialer),
            gate: AdmissionGate::new(config.max_concurrency),
            config,
        }
    }

    /// The admission gate shared by this prober's probes
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Prober settings
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probes a single endpoint through the admission gate
    pub async fn probe(&self, ip: &str, port: Option<u16>) -> ProbeOutcome {
        probe_endpoint(self.dialer.as_ref(), &self.gate, ip, port, self.config.timeout).await
    }

    /// Probes every record and writes the outcomes back in place
    ///
    /// Each record is probed exactly once. Record order is left untouched.
    pub async fn probe_all(&self, records: &mut [Record]) -> ProbeSummary {
        let started = Instant::now();
        let total = records.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let interval = self.config.progress_interval;

        info!(
            "Probing {} records (timeout {:?}, concurrency {})",
            total,
            self.config.timeout,
            self.gate.capacity()
        );

        let mut tasks = JoinSet::new();
        for (index, record) in records.iter().enumerate() {
            let dialer = Arc::clone(&self.dialer);
            let gate = self.gate.clone();
            let completed = Arc::clone(&completed);
            let ip = record.ip.clone();
            let port = record.port;
            let timeout = self.config.timeout;

            tasks.spawn(async move {
                let outcome = probe_endpoint(dialer.as_ref(), &gate, &ip, port, timeout).await;
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if interval > 0 && done % interval == 0 {
                    info!("Probed {}/{}", done, total);
                }
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<ProbeOutcome>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => warn!("Probe task failed: {}", e),
            }
        }

        let mut reachable = 0;
        for (record, outcome) in records.iter_mut().zip(outcomes) {
            let outcome = outcome.unwrap_or(ProbeOutcome::Unreachable {
                error: ProbeError::TaskFailed,
            });
            if outcome.is_reachable() {
                reachable += 1;
            }
            outcome.apply(record);
        }

        let summary = ProbeSummary {
            total,
            reachable,
            unreachable: total - reachable,
            elapsed: started.elapsed(),
        };
        info!(
            "Probe finished: {}/{} reachable in {:.1}s",
            summary.reachable,
            summary.total,
            summary.elapsed.as_secs_f64()
        );
        summary
    }
}

async fn probe_endpoint<D: Dialer + ?Sized>(
    dialer: &D,
    gate: &AdmissionGate,
    ip: &str,
    port: Option<u16>,
    timeout: Duration,
) -> ProbeOutcome {
    let Some(addr) = parse_ipv4(ip) else {
        return ProbeOutcome::Unreachable {
            error: ProbeError::InvalidAddress,
        };
    };

    // Held until this function returns, whichever way it returns
    let _permit = match gate.acquire().await {
        Ok(permit) => permit,
        Err(_) => {
            return ProbeOutcome::Unreachable {
                error: ProbeError::AdmissionClosed,
            };
        }
    };

    match port {
        Some(port) => dial_once(dialer, SocketAddrV4::new(addr, port), timeout).await,
        None => {
            let per_attempt = timeout / FALLBACK_PORTS.len() as u32;
            let mut last_error = ProbeError::Timeout;
            for candidate in FALLBACK_PORTS {
                let target = SocketAddrV4::new(addr, candidate);
                match dial_once(dialer, target, per_attempt).await {
                    reachable @ ProbeOutcome::Reachable { .. } => return reachable,
                    ProbeOutcome::Unreachable { error } => last_error = error,
                }
            }
            ProbeOutcome::Unreachable { error: last_error }
        }
    }
}

async fn dial_once<D: Dialer + ?Sized>(
    dialer: &D,
    target: SocketAddrV4,
    timeout: Duration,
) -> ProbeOutcome {
    let started = Instant::now();
    let result = tokio::time::timeout(timeout, dialer.dial(target)).await;
    match result {
        Ok(Ok(())) => {
            let latency_ms = round_ms(started.elapsed());
            debug!("{} reachable in {}ms", target, latency_ms);
            ProbeOutcome::Reachable {
                port: target.port(),
                latency_ms,
            }
        }
        Ok(Err(e)) => {
            debug!("{} failed: {}", target, e);
            ProbeOutcome::Unreachable {
                error: ProbeError::from_io(&e),
            }
        }
        Err(_) => ProbeOutcome::Unreachable {
            error: ProbeError::Timeout,
        },
    }
}
