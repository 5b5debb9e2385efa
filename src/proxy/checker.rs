//! Connectivity prober for classifying proxy liveness
//!
//! Records are probed in sequential batches. Within a batch every connect is
//! started up front and the whole set is driven from a single task until it
//! drains or the batch deadline passes, waking at least once per poll slice.

use crate::proxy::models::{ProbeOutcome, ProbeStatus, ProxyRecord};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};
use tokio::time::{self, Instant};
use tracing::{debug, info};

/// Default number of connects in flight per batch
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default wall-clock budget of a batch in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;

/// Default readiness poll slice in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// Default time allowed for the echo check after a connect, in milliseconds
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 500;

/// Default size of the random liveness payload
pub const DEFAULT_PAYLOAD_LEN: usize = 16;

/// Shortest poll slice accepted; a zero slice would spin until the deadline
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for the connectivity prober
#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// Maximum number of records probed together
    pub batch_size: usize,
    /// Deadline of each batch, measured from the end of connect initiation
    pub connect_timeout: Duration,
    /// Upper bound of a single readiness wait
    pub poll_interval: Duration,
    /// Time allowed for the payload echo once connected
    pub handshake_timeout: Duration,
    /// Size of the random payload written after connecting
    pub payload_len: usize,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            handshake_timeout: Duration::from_millis(DEFAULT_HANDSHAKE_TIMEOUT_MS),
            payload_len: DEFAULT_PAYLOAD_LEN,
        }
    }
}

impl ProberConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_payload_len(mut self, payload_len: usize) -> Self {
        self.payload_len = payload_len.max(1);
        self
    }
}

/// Where a pending connect goes
enum ConnectTarget {
    Socket(TcpSocket, SocketAddr),
    Host(String, u16),
}

/// Prober that classifies records as online, unstable or offline
#[derive(Debug, Clone, Default)]
pub struct ConnectivityProber {
    config: ProberConfig,
}

impl ConnectivityProber {
    /// Create a new prober with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new prober with custom configuration
    pub fn with_config(config: ProberConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProberConfig {
        &self.config
    }

    /// Probe all records, one batch after another.
    ///
    /// Exactly one outcome is produced per record. Outcomes of a batch are
    /// appended in the order they resolve, not in input order.
    pub async fn probe_all(&self, records: Vec<ProxyRecord>) -> Vec<ProbeOutcome> {
        let total = records.len();
        let batch_size = self.config.batch_size.max(1);
        let mut outcomes = Vec::with_capacity(total);
        let mut remaining = records.into_iter();
        let mut batch_no = 0usize;

        loop {
            let batch: Vec<_> = remaining.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                break;
            }
            batch_no += 1;
            info!(batch = batch_no, size = batch.len(), "probing batch");
            outcomes.extend(self.probe_batch(batch).await);
        }

        let online = outcomes.iter().filter(|o| o.status == ProbeStatus::Online).count();
        let unstable = outcomes.iter().filter(|o| o.status == ProbeStatus::Unstable).count();
        info!(
            total,
            online,
            unstable,
            offline = total - online - unstable,
            "probing finished"
        );

        outcomes
    }

    /// Probe a single batch under one shared deadline
    pub async fn probe_batch(&self, batch: Vec<ProxyRecord>) -> Vec<ProbeOutcome> {
        let mut outcomes = Vec::with_capacity(batch.len());
        let mut pending: Vec<Option<ProxyRecord>> = Vec::with_capacity(batch.len());
        let mut connecting = FuturesUnordered::new();

        for (index, record) in batch.into_iter().enumerate() {
            match start_connect(&record) {
                Ok(connect) => {
                    let started = Instant::now();
                    connecting.push(async move { (index, started, connect.await) });
                    pending.push(Some(record));
                }
                Err(e) => {
                    debug!(proxy = %record.identity(), error = %e, "connect not started");
                    outcomes.push(ProbeOutcome::offline(record));
                    pending.push(None);
                }
            }
        }

        let deadline = Instant::now() + self.config.connect_timeout;
        let mut handshaking = FuturesUnordered::new();
        // latency of every record whose connect completed but whose echo check is still running
        let mut connected: HashMap<usize, u64> = HashMap::new();

        loop {
            if connecting.is_empty() && handshaking.is_empty() {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let slice = (deadline - now).min(self.config.poll_interval.max(MIN_POLL_INTERVAL));

            tokio::select! {
                Some((index, started, result)) = connecting.next(), if !connecting.is_empty() => {
                    match result {
                        Ok(stream) => {
                            let latency_ms = started.elapsed().as_millis() as u64;
                            let until = (Instant::now() + self.config.handshake_timeout).min(deadline);
                            let payload = self.payload();
                            connected.insert(index, latency_ms);
                            handshaking.push(async move {
                                (index, latency_ms, exchange(stream, payload, until).await)
                            });
                        }
                        Err(e) => {
                            if let Some(record) = pending[index].take() {
                                debug!(proxy = %record.identity(), error = %e, "connect failed");
                                outcomes.push(ProbeOutcome::offline(record));
                            }
                        }
                    }
                }
                Some((index, latency_ms, echoed)) = handshaking.next(), if !handshaking.is_empty() => {
                    connected.remove(&index);
                    if let Some(record) = pending[index].take() {
                        let outcome = if echoed {
                            ProbeOutcome::online(record, latency_ms)
                        } else {
                            ProbeOutcome::unstable(record, latency_ms)
                        };
                        debug!(proxy = %outcome.record.identity(), status = %outcome.status, latency_ms, "probed");
                        outcomes.push(outcome);
                    }
                }
                _ = time::sleep(slice) => {}
            }
        }

        // Releases every socket still open at the deadline.
        drop(connecting);
        drop(handshaking);

        for (index, slot) in pending.into_iter().enumerate() {
            if let Some(record) = slot {
                let outcome = match connected.remove(&index) {
                    Some(latency_ms) => ProbeOutcome::unstable(record, latency_ms),
                    None => ProbeOutcome::offline(record),
                };
                debug!(proxy = %outcome.record.identity(), status = %outcome.status, "deadline reached");
                outcomes.push(outcome);
            }
        }

        outcomes
    }

    fn payload(&self) -> Vec<u8> {
        (0..self.config.payload_len)
            .map(|_| rand::random::<u8>())
            .collect()
    }
}

/// Start a connect attempt without awaiting it.
///
/// Literal addresses get their socket created here, so a failure surfaces
/// immediately; host names are resolved inside the returned future.
fn start_connect(record: &ProxyRecord) -> io::Result<impl Future<Output = io::Result<TcpStream>>> {
    if record.port() == 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "port 0"));
    }

    let host = record.server().trim_start_matches('[').trim_end_matches(']');
    let target = match host.parse::<IpAddr>() {
        Ok(ip) if ip.is_unspecified() => {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "unspecified address"));
        }
        Ok(ip) => {
            let addr = SocketAddr::new(ip, record.port());
            let socket = if addr.is_ipv4() {
                TcpSocket::new_v4()?
            } else {
                TcpSocket::new_v6()?
            };
            ConnectTarget::Socket(socket, addr)
        }
        Err(_) => ConnectTarget::Host(host.to_string(), record.port()),
    };

    Ok(async move {
        match target {
            ConnectTarget::Socket(socket, addr) => socket.connect(addr).await,
            ConnectTarget::Host(host, port) => TcpStream::connect((host.as_str(), port)).await,
        }
    })
}

/// Write the payload and wait for at least one byte back before `until`
async fn exchange(mut stream: TcpStream, payload: Vec<u8>, until: Instant) -> bool {
    let echoed = time::timeout_at(until, async {
        stream.write_all(&payload).await?;
        let mut buf = [0u8; 1];
        let read = stream.read(&mut buf).await?;
        Ok::<bool, io::Error>(read > 0)
    })
    .await;

    let _ = stream.shutdown().await;
    matches!(echoed, Ok(Ok(true)))
}
