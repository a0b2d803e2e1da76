// ConnectionManager: owns the transport and the single logical link
//
// Single Responsibility: connection lifecycle and supervision
//
// The manager never sleeps on its own. A connect job is advanced one variant
// at a time by `step()`, and the engine worker schedules the next step at
// `next_attempt_at()`, which keeps every transport call on the worker and
// lets commands interleave with a long retry loop.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::ConnectionConfig;
use crate::error::{
    log_connection_error, log_transport_error, ConnectionError, TransportError,
};
use crate::transport::{address_variants, Transport};

/// Connection state visible to the foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    ConnectFailed,
}

impl ConnectionState {
    fn to_raw(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::ConnectFailed => 3,
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::ConnectFailed,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// Lock-free snapshot of the connection state
///
/// Cloned into the engine handle for polling; only the manager writes it.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStatus {
    inner: Arc<AtomicU8>,
}

impl ConnectionStatus {
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_raw(self.inner.load(Ordering::SeqCst))
    }

    pub(crate) fn set(&self, state: ConnectionState) {
        self.inner.store(state.to_raw(), Ordering::SeqCst);
    }
}

/// Parameters of one bounded connect job
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectRequest {
    /// Address as configured
    pub address: String,
    /// Textual forms tried in order within one attempt
    pub variants: Vec<String>,
    /// Full passes over `variants` before giving up
    pub max_attempts: u32,
    /// Deadline for one variant, connect and verify included
    pub attempt_timeout: Duration,
    /// Pause after a pass in which every variant failed
    pub backoff: Duration,
}

impl ConnectRequest {
    pub fn new(
        address: impl Into<String>,
        max_attempts: u32,
        attempt_timeout: Duration,
        backoff: Duration,
    ) -> Self {
        let address = address.into();
        Self {
            variants: address_variants(&address),
            address,
            max_attempts,
            attempt_timeout,
            backoff,
        }
    }

    pub fn from_config(address: impl Into<String>, config: &ConnectionConfig) -> Self {
        Self::new(
            address,
            config.max_attempts,
            config.attempt_timeout(),
            config.backoff(),
        )
    }

    /// Replace the generated variants
    pub fn with_variants(mut self, variants: Vec<String>) -> Self {
        self.variants = variants;
        self
    }
}

#[derive(Debug)]
struct ConnectJob {
    request: ConnectRequest,
    /// Completed passes over the variants
    attempt: u32,
    /// Index of the next variant to try
    variant: usize,
    next_at: Instant,
}

/// Result of one `step()`
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOutcome {
    /// A variant produced a verified link
    Connected { address: String },
    /// Variant failed; another step is scheduled
    Retrying,
    /// All attempts failed; state is `ConnectFailed`
    Exhausted { attempts: u32 },
    /// No connect job is running
    Idle,
}

/// Supervises exactly one logical connection
///
/// `ConnectionState::Connected` is only ever published while `handle` is
/// `Some`.
pub struct ConnectionManager<T: Transport> {
    transport: T,
    handle: Option<T::Handle>,
    status: ConnectionStatus,
    job: Option<ConnectJob>,
    last_request: Option<ConnectRequest>,
    attempts_made: u64,
    reconnect_on_drop: bool,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(transport: T, status: ConnectionStatus) -> Self {
        status.set(ConnectionState::Disconnected);
        Self {
            transport,
            handle: None,
            status,
            job: None,
            last_request: None,
            attempts_made: 0,
            reconnect_on_drop: false,
        }
    }

    /// Start a new connect job after a live link drops
    pub fn with_reconnect_on_drop(mut self, enabled: bool) -> Self {
        self.reconnect_on_drop = enabled;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.status.get()
    }

    /// Connect calls issued over the manager's lifetime
    pub fn attempts_made(&self) -> u64 {
        self.attempts_made
    }

    /// Deadline for the next `step()`, if a job is running
    pub fn next_attempt_at(&self) -> Option<Instant> {
        self.job.as_ref().map(|job| job.next_at)
    }

    /// Begin a bounded connect job.
    ///
    /// A no-op while `Connected`. A job already running is replaced.
    ///
    /// # Errors
    /// - `InvalidAddress` - the request has no address variants
    /// - `InvalidAttemptLimit` - `max_attempts` is zero
    pub fn begin(&mut self, request: ConnectRequest) -> Result<(), ConnectionError> {
        if self.state() == ConnectionState::Connected {
            log::debug!("[ConnectionManager] Already connected, ignoring connect request");
            return Ok(());
        }

        if request.variants.is_empty() {
            let err = ConnectionError::InvalidAddress {
                address: request.address.clone(),
            };
            log_connection_error(&err, "begin");
            return Err(err);
        }

        if request.max_attempts == 0 {
            let err = ConnectionError::InvalidAttemptLimit { max_attempts: 0 };
            log_connection_error(&err, "begin");
            return Err(err);
        }

        log::info!(
            "[ConnectionManager] Connecting to {} ({} variants, {} attempts)",
            request.address,
            request.variants.len(),
            request.max_attempts
        );

        self.last_request = Some(request.clone());
        self.job = Some(ConnectJob {
            request,
            attempt: 0,
            variant: 0,
            next_at: Instant::now(),
        });
        self.status.set(ConnectionState::Connecting);
        Ok(())
    }

    /// Try the next address variant of the running job
    pub async fn step(&mut self) -> ConnectOutcome {
        let (address, timeout) = match self.job.as_ref() {
            Some(job) => (
                job.request.variants[job.variant].clone(),
                job.request.attempt_timeout,
            ),
            None => return ConnectOutcome::Idle,
        };

        self.attempts_made += 1;
        tracing::debug!(address = %address, "[ConnectionManager] Connect attempt");

        let result = match tokio::time::timeout(
            timeout,
            Self::connect_verified(&mut self.transport, &address, timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                operation: format!("connect {}", address),
            }),
        };

        match result {
            Ok(handle) => {
                self.handle = Some(handle);
                self.job = None;
                self.status.set(ConnectionState::Connected);
                log::info!("[ConnectionManager] Connected via {}", address);
                ConnectOutcome::Connected { address }
            }
            Err(err) => {
                log_transport_error(&err, "connect");
                self.advance_job()
            }
        }
    }

    async fn connect_verified(
        transport: &mut T,
        address: &str,
        timeout: Duration,
    ) -> Result<T::Handle, TransportError> {
        let handle = transport.connect(address, timeout).await?;

        match transport.is_connected(&handle).await {
            Ok(true) => Ok(handle),
            Ok(false) => {
                let _ = transport.disconnect(handle).await;
                Err(TransportError::ConnectFailed {
                    address: address.to_string(),
                    reason: "link not verified after connect".to_string(),
                })
            }
            Err(err) => {
                let _ = transport.disconnect(handle).await;
                Err(err)
            }
        }
    }

    fn advance_job(&mut self) -> ConnectOutcome {
        let Some(job) = self.job.as_mut() else {
            return ConnectOutcome::Idle;
        };

        job.variant += 1;
        if job.variant < job.request.variants.len() {
            job.next_at = Instant::now();
            return ConnectOutcome::Retrying;
        }

        job.variant = 0;
        job.attempt += 1;
        let max_attempts = job.request.max_attempts;
        if job.attempt >= max_attempts {
            self.job = None;
            self.status.set(ConnectionState::ConnectFailed);
            log_connection_error(
                &ConnectionError::AttemptsExhausted {
                    attempts: max_attempts,
                },
                "step",
            );
            return ConnectOutcome::Exhausted {
                attempts: max_attempts,
            };
        }

        log::info!(
            "[ConnectionManager] Attempt {}/{} failed, retrying in {:?}",
            job.attempt,
            max_attempts,
            job.request.backoff
        );
        job.next_at = Instant::now() + job.request.backoff;
        ConnectOutcome::Retrying
    }

    /// Read the characteristic over the live link.
    ///
    /// Returns `None` on any failure. When the failure is a dropped link the
    /// handle is released and the state moves to `Disconnected`.
    pub async fn read(&mut self, characteristic: &str) -> Option<Vec<u8>> {
        let handle = self.handle.as_ref()?;

        let err = match self
            .transport
            .read_characteristic(handle, characteristic)
            .await
        {
            Ok(payload) => return Some(payload),
            Err(err) => err,
        };
        log_transport_error(&err, "read");

        let alive = matches!(self.transport.is_connected(handle).await, Ok(true));
        if !alive {
            self.handle_link_lost().await;
        }
        None
    }

    async fn handle_link_lost(&mut self) {
        log::warn!("[ConnectionManager] Link dropped");

        if let Some(handle) = self.handle.take() {
            let _ = self.transport.disconnect(handle).await;
        }
        self.status.set(ConnectionState::Disconnected);

        if self.reconnect_on_drop {
            if let Some(request) = self.last_request.clone() {
                let _ = self.begin(request);
            }
        }
    }

    /// Tear down the link and cancel any running job. Idempotent.
    pub async fn disconnect(&mut self) {
        self.job = None;

        if let Some(handle) = self.handle.take() {
            if let Err(err) = self.transport.disconnect(handle).await {
                log_transport_error(&err, "disconnect");
            }
            log::info!("[ConnectionManager] Disconnected");
        }
        self.status.set(ConnectionState::Disconnected);
    }
}
