//! EngineHandle: explicitly owned facade over the sensor session engine.
//!
//! The handle spawns one worker thread with its own current-thread Tokio
//! runtime, submits transport work to it over an unbounded queue, and
//! answers every query from lock-free or briefly-locked snapshots, so no
//! call on the handle ever waits on BLE I/O.

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use crate::calibration::{CalibrationListener, CalibrationProfile, CalibrationProgress};
use crate::config::AppConfig;
use crate::engine::worker::{Command, EngineShared, Worker};
use crate::error::{
    log_calibration_error, log_connection_error, log_session_error, CalibrationError,
    ConnectionError, SessionError,
};
use crate::managers::{ConnectRequest, ConnectionState};
use crate::session::{Session, SessionSink, SessionSnapshot, SessionStart};
use crate::telemetry::{TelemetryCollector, TelemetryEventKind, TelemetrySnapshot};
use crate::transport::Transport;

#[path = "core_subscriptions.rs"]
mod core_subscriptions;

/// Handle to a running engine.
///
/// Dropping the handle shuts the worker down, disconnecting any live link
/// first.
pub struct EngineHandle {
    config: AppConfig,
    shared: EngineShared,
    command_tx: mpsc::UnboundedSender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Create an engine driving `transport` and start its worker thread.
    pub fn new<T: Transport>(config: AppConfig, transport: T) -> Self {
        let shared = EngineShared::new(&config.device.characteristic_uuid);
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let worker_shared = shared.clone();
        let worker_config = config.clone();

        // The worker gets a dedicated thread with its own runtime so callers
        // need no Tokio runtime of their own
        let spawned = std::thread::Builder::new()
            .name("emg-engine-worker".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(err) => {
                        log::error!("[EngineHandle] Failed to create worker runtime: {}", err);
                        return;
                    }
                };

                rt.block_on(async move {
                    Worker::new(transport, worker_shared, &worker_config)
                        .run(command_rx)
                        .await;
                });
            });

        let worker = match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                log::error!("[EngineHandle] Failed to spawn worker thread: {}", err);
                None
            }
        };

        Self {
            config,
            shared,
            command_tx,
            worker,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn submit(&self, command: Command) -> bool {
        self.command_tx.send(command).is_ok()
    }

    fn telemetry(&self) -> &TelemetryCollector {
        &self.shared.telemetry
    }

    // ========================================================================
    // CONNECTION
    // ========================================================================

    /// Connect to the configured device using the configured retry policy.
    pub fn connect(&self) -> Result<(), ConnectionError> {
        self.connect_with(ConnectRequest::from_config(
            self.config.device.address.clone(),
            &self.config.connection,
        ))
    }

    /// Schedule a bounded connect job. Returns without waiting for it.
    ///
    /// A no-op while connected; replaces a job that is still connecting.
    ///
    /// # Errors
    /// - `InvalidAddress` - the request has no address variants
    /// - `InvalidAttemptLimit` - the request allows no attempts
    /// - `WorkerUnavailable` - the worker has shut down
    pub fn connect_with(&self, request: ConnectRequest) -> Result<(), ConnectionError> {
        if request.variants.is_empty() {
            let err = ConnectionError::InvalidAddress {
                address: request.address,
            };
            log_connection_error(&err, "connect");
            return Err(err);
        }

        if request.max_attempts == 0 {
            let err = ConnectionError::InvalidAttemptLimit { max_attempts: 0 };
            log_connection_error(&err, "connect");
            return Err(err);
        }

        if !self.submit(Command::Connect(request)) {
            let err = ConnectionError::WorkerUnavailable;
            log_connection_error(&err, "connect");
            return Err(err);
        }
        Ok(())
    }

    /// Tear down the link. Idempotent.
    pub fn disconnect(&self) -> Result<(), ConnectionError> {
        if !self.submit(Command::Disconnect) {
            let err = ConnectionError::WorkerUnavailable;
            log_connection_error(&err, "disconnect");
            return Err(err);
        }
        Ok(())
    }

    /// Non-blocking connection state snapshot
    pub fn current_state(&self) -> ConnectionState {
        self.shared.status.get()
    }

    // ========================================================================
    // SAMPLING GATE
    // ========================================================================

    /// Open the sampling gate. Outside a session or calibration the worker
    /// then polls at the monitor interval to keep `last_value()` fresh.
    pub fn start_reading(&self) {
        if !self.shared.gate.is_reading() {
            self.shared.gate.start_reading();
            self.telemetry()
                .publish(TelemetryEventKind::ReadingStarted, None);
        }
        self.submit(Command::StartReading);
    }

    /// Close the sampling gate. Takes effect before the next tick.
    pub fn stop_reading(&self) {
        if self.shared.gate.is_reading() {
            self.shared.gate.stop_reading();
            self.telemetry()
                .publish(TelemetryEventKind::ReadingStopped, None);
        }
        self.submit(Command::StopReading);
    }

    pub fn is_reading(&self) -> bool {
        self.shared.gate.is_reading()
    }

    /// Last value produced by the gate, raw
    pub fn last_value(&self) -> Option<f64> {
        self.shared.last_value()
    }

    /// Last value produced by the gate, normalized with the active profile
    pub fn last_normalized(&self) -> Option<f64> {
        self.last_value().map(|raw| self.normalize(raw))
    }

    /// Normalize `raw` onto 0-100% with the active profile, or return it
    /// unchanged when there is none
    pub fn normalize(&self, raw: f64) -> f64 {
        self.shared.calibration.normalize(raw)
    }

    // ========================================================================
    // CALIBRATION
    // ========================================================================

    /// Start the two-phase calibration protocol.
    ///
    /// `listener` receives a phase change at the entry of relax and tension
    /// and exactly one completion.
    ///
    /// # Errors
    /// - `NotConnected` - the link is not `Connected`
    /// - `SessionActive` - a recording session owns the gate
    /// - `AlreadyInProgress` - another calibration is running
    pub fn start_calibration<L>(&self, listener: L) -> Result<(), CalibrationError>
    where
        L: CalibrationListener + 'static,
    {
        if self.current_state() != ConnectionState::Connected {
            let err = CalibrationError::NotConnected;
            log_calibration_error(&err, "start_calibration");
            return Err(err);
        }

        if self.shared.session.is_recording() {
            let err = CalibrationError::SessionActive;
            log_calibration_error(&err, "start_calibration");
            return Err(err);
        }

        self.shared.calibration.claim()?;

        if !self.submit(Command::StartCalibration(Box::new(listener))) {
            self.shared.calibration.release();
            let err = CalibrationError::Interrupted;
            log_calibration_error(&err, "start_calibration");
            return Err(err);
        }
        Ok(())
    }

    pub fn is_calibrating(&self) -> bool {
        self.shared.calibration.is_active()
    }

    pub fn calibration_progress(&self) -> Result<CalibrationProgress, CalibrationError> {
        self.shared.calibration.progress()
    }

    pub fn calibration_profile(&self) -> Result<Option<CalibrationProfile>, CalibrationError> {
        self.shared.calibration.profile()
    }

    /// Install a profile loaded from an external store
    pub fn load_calibration(&self, profile: CalibrationProfile) -> Result<(), CalibrationError> {
        log::info!(
            "[EngineHandle] Loading calibration baseline={}, max={}",
            profile.baseline,
            profile.max_value
        );
        self.shared.calibration.set_profile(Some(profile))
    }

    /// Drop the active profile; readings are reported raw again
    pub fn clear_calibration(&self) -> Result<(), CalibrationError> {
        self.shared.calibration.set_profile(None)
    }

    // ========================================================================
    // SESSION
    // ========================================================================

    /// Start recording, or resume a stopped session.
    ///
    /// Opens the sampling gate. Calling it while recording changes nothing.
    ///
    /// # Errors
    /// - `CalibrationActive` - calibration owns the gate
    /// - `SaveInProgress` - the session is being saved
    /// - `WorkerUnavailable` - the worker has shut down
    pub fn start_session(&self) -> Result<SessionStart, SessionError> {
        if self.shared.calibration.is_active() {
            let err = SessionError::CalibrationActive;
            log_session_error(&err, "start_session");
            return Err(err);
        }

        if self.command_tx.is_closed() {
            let err = SessionError::WorkerUnavailable;
            log_session_error(&err, "start_session");
            return Err(err);
        }

        let profile = self
            .shared
            .calibration
            .profile()
            .map_err(|_| SessionError::StatePoisoned)?;
        let start = self.shared.session.start(profile)?;

        if let SessionStart::AlreadyRecording { .. } = start {
            return Ok(start);
        }

        self.shared.gate.start_reading();
        self.telemetry().publish(
            TelemetryEventKind::SessionStarted {
                id: start.id().to_string(),
            },
            None,
        );
        self.submit(Command::SessionStarted);
        Ok(start)
    }

    /// Stop recording and close the gate. Samples are kept. Idempotent.
    ///
    /// # Returns
    /// `true` when a recording session was stopped by this call
    pub fn stop_session(&self) -> Result<bool, SessionError> {
        let stopped = self.shared.session.stop()?;
        if stopped {
            self.session_stopped();
        }
        Ok(stopped)
    }

    /// Seal the session and hand it to `sink`, stopping it first if needed.
    ///
    /// A refused save leaves a recording session recording. When the sink
    /// fails the session is kept stopped and the save may be retried.
    ///
    /// # Errors
    /// - `NotStarted`, `NoSamples`, `NoElapsedTime` - nothing to save
    /// - `SaveInProgress` - another save has not finished
    /// - `PersistFailed` - the sink returned an error
    pub fn save_session<S>(&self, sink: &mut S) -> Result<Session, SessionError>
    where
        S: SessionSink + ?Sized,
    {
        let sealed = self.shared.session.seal()?;
        if sealed.stopped_recording {
            self.session_stopped();
        }

        let session = self.shared.session.persist(sealed.session, sink)?;
        self.telemetry().publish(
            TelemetryEventKind::SessionSaved {
                id: session.id.clone(),
                samples: session.samples.len(),
            },
            None,
        );
        Ok(session)
    }

    fn session_stopped(&self) {
        self.shared.gate.stop_reading();
        self.telemetry()
            .publish(TelemetryEventKind::SessionStopped, None);
        self.submit(Command::SessionStopped);
    }

    pub fn session_snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.shared.session.snapshot()
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Recent telemetry events retained by the collector
    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        self.telemetry().snapshot()
    }

    /// Stop the worker and wait for it to exit. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        self.submit(Command::Shutdown);
        if worker.join().is_err() {
            log::error!("[EngineHandle] Worker thread panicked");
        }
    }

    pub(crate) fn telemetry_collector(&self) -> Arc<TelemetryCollector> {
        Arc::clone(&self.shared.telemetry)
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
