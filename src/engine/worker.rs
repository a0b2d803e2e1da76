//! Background worker owning the transport.
//!
//! One cooperative loop on one thread: commands from the foreground, the
//! connect-step deadline and the calibration/session/monitor ticks are
//! multiplexed with `tokio::select!`, so no two transport operations are
//! ever in flight at once.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::calibration::{
    CalibrationListener, CalibrationPhase, CalibrationRun, CalibrationStep, PhaseDurations,
};
use crate::config::AppConfig;
use crate::error::{log_calibration_error, CalibrationError, ErrorCode};
use crate::managers::{
    CalibrationManager, ConnectRequest, ConnectionManager, ConnectionState, ConnectionStatus,
    SessionManager,
};
use crate::sampling::SamplingGate;
use crate::session::types::unix_secs;
use crate::telemetry::{TelemetryCollector, TelemetryEventKind};
use crate::transport::Transport;

/// Requests submitted by the engine handle
pub(crate) enum Command {
    Connect(ConnectRequest),
    Disconnect,
    StartReading,
    StopReading,
    StartCalibration(Box<dyn CalibrationListener>),
    SessionStarted,
    SessionStopped,
    Shutdown,
}

/// State shared between the handle and the worker
#[derive(Debug, Clone)]
pub(crate) struct EngineShared {
    pub(crate) status: ConnectionStatus,
    pub(crate) gate: SamplingGate,
    pub(crate) last_value: Arc<Mutex<Option<f64>>>,
    pub(crate) calibration: CalibrationManager,
    pub(crate) session: SessionManager,
    pub(crate) telemetry: Arc<TelemetryCollector>,
}

impl EngineShared {
    pub(crate) fn new(characteristic: &str) -> Self {
        Self {
            status: ConnectionStatus::default(),
            gate: SamplingGate::new(characteristic, Default::default()),
            last_value: Arc::new(Mutex::new(None)),
            calibration: CalibrationManager::new(),
            session: SessionManager::new(),
            telemetry: Arc::new(TelemetryCollector::default()),
        }
    }

    pub(crate) fn last_value(&self) -> Option<f64> {
        self.last_value
            .lock()
            .map(|guard| *guard)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }

    fn store_last_value(&self, value: f64) {
        let mut guard = self
            .last_value
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(value);
    }
}

#[derive(Debug, Clone, Copy)]
struct WorkerTiming {
    phases: PhaseDurations,
    calibration_poll: Duration,
    session_tick: Duration,
    monitor: Duration,
}

impl From<&AppConfig> for WorkerTiming {
    fn from(config: &AppConfig) -> Self {
        Self {
            phases: PhaseDurations::from(&config.calibration),
            calibration_poll: config.calibration.poll_interval(),
            session_tick: config.session.tick_interval(),
            monitor: config.session.monitor_interval(),
        }
    }
}

struct ActiveCalibration {
    run: CalibrationRun,
    listener: Box<dyn CalibrationListener>,
}

pub(crate) struct Worker<T: Transport> {
    link: ConnectionManager<T>,
    shared: EngineShared,
    timing: WorkerTiming,
    calibration: Option<ActiveCalibration>,
    published_state: ConnectionState,
}

impl<T: Transport> Worker<T> {
    pub(crate) fn new(transport: T, shared: EngineShared, config: &AppConfig) -> Self {
        let link = ConnectionManager::new(transport, shared.status.clone())
            .with_reconnect_on_drop(config.connection.reconnect_on_drop);

        Self {
            link,
            shared,
            timing: WorkerTiming::from(config),
            calibration: None,
            published_state: ConnectionState::Disconnected,
        }
    }

    /// Serve commands until `Shutdown` or until every sender is dropped
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut calibration_tick = Self::interval(self.timing.calibration_poll);
        let mut session_tick = Self::interval(self.timing.session_tick);
        let mut monitor_tick = Self::interval(self.timing.monitor);

        log::info!("[Worker] Started");

        loop {
            let connect_at = self.link.next_attempt_at();
            let calibrating = self.calibration.is_some();
            let recording = !calibrating && self.shared.session.is_recording();
            let monitoring = !calibrating && !recording && self.shared.gate.is_reading();

            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => {
                        match &command {
                            Command::StartCalibration(_) => calibration_tick.reset(),
                            Command::SessionStarted => session_tick.reset(),
                            Command::StartReading => monitor_tick.reset(),
                            _ => {}
                        }
                        self.handle_command(command).await;
                    }
                },

                _ = time::sleep_until(connect_at.unwrap_or_else(Instant::now)), if connect_at.is_some() => {
                    self.link.step().await;
                }

                _ = calibration_tick.tick(), if calibrating => {
                    self.calibration_tick().await;
                }

                _ = session_tick.tick(), if recording => {
                    self.session_tick().await;
                }

                _ = monitor_tick.tick(), if monitoring => {
                    self.poll_and_publish().await;
                }
            }

            self.publish_connection_state();
        }

        self.shutdown().await;
        log::info!("[Worker] Stopped");
    }

    fn interval(period: Duration) -> time::Interval {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect(request) => {
                if let Err(err) = self.link.begin(request) {
                    self.shared.telemetry.warn(err.to_string());
                }
            }
            Command::Disconnect => self.link.disconnect().await,
            Command::StartReading => tracing::debug!("[Worker] Gate opened"),
            Command::StopReading => tracing::debug!("[Worker] Gate closed"),
            Command::StartCalibration(listener) => self.start_calibration(listener),
            Command::SessionStarted => tracing::debug!("[Worker] Session ticks armed"),
            Command::SessionStopped => tracing::debug!("[Worker] Session ticks paused"),
            Command::Shutdown => {}
        }
    }

    fn publish_connection_state(&mut self) {
        let state = self.link.state();
        if state != self.published_state {
            log::info!(
                "[Worker] Connection {:?} -> {:?}",
                self.published_state,
                state
            );
            self.published_state = state;
            self.shared
                .telemetry
                .publish(TelemetryEventKind::ConnectionChanged { state }, None);
        }
    }

    async fn poll_and_publish(&mut self) -> Option<f64> {
        let value = self.shared.gate.poll_once(&mut self.link).await;
        if let Some(value) = value {
            self.shared.store_last_value(value);
        }
        value
    }

    // ========================================================================
    // CALIBRATION
    // ========================================================================

    fn start_calibration(&mut self, mut listener: Box<dyn CalibrationListener>) {
        let rejection = if self.calibration.is_some() {
            Some(CalibrationError::AlreadyInProgress)
        } else if self.link.state() != ConnectionState::Connected {
            Some(CalibrationError::NotConnected)
        } else {
            None
        };

        if let Some(err) = rejection {
            log_calibration_error(&err, "start_calibration");
            // The slot is only ours to release when no run is active
            if self.calibration.is_none() {
                self.shared.calibration.release();
            }
            listener.on_complete(Err(err));
            return;
        }

        let now = Instant::now();
        let run = CalibrationRun::start(self.timing.phases, now);
        self.shared.gate.start_reading();
        let _ = self.shared.calibration.update_progress(run.progress(now));

        let durations = run.durations();
        log::info!(
            "[Worker] Calibration started (relax {:?}, tension {:?})",
            durations.relax,
            durations.tension
        );
        self.shared.telemetry.publish(
            TelemetryEventKind::CalibrationPhase {
                phase: CalibrationPhase::Relax,
            },
            None,
        );
        listener.on_phase_change(CalibrationPhase::Relax, durations.relax);

        self.calibration = Some(ActiveCalibration { run, listener });
    }

    async fn calibration_tick(&mut self) {
        let now = Instant::now();
        let Some(active) = self.calibration.as_mut() else {
            return;
        };

        match active.run.advance(now) {
            CalibrationStep::Continue => {}
            CalibrationStep::Entered { phase, remaining } => {
                log::info!("[Worker] Calibration phase {}", phase.display_name());
                self.shared
                    .telemetry
                    .publish(TelemetryEventKind::CalibrationPhase { phase }, None);
                active.listener.on_phase_change(phase, remaining);
            }
            CalibrationStep::Finished => {
                self.finish_calibration(now);
                return;
            }
        }

        let value = self.shared.gate.poll_once(&mut self.link).await;
        if let Some(value) = value {
            active.run.record(value);
            self.shared.store_last_value(value);
        }
        let _ = self
            .shared
            .calibration
            .update_progress(active.run.progress(Instant::now()));
    }

    fn finish_calibration(&mut self, now: Instant) {
        let Some(mut active) = self.calibration.take() else {
            return;
        };

        self.shared.gate.stop_reading();

        let result = active.run.finish(unix_secs());
        let progress = active.run.progress(now).finished(result.is_ok());
        let _ = self.shared.calibration.update_progress(progress);

        match &result {
            Ok(profile) => {
                log::info!(
                    "[Worker] Calibration complete: baseline={}, max={}",
                    profile.baseline,
                    profile.max_value
                );
                if let Err(err) = self.shared.calibration.set_profile(Some(*profile)) {
                    log_calibration_error(&err, "finish_calibration");
                }
            }
            Err(err) => log_calibration_error(err, "finish_calibration"),
        }

        self.shared.calibration.release();
        self.shared.telemetry.publish(
            TelemetryEventKind::CalibrationFinished {
                success: result.is_ok(),
            },
            result.as_ref().err().map(|err| err.message()),
        );
        active.listener.on_complete(result);
    }

    // ========================================================================
    // SESSION
    // ========================================================================

    async fn session_tick(&mut self) {
        let value = self.poll_and_publish().await;
        // A stop_reading() that raced the read still keeps the sample out
        let value = value.filter(|_| self.shared.gate.is_reading());

        if let Err(err) = self.shared.session.tick(value) {
            self.shared.telemetry.warn(err.to_string());
        }
    }

    async fn shutdown(&mut self) {
        if let Some(mut active) = self.calibration.take() {
            self.shared.gate.stop_reading();
            let _ = self
                .shared
                .calibration
                .update_progress(active.run.progress(Instant::now()).finished(false));
            self.shared.calibration.release();
            active
                .listener
                .on_complete(Err(CalibrationError::Interrupted));
        }

        self.link.disconnect().await;
        self.publish_connection_state();
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
