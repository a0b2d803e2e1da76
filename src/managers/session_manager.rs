// SessionManager: Focused manager for the recording session
//
// Single Responsibility: thread-safe access to the SessionAggregator and the
// save flow
//
// The foreground starts, stops and saves; the worker ticks. The aggregator
// lock is never held while the sink runs; the sealed session stays frozen
// until the sink has answered.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::calibration::CalibrationProfile;
use crate::error::{log_session_error, SessionError};
use crate::session::{
    SensorSample, Session, SessionAggregator, SessionSink, SessionSnapshot, SessionStart,
};

/// Session sealed for persistence
#[derive(Debug, Clone, PartialEq)]
pub struct SealedSession {
    pub session: Session,
    /// The seal stopped a session that was recording
    pub stopped_recording: bool,
}

/// Shared handle to the current recording session
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    aggregator: Arc<Mutex<SessionAggregator>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start or resume recording
    ///
    /// # Arguments
    /// * `profile` - Profile used to normalize the samples of a new session
    pub fn start(
        &self,
        profile: Option<CalibrationProfile>,
    ) -> Result<SessionStart, SessionError> {
        let start = self
            .lock("start_session")?
            .start(profile)
            .inspect_err(|err| log_session_error(err, "start_session"))?;
        match &start {
            SessionStart::Started { id } => log::info!("[SessionManager] Started {}", id),
            SessionStart::Resumed { id } => log::info!("[SessionManager] Resumed {}", id),
            SessionStart::AlreadyRecording { id } => {
                log::debug!("[SessionManager] {} already recording", id)
            }
        }
        Ok(start)
    }

    /// Stop recording, keeping samples. Idempotent.
    pub fn stop(&self) -> Result<bool, SessionError> {
        let stopped = self.lock("stop_session")?.stop();
        if stopped {
            log::info!("[SessionManager] Recording stopped");
        }
        Ok(stopped)
    }

    pub fn is_recording(&self) -> bool {
        self.lock("is_recording")
            .map(|guard| guard.is_recording())
            .unwrap_or(false)
    }

    /// Advance the session clock by one tick
    pub fn tick(&self, value: Option<f64>) -> Result<Option<SensorSample>, SessionError> {
        Ok(self.lock("session_tick")?.tick(value))
    }

    /// Seal the session and hand it to `sink`.
    ///
    /// On success the aggregator is reset so a new session can start. On
    /// failure the session stays in memory and the save can be retried.
    ///
    /// # Errors
    /// - `NotStarted`, `NoSamples`, `NoElapsedTime`, `SaveInProgress` -
    ///   nothing was changed and the sink is not called
    /// - `PersistFailed` - the sink returned an error
    pub fn save<S: SessionSink + ?Sized>(&self, sink: &mut S) -> Result<Session, SessionError> {
        let sealed = self.seal()?;
        self.persist(sealed.session, sink)
    }

    /// Validate and freeze the session for persistence.
    ///
    /// A refused seal leaves the session exactly as it was.
    pub fn seal(&self) -> Result<SealedSession, SessionError> {
        let mut aggregator = self.lock("save_session")?;
        let was_recording = aggregator.is_recording();

        let session = aggregator
            .seal()
            .inspect_err(|err| log_session_error(err, "save_session"))?;
        Ok(SealedSession {
            session,
            stopped_recording: was_recording,
        })
    }

    /// Hand a sealed session to `sink` and settle the aggregator.
    pub fn persist<S: SessionSink + ?Sized>(
        &self,
        session: Session,
        sink: &mut S,
    ) -> Result<Session, SessionError> {
        if let Err(err) = sink.persist(&session) {
            self.lock("save_session")?.abort_save();
            let err = SessionError::PersistFailed {
                reason: format!("{:#}", err),
            };
            log_session_error(&err, "save_session");
            return Err(err);
        }

        self.lock("save_session")?.complete_save(&session.id);
        log::info!(
            "[SessionManager] Saved {} ({} samples, {} s)",
            session.id,
            session.samples.len(),
            session.duration_seconds
        );
        Ok(session)
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        Ok(self.lock("session_snapshot")?.snapshot())
    }

    fn lock(&self, context: &str) -> Result<MutexGuard<'_, SessionAggregator>, SessionError> {
        self.aggregator.lock().map_err(|_| {
            let err = SessionError::StatePoisoned;
            log_session_error(&err, context);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;

    #[test]
    fn test_save_without_samples_skips_sink() {
        let manager = SessionManager::new();
        manager.start(None).unwrap();
        manager.tick(None).unwrap();

        let mut calls = 0;
        let result = manager.save(&mut |_: &Session| -> anyhow::Result<()> {
            calls += 1;
            Ok(())
        });

        assert_eq!(result, Err(SessionError::NoSamples));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_save_resets_on_success() {
        let manager = SessionManager::new();
        manager.start(None).unwrap();
        for value in [10.0, 20.0, 30.0] {
            manager.tick(Some(value)).unwrap();
        }

        let mut saved = Vec::new();
        let session = manager
            .save(&mut |session: &Session| -> anyhow::Result<()> {
                saved.push(session.clone());
                Ok(())
            })
            .unwrap();

        assert_eq!(session.metrics.avg_raw, 20.0);
        assert_eq!(saved.len(), 1);
        assert_eq!(manager.snapshot().unwrap().state, SessionState::Idle);
    }

    #[test]
    fn test_failed_persist_keeps_session() {
        let manager = SessionManager::new();
        manager.start(None).unwrap();
        manager.tick(Some(10.0)).unwrap();

        let result = manager.save(&mut |_: &Session| -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        });
        match result {
            Err(SessionError::PersistFailed { reason }) => assert!(reason.contains("disk full")),
            other => panic!("unexpected result: {:?}", other),
        }

        let snapshot = manager.snapshot().unwrap();
        assert_eq!(snapshot.state, SessionState::Stopped);
        assert_eq!(snapshot.sample_count, 1);

        // Retry succeeds with the same session
        let session = manager
            .save(&mut |_: &Session| -> anyhow::Result<()> { Ok(()) })
            .unwrap();
        assert_eq!(session.samples.len(), 1);
    }

    #[test]
    fn test_clones_share_session() {
        let manager = SessionManager::new();
        let worker_side = manager.clone();

        manager.start(None).unwrap();
        worker_side.tick(Some(4.0)).unwrap();

        assert!(manager.is_recording());
        assert_eq!(manager.snapshot().unwrap().sample_count, 1);
    }

    #[test]
    fn test_refused_save_keeps_recording() {
        let manager = SessionManager::new();
        manager.start(None).unwrap();

        assert_eq!(manager.seal(), Err(SessionError::NoSamples));
        assert!(manager.is_recording());
        assert_eq!(manager.snapshot().unwrap().state, SessionState::Recording);
    }

    #[test]
    fn test_seal_reports_stopped_recording() {
        let manager = SessionManager::new();
        manager.start(None).unwrap();
        manager.tick(Some(10.0)).unwrap();

        let sealed = manager.seal().unwrap();
        assert!(sealed.stopped_recording);
        assert!(!manager.is_recording());
    }

    #[test]
    fn test_start_during_save_is_refused() {
        let manager = SessionManager::new();
        let foreground = manager.clone();
        manager.start(None).unwrap();
        manager.tick(Some(10.0)).unwrap();

        let mut resumed = None;
        let session = manager
            .save(&mut |_: &Session| -> anyhow::Result<()> {
                resumed = Some(foreground.start(None));
                Ok(())
            })
            .unwrap();

        assert_eq!(resumed, Some(Err(SessionError::SaveInProgress)));
        assert_eq!(session.samples.len(), 1);
        assert_eq!(manager.snapshot().unwrap().state, SessionState::Idle);
    }
}
