// SessionAggregator - lifecycle of one recording session
//
// State machine: Idle -> Recording -> (Recording | Stopped) -> Idle.
// Recording and Stopped both retain samples; only a successful save clears
// them. Between seal() and the end of the save the session is frozen.

use crate::calibration::CalibrationProfile;
use crate::error::SessionError;
use crate::session::types::unix_millis;
use crate::session::{
    SensorSample, Session, SessionMetrics, SessionSnapshot, SessionStart, SessionState,
};

/// Accumulates samples for the current session
#[derive(Debug, Default)]
pub struct SessionAggregator {
    state: SessionState,
    id: Option<String>,
    started_at: u64,
    last_started_at: u64,
    elapsed: u64,
    samples: Vec<SensorSample>,
    profile: Option<CalibrationProfile>,
    saving: bool,
}

impl SessionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    /// A sealed record is waiting on `complete_save()` or `abort_save()`
    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn samples(&self) -> &[SensorSample] {
        &self.samples
    }

    /// Start recording.
    ///
    /// A no-op while already recording. A stopped session resumes with its
    /// samples, elapsed time and original profile.
    ///
    /// # Errors
    /// - `SaveInProgress` - the session is sealed and being persisted
    pub fn start(
        &mut self,
        profile: Option<CalibrationProfile>,
    ) -> Result<SessionStart, SessionError> {
        if self.saving {
            return Err(SessionError::SaveInProgress);
        }

        let start = match (self.state, self.id.clone()) {
            (SessionState::Recording, Some(id)) => SessionStart::AlreadyRecording { id },
            (SessionState::Stopped, Some(id)) => {
                self.state = SessionState::Recording;
                SessionStart::Resumed { id }
            }
            _ => {
                // Ids must stay unique even for starts within one millisecond
                let started_at = unix_millis().max(self.last_started_at + 1);
                let id = format!("session-{}", started_at);

                self.state = SessionState::Recording;
                self.id = Some(id.clone());
                self.started_at = started_at;
                self.last_started_at = started_at;
                self.elapsed = 0;
                self.samples.clear();
                self.profile = profile;
                SessionStart::Started { id }
            }
        };
        Ok(start)
    }

    /// Advance elapsed time by one second and append `value` if present.
    ///
    /// Ignored unless recording.
    pub fn tick(&mut self, value: Option<f64>) -> Option<SensorSample> {
        if self.state != SessionState::Recording {
            return None;
        }

        self.elapsed += 1;
        let raw_value = value?;
        let sample = SensorSample {
            timestamp: self.elapsed,
            raw_value,
            calibrated_value: self.profile.map(|profile| profile.normalize(raw_value)),
        };
        self.samples.push(sample);
        Some(sample)
    }

    /// Stop recording, keeping the collected samples. Idempotent.
    ///
    /// # Returns
    /// `true` when a recording session was stopped by this call
    pub fn stop(&mut self) -> bool {
        if self.state == SessionState::Recording {
            self.state = SessionState::Stopped;
            return true;
        }
        false
    }

    /// Build the sealed record for persistence.
    ///
    /// Stops a recording session first. Internal state is kept until
    /// `complete_save()` confirms the sink accepted the record, and `start()`
    /// is refused until then. A refused seal changes nothing.
    ///
    /// # Errors
    /// - `SaveInProgress` - an earlier seal has not completed
    /// - `NotStarted` - no session exists
    /// - `NoSamples` - nothing was captured
    /// - `NoElapsedTime` - no tick has run
    pub fn seal(&mut self) -> Result<Session, SessionError> {
        if self.saving {
            return Err(SessionError::SaveInProgress);
        }

        let id = match (self.state, &self.id) {
            (SessionState::Idle, _) | (_, None) => return Err(SessionError::NotStarted),
            (_, Some(id)) => id.clone(),
        };

        if self.samples.is_empty() {
            return Err(SessionError::NoSamples);
        }
        if self.elapsed == 0 {
            return Err(SessionError::NoElapsedTime);
        }

        self.stop();
        self.saving = true;

        Ok(Session {
            id,
            started_at: self.started_at,
            duration_seconds: self.elapsed,
            metrics: SessionMetrics::from_samples(&self.samples),
            samples: self.samples.clone(),
            calibration_used: self.profile.is_some(),
            calibration: self.profile,
        })
    }

    /// Reset to `Idle` after the session `id` was persisted.
    ///
    /// # Returns
    /// `false` if a different session is current, which is then left alone
    pub fn complete_save(&mut self, id: &str) -> bool {
        if self.id.as_deref() != Some(id) {
            return false;
        }

        self.state = SessionState::Idle;
        self.id = None;
        self.elapsed = 0;
        self.samples.clear();
        self.profile = None;
        self.saving = false;
        true
    }

    /// Unfreeze a sealed session whose save failed; it stays `Stopped`
    pub fn abort_save(&mut self) {
        self.saving = false;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            id: self.id.clone(),
            elapsed_seconds: self.elapsed,
            sample_count: self.samples.len(),
            last_sample: self.samples.last().copied(),
        }
    }
}
