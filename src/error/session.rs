// Session error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Session error code constants
///
/// Error code range: 4001-4008
pub struct SessionErrorCodes {}

impl SessionErrorCodes {
    /// No session has been started
    pub const NOT_STARTED: i32 = 4001;

    /// Session holds no samples
    pub const NO_SAMPLES: i32 = 4002;

    /// Session has no elapsed time
    pub const NO_ELAPSED_TIME: i32 = 4003;

    /// Calibration currently owns the sampling gate
    pub const CALIBRATION_ACTIVE: i32 = 4004;

    /// Persistence sink rejected the session
    pub const PERSIST_FAILED: i32 = 4005;

    /// Session state lock was poisoned
    pub const STATE_POISONED: i32 = 4006;

    /// Background worker is gone
    pub const WORKER_UNAVAILABLE: i32 = 4007;

    /// A sealed session is being handed to the sink
    pub const SAVE_IN_PROGRESS: i32 = 4008;
}

/// Log a session error with structured context
pub fn log_session_error(err: &SessionError, context: &str) {
    error!(
        "Session error in {}: code={}, component=SessionAggregator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Recording session errors
///
/// Error code ranges: 4001-4008
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// No session to stop or save
    NotStarted,

    /// Save requested with zero samples
    NoSamples,

    /// Save requested with zero elapsed seconds
    NoElapsedTime,

    /// Calibration is running
    CalibrationActive,

    /// Persistence sink failed; the in-memory session is kept
    PersistFailed { reason: String },

    /// Session state lock was poisoned
    StatePoisoned,

    /// Command queue to the background worker is closed
    WorkerUnavailable,

    /// Session is sealed and waiting on the persistence sink
    SaveInProgress,
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::NotStarted => SessionErrorCodes::NOT_STARTED,
            SessionError::NoSamples => SessionErrorCodes::NO_SAMPLES,
            SessionError::NoElapsedTime => SessionErrorCodes::NO_ELAPSED_TIME,
            SessionError::CalibrationActive => SessionErrorCodes::CALIBRATION_ACTIVE,
            SessionError::PersistFailed { .. } => SessionErrorCodes::PERSIST_FAILED,
            SessionError::StatePoisoned => SessionErrorCodes::STATE_POISONED,
            SessionError::WorkerUnavailable => SessionErrorCodes::WORKER_UNAVAILABLE,
            SessionError::SaveInProgress => SessionErrorCodes::SAVE_IN_PROGRESS,
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::NotStarted => "No session started".to_string(),
            SessionError::NoSamples => "Nothing to save: session has no samples".to_string(),
            SessionError::NoElapsedTime => {
                "Nothing to save: session has no elapsed time".to_string()
            }
            SessionError::CalibrationActive => {
                "Calibration in progress. Wait for it to finish.".to_string()
            }
            SessionError::PersistFailed { reason } => {
                format!("Failed to persist session: {}", reason)
            }
            SessionError::StatePoisoned => "Session state lock poisoned".to_string(),
            SessionError::WorkerUnavailable => "Engine worker is not running".to_string(),
            SessionError::SaveInProgress => {
                "Session is being saved. Wait for the save to finish.".to_string()
            }
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SessionError {}
