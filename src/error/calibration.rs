// Calibration error types and constants

use crate::calibration::CalibrationPhase;
use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// These constants provide a single source of truth for error codes
/// shared between the engine and its callers.
///
/// Error code range: 2001-2006
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Calibration already in progress
    pub const ALREADY_IN_PROGRESS: i32 = 2001;

    /// Sensor is not connected
    pub const NOT_CONNECTED: i32 = 2002;

    /// A phase finished without a single valid sample
    pub const EMPTY_PHASE: i32 = 2003;

    /// A recording session currently owns the sampling gate
    pub const SESSION_ACTIVE: i32 = 2004;

    /// Calibration state lock was poisoned
    pub const STATE_POISONED: i32 = 2005;

    /// Calibration was cut short by engine shutdown
    pub const INTERRUPTED: i32 = 2006;
}

/// Log a calibration error with structured context
///
/// This function logs calibration errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// These errors cover the two-phase calibration protocol: sequencing guards,
/// empty-data outcomes and shared state management.
///
/// Error code ranges: 2001-2006
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Calibration already in progress
    AlreadyInProgress,

    /// Calibration requires a connected sensor
    NotConnected,

    /// No valid sample was collected during a phase
    EmptyPhase { phase: CalibrationPhase },

    /// A recording session is using the sampling gate
    SessionActive,

    /// Calibration state lock was poisoned
    StatePoisoned,

    /// Background worker stopped before calibration finished
    Interrupted,
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::AlreadyInProgress => CalibrationErrorCodes::ALREADY_IN_PROGRESS,
            CalibrationError::NotConnected => CalibrationErrorCodes::NOT_CONNECTED,
            CalibrationError::EmptyPhase { .. } => CalibrationErrorCodes::EMPTY_PHASE,
            CalibrationError::SessionActive => CalibrationErrorCodes::SESSION_ACTIVE,
            CalibrationError::StatePoisoned => CalibrationErrorCodes::STATE_POISONED,
            CalibrationError::Interrupted => CalibrationErrorCodes::INTERRUPTED,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::AlreadyInProgress => "Calibration already in progress".to_string(),
            CalibrationError::NotConnected => {
                "Sensor not connected. Connect before calibrating.".to_string()
            }
            CalibrationError::EmptyPhase { phase } => {
                format!(
                    "No valid samples collected during {} phase",
                    phase.display_name()
                )
            }
            CalibrationError::SessionActive => {
                "Recording session in progress. Stop it before calibrating.".to_string()
            }
            CalibrationError::StatePoisoned => "Calibration state lock poisoned".to_string(),
            CalibrationError::Interrupted => "Calibration interrupted by shutdown".to_string(),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_error_codes() {
        assert_eq!(
            CalibrationError::AlreadyInProgress.code(),
            CalibrationErrorCodes::ALREADY_IN_PROGRESS
        );
        assert_eq!(
            CalibrationError::NotConnected.code(),
            CalibrationErrorCodes::NOT_CONNECTED
        );
        assert_eq!(
            CalibrationError::EmptyPhase {
                phase: CalibrationPhase::Relax
            }
            .code(),
            CalibrationErrorCodes::EMPTY_PHASE
        );
        assert_eq!(
            CalibrationError::SessionActive.code(),
            CalibrationErrorCodes::SESSION_ACTIVE
        );
        assert_eq!(
            CalibrationError::StatePoisoned.code(),
            CalibrationErrorCodes::STATE_POISONED
        );
        assert_eq!(
            CalibrationError::Interrupted.code(),
            CalibrationErrorCodes::INTERRUPTED
        );
    }

    #[test]
    fn test_calibration_error_messages() {
        let err = CalibrationError::EmptyPhase {
            phase: CalibrationPhase::Tension,
        };
        assert_eq!(
            err.message(),
            "No valid samples collected during TENSION phase"
        );

        let err = CalibrationError::AlreadyInProgress;
        assert!(err.message().contains("already in progress"));

        let err = CalibrationError::StatePoisoned;
        assert!(err.message().contains("poisoned"));
    }

    #[test]
    fn test_calibration_error_display() {
        let err = CalibrationError::NotConnected;
        let display = format!("{}", err);
        assert!(display.contains("CalibrationError"));
        assert!(display.contains(&err.code().to_string()));
    }
}
