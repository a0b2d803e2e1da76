// Connection error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Connection error code constants
///
/// Error code range: 3001-3005
pub struct ConnectionErrorCodes {}

impl ConnectionErrorCodes {
    /// Configured address is empty or malformed
    pub const INVALID_ADDRESS: i32 = 3001;

    /// Every attempt failed
    pub const ATTEMPTS_EXHAUSTED: i32 = 3002;

    /// Operation requires a live connection
    pub const NOT_CONNECTED: i32 = 3003;

    /// Background worker is gone
    pub const WORKER_UNAVAILABLE: i32 = 3004;

    /// Request allows no connection attempts
    pub const INVALID_ATTEMPT_LIMIT: i32 = 3005;
}

/// Log a connection error with structured context
pub fn log_connection_error(err: &ConnectionError, context: &str) {
    error!(
        "Connection error in {}: code={}, component=ConnectionManager, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Connection lifecycle errors
///
/// Error code ranges: 3001-3005
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionError {
    /// Address cannot be used to build any connection variant
    InvalidAddress { address: String },

    /// Connection attempts exhausted; an explicit `connect()` is needed
    AttemptsExhausted { attempts: u32 },

    /// No live connection
    NotConnected,

    /// Command queue to the background worker is closed
    WorkerUnavailable,

    /// `max_attempts` must be at least one
    InvalidAttemptLimit { max_attempts: u32 },
}

impl ErrorCode for ConnectionError {
    fn code(&self) -> i32 {
        match self {
            ConnectionError::InvalidAddress { .. } => ConnectionErrorCodes::INVALID_ADDRESS,
            ConnectionError::AttemptsExhausted { .. } => ConnectionErrorCodes::ATTEMPTS_EXHAUSTED,
            ConnectionError::NotConnected => ConnectionErrorCodes::NOT_CONNECTED,
            ConnectionError::WorkerUnavailable => ConnectionErrorCodes::WORKER_UNAVAILABLE,
            ConnectionError::InvalidAttemptLimit { .. } => {
                ConnectionErrorCodes::INVALID_ATTEMPT_LIMIT
            }
        }
    }

    fn message(&self) -> String {
        match self {
            ConnectionError::InvalidAddress { address } => {
                format!("Invalid device address: '{}'", address)
            }
            ConnectionError::AttemptsExhausted { attempts } => {
                format!(
                    "Connection failed after {} attempts. Call connect() to retry.",
                    attempts
                )
            }
            ConnectionError::NotConnected => "Sensor not connected".to_string(),
            ConnectionError::WorkerUnavailable => "Engine worker is not running".to_string(),
            ConnectionError::InvalidAttemptLimit { max_attempts } => {
                format!("Invalid attempt limit {}: at least one is required", max_attempts)
            }
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConnectionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConnectionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_codes() {
        assert_eq!(
            ConnectionError::InvalidAddress {
                address: String::new()
            }
            .code(),
            3001
        );
        assert_eq!(
            ConnectionError::AttemptsExhausted { attempts: 3 }.code(),
            3002
        );
        assert_eq!(ConnectionError::NotConnected.code(), 3003);
        assert_eq!(ConnectionError::WorkerUnavailable.code(), 3004);
        assert_eq!(
            ConnectionError::InvalidAttemptLimit { max_attempts: 0 }.code(),
            3005
        );
    }

    #[test]
    fn test_connection_error_messages() {
        let err = ConnectionError::AttemptsExhausted { attempts: 5 };
        assert!(err.message().contains("after 5 attempts"));

        let err = ConnectionError::InvalidAddress {
            address: "zz".to_string(),
        };
        assert!(err.message().contains("'zz'"));
    }
}
