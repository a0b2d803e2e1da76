// Error types for the EMG session engine
//
// This module defines custom error types for transport, connection, calibration
// and session operations, providing structured error handling with stable
// numeric codes suitable for crossing an FFI or UI boundary.

mod calibration;
mod connection;
mod session;
mod transport;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use connection::{log_connection_error, ConnectionError, ConnectionErrorCodes};
pub use session::{log_session_error, SessionError, SessionErrorCodes};
pub use transport::{log_transport_error, TransportError, TransportErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the engine boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
