// Transport error types and constants

use crate::error::ErrorCode;
use log::debug;
use std::fmt;

/// Transport error code constants
///
/// Error code range: 1001-1005
pub struct TransportErrorCodes {}

impl TransportErrorCodes {
    /// Connecting to an address failed
    pub const CONNECT_FAILED: i32 = 1001;

    /// A transport operation exceeded its deadline
    pub const TIMEOUT: i32 = 1002;

    /// Reading the characteristic failed
    pub const READ_FAILED: i32 = 1003;

    /// Operation required a live handle
    pub const NOT_CONNECTED: i32 = 1004;

    /// No usable radio/adapter on this host
    pub const ADAPTER_UNAVAILABLE: i32 = 1005;
}

/// Log a transport error with structured context
///
/// Transport errors are absorbed by the engine (retry loop or "no sample"),
/// so they are logged at debug level only.
pub fn log_transport_error(err: &TransportError, context: &str) {
    debug!(
        "Transport error in {}: code={}, component=Transport, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by a [`crate::transport::Transport`] implementation
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Connecting to the given address failed
    ConnectFailed { address: String, reason: String },

    /// The operation did not finish in time
    Timeout { operation: String },

    /// Characteristic read failed
    ReadFailed { reason: String },

    /// No live handle
    NotConnected,

    /// Bluetooth adapter missing or powered off
    AdapterUnavailable { reason: String },
}

impl ErrorCode for TransportError {
    fn code(&self) -> i32 {
        match self {
            TransportError::ConnectFailed { .. } => TransportErrorCodes::CONNECT_FAILED,
            TransportError::Timeout { .. } => TransportErrorCodes::TIMEOUT,
            TransportError::ReadFailed { .. } => TransportErrorCodes::READ_FAILED,
            TransportError::NotConnected => TransportErrorCodes::NOT_CONNECTED,
            TransportError::AdapterUnavailable { .. } => TransportErrorCodes::ADAPTER_UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            TransportError::ConnectFailed { address, reason } => {
                format!("Failed to connect to {}: {}", address, reason)
            }
            TransportError::Timeout { operation } => {
                format!("Transport operation timed out: {}", operation)
            }
            TransportError::ReadFailed { reason } => {
                format!("Characteristic read failed: {}", reason)
            }
            TransportError::NotConnected => "Transport handle is not connected".to_string(),
            TransportError::AdapterUnavailable { reason } => {
                format!("Bluetooth adapter unavailable: {}", reason)
            }
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TransportError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for TransportError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_codes() {
        assert_eq!(
            TransportError::ConnectFailed {
                address: "AA".to_string(),
                reason: "x".to_string()
            }
            .code(),
            1001
        );
        assert_eq!(
            TransportError::Timeout {
                operation: "connect".to_string()
            }
            .code(),
            1002
        );
        assert_eq!(
            TransportError::ReadFailed {
                reason: "x".to_string()
            }
            .code(),
            1003
        );
        assert_eq!(TransportError::NotConnected.code(), 1004);
        assert_eq!(
            TransportError::AdapterUnavailable {
                reason: "off".to_string()
            }
            .code(),
            1005
        );
    }

    #[test]
    fn test_transport_error_messages() {
        let err = TransportError::ConnectFailed {
            address: "AA:BB:CC:DD:EE:FF".to_string(),
            reason: "peer not found".to_string(),
        };
        assert_eq!(
            err.message(),
            "Failed to connect to AA:BB:CC:DD:EE:FF: peer not found"
        );

        let display = format!("{}", TransportError::NotConnected);
        assert!(display.contains("TransportError"));
        assert!(display.contains("1004"));
    }
}
