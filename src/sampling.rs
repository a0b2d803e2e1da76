// Sampling gate - decides whether raw hardware reads are currently permitted
//
// The gate decouples "is the sensor reachable" from "are we supposed to be
// capturing". It holds no samples: each poll yields at most one value to
// whichever consumer (calibration or session) currently owns it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::managers::{ConnectionManager, ConnectionState};
use crate::transport::Transport;

/// Reasons a characteristic payload could not be turned into a reading
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Payload is not valid UTF-8
    InvalidUtf8,
    /// Payload text is not a number (e.g. the firmware's `Test:N` frames)
    NotNumeric { payload: String },
    /// Parsed to NaN or infinity
    NonFinite,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidUtf8 => write!(f, "payload is not valid UTF-8"),
            DecodeError::NotNumeric { payload } => {
                write!(f, "payload '{}' is not numeric", payload)
            }
            DecodeError::NonFinite => write!(f, "payload is not a finite number"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode a characteristic payload as a numeric string.
///
/// Returns `Ok(None)` for a zero reading: the sensor emits `0` on idle
/// frames, so zero is treated as "no valid reading".
///
/// NOTE: a physically genuine zero is discarded by this rule as well.
pub fn decode_reading(payload: &[u8]) -> Result<Option<f64>, DecodeError> {
    let text = std::str::from_utf8(payload).map_err(|_| DecodeError::InvalidUtf8)?;
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');

    let value: f64 = text.parse().map_err(|_| DecodeError::NotNumeric {
        payload: text.to_string(),
    })?;

    if !value.is_finite() {
        return Err(DecodeError::NonFinite);
    }
    if value == 0.0 {
        return Ok(None);
    }
    Ok(Some(value))
}

/// Boolean-gated pull of raw values from the transport
#[derive(Debug, Clone)]
pub struct SamplingGate {
    reading: Arc<AtomicBool>,
    characteristic: String,
}

impl SamplingGate {
    /// Create a closed gate for `characteristic`.
    ///
    /// `reading` is the flag published to foreground snapshots.
    pub fn new(characteristic: impl Into<String>, reading: Arc<AtomicBool>) -> Self {
        reading.store(false, Ordering::SeqCst);
        Self {
            reading,
            characteristic: characteristic.into(),
        }
    }

    /// Open the gate. Idempotent.
    pub fn start_reading(&self) {
        self.reading.store(true, Ordering::SeqCst);
    }

    /// Close the gate. Idempotent.
    pub fn stop_reading(&self) {
        self.reading.store(false, Ordering::SeqCst);
    }

    pub fn is_reading(&self) -> bool {
        self.reading.load(Ordering::SeqCst)
    }

    pub fn characteristic(&self) -> &str {
        &self.characteristic
    }

    /// Perform at most one characteristic read.
    ///
    /// No transport call is issued unless the gate is open and the link is
    /// `Connected`. Read failures, decode failures and zero readings all
    /// yield `None`.
    pub async fn poll_once<T: Transport>(&self, link: &mut ConnectionManager<T>) -> Option<f64> {
        if !self.is_reading() || link.state() != ConnectionState::Connected {
            return None;
        }

        let payload = link.read(&self.characteristic).await?;
        match decode_reading(&payload) {
            Ok(value) => value,
            Err(err) => {
                log::debug!("[SamplingGate] Skipping sample: {}", err);
                None
            }
        }
    }
}
