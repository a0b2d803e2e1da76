// Session data types shared by the aggregator, the manager and the sinks

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationProfile;
use crate::session::SessionMetrics;

/// One captured reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Elapsed seconds since session start
    pub timestamp: u64,
    pub raw_value: f64,
    /// Normalized value when a profile was loaded
    pub calibrated_value: Option<f64>,
}

/// Sealed session record handed to a [`crate::session::SessionSink`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// `session-<unix millis at start>`
    pub id: String,
    /// Unix milliseconds at start
    pub started_at: u64,
    pub duration_seconds: u64,
    pub samples: Vec<SensorSample>,
    pub metrics: SessionMetrics,
    pub calibration_used: bool,
    /// Profile in effect when the session was started
    pub calibration: Option<CalibrationProfile>,
}

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Recording,
    Stopped,
}

/// Outcome of a start request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStart {
    /// A fresh session was created
    Started { id: String },
    /// A stopped session continues with its samples and elapsed time
    Resumed { id: String },
    /// Already recording; nothing changed
    AlreadyRecording { id: String },
}

impl SessionStart {
    pub fn id(&self) -> &str {
        match self {
            SessionStart::Started { id }
            | SessionStart::Resumed { id }
            | SessionStart::AlreadyRecording { id } => id,
        }
    }
}

/// Polling view of the current session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub id: Option<String>,
    pub elapsed_seconds: u64,
    pub sample_count: usize,
    pub last_sample: Option<SensorSample>,
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub(crate) fn unix_secs() -> u64 {
    unix_millis() / 1000
}
