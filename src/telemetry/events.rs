//! Telemetry event types describing engine activity for CLI and UI
//! observers.

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationPhase;
use crate::managers::ConnectionState;

/// Telemetry event emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Milliseconds since the collector was created
    pub timestamp_ms: u64,
    pub kind: TelemetryEventKind,
    pub detail: Option<String>,
}

/// Types of telemetry events supported by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TelemetryEventKind {
    ConnectionChanged { state: ConnectionState },
    ReadingStarted,
    ReadingStopped,
    CalibrationPhase { phase: CalibrationPhase },
    CalibrationFinished { success: bool },
    SessionStarted { id: String },
    SessionStopped,
    SessionSaved { id: String, samples: usize },
    Warning,
}
