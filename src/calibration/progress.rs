// Progress tracking and notifications for the calibration workflow
//
// The foreground polls `CalibrationProgress` snapshots; phase changes and
// completion are additionally delivered once each through a
// `CalibrationListener` registered for a single run.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::calibration::CalibrationProfile;
use crate::error::CalibrationError;

/// Calibration phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalibrationPhase {
    /// No calibration has run yet
    #[default]
    Idle,
    /// Step 1: subject keeps the muscle relaxed
    Relax,
    /// Step 2: subject tenses the muscle as hard as possible
    Tension,
    /// Last run produced a profile
    Complete,
    /// Last run ended without a profile
    Failed,
}

impl CalibrationPhase {
    /// Get the next phase in the protocol
    ///
    /// # Returns
    /// * `Some(CalibrationPhase)` - Next collecting phase
    /// * `None` - Protocol complete after this phase
    pub fn next(&self) -> Option<CalibrationPhase> {
        match self {
            CalibrationPhase::Idle => Some(CalibrationPhase::Relax),
            CalibrationPhase::Relax => Some(CalibrationPhase::Tension),
            CalibrationPhase::Tension
            | CalibrationPhase::Complete
            | CalibrationPhase::Failed => None,
        }
    }

    /// Get human-readable name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            CalibrationPhase::Idle => "IDLE",
            CalibrationPhase::Relax => "RELAX",
            CalibrationPhase::Tension => "TENSION",
            CalibrationPhase::Complete => "COMPLETE",
            CalibrationPhase::Failed => "FAILED",
        }
    }

    /// Check if samples are being collected in this phase
    pub fn is_collecting(&self) -> bool {
        matches!(self, CalibrationPhase::Relax | CalibrationPhase::Tension)
    }
}

/// Snapshot of the calibration state for polling UIs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProgress {
    /// Current phase
    pub phase: CalibrationPhase,
    /// Time left in the current collecting phase
    pub remaining_ms: u64,
    /// Valid samples collected while relaxed
    pub relax_samples: usize,
    /// Valid samples collected while tensed
    pub tension_samples: usize,
}

impl CalibrationProgress {
    /// Progress marking the end of a run
    pub fn finished(mut self, success: bool) -> Self {
        self.phase = if success {
            CalibrationPhase::Complete
        } else {
            CalibrationPhase::Failed
        };
        self.remaining_ms = 0;
        self
    }
}

/// Receives the notifications of one calibration run.
///
/// `on_phase_change` fires once at the entry of each collecting phase and
/// `on_complete` fires exactly once at the end of the run. Both are called
/// from the engine's background thread and must not block.
pub trait CalibrationListener: Send {
    fn on_phase_change(&mut self, phase: CalibrationPhase, remaining: Duration);

    fn on_complete(&mut self, result: Result<CalibrationProfile, CalibrationError>);
}

/// Listener that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl CalibrationListener for NoopListener {
    fn on_phase_change(&mut self, _phase: CalibrationPhase, _remaining: Duration) {}

    fn on_complete(&mut self, _result: Result<CalibrationProfile, CalibrationError>) {}
}

/// Calibration notification as a value, for channel-based listeners
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationEvent {
    PhaseChanged {
        phase: CalibrationPhase,
        remaining: Duration,
    },
    Completed(Result<CalibrationProfile, CalibrationError>),
}

impl CalibrationListener for mpsc::UnboundedSender<CalibrationEvent> {
    fn on_phase_change(&mut self, phase: CalibrationPhase, remaining: Duration) {
        let _ = self.send(CalibrationEvent::PhaseChanged { phase, remaining });
    }

    fn on_complete(&mut self, result: Result<CalibrationProfile, CalibrationError>) {
        let _ = self.send(CalibrationEvent::Completed(result));
    }
}
