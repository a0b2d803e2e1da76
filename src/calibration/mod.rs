// Calibration module - two-phase normalization workflow and profile storage
//
// This module provides the pieces of the calibration protocol:
// 1. CalibrationProfile: baseline/max pair and the 0-100% normalization
// 2. CalibrationRun: fixed-duration relax/tension state machine
// 3. CalibrationListener: one-shot phase-change and completion notifications
// 4. JsonProfileStore: optional on-disk persistence of the profile
//
// The calibration workflow:
// 1. Relax for 15 s while the gate collects samples (baseline = minimum)
// 2. Tense for 15 s while the gate collects samples (max = maximum)
// 3. Finish to create a CalibrationProfile, or fail if a phase saw no data

pub mod procedure;
pub mod progress;
pub mod state;
pub mod store;

pub use procedure::{CalibrationRun, CalibrationStep, PhaseDurations};
pub use progress::{
    CalibrationEvent, CalibrationListener, CalibrationPhase, CalibrationProgress, NoopListener,
};
pub use state::{normalize, CalibrationProfile};
pub use store::JsonProfileStore;
