// CalibrationRun - fixed-duration relax/tension state machine
//
// The run owns the samples collected during each phase and decides when a
// phase has elapsed. It does no I/O and never sleeps: the engine worker
// drives it with `advance()` on every calibration tick and feeds it the
// values produced by the sampling gate.

use std::time::Duration;

use tokio::time::Instant;

use crate::calibration::{CalibrationPhase, CalibrationProfile, CalibrationProgress};
use crate::config::CalibrationConfig;
use crate::error::CalibrationError;

/// Length of each collecting phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDurations {
    pub relax: Duration,
    pub tension: Duration,
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            relax: Duration::from_secs(15),
            tension: Duration::from_secs(15),
        }
    }
}

impl From<&CalibrationConfig> for PhaseDurations {
    fn from(config: &CalibrationConfig) -> Self {
        Self {
            relax: config.relax_duration(),
            tension: config.tension_duration(),
        }
    }
}

/// Result of advancing a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationStep {
    /// Still collecting in the current phase
    Continue,
    /// A new collecting phase was entered
    Entered {
        phase: CalibrationPhase,
        remaining: Duration,
    },
    /// Tension phase elapsed; call `finish()`
    Finished,
}

/// One in-flight calibration run
#[derive(Debug)]
pub struct CalibrationRun {
    durations: PhaseDurations,
    phase: CalibrationPhase,
    phase_started: Instant,
    relax_samples: Vec<f64>,
    tension_samples: Vec<f64>,
}

impl CalibrationRun {
    /// Start a run in the relax phase at `now`
    pub fn start(durations: PhaseDurations, now: Instant) -> Self {
        Self {
            durations,
            phase: CalibrationPhase::Relax,
            phase_started: now,
            relax_samples: Vec::new(),
            tension_samples: Vec::new(),
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn durations(&self) -> PhaseDurations {
        self.durations
    }

    /// Record a valid reading into the current phase's buffer
    pub fn record(&mut self, value: f64) {
        match self.phase {
            CalibrationPhase::Relax => self.relax_samples.push(value),
            CalibrationPhase::Tension => self.tension_samples.push(value),
            _ => {}
        }
    }

    /// Move the state machine forward to `now`.
    ///
    /// Relax hands over to tension once its duration has elapsed; the
    /// tension clock starts at the handover, not at the relax deadline.
    pub fn advance(&mut self, now: Instant) -> CalibrationStep {
        if !self.phase.is_collecting() || self.remaining(now) > Duration::ZERO {
            return CalibrationStep::Continue;
        }

        match self.phase.next() {
            Some(phase) => {
                self.phase = phase;
                self.phase_started = now;
                CalibrationStep::Entered {
                    phase,
                    remaining: self.phase_length(phase),
                }
            }
            None => CalibrationStep::Finished,
        }
    }

    /// Time left in the current phase
    pub fn remaining(&self, now: Instant) -> Duration {
        self.phase_length(self.phase)
            .saturating_sub(now.saturating_duration_since(self.phase_started))
    }

    fn phase_length(&self, phase: CalibrationPhase) -> Duration {
        match phase {
            CalibrationPhase::Relax => self.durations.relax,
            CalibrationPhase::Tension => self.durations.tension,
            _ => Duration::ZERO,
        }
    }

    pub fn progress(&self, now: Instant) -> CalibrationProgress {
        CalibrationProgress {
            phase: self.phase,
            remaining_ms: self.remaining(now).as_millis() as u64,
            relax_samples: self.relax_samples.len(),
            tension_samples: self.tension_samples.len(),
        }
    }

    /// Compute the profile from the collected samples.
    ///
    /// Baseline is the minimum relaxed reading and max_value the maximum
    /// tensed reading. A phase without samples fails the run.
    pub fn finish(&self, captured_at: u64) -> Result<CalibrationProfile, CalibrationError> {
        let baseline = self
            .relax_samples
            .iter()
            .copied()
            .reduce(f64::min)
            .ok_or(CalibrationError::EmptyPhase {
                phase: CalibrationPhase::Relax,
            })?;

        let max_value = self
            .tension_samples
            .iter()
            .copied()
            .reduce(f64::max)
            .ok_or(CalibrationError::EmptyPhase {
                phase: CalibrationPhase::Tension,
            })?;

        Ok(CalibrationProfile::new(baseline, max_value, captured_at))
    }
}

#[cfg(test)]
#[path = "procedure_tests.rs"]
mod tests;
