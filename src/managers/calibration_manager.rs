// CalibrationManager: Focused manager for calibration state shared across threads
//
// Single Responsibility: calibration ownership claim, progress snapshot and
// the active profile

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::calibration::{self, CalibrationProfile, CalibrationProgress};
use crate::error::{log_calibration_error, CalibrationError};

/// Manages calibration state visible to both the foreground and the worker
///
/// This manager handles:
/// - Claiming the calibration slot so only one run exists at a time
/// - Publishing the progress snapshot polled by the foreground
/// - Holding the profile used for normalization
/// - Thread-safe lock management
///
/// Clones share the same state.
///
/// # Example
/// ```ignore
/// let manager = CalibrationManager::new();
/// manager.claim()?;
/// // ... worker runs the protocol and updates progress ...
/// manager.set_profile(Some(profile))?;
/// manager.release();
/// ```
#[derive(Debug, Clone, Default)]
pub struct CalibrationManager {
    profile: Arc<RwLock<Option<CalibrationProfile>>>,
    progress: Arc<Mutex<CalibrationProgress>>,
    active: Arc<AtomicBool>,
}

impl CalibrationManager {
    /// Create a new CalibrationManager with no profile and no run in progress
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the calibration slot
    ///
    /// # Errors
    /// - `AlreadyInProgress` if another run holds the slot
    pub fn claim(&self) -> Result<(), CalibrationError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            let err = CalibrationError::AlreadyInProgress;
            log_calibration_error(&err, "start_calibration");
            return Err(err);
        }
        Ok(())
    }

    /// Give the calibration slot back
    pub fn release(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Get the active calibration profile
    ///
    /// # Returns
    /// * `Ok(Some(profile))` - A calibration has completed or was loaded
    /// * `Ok(None)` - Readings are used uncalibrated
    /// * `Err(CalibrationError::StatePoisoned)` - Lock poisoning
    pub fn profile(&self) -> Result<Option<CalibrationProfile>, CalibrationError> {
        let guard = self.read_profile().inspect_err(|err| {
            log_calibration_error(err, "get_calibration_profile");
        })?;
        Ok(*guard)
    }

    /// Replace the active profile; `None` clears it
    pub fn set_profile(&self, profile: Option<CalibrationProfile>) -> Result<(), CalibrationError> {
        let mut guard = self.write_profile().inspect_err(|err| {
            log_calibration_error(err, "set_calibration_profile");
        })?;
        *guard = profile;
        Ok(())
    }

    pub fn progress(&self) -> Result<CalibrationProgress, CalibrationError> {
        let guard = self.lock_progress()?;
        Ok(guard.clone())
    }

    pub fn update_progress(&self, progress: CalibrationProgress) -> Result<(), CalibrationError> {
        let mut guard = self.lock_progress()?;
        *guard = progress;
        Ok(())
    }

    /// Normalize a raw reading with the active profile.
    ///
    /// Falls back to the raw value when no profile is loaded.
    pub fn normalize(&self, raw: f64) -> f64 {
        match self.read_profile() {
            Ok(guard) => calibration::normalize(guard.as_ref(), raw),
            Err(err) => {
                log_calibration_error(&err, "normalize");
                raw
            }
        }
    }

    // ========================================================================
    // HELPER METHODS - Lock management
    // ========================================================================

    fn read_profile(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, Option<CalibrationProfile>>, CalibrationError> {
        self.profile
            .read()
            .map_err(|_| CalibrationError::StatePoisoned)
    }

    fn write_profile(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, Option<CalibrationProfile>>, CalibrationError> {
        self.profile
            .write()
            .map_err(|_| CalibrationError::StatePoisoned)
    }

    fn lock_progress(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, CalibrationProgress>, CalibrationError> {
        self.progress
            .lock()
            .map_err(|_| CalibrationError::StatePoisoned)
    }
}
