// CalibrationProfile - normalization bounds derived from a calibration run
//
// Raw sensor readings are mapped onto a 0-100% scale using the relaxed
// minimum (baseline) and the tensed maximum (max_value).

use serde::{Deserialize, Serialize};

/// Baseline/max pair produced by a completed calibration run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// Lowest reading observed while relaxed
    pub baseline: f64,
    /// Highest reading observed while tensed
    pub max_value: f64,
    /// Unix timestamp (seconds) when the profile was captured
    pub captured_at: u64,
}

impl CalibrationProfile {
    pub fn new(baseline: f64, max_value: f64, captured_at: u64) -> Self {
        Self {
            baseline,
            max_value,
            captured_at,
        }
    }

    /// True when `max_value == baseline`, where normalization is undefined
    pub fn is_degenerate(&self) -> bool {
        self.max_value == self.baseline
    }

    /// Map a raw reading onto 0-100%.
    ///
    /// `clamp((v - baseline) / (max_value - baseline) * 100, 0, 100)`.
    /// A degenerate profile returns `raw` unchanged.
    pub fn normalize(&self, raw: f64) -> f64 {
        if self.is_degenerate() {
            return raw;
        }
        let scaled = (raw - self.baseline) / (self.max_value - self.baseline) * 100.0;
        scaled.clamp(0.0, 100.0)
    }
}

/// Normalize with an optional profile; without one the raw value is returned.
pub fn normalize(profile: Option<&CalibrationProfile>, raw: f64) -> f64 {
    match profile {
        Some(profile) => profile.normalize(raw),
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(baseline: f64, max_value: f64) -> CalibrationProfile {
        CalibrationProfile::new(baseline, max_value, 0)
    }

    #[test]
    fn test_bounds_map_to_0_and_100() {
        let p = profile(4.0, 95.0);
        assert_eq!(p.normalize(4.0), 0.0);
        assert_eq!(p.normalize(95.0), 100.0);
    }

    #[test]
    fn test_midpoint() {
        let p = profile(4.0, 95.0);
        assert!((p.normalize(49.5) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_output_is_clamped() {
        let p = profile(10.0, 20.0);
        assert_eq!(p.normalize(-100.0), 0.0);
        assert_eq!(p.normalize(5.0), 0.0);
        assert_eq!(p.normalize(25.0), 100.0);
        assert_eq!(p.normalize(1e9), 100.0);
    }

    #[test]
    fn test_monotonic_non_decreasing() {
        let p = profile(3.5, 88.25);
        let mut previous = f64::MIN;
        let mut raw = -20.0;
        while raw <= 120.0 {
            let value = p.normalize(raw);
            assert!(
                value >= previous,
                "normalize decreased at raw={}: {} < {}",
                raw,
                value,
                previous
            );
            assert!((0.0..=100.0).contains(&value));
            previous = value;
            raw += 0.25;
        }
    }

    #[test]
    fn test_degenerate_profile_is_identity() {
        let p = profile(42.0, 42.0);
        assert!(p.is_degenerate());
        for raw in [-5.0, 0.0, 42.0, 73.25, 1000.0] {
            assert_eq!(p.normalize(raw), raw);
        }
    }

    #[test]
    fn test_missing_profile_is_identity() {
        assert_eq!(normalize(None, 61.5), 61.5);
        assert_eq!(normalize(Some(&profile(0.0, 50.0)), 25.0), 50.0);
    }

    #[test]
    fn test_serde_field_names() {
        let json =
            serde_json::to_string(&CalibrationProfile::new(4.0, 95.0, 1_700_000_000)).unwrap();
        assert!(json.contains("\"baseline\":4.0"));
        assert!(json.contains("\"max_value\":95.0"));
        assert!(json.contains("\"captured_at\":1700000000"));
    }
}
