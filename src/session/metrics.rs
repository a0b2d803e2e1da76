// SessionMetrics - summary statistics derived from a sample sequence

use serde::{Deserialize, Serialize};

use crate::session::SensorSample;

/// Summary statistics, a pure function of the samples at seal time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub max_raw: f64,
    pub avg_raw: f64,
    pub min_raw: f64,
    pub max_calibrated: Option<f64>,
    pub avg_calibrated: Option<f64>,
    pub min_calibrated: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Reduced {
    max: f64,
    min: f64,
    avg: f64,
}

fn reduce(values: impl Iterator<Item = f64>) -> Option<Reduced> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut max = f64::NEG_INFINITY;
    let mut min = f64::INFINITY;

    for value in values {
        count += 1;
        sum += value;
        max = max.max(value);
        min = min.min(value);
    }

    if count == 0 {
        return None;
    }

    // Keep avg inside [min, max] despite rounding in the sum
    let avg = (sum / count as f64).clamp(min, max);
    Some(Reduced { max, min, avg })
}

impl SessionMetrics {
    /// Compute metrics over `samples`.
    ///
    /// Calibrated fields are `None` when no sample carries a calibrated
    /// value. An empty slice yields all-zero raw fields.
    pub fn from_samples(samples: &[SensorSample]) -> Self {
        let raw = reduce(samples.iter().map(|s| s.raw_value));
        let calibrated = reduce(samples.iter().filter_map(|s| s.calibrated_value));

        let mut metrics = SessionMetrics::default();
        if let Some(raw) = raw {
            metrics.max_raw = raw.max;
            metrics.min_raw = raw.min;
            metrics.avg_raw = raw.avg;
        }
        if let Some(calibrated) = calibrated {
            metrics.max_calibrated = Some(calibrated.max);
            metrics.min_calibrated = Some(calibrated.min);
            metrics.avg_calibrated = Some(calibrated.avg);
        }
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(timestamp: u64, value: f64) -> SensorSample {
        SensorSample {
            timestamp,
            raw_value: value,
            calibrated_value: None,
        }
    }

    #[test]
    fn test_raw_metrics() {
        let samples = [raw(1, 10.0), raw(2, 20.0), raw(3, 30.0)];
        let metrics = SessionMetrics::from_samples(&samples);

        assert_eq!(metrics.max_raw, 30.0);
        assert_eq!(metrics.min_raw, 10.0);
        assert_eq!(metrics.avg_raw, 20.0);
        assert_eq!(metrics.max_calibrated, None);
        assert_eq!(metrics.avg_calibrated, None);
        assert_eq!(metrics.min_calibrated, None);
    }

    #[test]
    fn test_calibrated_metrics() {
        let samples = [
            SensorSample {
                timestamp: 1,
                raw_value: 4.0,
                calibrated_value: Some(0.0),
            },
            SensorSample {
                timestamp: 2,
                raw_value: 49.5,
                calibrated_value: Some(50.0),
            },
            SensorSample {
                timestamp: 3,
                raw_value: 95.0,
                calibrated_value: Some(100.0),
            },
        ];
        let metrics = SessionMetrics::from_samples(&samples);

        assert_eq!(metrics.max_calibrated, Some(100.0));
        assert_eq!(metrics.min_calibrated, Some(0.0));
        assert_eq!(metrics.avg_calibrated, Some(50.0));
    }

    #[test]
    fn test_min_avg_max_ordering() {
        let values = [0.1, 0.1, 0.1, 7.3, 1e-9, 12345.678, 0.3, 42.0];
        for len in 1..=values.len() {
            let samples: Vec<_> = values[..len]
                .iter()
                .enumerate()
                .map(|(i, v)| raw(i as u64 + 1, *v))
                .collect();
            let metrics = SessionMetrics::from_samples(&samples);
            assert!(metrics.min_raw <= metrics.avg_raw, "len {}", len);
            assert!(metrics.avg_raw <= metrics.max_raw, "len {}", len);
        }
    }

    #[test]
    fn test_single_sample() {
        let metrics = SessionMetrics::from_samples(&[raw(1, 0.1)]);
        assert_eq!(metrics.min_raw, 0.1);
        assert_eq!(metrics.avg_raw, 0.1);
        assert_eq!(metrics.max_raw, 0.1);
    }
}
