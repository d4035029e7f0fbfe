use time::Date;

use crate::{
    analytics::robust::{median, median_absolute_deviation, round2},
    domain::Reading,
    error::AnalyticsError,
};

pub const DEFAULT_THRESHOLD: f64 = 3.5;

/// Fewer samples than this cannot establish a baseline.
pub const MIN_BASELINE_SAMPLES: usize = 2;

// 0.75 quantile of the standard normal; makes MAD comparable to a std dev.
const MAD_SCALE: f64 = 0.6745;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Anomaly {
    pub date: Date,
    pub value: f64,
    /// Modified z-score, rounded to two decimals.
    pub score: f64,
}

/// Outcome of fitting the median / MAD baseline to a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Baseline {
    /// Fewer than [`MIN_BASELINE_SAMPLES`] readings.
    Insufficient,
    /// MAD is zero, so no reading can be scored. Note this also hides real
    /// outliers when most readings are identical (`[1, 1, 1, 100]`).
    Degenerate { median: f64 },
    Established { median: f64, mad: f64 },
}

impl Baseline {
    pub fn fit(values: &[f64]) -> Self {
        if values.len() < MIN_BASELINE_SAMPLES {
            return Self::Insufficient;
        }

        let mut sorted = values.to_vec();
        let Some(median) = median(&mut sorted) else {
            return Self::Insufficient;
        };

        match median_absolute_deviation(values, median) {
            Some(mad) if mad > 0.0 => Self::Established { median, mad },
            _ => Self::Degenerate { median },
        }
    }
}

/// Flags readings whose MAD-based modified z-score exceeds a threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyDetector {
    threshold: f64,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl AnomalyDetector {
    pub fn new(threshold: f64) -> Result<Self, AnalyticsError> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(AnalyticsError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Anomalous readings in input order.
    pub fn detect(&self, readings: &[Reading]) -> Vec<Anomaly> {
        let values: Vec<f64> = readings.iter().map(|r| r.value).collect();

        let (median, mad) = match Baseline::fit(&values) {
            Baseline::Established { median, mad } => (median, mad),
            Baseline::Insufficient => {
                tracing::debug!(samples = values.len(), "too few readings for an anomaly baseline");
                return Vec::new();
            }
            Baseline::Degenerate { median } => {
                tracing::debug!(samples = values.len(), median, "MAD is zero, no anomaly can be scored");
                return Vec::new();
            }
        };

        readings
            .iter()
            .filter_map(|r| {
                let score = MAD_SCALE * (r.value - median) / mad;
                (score.abs() > self.threshold).then(|| Anomaly {
                    date: r.date,
                    value: r.value,
                    score: round2(score),
                })
            })
            .collect()
    }
}
