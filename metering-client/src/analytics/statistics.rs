use time::Date;

use crate::domain::Reading;

/// Aggregate consumption of one household. All measures are `None` when the
/// household has no records, which is distinct from a total of zero.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HouseholdStatistics {
    pub household_id: String,
    pub total_consumption: Option<f64>,
    pub mean_consumption: Option<f64>,
    pub peak_day: Option<Date>,
    pub peak_value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumptionSummary {
    pub count: usize,
    pub total: f64,
    pub mean: f64,
    pub peak: Reading,
}

impl HouseholdStatistics {
    pub fn from_summary(household_id: impl Into<String>, summary: Option<ConsumptionSummary>) -> Self {
        Self {
            household_id: household_id.into(),
            total_consumption: summary.map(|s| s.total),
            mean_consumption: summary.map(|s| s.mean),
            peak_day: summary.map(|s| s.peak.date),
            peak_value: summary.map(|s| s.peak.value),
        }
    }
}

/// Total, mean and peak over `readings`.
///
/// The peak is the maximum value; among equal maxima the earliest date wins,
/// and among equal dates the first reading in slice order.
pub fn summarize(readings: &[Reading]) -> Option<ConsumptionSummary> {
    let (first, rest) = readings.split_first()?;

    let mut total = first.value;
    let mut peak = *first;
    for r in rest {
        total += r.value;
        if r.value > peak.value || (r.value == peak.value && r.date < peak.date) {
            peak = *r;
        }
    }

    let count = readings.len();
    Some(ConsumptionSummary {
        count,
        total,
        mean: total / count as f64,
        peak,
    })
}
