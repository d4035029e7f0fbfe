//! Household consumption statistics and MAD-based anomaly detection.
//!
//! Both entry points resolve the household through a [`ConsumptionRepository`],
//! fetch its readings once and compute over that snapshot. An unknown
//! household is [`AnalyticsError::NotFound`], never an empty result.

pub mod anomalies;
pub mod robust;
pub mod statistics;

pub use anomalies::{Anomaly, AnomalyDetector, Baseline, DEFAULT_THRESHOLD};
pub use statistics::{summarize, ConsumptionSummary, HouseholdStatistics};

use crate::{
    domain::{ConsumptionRecord, Reading},
    error::AnalyticsError,
    repository::ConsumptionRepository,
};

pub async fn compute_statistics<R>(repo: &R, household_id: &str) -> Result<HouseholdStatistics, AnalyticsError>
where
    R: ConsumptionRepository + ?Sized,
{
    let readings = load_readings(repo, household_id).await?;
    let summary = summarize(&readings);

    tracing::debug!(household_id, records = readings.len(), "computed household statistics");

    Ok(HouseholdStatistics::from_summary(household_id, summary))
}

pub async fn detect_anomalies<R>(
    repo: &R,
    household_id: &str,
    detector: &AnomalyDetector,
) -> Result<Vec<Anomaly>, AnalyticsError>
where
    R: ConsumptionRepository + ?Sized,
{
    let readings = load_readings(repo, household_id).await?;
    let anomalies = detector.detect(&readings);

    tracing::debug!(
        household_id,
        records = readings.len(),
        threshold = detector.threshold(),
        anomalies = anomalies.len(),
        "ran anomaly detection"
    );

    Ok(anomalies)
}

async fn load_readings<R>(repo: &R, household_id: &str) -> Result<Vec<Reading>, AnalyticsError>
where
    R: ConsumptionRepository + ?Sized,
{
    let household = repo
        .resolve_household(household_id)
        .await?
        .ok_or_else(|| AnalyticsError::NotFound(household_id.to_string()))?;

    let records = repo.fetch_consumption(household.id).await?;
    records.iter().map(checked_reading).collect()
}

// Upstream validation guarantees positive values; anything else is a broken
// invariant and must not be averaged in silently.
fn checked_reading(record: &ConsumptionRecord) -> Result<Reading, AnalyticsError> {
    if !record.consumption_value.is_finite() || record.consumption_value <= 0.0 {
        tracing::error!(
            record_id = record.id,
            value = record.consumption_value,
            "stored consumption value violates the positive-value invariant"
        );
        return Err(AnalyticsError::InvalidRecord {
            id: record.id,
            value: record.consumption_value,
        });
    }
    Ok(record.reading())
}
