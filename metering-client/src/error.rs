/// Violations of the household / consumption invariants.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("household_id must be exactly 10 alphanumeric characters, got '{0}'")]
    InvalidHouseholdId(String),
    #[error("meter_point_id must be a 13-digit number, got {0}")]
    InvalidMeterPointId(u64),
    #[error("consumption_value must be a finite number greater than 0, got {0}")]
    InvalidConsumptionValue(f64),
    #[error("unknown consumption_type '{0}', expected Import or Export")]
    InvalidConsumptionType(String),
}

#[derive(thiserror::Error, Debug)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors surfaced by `compute_statistics` and `detect_anomalies`.
///
/// Too few records and a zero MAD are not errors; both yield an empty
/// anomaly list.
#[derive(thiserror::Error, Debug)]
pub enum AnalyticsError {
    #[error("household '{0}' not found")]
    NotFound(String),
    #[error("anomaly threshold must be a finite number greater than 0, got {0}")]
    InvalidThreshold(f64),
    #[error("consumption record {id} has invalid value {value}")]
    InvalidRecord { id: i64, value: f64 },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
