pub mod analytics;
pub mod db;
pub mod domain;
pub mod error;
pub mod repository;

pub use analytics::{compute_statistics, detect_anomalies, AnomalyDetector};
pub use error::{AnalyticsError, DomainError, RepositoryError};
pub use repository::{ConsumptionRepository, ConsumptionStore};
