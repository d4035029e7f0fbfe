pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use metering_client::{AnomalyDetector, ConsumptionStore};

pub use error::ApiError;

pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Shared request state. The store handle is passed in explicitly so tests
/// and binaries choose the backend.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ConsumptionStore>,
    pub detector: AnomalyDetector,
    pub max_page_size: u32,
}

impl AppState {
    pub fn new(store: Arc<dyn ConsumptionStore>, detector: AnomalyDetector, max_page_size: u32) -> Self {
        Self {
            store,
            detector,
            max_page_size,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/ingest", post(handlers::ingest))
        .route("/statistics/household/:household_id", get(handlers::household_statistics))
        .route("/anomalies/household/:household_id", get(handlers::household_anomalies))
        .route("/consumption", get(handlers::list_consumption))
        .route("/households/:household_id", delete(handlers::delete_household))
        .with_state(state)
}
