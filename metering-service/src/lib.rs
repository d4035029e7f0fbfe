pub mod api;
pub mod backfill;
pub mod config;
pub mod metrics_server;
pub mod observability;
pub mod storage;
pub mod validation;

pub use api::{router, AppState};
