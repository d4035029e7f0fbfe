use crate::{
    domain::{ConsumptionItem, ConsumptionRecord, Household, NewHouseholdConsumption},
    error::RepositoryError,
};

/// Read access the analytics need: resolve a business identifier, then
/// fetch that household's consumption history.
#[async_trait::async_trait]
pub trait ConsumptionRepository: Send + Sync {
    async fn resolve_household(&self, household_id: &str) -> Result<Option<Household>, RepositoryError>;

    /// All records of one household, ordered by `(consumption_date, id)`.
    async fn fetch_consumption(&self, household_pk: i64) -> Result<Vec<ConsumptionRecord>, RepositoryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub household: Household,
    pub created: bool,
    pub inserted: usize,
}

/// Write side of the store, used by ingestion and the listing endpoints.
#[async_trait::async_trait]
pub trait ConsumptionStore: ConsumptionRepository {
    /// Creates the household on first sight, then appends its readings.
    /// An existing household keeps its stored meter point id.
    async fn ingest(&self, batch: NewHouseholdConsumption) -> Result<IngestOutcome, RepositoryError>;

    /// Consumption across all households, ordered by record id.
    async fn list_consumption(&self, page: Page) -> Result<Vec<ConsumptionItem>, RepositoryError>;

    /// Removes a household and its consumption. Returns false if unknown.
    async fn delete_household(&self, household_id: &str) -> Result<bool, RepositoryError>;
}

/// Warns when a re-ingest carries a meter point id other than the stored
/// one and reports whether they differ. The stored value is always kept.
pub fn meter_point_mismatch(stored: &Household, batch: &NewHouseholdConsumption) -> bool {
    let received = batch.meter_point_id.to_string();
    if stored.meter_point_id == received {
        return false;
    }

    tracing::warn!(
        household_id = %batch.household_id,
        stored = %stored.meter_point_id,
        received = %received,
        "meter_point_id differs from stored value; keeping stored value"
    );
    true
}
