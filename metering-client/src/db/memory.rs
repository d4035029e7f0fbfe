use tokio::sync::RwLock;

use crate::{
    domain::{ConsumptionItem, ConsumptionRecord, Household, NewHouseholdConsumption},
    error::RepositoryError,
    repository::{meter_point_mismatch, ConsumptionRepository, ConsumptionStore, IngestOutcome, Page},
};

/// Process-local store with the same semantics as the PostgreSQL one.
/// Used for tests and for running the service without a database.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    last_household_pk: i64,
    last_consumption_pk: i64,
    households: Vec<Household>,
    // insertion order == id order
    consumption: Vec<ConsumptionRecord>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ConsumptionRepository for InMemoryRepository {
    async fn resolve_household(&self, household_id: &str) -> Result<Option<Household>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .households
            .iter()
            .find(|h| h.household_id == household_id)
            .cloned())
    }

    async fn fetch_consumption(&self, household_pk: i64) -> Result<Vec<ConsumptionRecord>, RepositoryError> {
        let state = self.state.read().await;
        let mut rows: Vec<ConsumptionRecord> = state
            .consumption
            .iter()
            .filter(|c| c.household_id == household_pk)
            .cloned()
            .collect();
        rows.sort_by_key(|c| (c.consumption_date, c.id));
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl ConsumptionStore for InMemoryRepository {
    async fn ingest(&self, batch: NewHouseholdConsumption) -> Result<IngestOutcome, RepositoryError> {
        let mut state = self.state.write().await;

        let existing = state
            .households
            .iter()
            .find(|h| h.household_id == batch.household_id.as_str())
            .cloned();

        let (household, created) = match existing {
            Some(h) => {
                meter_point_mismatch(&h, &batch);
                (h, false)
            }
            None => {
                state.last_household_pk += 1;
                let h = Household {
                    id: state.last_household_pk,
                    household_id: batch.household_id.as_str().to_string(),
                    meter_point_id: batch.meter_point_id.to_string(),
                };
                state.households.push(h.clone());
                (h, true)
            }
        };

        for c in &batch.consumption {
            state.last_consumption_pk += 1;
            let record = ConsumptionRecord {
                id: state.last_consumption_pk,
                household_id: household.id,
                consumption_type: c.consumption_type(),
                consumption_value: c.consumption_value(),
                consumption_date: c.consumption_date(),
            };
            state.consumption.push(record);
        }

        Ok(IngestOutcome {
            household,
            created,
            inserted: batch.consumption.len(),
        })
    }

    async fn list_consumption(&self, page: Page) -> Result<Vec<ConsumptionItem>, RepositoryError> {
        let state = self.state.read().await;
        let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);

        let items = state
            .consumption
            .iter()
            .skip(offset)
            .take(page.limit as usize)
            .filter_map(|c| {
                let household = state.households.iter().find(|h| h.id == c.household_id)?;
                Some(ConsumptionItem {
                    household_id: household.household_id.clone(),
                    consumption_type: c.consumption_type,
                    consumption_value: c.consumption_value,
                    consumption_date: c.consumption_date,
                })
            })
            .collect();

        Ok(items)
    }

    async fn delete_household(&self, household_id: &str) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;

        let Some(pos) = state.households.iter().position(|h| h.household_id == household_id) else {
            return Ok(false);
        };
        let removed = state.households.remove(pos);
        state.consumption.retain(|c| c.household_id != removed.id);

        Ok(true)
    }
}
