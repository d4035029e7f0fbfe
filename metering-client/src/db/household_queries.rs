use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    domain::{ConsumptionItem, ConsumptionRecord, Household, NewConsumption, NewHouseholdConsumption},
    error::RepositoryError,
    repository::{meter_point_mismatch, ConsumptionRepository, ConsumptionStore, IngestOutcome, Page},
};

// Four binds per row keeps each statement well under the 65535 parameter limit.
const INSERT_CHUNK_ROWS: usize = 1000;

/// PostgreSQL-backed store. Schema lives in `sql/schema/01_households.sql`.
#[derive(Debug, Clone)]
pub struct PgConsumptionRepository {
    pool: PgPool,
}

impl PgConsumptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct UpsertedHousehold {
    #[sqlx(flatten)]
    household: Household,
    created: bool,
}

#[async_trait::async_trait]
impl ConsumptionRepository for PgConsumptionRepository {
    async fn resolve_household(&self, household_id: &str) -> Result<Option<Household>, RepositoryError> {
        let row = sqlx::query_as::<_, Household>(
            r#"
            SELECT id, household_id, meter_point_id
            FROM households
            WHERE household_id = $1
            "#,
        )
        .bind(household_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn fetch_consumption(&self, household_pk: i64) -> Result<Vec<ConsumptionRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, ConsumptionRecord>(
            r#"
            SELECT
                id,
                household_id,
                consumption_type,
                consumption_value,
                consumption_date
            FROM consumption
            WHERE household_id = $1
            ORDER BY consumption_date, id
            "#,
        )
        .bind(household_pk)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait::async_trait]
impl ConsumptionStore for PgConsumptionRepository {
    async fn ingest(&self, batch: NewHouseholdConsumption) -> Result<IngestOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Household>(
            r#"
            SELECT id, household_id, meter_point_id
            FROM households
            WHERE household_id = $1
            FOR UPDATE
            "#,
        )
        .bind(batch.household_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let (household, created) = match existing {
            Some(h) => {
                meter_point_mismatch(&h, &batch);
                (h, false)
            }
            None => {
                // A concurrent ingest may have created the row since the SELECT;
                // the no-op update makes RETURNING yield it either way, and
                // xmax is only zero on a row this statement inserted.
                let row = sqlx::query_as::<_, UpsertedHousehold>(
                    r#"
                    INSERT INTO households (household_id, meter_point_id)
                    VALUES ($1, $2)
                    ON CONFLICT (household_id) DO UPDATE SET household_id = EXCLUDED.household_id
                    RETURNING id, household_id, meter_point_id, (xmax = 0) AS created
                    "#,
                )
                .bind(batch.household_id.as_str())
                .bind(batch.meter_point_id.to_string())
                .fetch_one(&mut *tx)
                .await?;

                if !row.created {
                    meter_point_mismatch(&row.household, &batch);
                }
                (row.household, row.created)
            }
        };

        for chunk in batch.consumption.chunks(INSERT_CHUNK_ROWS) {
            insert_consumption(&mut tx, household.id, chunk).await?;
        }

        tx.commit().await?;

        Ok(IngestOutcome {
            household,
            created,
            inserted: batch.consumption.len(),
        })
    }

    async fn list_consumption(&self, page: Page) -> Result<Vec<ConsumptionItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, ConsumptionItem>(
            r#"
            SELECT
                h.household_id,
                c.consumption_type,
                c.consumption_value,
                c.consumption_date
            FROM consumption c
            JOIN households h ON c.household_id = h.id
            ORDER BY c.id
            LIMIT $1
            OFFSET $2
            "#,
        )
        .bind(i64::from(page.limit))
        .bind(i64::try_from(page.offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn delete_household(&self, household_id: &str) -> Result<bool, RepositoryError> {
        // consumption rows go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM households WHERE household_id = $1")
            .bind(household_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

async fn insert_consumption(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    household_pk: i64,
    rows: &[NewConsumption],
) -> Result<(), sqlx::Error> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO consumption (household_id, consumption_type, consumption_value, consumption_date) ",
    );

    builder.push_values(rows, |mut b, c| {
        b.push_bind(household_pk)
            .push_bind(c.consumption_type().as_str())
            .push_bind(c.consumption_value())
            .push_bind(c.consumption_date());
    });

    builder.build().execute(&mut **tx).await.map(|_| ())
}
