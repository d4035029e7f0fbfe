use std::{collections::HashMap, io::Read};

use csv::StringRecord;
use metering_client::{
    domain::{ConsumptionType, HouseholdId, MeterPointId, NewHouseholdConsumption},
    ConsumptionStore, DomainError, RepositoryError,
};
use time::{macros::format_description, Date};

use crate::validation::{validate_item, IncomingConsumptionItem};

#[derive(thiserror::Error, Debug)]
pub enum BackfillError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {message}")]
    Record { line: u64, message: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// CSV backfill of household consumption.
///
/// Expected header columns (by name):
/// - household_id
/// - meter_point_id (13 digits)
/// - consumption_type (Import | Export)
/// - consumption_value (> 0)
/// - consumption_date (YYYY-MM-DD)
///
/// Rows are validated like `/ingest` payloads and grouped per household in
/// first-seen order. The first row of a household fixes its meter point id;
/// a later row carrying another one is rejected.
pub fn read_batches<R: Read>(reader: R) -> Result<Vec<NewHouseholdConsumption>, BackfillError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut batches: Vec<NewHouseholdConsumption> = Vec::new();
    let mut index: HashMap<HouseholdId, usize> = HashMap::new();

    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let reject = |message: String| {
            metrics::counter!("backfill_parse_errors_total").increment(1);
            BackfillError::Record { line, message }
        };

        let (household_id, meter_point_id, item) = parse_record(&record, &headers).map_err(reject)?;
        let consumption = validate_item(&item).map_err(|e| reject(e.to_string()))?;

        match index.get(&household_id) {
            Some(&i) if batches[i].meter_point_id != meter_point_id => {
                return Err(reject(format!(
                    "meter_point_id {meter_point_id} conflicts with {} seen earlier for household {household_id}",
                    batches[i].meter_point_id
                )));
            }
            Some(&i) => batches[i].consumption.push(consumption),
            None => {
                index.insert(household_id.clone(), batches.len());
                batches.push(NewHouseholdConsumption {
                    household_id,
                    meter_point_id,
                    consumption: vec![consumption],
                });
            }
        }
    }

    Ok(batches)
}

fn parse_record(
    record: &StringRecord,
    headers: &StringRecord,
) -> Result<(HouseholdId, MeterPointId, IncomingConsumptionItem), String> {
    let get = |name: &str| -> Result<&str, String> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .ok_or_else(|| format!("missing column '{name}'"))
    };

    let household_id = HouseholdId::parse(get("household_id")?).map_err(|e| e.to_string())?;

    let mpid_str = get("meter_point_id")?;
    let mpid: u64 = mpid_str
        .parse()
        .map_err(|e| format!("invalid meter_point_id '{mpid_str}': {e}"))?;
    let meter_point_id = MeterPointId::new(mpid).map_err(|e| e.to_string())?;

    let consumption_type: ConsumptionType = get("consumption_type")?
        .parse()
        .map_err(|e: DomainError| e.to_string())?;

    let value_str = get("consumption_value")?;
    let consumption_value: f64 = value_str
        .parse()
        .map_err(|e| format!("invalid consumption_value '{value_str}': {e}"))?;

    let date_str = get("consumption_date")?;
    let consumption_date = Date::parse(date_str, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("invalid consumption_date '{date_str}': {e}"))?;

    Ok((
        household_id,
        meter_point_id,
        IncomingConsumptionItem {
            consumption_type,
            consumption_value,
            consumption_date,
        },
    ))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackfillSummary {
    pub households: usize,
    pub households_created: usize,
    pub records: usize,
}

/// Ingests every batch through `store`, stopping at the first failure.
pub async fn ingest_batches<S>(store: &S, batches: Vec<NewHouseholdConsumption>) -> Result<BackfillSummary, BackfillError>
where
    S: ConsumptionStore + ?Sized,
{
    let mut summary = BackfillSummary::default();

    for batch in batches {
        let household_id = batch.household_id.clone();
        let outcome = store.ingest(batch).await.map_err(|e| {
            tracing::error!(household_id = %household_id, error = %e, "backfill ingest failed");
            e
        })?;

        summary.households += 1;
        summary.records += outcome.inserted;
        if outcome.created {
            summary.households_created += 1;
        }
        metrics::counter!("backfill_records_total").increment(outcome.inserted as u64);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metering_client::{db::InMemoryRepository, ConsumptionRepository};
    use time::macros::date;

    const CSV: &str = "\
household_id,meter_point_id,consumption_type,consumption_value,consumption_date
HOUSE00001,1234567890123,Import,1.5,2025-01-01
HOUSE00002,1234567890124,Export,0.5,2025-01-01
HOUSE00001,1234567890123,Import,2.5,2025-01-02
";

    #[test]
    fn groups_rows_by_household_in_first_seen_order() {
        let batches = read_batches(CSV.as_bytes()).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].household_id.as_str(), "HOUSE00001");
        assert_eq!(batches[0].consumption.len(), 2);
        assert_eq!(batches[0].consumption[1].consumption_date(), date!(2025 - 01 - 02));
        assert_eq!(batches[1].household_id.as_str(), "HOUSE00002");
        assert_eq!(batches[1].consumption[0].consumption_type(), ConsumptionType::Export);
    }

    #[test]
    fn column_order_does_not_matter() {
        let csv = "\
consumption_date,consumption_value,consumption_type,meter_point_id,household_id
2025-01-01,3.0,Import,1234567890123,HOUSE00001
";
        let batches = read_batches(csv.as_bytes()).unwrap();
        assert_eq!(batches[0].consumption[0].consumption_value(), 3.0);
    }

    #[test]
    fn rejects_non_positive_value_with_line_number() {
        let csv = "\
household_id,meter_point_id,consumption_type,consumption_value,consumption_date
HOUSE00001,1234567890123,Import,1.5,2025-01-01
HOUSE00001,1234567890123,Import,0,2025-01-02
";
        match read_batches(csv.as_bytes()) {
            Err(BackfillError::Record { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_date_and_missing_column() {
        let bad_date = "\
household_id,meter_point_id,consumption_type,consumption_value,consumption_date
HOUSE00001,1234567890123,Import,1.5,01/02/2025
";
        assert!(matches!(read_batches(bad_date.as_bytes()), Err(BackfillError::Record { .. })));

        let missing = "\
household_id,meter_point_id,consumption_value,consumption_date
HOUSE00001,1234567890123,1.5,2025-01-01
";
        match read_batches(missing.as_bytes()) {
            Err(BackfillError::Record { message, .. }) => assert!(message.contains("consumption_type")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_meter_point_with_line_number() {
        let csv = "\
household_id,meter_point_id,consumption_type,consumption_value,consumption_date
HOUSE00001,1234567890123,Import,1.5,2025-01-01
HOUSE00002,1234567890124,Import,1.0,2025-01-01
HOUSE00001,9999999999999,Import,2.5,2025-01-02
";
        match read_batches(csv.as_bytes()) {
            Err(BackfillError::Record { line, message }) => {
                assert_eq!(line, 4);
                assert!(message.contains("9999999999999"));
                assert!(message.contains("1234567890123"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn ingests_batches_into_store() {
        let store = InMemoryRepository::new();
        let batches = read_batches(CSV.as_bytes()).unwrap();

        let summary = ingest_batches(&store, batches).await.unwrap();
        assert_eq!(
            summary,
            BackfillSummary {
                households: 2,
                households_created: 2,
                records: 3,
            }
        );

        let household = store.resolve_household("HOUSE00001").await.unwrap().unwrap();
        assert_eq!(store.fetch_consumption(household.id).await.unwrap().len(), 2);

        let again = ingest_batches(&store, read_batches(CSV.as_bytes()).unwrap()).await.unwrap();
        assert_eq!(again.households_created, 0);
    }
}
