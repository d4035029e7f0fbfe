use metering_client::{
    domain::{ConsumptionType, HouseholdId, MeterPointId, NewConsumption, NewHouseholdConsumption},
    DomainError,
};
use serde::Deserialize;
use time::Date;

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingConsumptionItem {
    pub consumption_type: ConsumptionType,
    pub consumption_value: f64,
    pub consumption_date: Date,
}

/// Ingest payload as received on the wire, before any invariant is checked.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingHouseholdConsumption {
    pub household_id: String,
    pub meter_point_id: u64,
    pub consumption: Vec<IncomingConsumptionItem>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("consumption must contain at least one record")]
    EmptyConsumption,
    #[error("consumption[{index}]: {source}")]
    Item { index: usize, source: DomainError },
}

pub fn validate_item(item: &IncomingConsumptionItem) -> Result<NewConsumption, DomainError> {
    NewConsumption::new(item.consumption_type, item.consumption_value, item.consumption_date)
}

/// Pure validation of an ingest payload.
///
/// Rules:
/// - household_id is exactly ten ASCII alphanumerics.
/// - meter_point_id has thirteen digits.
/// - at least one consumption record, each with a finite value > 0.
pub fn validate_ingest(payload: IncomingHouseholdConsumption) -> Result<NewHouseholdConsumption, ValidationError> {
    let household_id = HouseholdId::parse(&payload.household_id)?;
    let meter_point_id = MeterPointId::new(payload.meter_point_id)?;

    if payload.consumption.is_empty() {
        return Err(ValidationError::EmptyConsumption);
    }

    let consumption = payload
        .consumption
        .iter()
        .enumerate()
        .map(|(index, item)| validate_item(item).map_err(|source| ValidationError::Item { index, source }))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NewHouseholdConsumption {
        household_id,
        meter_point_id,
        consumption,
    })
}

/// [`validate_ingest`] plus the rejection counter.
pub fn validate_ingest_counted(
    payload: IncomingHouseholdConsumption,
) -> Result<NewHouseholdConsumption, ValidationError> {
    match validate_ingest(payload) {
        Ok(batch) => Ok(batch),
        Err(e) => {
            metrics::counter!("validation_ingest_rejected_total").increment(1);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn item(value: f64) -> IncomingConsumptionItem {
        IncomingConsumptionItem {
            consumption_type: ConsumptionType::Import,
            consumption_value: value,
            consumption_date: date!(2025 - 01 - 01),
        }
    }

    fn payload(household_id: &str, meter_point_id: u64, items: Vec<IncomingConsumptionItem>) -> IncomingHouseholdConsumption {
        IncomingHouseholdConsumption {
            household_id: household_id.to_string(),
            meter_point_id,
            consumption: items,
        }
    }

    #[test]
    fn ingest_validation_accepts_valid_payload() {
        let res = validate_ingest(payload("ZZZZZZZZZZ", 9_999_999_999_999, vec![item(1.5)]));
        let batch = res.unwrap();
        assert_eq!(batch.household_id.as_str(), "ZZZZZZZZZZ");
        assert_eq!(batch.meter_point_id.get(), 9_999_999_999_999);
        assert_eq!(batch.consumption.len(), 1);
    }

    #[test]
    fn ingest_validation_rejects_short_household_id() {
        let res = validate_ingest(payload("SHORT", 9_999_999_999_999, vec![item(1.5)]));
        assert!(matches!(
            res,
            Err(ValidationError::Domain(DomainError::InvalidHouseholdId(_)))
        ));
    }

    #[test]
    fn ingest_validation_rejects_twelve_digit_meter_point() {
        let res = validate_ingest(payload("ZZZZZZZZZZ", 999_999_999_999, vec![item(1.5)]));
        assert!(matches!(
            res,
            Err(ValidationError::Domain(DomainError::InvalidMeterPointId(_)))
        ));
    }

    #[test]
    fn ingest_validation_rejects_empty_consumption() {
        let res = validate_ingest(payload("ZZZZZZZZZZ", 9_999_999_999_999, vec![]));
        assert_eq!(res, Err(ValidationError::EmptyConsumption));
    }

    #[test]
    fn ingest_validation_reports_offending_item_index() {
        let res = validate_ingest(payload(
            "ZZZZZZZZZZ",
            9_999_999_999_999,
            vec![item(1.5), item(2.0), item(0.0)],
        ));
        match res {
            Err(ValidationError::Item { index, source }) => {
                assert_eq!(index, 2);
                assert_eq!(source, DomainError::InvalidConsumptionValue(0.0));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn incoming_payload_deserializes_from_json() {
        let json = r#"{
            "household_id": "ZZZZZZZZZZ",
            "meter_point_id": 9999999999999,
            "consumption": [
                {"consumption_type": "Export", "consumption_value": 1.5, "consumption_date": "2025-01-01"}
            ]
        }"#;
        let incoming: IncomingHouseholdConsumption = serde_json::from_str(json).unwrap();
        assert_eq!(incoming.consumption[0].consumption_type, ConsumptionType::Export);
        assert_eq!(incoming.consumption[0].consumption_date, date!(2025 - 01 - 01));
    }
}
