pub mod consumption;
pub mod household;

pub use consumption::{
    ConsumptionItem, ConsumptionRecord, ConsumptionType, NewConsumption, NewHouseholdConsumption,
    Reading,
};
pub use household::{Household, HouseholdId, MeterPointId, HOUSEHOLD_ID_LEN};
