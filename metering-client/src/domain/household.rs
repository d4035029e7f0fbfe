use std::fmt;

use crate::error::DomainError;

pub const HOUSEHOLD_ID_LEN: usize = 10;

const METER_POINT_MIN: u64 = 1_000_000_000_000;
const METER_POINT_MAX: u64 = 10_000_000_000_000;

/// Stored household row. `id` is the internal storage identity,
/// `household_id` the business identifier callers know.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Household {
    pub id: i64,
    pub household_id: String,
    pub meter_point_id: String,
}

/// Validated business identifier: exactly ten ASCII alphanumerics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HouseholdId(String);

impl HouseholdId {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let valid = raw.len() == HOUSEHOLD_ID_LEN && raw.bytes().all(|b| b.is_ascii_alphanumeric());
        if !valid {
            return Err(DomainError::InvalidHouseholdId(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HouseholdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 13-digit meter point identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeterPointId(u64);

impl MeterPointId {
    pub fn new(raw: u64) -> Result<Self, DomainError> {
        if !(METER_POINT_MIN..METER_POINT_MAX).contains(&raw) {
            return Err(DomainError::InvalidMeterPointId(raw));
        }
        Ok(Self(raw))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MeterPointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
