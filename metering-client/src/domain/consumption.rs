use std::{fmt, str::FromStr};

use time::Date;

use crate::{
    domain::household::{HouseholdId, MeterPointId},
    error::DomainError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConsumptionType {
    Import,
    Export,
}

impl ConsumptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "Import",
            Self::Export => "Export",
        }
    }
}

impl fmt::Display for ConsumptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsumptionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Import" => Ok(Self::Import),
            "Export" => Ok(Self::Export),
            other => Err(DomainError::InvalidConsumptionType(other.to_string())),
        }
    }
}

impl TryFrom<String> for ConsumptionType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A stored consumption row, as fetched for a single household.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConsumptionRecord {
    pub id: i64,
    pub household_id: i64,
    #[sqlx(try_from = "String")]
    pub consumption_type: ConsumptionType,
    pub consumption_value: f64,
    pub consumption_date: Date,
}

impl ConsumptionRecord {
    pub fn reading(&self) -> Reading {
        Reading {
            date: self.consumption_date,
            value: self.consumption_value,
        }
    }
}

/// The (date, value) pair the analytics operate on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub date: Date,
    pub value: f64,
}

/// A consumption row joined with its household's business identifier,
/// as returned by paginated listings.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConsumptionItem {
    pub household_id: String,
    #[sqlx(try_from = "String")]
    pub consumption_type: ConsumptionType,
    pub consumption_value: f64,
    pub consumption_date: Date,
}

/// A validated consumption entry awaiting insertion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewConsumption {
    consumption_type: ConsumptionType,
    consumption_value: f64,
    consumption_date: Date,
}

impl NewConsumption {
    pub fn new(
        consumption_type: ConsumptionType,
        consumption_value: f64,
        consumption_date: Date,
    ) -> Result<Self, DomainError> {
        if !consumption_value.is_finite() || consumption_value <= 0.0 {
            return Err(DomainError::InvalidConsumptionValue(consumption_value));
        }
        Ok(Self {
            consumption_type,
            consumption_value,
            consumption_date,
        })
    }

    pub fn consumption_type(&self) -> ConsumptionType {
        self.consumption_type
    }

    pub fn consumption_value(&self) -> f64 {
        self.consumption_value
    }

    pub fn consumption_date(&self) -> Date {
        self.consumption_date
    }
}

/// One ingestion unit: a household and the readings to append to it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHouseholdConsumption {
    pub household_id: HouseholdId,
    pub meter_point_id: MeterPointId,
    pub consumption: Vec<NewConsumption>,
}
