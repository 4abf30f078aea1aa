//! Core types shared across the calculation engine

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A monetary value in signed minor currency units (e.g. cents)
///
/// The integer carries the amount; the currency code is carried alongside,
/// never encoded into the integer. Arithmetic between two values requires
/// matching currencies; cross-currency math must go through an explicit
/// FX conversion step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in minor units
    pub minor: i64,
    /// ISO-4217 currency code
    pub currency: String,
}

impl Money {
    /// Create a new monetary value
    pub fn new(minor: i64, currency: impl Into<String>) -> Self {
        Self {
            minor,
            currency: currency.into(),
        }
    }

    /// Add another value of the same currency
    pub fn checked_add(&self, other: &Money) -> EngineResult<Money> {
        self.ensure_same_currency(other)?;
        let minor = self.minor.checked_add(other.minor).ok_or_else(|| {
            EngineError::Validation("Monetary amount overflow".to_string())
        })?;
        Ok(Money::new(minor, self.currency.clone()))
    }

    /// Subtract another value of the same currency
    pub fn checked_sub(&self, other: &Money) -> EngineResult<Money> {
        self.ensure_same_currency(other)?;
        let minor = self.minor.checked_sub(other.minor).ok_or_else(|| {
            EngineError::Validation("Monetary amount overflow".to_string())
        })?;
        Ok(Money::new(minor, self.currency.clone()))
    }

    fn ensure_same_currency(&self, other: &Money) -> EngineResult<()> {
        if self.currency != other.currency {
            return Err(EngineError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            });
        }
        Ok(())
    }
}

/// Round a decimal amount to whole minor units, half away from zero
///
/// This is the single path by which a decimal rate product becomes money.
/// Schedule math never uses it; schedules use integer floor division with
/// the final period absorbing the remainder.
pub fn round_half_up_minor(value: &BigDecimal) -> EngineResult<i64> {
    value
        .with_scale_round(0, RoundingMode::HalfUp)
        .to_i64()
        .ok_or_else(|| EngineError::Validation(format!("amount out of i64 range: {}", value)))
}

/// Outcome of an insert guarded by a storage uniqueness constraint
///
/// A concurrent writer hitting the same key surfaces as `Conflict`, not as a
/// storage error. Callers treat it as "someone else already wrote this row".
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome<T> {
    /// The row was inserted and is returned
    Inserted(T),
    /// A row with the same unique key already exists
    Conflict,
}

/// Posting state of an accounting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiscalPeriodStatus {
    /// Accepts new postings
    Open,
    /// Closed to postings; may be reopened
    Closed,
    /// Permanently closed
    Locked,
}

/// Depreciation method of a fixed asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationMethod {
    /// Asset is not depreciated
    None,
    /// Equal charge each period, last period absorbs rounding
    StraightLine,
    /// Double-declining balance with switch to straight-line
    DecliningBalance,
}

/// Lifecycle status of a fixed asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Draft,
    InService,
    Disposed,
    Scrapped,
}

/// Fixed asset as read from the business-object layer
///
/// The engine never writes assets; it only reads the fields that drive the
/// depreciation schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub org_id: String,
    pub acquisition_cost_minor: i64,
    pub residual_value_minor: i64,
    pub useful_life_months: u32,
    pub depreciation_method: DepreciationMethod,
    pub status: AssetStatus,
}

impl Asset {
    /// Whether the asset is in a state that accepts a depreciation advance
    pub fn is_depreciable(&self) -> bool {
        self.status == AssetStatus::InService
            && self.depreciation_method != DepreciationMethod::None
    }
}

/// Errors raised by the calculation engine
///
/// Expected non-posting outcomes (asset not eligible, no FX rate found, no
/// acceptable reconciliation match, a concurrent advance that already wrote
/// the period) are modeled as ordinary return values, not variants here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },
    #[error("Fiscal period covering {date} is {status:?}; posting rejected")]
    PeriodClosed {
        date: NaiveDate,
        status: FiscalPeriodStatus,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
