//! Point-in-time FX rate resolution
//!
//! Rates are effective-dated; several rates for the same pair may coexist. A
//! lookup returns the most recent rate not after the query date, with ties on
//! effective date broken by the most recently recorded row. There is no
//! interpolation and no inverse-pair fallback: a missing USD→MYR rate is
//! reported as absent even when a MYR→USD rate exists, and the caller decides
//! the fallback policy.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::traits::EngineStorage;
use crate::types::*;
use crate::utils::validation::validate_currency_code;

/// Where an FX rate was recorded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FxRateSource {
    /// Entered by a user on a document
    Manual,
    /// Maintained in the organization's rate table
    RateTable,
    /// Supplied by an upstream system feed
    System,
}

/// One recorded FX rate for a currency pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxRateRow {
    pub org_id: String,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: BigDecimal,
    pub effective_date: NaiveDate,
    pub source: FxRateSource,
    pub recorded_at: NaiveDateTime,
}

/// Result of an FX rate lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxRateResult {
    pub rate: BigDecimal,
    pub effective_date: NaiveDate,
    pub source: FxRateSource,
}

/// Resolver for point-in-time FX rate lookups
pub struct FxRateResolver<S: EngineStorage> {
    storage: S,
}

impl<S: EngineStorage> FxRateResolver<S> {
    /// Create a resolver over the given storage handle
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Look up the rate for an exact currency pair as of a date
    ///
    /// Returns `Ok(None)` when no rate is effective on or before `as_of`;
    /// absence is a normal outcome, not an error.
    pub async fn lookup_rate(
        &self,
        org_id: &str,
        from_currency: &str,
        to_currency: &str,
        as_of: NaiveDate,
    ) -> EngineResult<Option<FxRateResult>> {
        let rates = self
            .storage
            .list_fx_rates(org_id, from_currency, to_currency)
            .await?;

        let best = rates
            .into_iter()
            .filter(|row| row.effective_date <= as_of)
            .max_by(|a, b| {
                a.effective_date
                    .cmp(&b.effective_date)
                    .then(a.recorded_at.cmp(&b.recorded_at))
            });

        Ok(best.map(|row| FxRateResult {
            rate: row.rate,
            effective_date: row.effective_date,
            source: row.source,
        }))
    }
}

/// Convert a monetary value with a resolved rate, rounding half-up
///
/// This is the one sanctioned cross-currency step in the money model.
pub fn convert(amount: &Money, rate: &FxRateResult, to_currency: &str) -> EngineResult<Money> {
    validate_currency_code(to_currency)?;
    let converted = BigDecimal::from(amount.minor) * &rate.rate;
    Ok(Money::new(round_half_up_minor(&converted)?, to_currency))
}
