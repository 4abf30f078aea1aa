//! Depreciation schedules for fixed assets
//!
//! All schedule math is integer-only: the per-period charge is a floor
//! division and the final period absorbs the remainder, so a straight-line
//! schedule sums to exactly `cost - residual` no matter how unevenly the
//! amounts divide. Generated rows are immutable; a later period is computed
//! from the prior accumulated total and appended, never edited in place.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fiscal::FiscalPeriodGuard;
use crate::traits::{EngineStorage, FiscalCalendar};
use crate::types::*;

/// One period of a depreciation schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationPeriodResult {
    /// Zero-based period ordinal
    pub period_index: u32,
    pub depreciation_minor: i64,
    pub accum_depreciation_minor: i64,
    pub book_value_minor: i64,
}

/// Full schedule for an asset, generated up front for preview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationScheduleResult {
    pub asset_id: String,
    pub method: DepreciationMethod,
    pub total_periods: u32,
    pub periods: Vec<DepreciationPeriodResult>,
}

/// Persisted depreciation row, at most one per (asset, fiscal period)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationPeriodRow {
    pub asset_id: String,
    pub fiscal_period_id: String,
    pub period_index: u32,
    pub depreciation_minor: i64,
    pub accum_depreciation_minor: i64,
    pub book_value_minor: i64,
    pub posting_date: NaiveDate,
}

fn validate_inputs(
    cost_minor: i64,
    residual_minor: i64,
    useful_life_months: u32,
) -> EngineResult<()> {
    if useful_life_months == 0 {
        return Err(EngineError::Validation(
            "Useful life must be at least one month".to_string(),
        ));
    }
    if cost_minor < 0 || residual_minor < 0 {
        return Err(EngineError::Validation(
            "Cost and residual value must be non-negative".to_string(),
        ));
    }
    if residual_minor > cost_minor {
        return Err(EngineError::Validation(format!(
            "Residual value {} exceeds acquisition cost {}",
            residual_minor, cost_minor
        )));
    }
    Ok(())
}

/// Compute the next schedule period, if the schedule has not ended
///
/// Pure: reads only its arguments. Returns `Ok(None)` once the schedule
/// naturally terminates (all periods taken, or book value at residual).
pub fn next_period(
    cost_minor: i64,
    residual_minor: i64,
    useful_life_months: u32,
    method: DepreciationMethod,
    period_index: u32,
    prior_accum_minor: i64,
) -> EngineResult<Option<DepreciationPeriodResult>> {
    validate_inputs(cost_minor, residual_minor, useful_life_months)?;
    if method == DepreciationMethod::None {
        return Err(EngineError::Validation(
            "Asset has no depreciation method".to_string(),
        ));
    }
    if period_index >= useful_life_months {
        return Ok(None);
    }

    let depreciable = cost_minor - residual_minor;
    let amount = match method {
        DepreciationMethod::StraightLine => {
            if period_index == useful_life_months - 1 {
                // Final period absorbs whatever floor division left behind
                depreciable - prior_accum_minor
            } else {
                depreciable / useful_life_months as i64
            }
        }
        DepreciationMethod::DecliningBalance => {
            let book_value = cost_minor - prior_accum_minor;
            if book_value <= residual_minor {
                return Ok(None);
            }
            let remaining = (useful_life_months - period_index) as i64;
            // Double-declining rate, floor; switch to straight-line when
            // that yields more
            let db_amount = ((book_value as i128 * 2) / useful_life_months as i128) as i64;
            let sl_amount = (book_value - residual_minor) / remaining;
            // Never drive book value below residual
            db_amount.max(sl_amount).min(book_value - residual_minor)
        }
        // Rejected by the validation above
        DepreciationMethod::None => unreachable!(),
    };

    if amount <= 0 {
        return Ok(None);
    }

    let accum = prior_accum_minor + amount;
    Ok(Some(DepreciationPeriodResult {
        period_index,
        depreciation_minor: amount,
        accum_depreciation_minor: accum,
        book_value_minor: cost_minor - accum,
    }))
}

/// Generate the entire schedule up front
///
/// Pure, no I/O; intended for previewing an asset's depreciation plan.
pub fn generate_schedule(
    cost_minor: i64,
    residual_minor: i64,
    useful_life_months: u32,
    method: DepreciationMethod,
) -> EngineResult<Vec<DepreciationPeriodResult>> {
    let mut periods = Vec::new();
    let mut accum = 0i64;
    for period_index in 0..useful_life_months {
        match next_period(
            cost_minor,
            residual_minor,
            useful_life_months,
            method,
            period_index,
            accum,
        )? {
            Some(period) => {
                accum = period.accum_depreciation_minor;
                periods.push(period);
            }
            None => break,
        }
    }
    Ok(periods)
}

/// Stateful depreciation scheduler
///
/// Advances one period at a time against storage, inside a transaction the
/// caller owns. The (asset, fiscal period) uniqueness constraint at the
/// storage boundary is what makes concurrent advances safe; a conflict is
/// treated as "someone else already advanced this period".
pub struct DepreciationScheduler<S: EngineStorage, C: FiscalCalendar> {
    storage: S,
    guard: FiscalPeriodGuard<C>,
}

impl<S: EngineStorage, C: FiscalCalendar> DepreciationScheduler<S, C> {
    /// Create a scheduler over the given storage and fiscal calendar
    pub fn new(storage: S, calendar: C) -> Self {
        Self {
            storage,
            guard: FiscalPeriodGuard::new(calendar),
        }
    }

    /// Generate the full preview schedule for a stored asset
    pub async fn preview_schedule(&self, asset_id: &str) -> EngineResult<DepreciationScheduleResult> {
        let asset = self.get_asset_required(asset_id).await?;
        let periods = generate_schedule(
            asset.acquisition_cost_minor,
            asset.residual_value_minor,
            asset.useful_life_months,
            asset.depreciation_method,
        )?;
        Ok(DepreciationScheduleResult {
            asset_id: asset.id,
            method: asset.depreciation_method,
            total_periods: asset.useful_life_months,
            periods,
        })
    }

    /// Compute and persist exactly the next depreciation period
    ///
    /// Returns `Ok(None)` when the asset is not eligible, the schedule has
    /// ended, or another caller already recorded this period. A closed
    /// fiscal period is a hard error.
    pub async fn advance(
        &mut self,
        asset_id: &str,
        fiscal_period_id: &str,
        posting_date: NaiveDate,
    ) -> EngineResult<Option<DepreciationPeriodResult>> {
        let asset = self.get_asset_required(asset_id).await?;
        if !asset.is_depreciable() {
            debug!(
                asset_id = %asset.id,
                status = ?asset.status,
                method = ?asset.depreciation_method,
                "asset not eligible for depreciation"
            );
            return Ok(None);
        }

        self.guard.assert_open(&asset.org_id, posting_date).await?;

        // Aggregate reads and the insert below run in the caller's
        // transaction; the uniqueness constraint covers the race between them
        let period_index = self.storage.depreciation_period_count(asset_id).await?;
        let prior_accum = self.storage.max_accumulated_depreciation(asset_id).await?;

        let next = match next_period(
            asset.acquisition_cost_minor,
            asset.residual_value_minor,
            asset.useful_life_months,
            asset.depreciation_method,
            period_index,
            prior_accum,
        )? {
            Some(next) => next,
            None => return Ok(None),
        };

        let row = DepreciationPeriodRow {
            asset_id: asset.id.clone(),
            fiscal_period_id: fiscal_period_id.to_string(),
            period_index: next.period_index,
            depreciation_minor: next.depreciation_minor,
            accum_depreciation_minor: next.accum_depreciation_minor,
            book_value_minor: next.book_value_minor,
            posting_date,
        };

        match self.storage.insert_depreciation_period(&row).await? {
            InsertOutcome::Inserted(_) => {
                debug!(
                    asset_id = %asset.id,
                    period_index = next.period_index,
                    depreciation_minor = next.depreciation_minor,
                    "depreciation period recorded"
                );
                Ok(Some(next))
            }
            InsertOutcome::Conflict => {
                warn!(
                    asset_id = %asset.id,
                    fiscal_period_id,
                    "depreciation period already recorded, skipping"
                );
                Ok(None)
            }
        }
    }

    async fn get_asset_required(&self, asset_id: &str) -> EngineResult<Asset> {
        self.storage
            .get_asset(asset_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("asset {}", asset_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_line_even_division() {
        // 120000 over 12 months: periods 0-10 at 10000, period 11 absorbs
        // the (zero) remainder
        let periods = generate_schedule(120_000, 0, 12, DepreciationMethod::StraightLine).unwrap();

        assert_eq!(periods.len(), 12);
        for period in &periods[..11] {
            assert_eq!(period.depreciation_minor, 10_000);
        }
        assert_eq!(periods[11].depreciation_minor, 10_000);
        assert_eq!(periods[11].book_value_minor, 0);
    }

    #[test]
    fn test_straight_line_no_drift_on_uneven_division() {
        // 100000 over 7 months does not divide evenly
        let periods = generate_schedule(100_000, 0, 7, DepreciationMethod::StraightLine).unwrap();

        let total: i64 = periods.iter().map(|p| p.depreciation_minor).sum();
        assert_eq!(total, 100_000);
        for period in &periods[..6] {
            assert_eq!(period.depreciation_minor, 14_285);
        }
        assert_eq!(periods[6].depreciation_minor, 100_000 - 6 * 14_285);
    }

    #[test]
    fn test_straight_line_respects_residual() {
        let periods =
            generate_schedule(100_000, 10_000, 9, DepreciationMethod::StraightLine).unwrap();

        let total: i64 = periods.iter().map(|p| p.depreciation_minor).sum();
        assert_eq!(total, 90_000);
        assert_eq!(periods.last().unwrap().book_value_minor, 10_000);
    }

    #[test]
    fn test_book_value_monotonic_and_never_below_residual() {
        for method in [
            DepreciationMethod::StraightLine,
            DepreciationMethod::DecliningBalance,
        ] {
            let periods = generate_schedule(987_654, 12_345, 36, method).unwrap();
            let mut prev_book = 987_654;
            for period in &periods {
                assert!(period.book_value_minor <= prev_book, "{:?}", method);
                assert!(period.book_value_minor >= 12_345, "{:?}", method);
                prev_book = period.book_value_minor;
            }
        }
    }

    #[test]
    fn test_declining_balance_front_loads_and_switches() {
        let periods =
            generate_schedule(120_000, 0, 12, DepreciationMethod::DecliningBalance).unwrap();

        // Double-declining: first charge is book * 2 / life = 20000
        assert_eq!(periods[0].depreciation_minor, 20_000);
        // Charges never increase once straight-line takes over, and the
        // schedule fully depreciates to zero book value
        assert_eq!(periods.last().unwrap().book_value_minor, 0);
        let total: i64 = periods.iter().map(|p| p.depreciation_minor).sum();
        assert_eq!(total, 120_000);
    }

    #[test]
    fn test_declining_balance_stops_at_residual() {
        let periods =
            generate_schedule(100_000, 40_000, 10, DepreciationMethod::DecliningBalance).unwrap();

        for period in &periods {
            assert!(period.book_value_minor >= 40_000);
        }
        assert_eq!(periods.last().unwrap().book_value_minor, 40_000);
    }

    #[test]
    fn test_next_period_ends_schedule() {
        // All periods already taken
        let next = next_period(
            120_000,
            0,
            12,
            DepreciationMethod::StraightLine,
            12,
            120_000,
        )
        .unwrap();
        assert!(next.is_none());

        // Fully depreciated declining-balance book value
        let next = next_period(
            120_000,
            0,
            12,
            DepreciationMethod::DecliningBalance,
            5,
            120_000,
        )
        .unwrap();
        assert!(next.is_none());
    }

    #[test]
    fn test_invalid_inputs_fail_fast() {
        assert!(generate_schedule(100_000, 0, 0, DepreciationMethod::StraightLine).is_err());
        assert!(generate_schedule(100_000, 200_000, 12, DepreciationMethod::StraightLine).is_err());
        assert!(generate_schedule(-1, 0, 12, DepreciationMethod::StraightLine).is_err());
        assert!(generate_schedule(100_000, 0, 12, DepreciationMethod::None).is_err());
    }
}
