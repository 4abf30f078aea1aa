//! Traits for storage abstraction
//!
//! The engine never owns a database. Every stateful operation is handed a
//! transaction-scoped handle implementing these traits; the caller owns the
//! transaction and its isolation level. The surface is deliberately narrow:
//! point lookups, filtered aggregate reads (count/max), and single-row
//! inserts that report uniqueness conflicts as a typed outcome.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::allocation::AllocationRow;
use crate::fx::FxRateRow;
use crate::reconciliation::ReconciliationMatchRow;
use crate::schedule::{DepreciationPeriodRow, RecognitionLineRow, RevenueScheduleRow};
use crate::types::*;

/// Storage handle for the engine's stateful operations
///
/// Implementations are expected to enforce uniqueness constraints on
/// (asset, fiscal period) for depreciation rows and (schedule, period index)
/// for recognition rows, so that a concurrent advance turns into
/// [`InsertOutcome::Conflict`] rather than a double-posted period.
#[async_trait]
pub trait EngineStorage: Send + Sync {
    /// List all recorded FX rates for an exact currency pair within an org
    async fn list_fx_rates(
        &self,
        org_id: &str,
        from_currency: &str,
        to_currency: &str,
    ) -> EngineResult<Vec<FxRateRow>>;

    /// Load a fixed asset by id
    async fn get_asset(&self, asset_id: &str) -> EngineResult<Option<Asset>>;

    /// Count of depreciation periods already recorded for an asset
    async fn depreciation_period_count(&self, asset_id: &str) -> EngineResult<u32>;

    /// Maximum accumulated depreciation recorded for an asset, zero if none
    async fn max_accumulated_depreciation(&self, asset_id: &str) -> EngineResult<i64>;

    /// Insert one depreciation period row, or report a key conflict
    async fn insert_depreciation_period(
        &mut self,
        row: &DepreciationPeriodRow,
    ) -> EngineResult<InsertOutcome<DepreciationPeriodRow>>;

    /// Persist a revenue recognition schedule header
    async fn insert_revenue_schedule(
        &mut self,
        row: &RevenueScheduleRow,
    ) -> EngineResult<RevenueScheduleRow>;

    /// Load a revenue recognition schedule header by id
    async fn get_revenue_schedule(
        &self,
        schedule_id: &str,
    ) -> EngineResult<Option<RevenueScheduleRow>>;

    /// Count of recognition lines already recorded for a schedule
    async fn recognition_line_count(&self, schedule_id: &str) -> EngineResult<u32>;

    /// Maximum accumulated recognized amount for a schedule, zero if none
    async fn max_recognized_amount(&self, schedule_id: &str) -> EngineResult<i64>;

    /// Insert one recognition line, or report a key conflict
    async fn insert_recognition_line(
        &mut self,
        row: &RecognitionLineRow,
    ) -> EngineResult<InsertOutcome<RecognitionLineRow>>;

    /// Insert one payment allocation row
    async fn insert_allocation(&mut self, row: &AllocationRow) -> EngineResult<AllocationRow>;

    /// List allocation rows previously recorded for a payment
    async fn allocations_for_payment(&self, payment_id: &str) -> EngineResult<Vec<AllocationRow>>;

    /// Persist a confirmed reconciliation match, returning its id
    ///
    /// At-most-one-confirmed-match-per-statement-line is a storage constraint;
    /// this method does not re-verify the candidate still exists.
    async fn insert_reconciliation_match(
        &mut self,
        row: &ReconciliationMatchRow,
    ) -> EngineResult<String>;
}

/// Fiscal period oracle
///
/// Pure lookup against period metadata owned by the storage layer; every
/// persisting operation consults it before committing a new period entry.
#[async_trait]
pub trait FiscalCalendar: Send + Sync {
    /// Status of the accounting period covering `date`, if one is defined
    async fn period_status(
        &self,
        org_id: &str,
        date: NaiveDate,
    ) -> EngineResult<Option<FiscalPeriodStatus>>;
}
