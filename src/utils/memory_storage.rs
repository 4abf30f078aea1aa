//! In-memory storage implementation for testing
//!
//! Enforces the same uniqueness constraints a real storage layer would, so
//! the conflict paths of the stateful operations are testable.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::allocation::AllocationRow;
use crate::fx::FxRateRow;
use crate::reconciliation::ReconciliationMatchRow;
use crate::schedule::{DepreciationPeriodRow, RecognitionLineRow, RevenueScheduleRow};
use crate::traits::*;
use crate::types::*;

/// A fiscal period definition held by the in-memory calendar
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryFiscalPeriod {
    pub org_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: FiscalPeriodStatus,
}

/// In-memory storage implementation for testing and development
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    fx_rates: Arc<RwLock<Vec<FxRateRow>>>,
    assets: Arc<RwLock<HashMap<String, Asset>>>,
    depreciation_rows: Arc<RwLock<Vec<DepreciationPeriodRow>>>,
    revenue_schedules: Arc<RwLock<HashMap<String, RevenueScheduleRow>>>,
    recognition_rows: Arc<RwLock<Vec<RecognitionLineRow>>>,
    allocations: Arc<RwLock<Vec<AllocationRow>>>,
    matches: Arc<RwLock<Vec<ReconciliationMatchRow>>>,
    fiscal_periods: Arc<RwLock<Vec<MemoryFiscalPeriod>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an asset
    pub fn add_asset(&self, asset: Asset) {
        self.assets
            .write()
            .unwrap()
            .insert(asset.id.clone(), asset);
    }

    /// Seed an FX rate
    pub fn add_fx_rate(&self, row: FxRateRow) {
        self.fx_rates.write().unwrap().push(row);
    }

    /// Define a fiscal period and its posting status
    pub fn set_fiscal_period(
        &self,
        org_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        status: FiscalPeriodStatus,
    ) {
        self.fiscal_periods.write().unwrap().push(MemoryFiscalPeriod {
            org_id: org_id.to_string(),
            start_date,
            end_date,
            status,
        });
    }

    /// Recorded depreciation rows for an asset, in insertion order
    pub fn depreciation_rows(&self, asset_id: &str) -> Vec<DepreciationPeriodRow> {
        self.depreciation_rows
            .read()
            .unwrap()
            .iter()
            .filter(|row| row.asset_id == asset_id)
            .cloned()
            .collect()
    }

    /// Recorded recognition rows for a schedule, in insertion order
    pub fn recognition_rows(&self, schedule_id: &str) -> Vec<RecognitionLineRow> {
        self.recognition_rows
            .read()
            .unwrap()
            .iter()
            .filter(|row| row.schedule_id == schedule_id)
            .cloned()
            .collect()
    }

    /// All recorded reconciliation matches
    pub fn reconciliation_matches(&self) -> Vec<ReconciliationMatchRow> {
        self.matches.read().unwrap().clone()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.fx_rates.write().unwrap().clear();
        self.assets.write().unwrap().clear();
        self.depreciation_rows.write().unwrap().clear();
        self.revenue_schedules.write().unwrap().clear();
        self.recognition_rows.write().unwrap().clear();
        self.allocations.write().unwrap().clear();
        self.matches.write().unwrap().clear();
        self.fiscal_periods.write().unwrap().clear();
    }
}

#[async_trait]
impl EngineStorage for MemoryStorage {
    async fn list_fx_rates(
        &self,
        org_id: &str,
        from_currency: &str,
        to_currency: &str,
    ) -> EngineResult<Vec<FxRateRow>> {
        Ok(self
            .fx_rates
            .read()
            .unwrap()
            .iter()
            .filter(|row| {
                row.org_id == org_id
                    && row.from_currency == from_currency
                    && row.to_currency == to_currency
            })
            .cloned()
            .collect())
    }

    async fn get_asset(&self, asset_id: &str) -> EngineResult<Option<Asset>> {
        Ok(self.assets.read().unwrap().get(asset_id).cloned())
    }

    async fn depreciation_period_count(&self, asset_id: &str) -> EngineResult<u32> {
        Ok(self
            .depreciation_rows
            .read()
            .unwrap()
            .iter()
            .filter(|row| row.asset_id == asset_id)
            .count() as u32)
    }

    async fn max_accumulated_depreciation(&self, asset_id: &str) -> EngineResult<i64> {
        Ok(self
            .depreciation_rows
            .read()
            .unwrap()
            .iter()
            .filter(|row| row.asset_id == asset_id)
            .map(|row| row.accum_depreciation_minor)
            .max()
            .unwrap_or(0))
    }

    async fn insert_depreciation_period(
        &mut self,
        row: &DepreciationPeriodRow,
    ) -> EngineResult<InsertOutcome<DepreciationPeriodRow>> {
        let mut rows = self.depreciation_rows.write().unwrap();
        // Uniqueness on (asset, fiscal period) and on (asset, period index)
        let duplicate = rows.iter().any(|existing| {
            existing.asset_id == row.asset_id
                && (existing.fiscal_period_id == row.fiscal_period_id
                    || existing.period_index == row.period_index)
        });
        if duplicate {
            return Ok(InsertOutcome::Conflict);
        }
        rows.push(row.clone());
        Ok(InsertOutcome::Inserted(row.clone()))
    }

    async fn insert_revenue_schedule(
        &mut self,
        row: &RevenueScheduleRow,
    ) -> EngineResult<RevenueScheduleRow> {
        self.revenue_schedules
            .write()
            .unwrap()
            .insert(row.id.clone(), row.clone());
        Ok(row.clone())
    }

    async fn get_revenue_schedule(
        &self,
        schedule_id: &str,
    ) -> EngineResult<Option<RevenueScheduleRow>> {
        Ok(self
            .revenue_schedules
            .read()
            .unwrap()
            .get(schedule_id)
            .cloned())
    }

    async fn recognition_line_count(&self, schedule_id: &str) -> EngineResult<u32> {
        Ok(self
            .recognition_rows
            .read()
            .unwrap()
            .iter()
            .filter(|row| row.schedule_id == schedule_id)
            .count() as u32)
    }

    async fn max_recognized_amount(&self, schedule_id: &str) -> EngineResult<i64> {
        Ok(self
            .recognition_rows
            .read()
            .unwrap()
            .iter()
            .filter(|row| row.schedule_id == schedule_id)
            .map(|row| row.accum_recognized_minor)
            .max()
            .unwrap_or(0))
    }

    async fn insert_recognition_line(
        &mut self,
        row: &RecognitionLineRow,
    ) -> EngineResult<InsertOutcome<RecognitionLineRow>> {
        let mut rows = self.recognition_rows.write().unwrap();
        let duplicate = rows.iter().any(|existing| {
            existing.schedule_id == row.schedule_id
                && (existing.fiscal_period_id == row.fiscal_period_id
                    || existing.period_index == row.period_index)
        });
        if duplicate {
            return Ok(InsertOutcome::Conflict);
        }
        rows.push(row.clone());
        Ok(InsertOutcome::Inserted(row.clone()))
    }

    async fn insert_allocation(&mut self, row: &AllocationRow) -> EngineResult<AllocationRow> {
        self.allocations.write().unwrap().push(row.clone());
        Ok(row.clone())
    }

    async fn allocations_for_payment(&self, payment_id: &str) -> EngineResult<Vec<AllocationRow>> {
        Ok(self
            .allocations
            .read()
            .unwrap()
            .iter()
            .filter(|row| row.payment_id == payment_id)
            .cloned()
            .collect())
    }

    async fn insert_reconciliation_match(
        &mut self,
        row: &ReconciliationMatchRow,
    ) -> EngineResult<String> {
        let mut matches = self.matches.write().unwrap();
        // At most one confirmed match per statement line
        if matches
            .iter()
            .any(|existing| existing.statement_line_id == row.statement_line_id)
        {
            return Err(EngineError::Storage(format!(
                "Statement line {} already has a confirmed match",
                row.statement_line_id
            )));
        }
        matches.push(row.clone());
        Ok(row.id.clone())
    }
}

#[async_trait]
impl FiscalCalendar for MemoryStorage {
    async fn period_status(
        &self,
        org_id: &str,
        date: NaiveDate,
    ) -> EngineResult<Option<FiscalPeriodStatus>> {
        Ok(self
            .fiscal_periods
            .read()
            .unwrap()
            .iter()
            .find(|period| {
                period.org_id == org_id && period.start_date <= date && date <= period.end_date
            })
            .map(|period| period.status))
    }
}
