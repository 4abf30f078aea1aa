//! Fiscal period guard
//!
//! Answers whether a date's accounting period accepts new postings. Every
//! component that persists a period entry consults this guard first, so no
//! schedule advance or allocation can silently post into a closed period.

use chrono::NaiveDate;

use crate::traits::FiscalCalendar;
use crate::types::*;

/// Guard over the posting state of accounting periods
pub struct FiscalPeriodGuard<C: FiscalCalendar> {
    calendar: C,
}

impl<C: FiscalCalendar> FiscalPeriodGuard<C> {
    /// Create a guard over the given fiscal calendar
    pub fn new(calendar: C) -> Self {
        Self { calendar }
    }

    /// Status of the period covering `date`
    ///
    /// A date with no period defined is treated as `Open`: period records are
    /// created as books are closed, so their absence means nothing has been
    /// closed yet.
    pub async fn check(&self, org_id: &str, date: NaiveDate) -> EngineResult<FiscalPeriodStatus> {
        Ok(self
            .calendar
            .period_status(org_id, date)
            .await?
            .unwrap_or(FiscalPeriodStatus::Open))
    }

    /// Fail with [`EngineError::PeriodClosed`] unless the period is open
    pub async fn assert_open(&self, org_id: &str, date: NaiveDate) -> EngineResult<()> {
        match self.check(org_id, date).await? {
            FiscalPeriodStatus::Open => Ok(()),
            status => Err(EngineError::PeriodClosed { date, status }),
        }
    }
}
