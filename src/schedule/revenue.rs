//! Straight-line revenue recognition schedules
//!
//! A deferred-revenue balance is amortized evenly across a period count with
//! the same integer discipline as depreciation: floor division per period,
//! final period absorbs the remainder, advance exactly one period per call.
//! There is no declining-balance variant for revenue.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::fiscal::FiscalPeriodGuard;
use crate::traits::{EngineStorage, FiscalCalendar};
use crate::types::*;
use crate::utils::validation::validate_entity_id;

/// One line of a recognition schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionLineResult {
    /// Zero-based period ordinal
    pub period_index: u32,
    pub recognized_minor: i64,
    pub accum_recognized_minor: i64,
    pub remaining_minor: i64,
}

/// Full recognition plan for a schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionScheduleResult {
    pub schedule_id: String,
    pub total_minor: i64,
    pub total_periods: u32,
    pub lines: Vec<RecognitionLineResult>,
}

/// Persisted recognition schedule header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueScheduleRow {
    pub id: String,
    pub org_id: String,
    /// Document the deferred balance came from (invoice, contract)
    pub reference: Option<String>,
    pub total_minor: i64,
    pub total_periods: u32,
    pub created_at: NaiveDateTime,
}

/// Persisted recognition line, at most one per (schedule, period)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionLineRow {
    pub schedule_id: String,
    pub fiscal_period_id: String,
    pub period_index: u32,
    pub recognized_minor: i64,
    pub accum_recognized_minor: i64,
    pub posting_date: NaiveDate,
}

/// Parameters for creating a recognition schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRevenueScheduleParams {
    pub org_id: String,
    pub reference: Option<String>,
    pub total_minor: i64,
    pub total_periods: u32,
}

fn validate_inputs(total_minor: i64, total_periods: u32) -> EngineResult<()> {
    if total_periods == 0 {
        return Err(EngineError::Validation(
            "Recognition schedule must span at least one period".to_string(),
        ));
    }
    if total_minor < 0 {
        return Err(EngineError::Validation(
            "Recognizable amount must be non-negative".to_string(),
        ));
    }
    Ok(())
}

/// Compute the next recognition line, if the schedule has not ended
pub fn next_recognition_line(
    total_minor: i64,
    total_periods: u32,
    period_index: u32,
    prior_accum_minor: i64,
) -> EngineResult<Option<RecognitionLineResult>> {
    validate_inputs(total_minor, total_periods)?;
    if period_index >= total_periods {
        return Ok(None);
    }

    let amount = if period_index == total_periods - 1 {
        total_minor - prior_accum_minor
    } else {
        total_minor / total_periods as i64
    };
    if amount <= 0 {
        return Ok(None);
    }

    let accum = prior_accum_minor + amount;
    Ok(Some(RecognitionLineResult {
        period_index,
        recognized_minor: amount,
        accum_recognized_minor: accum,
        remaining_minor: total_minor - accum,
    }))
}

/// Generate the full straight-line amortization plan
///
/// Pure, no I/O. Sums exactly to `total_minor`.
pub fn generate_straight_line_schedule(
    total_minor: i64,
    total_periods: u32,
) -> EngineResult<Vec<RecognitionLineResult>> {
    let mut lines = Vec::new();
    let mut accum = 0i64;
    for period_index in 0..total_periods {
        match next_recognition_line(total_minor, total_periods, period_index, accum)? {
            Some(line) => {
                accum = line.accum_recognized_minor;
                lines.push(line);
            }
            None => break,
        }
    }
    Ok(lines)
}

/// Stateful revenue recognition scheduler
pub struct RevenueRecognizer<S: EngineStorage, C: FiscalCalendar> {
    storage: S,
    guard: FiscalPeriodGuard<C>,
}

impl<S: EngineStorage, C: FiscalCalendar> RevenueRecognizer<S, C> {
    /// Create a recognizer over the given storage and fiscal calendar
    pub fn new(storage: S, calendar: C) -> Self {
        Self {
            storage,
            guard: FiscalPeriodGuard::new(calendar),
        }
    }

    /// Validate and persist a new recognition schedule header
    pub async fn create_schedule(
        &mut self,
        params: CreateRevenueScheduleParams,
    ) -> EngineResult<RevenueScheduleRow> {
        validate_entity_id(&params.org_id, "org id")?;
        validate_inputs(params.total_minor, params.total_periods)?;
        let row = RevenueScheduleRow {
            id: Uuid::new_v4().to_string(),
            org_id: params.org_id,
            reference: params.reference,
            total_minor: params.total_minor,
            total_periods: params.total_periods,
            created_at: chrono::Utc::now().naive_utc(),
        };
        let inserted = self.storage.insert_revenue_schedule(&row).await?;
        debug!(
            schedule_id = %inserted.id,
            total_minor = inserted.total_minor,
            total_periods = inserted.total_periods,
            "revenue schedule created"
        );
        Ok(inserted)
    }

    /// Full amortization plan for a stored schedule
    pub async fn preview_schedule(
        &self,
        schedule_id: &str,
    ) -> EngineResult<RecognitionScheduleResult> {
        let schedule = self.get_schedule_required(schedule_id).await?;
        let lines =
            generate_straight_line_schedule(schedule.total_minor, schedule.total_periods)?;
        Ok(RecognitionScheduleResult {
            schedule_id: schedule.id,
            total_minor: schedule.total_minor,
            total_periods: schedule.total_periods,
            lines,
        })
    }

    /// Recognize exactly the next period of a schedule
    ///
    /// Same discipline as the depreciation advance: load prior accumulated
    /// state, compute the next line, insert once. `Ok(None)` when the
    /// schedule has ended or the period was already recognized.
    pub async fn recognize(
        &mut self,
        schedule_id: &str,
        fiscal_period_id: &str,
        posting_date: NaiveDate,
    ) -> EngineResult<Option<RecognitionLineResult>> {
        let schedule = self.get_schedule_required(schedule_id).await?;

        self.guard
            .assert_open(&schedule.org_id, posting_date)
            .await?;

        let period_index = self.storage.recognition_line_count(schedule_id).await?;
        let prior_accum = self.storage.max_recognized_amount(schedule_id).await?;

        let next = match next_recognition_line(
            schedule.total_minor,
            schedule.total_periods,
            period_index,
            prior_accum,
        )? {
            Some(next) => next,
            None => return Ok(None),
        };

        let row = RecognitionLineRow {
            schedule_id: schedule.id.clone(),
            fiscal_period_id: fiscal_period_id.to_string(),
            period_index: next.period_index,
            recognized_minor: next.recognized_minor,
            accum_recognized_minor: next.accum_recognized_minor,
            posting_date,
        };

        match self.storage.insert_recognition_line(&row).await? {
            InsertOutcome::Inserted(_) => {
                debug!(
                    schedule_id = %schedule.id,
                    period_index = next.period_index,
                    recognized_minor = next.recognized_minor,
                    "revenue recognized"
                );
                Ok(Some(next))
            }
            InsertOutcome::Conflict => {
                warn!(
                    schedule_id = %schedule.id,
                    fiscal_period_id,
                    "recognition line already recorded, skipping"
                );
                Ok(None)
            }
        }
    }

    async fn get_schedule_required(&self, schedule_id: &str) -> EngineResult<RevenueScheduleRow> {
        self.storage
            .get_revenue_schedule(schedule_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("revenue schedule {}", schedule_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_amortization() {
        let lines = generate_straight_line_schedule(120_000, 12).unwrap();
        assert_eq!(lines.len(), 12);
        for line in &lines {
            assert_eq!(line.recognized_minor, 10_000);
        }
        assert_eq!(lines.last().unwrap().remaining_minor, 0);
    }

    #[test]
    fn test_last_line_absorbs_remainder() {
        let lines = generate_straight_line_schedule(100_000, 7).unwrap();

        let total: i64 = lines.iter().map(|l| l.recognized_minor).sum();
        assert_eq!(total, 100_000);
        for line in &lines[..6] {
            assert_eq!(line.recognized_minor, 14_285);
        }
        assert_eq!(lines[6].recognized_minor, 100_000 - 6 * 14_285);
        assert_eq!(lines[6].remaining_minor, 0);
    }

    #[test]
    fn test_remaining_decreases_monotonically() {
        let lines = generate_straight_line_schedule(55_501, 9).unwrap();
        let mut prev_remaining = 55_501;
        for line in &lines {
            assert!(line.remaining_minor < prev_remaining);
            assert!(line.remaining_minor >= 0);
            prev_remaining = line.remaining_minor;
        }
    }

    #[test]
    fn test_invalid_inputs_fail_fast() {
        assert!(generate_straight_line_schedule(100_000, 0).is_err());
        assert!(generate_straight_line_schedule(-5, 12).is_err());
    }

    #[test]
    fn test_schedule_past_end_yields_nothing() {
        let next = next_recognition_line(120_000, 12, 12, 120_000).unwrap();
        assert!(next.is_none());
    }
}
