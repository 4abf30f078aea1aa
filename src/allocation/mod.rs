//! Payment-to-invoice allocation
//!
//! A payment is walked across outstanding targets in the caller-supplied
//! order, greedily taking `min(remaining payment, outstanding)` from each.
//! The component never re-sorts: a caller wanting oldest-first or pro-rata
//! ordering pre-sorts or pre-weights before calling. Over-allocation is
//! impossible by construction; under- and over-payment are normal outcomes
//! surfaced through the summary fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fiscal::FiscalPeriodGuard;
use crate::traits::{EngineStorage, FiscalCalendar};
use crate::types::*;
use crate::utils::validation::validate_non_negative_minor;

/// An outstanding receivable or payable a payment may settle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutstandingTarget {
    pub target_id: String,
    pub outstanding_minor: i64,
}

/// Allocation of part of a payment to one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub target_id: String,
    pub allocated_minor: i64,
    pub remaining_outstanding_minor: i64,
}

/// Result of allocating one payment across a set of targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAllocationSummary {
    pub total_payment_minor: i64,
    pub total_allocated_minor: i64,
    pub unallocated_minor: i64,
    pub allocations: Vec<AllocationResult>,
}

/// Persisted allocation row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRow {
    pub payment_id: String,
    pub target_id: String,
    pub allocated_minor: i64,
    pub posting_date: NaiveDate,
}

/// Distribute a payment across outstanding targets, greedily and in order
///
/// Conservation invariant: `total_allocated + unallocated` always equals the
/// payment amount.
pub fn allocate_payment(
    payment_amount_minor: i64,
    targets: &[OutstandingTarget],
) -> EngineResult<PaymentAllocationSummary> {
    validate_non_negative_minor(payment_amount_minor, "payment amount")?;
    for target in targets {
        validate_non_negative_minor(target.outstanding_minor, "outstanding amount")?;
    }

    let mut remaining = payment_amount_minor;
    let mut allocations = Vec::with_capacity(targets.len());
    for target in targets {
        let allocated = remaining.min(target.outstanding_minor);
        remaining -= allocated;
        allocations.push(AllocationResult {
            target_id: target.target_id.clone(),
            allocated_minor: allocated,
            remaining_outstanding_minor: target.outstanding_minor - allocated,
        });
        if remaining == 0 {
            break;
        }
    }

    Ok(PaymentAllocationSummary {
        total_payment_minor: payment_amount_minor,
        total_allocated_minor: payment_amount_minor - remaining,
        unallocated_minor: remaining,
        allocations,
    })
}

/// Recorder for persisting and querying payment allocations
pub struct PaymentAllocator<S: EngineStorage, C: FiscalCalendar> {
    storage: S,
    guard: FiscalPeriodGuard<C>,
}

impl<S: EngineStorage, C: FiscalCalendar> PaymentAllocator<S, C> {
    /// Create an allocator over the given storage and fiscal calendar
    pub fn new(storage: S, calendar: C) -> Self {
        Self {
            storage,
            guard: FiscalPeriodGuard::new(calendar),
        }
    }

    /// Persist the non-zero allocations of a payment
    ///
    /// Consults the fiscal guard before writing; a closed period is a hard
    /// error and nothing is inserted.
    pub async fn record_payment_allocation(
        &mut self,
        org_id: &str,
        payment_id: &str,
        posting_date: NaiveDate,
        summary: &PaymentAllocationSummary,
    ) -> EngineResult<Vec<AllocationRow>> {
        self.guard.assert_open(org_id, posting_date).await?;

        let mut rows = Vec::new();
        for allocation in &summary.allocations {
            if allocation.allocated_minor == 0 {
                continue;
            }
            let row = AllocationRow {
                payment_id: payment_id.to_string(),
                target_id: allocation.target_id.clone(),
                allocated_minor: allocation.allocated_minor,
                posting_date,
            };
            rows.push(self.storage.insert_allocation(&row).await?);
        }
        debug!(
            payment_id,
            rows = rows.len(),
            total_allocated_minor = summary.total_allocated_minor,
            "payment allocation recorded"
        );
        Ok(rows)
    }

    /// Summarize the allocations previously recorded for a payment
    pub async fn allocations_for_payment(
        &self,
        payment_id: &str,
        payment_amount_minor: i64,
    ) -> EngineResult<PaymentAllocationSummary> {
        let rows = self.storage.allocations_for_payment(payment_id).await?;
        let allocations: Vec<AllocationResult> = rows
            .into_iter()
            .map(|row| AllocationResult {
                target_id: row.target_id,
                allocated_minor: row.allocated_minor,
                remaining_outstanding_minor: 0,
            })
            .collect();
        let total_allocated: i64 = allocations.iter().map(|a| a.allocated_minor).sum();
        Ok(PaymentAllocationSummary {
            total_payment_minor: payment_amount_minor,
            total_allocated_minor: total_allocated,
            unallocated_minor: payment_amount_minor - total_allocated,
            allocations,
        })
    }
}
