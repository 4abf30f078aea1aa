//! Bank reconciliation matching examples

use chrono::NaiveDate;
use ledger_engine::{
    allocate_payment, auto_match_statement_lines, CandidateEntry, OutstandingTarget,
    StatementLineForMatch,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🏦 Ledger Engine - Bank Reconciliation Examples\n");

    // 1. Score statement lines against ledger candidates
    let lines = vec![
        StatementLineForMatch {
            line_id: "stmt-1".to_string(),
            amount_minor: 50_000,
            transaction_date: date(2025, 3, 10),
            description: "TRANSFER IN".to_string(),
            reference: Some("INV-9001".to_string()),
        },
        StatementLineForMatch {
            line_id: "stmt-2".to_string(),
            amount_minor: 123_400,
            transaction_date: date(2025, 3, 12),
            description: "CHEQUE 5521".to_string(),
            reference: None,
        },
        StatementLineForMatch {
            line_id: "stmt-3".to_string(),
            amount_minor: 9_999,
            transaction_date: date(2025, 3, 15),
            description: "UNKNOWN DEPOSIT".to_string(),
            reference: None,
        },
    ];
    let candidates = vec![
        CandidateEntry {
            entity_type: "payment".to_string(),
            entity_id: "PAY-77".to_string(),
            amount_minor: 50_000,
            date: date(2025, 3, 11),
            reference: Some("inv-9001-partial".to_string()),
        },
        CandidateEntry {
            entity_type: "journal_entry".to_string(),
            entity_id: "JE-310".to_string(),
            amount_minor: 123_400,
            date: date(2025, 3, 20),
            reference: None,
        },
    ];

    println!("🔍 Auto-match proposals:");
    for result in auto_match_statement_lines(&lines, &candidates) {
        let status = if result.matched { "MATCHED" } else { "REVIEW " };
        println!("  [{}] {}: {}", status, result.line_id, result.reason);
    }
    println!();

    // 2. Allocate a payment across outstanding invoices, oldest first
    println!("💸 Allocating a 25000 payment across outstanding invoices:");
    let summary = allocate_payment(
        25_000,
        &[
            OutstandingTarget {
                target_id: "INV-9001".to_string(),
                outstanding_minor: 10_000,
            },
            OutstandingTarget {
                target_id: "INV-9002".to_string(),
                outstanding_minor: 30_000,
            },
        ],
    )?;
    for allocation in &summary.allocations {
        println!(
            "  {}: allocated {:>6}, still outstanding {:>6}",
            allocation.target_id, allocation.allocated_minor, allocation.remaining_outstanding_minor
        );
    }
    println!(
        "  allocated {} of {}, unallocated {}",
        summary.total_allocated_minor, summary.total_payment_minor, summary.unallocated_minor
    );

    Ok(())
}
