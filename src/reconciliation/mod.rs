//! Bank statement reconciliation matching
//!
//! Scores ledger-side candidates against bank statement lines and proposes
//! matches. Matching is deliberately greedy, not a global assignment
//! optimum: each line independently keeps its best candidate, and two lines
//! may claim the same one. A false auto-match is worse than an unmatched
//! line left for manual review, so only `Exact` and `High` confidence
//! results are auto-matched.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::traits::EngineStorage;
use crate::types::*;

/// Points for an exact amount match
const AMOUNT_EXACT_POINTS: u32 = 50;
/// Points for an amount within 1% of the statement line
const AMOUNT_CLOSE_POINTS: u32 = 20;
/// Points for mutual reference containment
const REFERENCE_POINTS: u32 = 30;
/// Points for dates within 3 days
const DATE_NEAR_POINTS: u32 = 20;
/// Points for dates within 7 days
const DATE_FAR_POINTS: u32 = 10;

/// One row of an externally-ingested bank statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLineForMatch {
    pub line_id: String,
    pub amount_minor: i64,
    pub transaction_date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
}

/// A ledger-side entry offered as a match candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEntry {
    pub entity_type: String,
    pub entity_id: String,
    pub amount_minor: i64,
    pub date: NaiveDate,
    pub reference: Option<String>,
}

/// Discrete confidence bucket derived from a numeric score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    Low,
    Medium,
    High,
    Exact,
}

impl MatchConfidence {
    /// Bucket a summed score
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 90 => MatchConfidence::Exact,
            s if s >= 70 => MatchConfidence::High,
            s if s >= 50 => MatchConfidence::Medium,
            _ => MatchConfidence::Low,
        }
    }

    /// Whether a match at this confidence may be confirmed without review
    pub fn auto_matchable(&self) -> bool {
        matches!(self, MatchConfidence::Exact | MatchConfidence::High)
    }
}

/// A candidate scored against one statement line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub entity_type: String,
    pub entity_id: String,
    pub amount_minor: i64,
    pub date: NaiveDate,
    pub reference: Option<String>,
    pub confidence: MatchConfidence,
    pub score: u32,
}

/// Outcome of auto-matching one statement line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoMatchResult {
    pub line_id: String,
    pub matched: bool,
    pub candidate: Option<MatchCandidate>,
    /// Human-readable explanation for the adjudicating user
    pub reason: String,
}

/// How a confirmed match was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Auto,
    Manual,
}

/// Parameters for recording a confirmed match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMatchParams {
    pub statement_line_id: String,
    pub ledger_entity_type: String,
    pub ledger_entity_id: String,
    pub match_method: MatchMethod,
    pub confidence: MatchConfidence,
    pub reconciled_by: Option<String>,
}

/// Persisted confirmed match row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationMatchRow {
    pub id: String,
    pub statement_line_id: String,
    pub ledger_entity_type: String,
    pub ledger_entity_id: String,
    pub match_method: MatchMethod,
    pub confidence: MatchConfidence,
    pub reconciled_by: Option<String>,
    pub status: String,
    pub recorded_at: NaiveDateTime,
}

/// Score one candidate against one statement line
///
/// Amount dominates: an exact match scores 50, within 1% of the line amount
/// scores 20, and anything further off rejects the pair outright without
/// scoring reference or date. Reference containment (either direction,
/// case-insensitive) adds 30; date proximity adds 20 within 3 days or 10
/// within 7.
pub fn score_match(line: &StatementLineForMatch, candidate: &CandidateEntry) -> MatchCandidate {
    let mut score = 0u32;

    let diff = (line.amount_minor - candidate.amount_minor).abs();
    if diff == 0 {
        score += AMOUNT_EXACT_POINTS;
    } else if (diff as i128) * 100 <= (line.amount_minor.abs() as i128) {
        score += AMOUNT_CLOSE_POINTS;
    } else {
        return rejected(candidate);
    }

    if let (Some(line_ref), Some(cand_ref)) = (&line.reference, &candidate.reference) {
        let a = line_ref.to_lowercase();
        let b = cand_ref.to_lowercase();
        if !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a)) {
            score += REFERENCE_POINTS;
        }
    }

    let day_gap = (line.transaction_date - candidate.date).num_days().abs();
    if day_gap <= 3 {
        score += DATE_NEAR_POINTS;
    } else if day_gap <= 7 {
        score += DATE_FAR_POINTS;
    }

    MatchCandidate {
        entity_type: candidate.entity_type.clone(),
        entity_id: candidate.entity_id.clone(),
        amount_minor: candidate.amount_minor,
        date: candidate.date,
        reference: candidate.reference.clone(),
        confidence: MatchConfidence::from_score(score),
        score,
    }
}

fn rejected(candidate: &CandidateEntry) -> MatchCandidate {
    MatchCandidate {
        entity_type: candidate.entity_type.clone(),
        entity_id: candidate.entity_id.clone(),
        amount_minor: candidate.amount_minor,
        date: candidate.date,
        reference: candidate.reference.clone(),
        confidence: MatchConfidence::Low,
        score: 0,
    }
}

/// Propose matches for a batch of statement lines
///
/// Every candidate is scored against every line; each line keeps its best.
/// Lines whose best confidence is below `High` come back with
/// `matched = false` and a reason for the reviewer.
pub fn auto_match_statement_lines(
    lines: &[StatementLineForMatch],
    candidates: &[CandidateEntry],
) -> Vec<AutoMatchResult> {
    lines
        .iter()
        .map(|line| {
            let best = candidates
                .iter()
                .map(|candidate| score_match(line, candidate))
                .max_by_key(|m| m.score);

            match best {
                None => AutoMatchResult {
                    line_id: line.line_id.clone(),
                    matched: false,
                    candidate: None,
                    reason: "No candidates available".to_string(),
                },
                Some(best) if best.confidence.auto_matchable() => AutoMatchResult {
                    reason: format!(
                        "Matched {} {} with score {} ({:?})",
                        best.entity_type, best.entity_id, best.score, best.confidence
                    ),
                    line_id: line.line_id.clone(),
                    matched: true,
                    candidate: Some(best),
                },
                Some(best) => AutoMatchResult {
                    reason: format!(
                        "Best candidate {} {} scored {} ({:?}); manual review required",
                        best.entity_type, best.entity_id, best.score, best.confidence
                    ),
                    line_id: line.line_id.clone(),
                    matched: false,
                    candidate: Some(best),
                },
            }
        })
        .collect()
}

/// Persist a confirmed reconciliation match, returning its id
///
/// Does not re-verify the candidate or check for an existing match on the
/// line; at-most-one-confirmed-match-per-line is enforced by a storage
/// constraint.
pub async fn record_reconciliation_match<S: EngineStorage>(
    storage: &mut S,
    params: RecordMatchParams,
) -> EngineResult<String> {
    let row = ReconciliationMatchRow {
        id: Uuid::new_v4().to_string(),
        statement_line_id: params.statement_line_id,
        ledger_entity_type: params.ledger_entity_type,
        ledger_entity_id: params.ledger_entity_id,
        match_method: params.match_method,
        confidence: params.confidence,
        reconciled_by: params.reconciled_by,
        status: "confirmed".to_string(),
        recorded_at: chrono::Utc::now().naive_utc(),
    };
    let id = storage.insert_reconciliation_match(&row).await?;
    debug!(
        match_id = %id,
        statement_line_id = %row.statement_line_id,
        method = ?row.match_method,
        "reconciliation match confirmed"
    );
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(amount: i64, date: (i32, u32, u32), reference: Option<&str>) -> StatementLineForMatch {
        StatementLineForMatch {
            line_id: "line1".to_string(),
            amount_minor: amount,
            transaction_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            description: "bank line".to_string(),
            reference: reference.map(str::to_string),
        }
    }

    fn candidate(amount: i64, date: (i32, u32, u32), reference: Option<&str>) -> CandidateEntry {
        CandidateEntry {
            entity_type: "payment".to_string(),
            entity_id: "PAY-001".to_string(),
            amount_minor: amount,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            reference: reference.map(str::to_string),
        }
    }

    #[test]
    fn test_full_score_exact_match() {
        // Exact amount + containing reference + next-day date = 100
        let scored = score_match(
            &line(50_000, (2025, 3, 10), Some("INV-9001")),
            &candidate(50_000, (2025, 3, 11), Some("inv-9001-partial")),
        );

        assert_eq!(scored.score, 100);
        assert_eq!(scored.confidence, MatchConfidence::Exact);
    }

    #[test]
    fn test_amount_within_one_percent() {
        // 50400 differs from 50000 by 0.8%: 20 amount + 20 date = 40
        let scored = score_match(
            &line(50_000, (2025, 3, 10), None),
            &candidate(50_400, (2025, 3, 10), None),
        );
        assert_eq!(scored.score, 40);
        assert_eq!(scored.confidence, MatchConfidence::Low);
    }

    #[test]
    fn test_amount_outside_tolerance_rejects_outright() {
        // 1.01% off: rejected before reference or date scoring
        let scored = score_match(
            &line(100_000, (2025, 3, 10), Some("REF-1")),
            &candidate(101_010, (2025, 3, 10), Some("REF-1")),
        );
        assert_eq!(scored.score, 0);
        assert_eq!(scored.confidence, MatchConfidence::Low);
    }

    #[test]
    fn test_amount_at_exactly_one_percent_is_within() {
        let scored = score_match(
            &line(100_000, (2025, 3, 10), None),
            &candidate(101_000, (2025, 3, 10), None),
        );
        assert_eq!(scored.score, AMOUNT_CLOSE_POINTS + DATE_NEAR_POINTS);
    }

    #[test]
    fn test_reference_containment_is_case_insensitive() {
        let scored = score_match(
            &line(50_000, (2025, 3, 10), Some("INV-9001")),
            &candidate(50_000, (2025, 4, 30), Some("payment for inv-9001")),
        );
        // 50 amount + 30 reference, date too far for points
        assert_eq!(scored.score, 80);
        assert_eq!(scored.confidence, MatchConfidence::High);
    }

    #[test]
    fn test_date_bands() {
        // 4 days away: far band
        let scored = score_match(
            &line(50_000, (2025, 3, 10), None),
            &candidate(50_000, (2025, 3, 14), None),
        );
        assert_eq!(scored.score, AMOUNT_EXACT_POINTS + DATE_FAR_POINTS);

        // 8 days away: no date points
        let scored = score_match(
            &line(50_000, (2025, 3, 10), None),
            &candidate(50_000, (2025, 3, 18), None),
        );
        assert_eq!(scored.score, AMOUNT_EXACT_POINTS);
    }

    #[test]
    fn test_confidence_buckets() {
        assert_eq!(MatchConfidence::from_score(100), MatchConfidence::Exact);
        assert_eq!(MatchConfidence::from_score(90), MatchConfidence::Exact);
        assert_eq!(MatchConfidence::from_score(89), MatchConfidence::High);
        assert_eq!(MatchConfidence::from_score(70), MatchConfidence::High);
        assert_eq!(MatchConfidence::from_score(69), MatchConfidence::Medium);
        assert_eq!(MatchConfidence::from_score(50), MatchConfidence::Medium);
        assert_eq!(MatchConfidence::from_score(49), MatchConfidence::Low);
        assert_eq!(MatchConfidence::from_score(0), MatchConfidence::Low);
    }

    #[test]
    fn test_auto_match_keeps_best_candidate() {
        let lines = vec![line(50_000, (2025, 3, 10), Some("INV-9001"))];
        let candidates = vec![
            candidate(50_000, (2025, 3, 20), None),
            candidate(50_000, (2025, 3, 11), Some("inv-9001-partial")),
        ];

        let results = auto_match_statement_lines(&lines, &candidates);
        assert_eq!(results.len(), 1);
        assert!(results[0].matched);
        assert_eq!(results[0].candidate.as_ref().unwrap().score, 100);
    }

    #[test]
    fn test_medium_confidence_needs_manual_review() {
        // Exact amount only, date too far and no references: score 50
        let lines = vec![line(50_000, (2025, 3, 10), None)];
        let candidates = vec![candidate(50_000, (2025, 4, 30), None)];

        let results = auto_match_statement_lines(&lines, &candidates);
        assert!(!results[0].matched);
        assert!(results[0].candidate.is_some());
        assert!(results[0].reason.contains("manual review"));
    }

    #[test]
    fn test_no_candidates_is_not_an_error() {
        let lines = vec![line(50_000, (2025, 3, 10), None)];
        let results = auto_match_statement_lines(&lines, &[]);
        assert!(!results[0].matched);
        assert!(results[0].candidate.is_none());
    }

    #[test]
    fn test_greedy_matching_may_share_a_candidate() {
        // Two identical lines both claim the same best candidate; the
        // matcher does not attempt bipartite optimality
        let mut second = line(50_000, (2025, 3, 10), Some("INV-9001"));
        second.line_id = "line2".to_string();
        let lines = vec![line(50_000, (2025, 3, 10), Some("INV-9001")), second];
        let candidates = vec![candidate(50_000, (2025, 3, 11), Some("inv-9001"))];

        let results = auto_match_statement_lines(&lines, &candidates);
        assert!(results[0].matched);
        assert!(results[1].matched);
        assert_eq!(
            results[0].candidate.as_ref().unwrap().entity_id,
            results[1].candidate.as_ref().unwrap().entity_id
        );
    }
}
