//! Tax rate resolution and per-line tax calculation
//!
//! Charge rows are evaluated in document order. A row may derive its amount
//! from the document net total, from a previously computed row, or from item
//! quantity; row references must point strictly backwards, and a forward or
//! missing reference is a hard error rather than a silent zero, since a zero
//! would understate the statement.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::round_half_up_minor;

/// Basis on which a charge row's amount is computed
///
/// A closed enum rather than a method string: adding or auditing a charge
/// type is a compiler-checked change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChargeBasis {
    /// The tax amount is given directly, not derived from a rate
    Actual { amount_minor: i64 },
    /// `round(net_total * rate)`, rate as a decimal fraction
    OnNetTotal { rate: BigDecimal },
    /// `round(tax_amount_of_referenced_row * rate)`
    OnPreviousRowAmount { row: usize, rate: BigDecimal },
    /// `round(running_total_through_referenced_row * rate)`
    OnPreviousRowTotal { row: usize, rate: BigDecimal },
    /// `round(quantity * rate)`, rate as a per-unit charge in minor units
    OnItemQuantity { per_unit: BigDecimal },
}

impl ChargeBasis {
    /// Discriminant without the payload, carried on results
    pub fn charge_type(&self) -> ChargeType {
        match self {
            ChargeBasis::Actual { .. } => ChargeType::Actual,
            ChargeBasis::OnNetTotal { .. } => ChargeType::OnNetTotal,
            ChargeBasis::OnPreviousRowAmount { .. } => ChargeType::OnPreviousRowAmount,
            ChargeBasis::OnPreviousRowTotal { .. } => ChargeType::OnPreviousRowTotal,
            ChargeBasis::OnItemQuantity { .. } => ChargeType::OnItemQuantity,
        }
    }

    /// The earlier row this basis depends on, if any
    pub fn row_reference(&self) -> Option<usize> {
        match self {
            ChargeBasis::OnPreviousRowAmount { row, .. }
            | ChargeBasis::OnPreviousRowTotal { row, .. } => Some(*row),
            _ => None,
        }
    }
}

/// Charge type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeType {
    Actual,
    OnNetTotal,
    OnPreviousRowAmount,
    OnPreviousRowTotal,
    OnItemQuantity,
}

/// One charge row of a tax template applied to a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxCharge {
    pub description: String,
    pub basis: ChargeBasis,
    /// Tax already contained in the amounts rather than added on top.
    /// An inclusive row is extracted from the total instead of growing it.
    /// Explicit on the row, never inferred.
    pub inclusive: bool,
}

/// Computed tax for one charge row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxLineResult {
    /// Base the row was computed against (the document net total)
    pub net_amount_minor: i64,
    pub tax_amount_minor: i64,
    pub charge_type: ChargeType,
    pub row_reference: Option<usize>,
    pub inclusive: bool,
    /// Document total through this row, inclusive rows excluded
    pub running_total_minor: i64,
}

/// Where a resolved tax rate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Rate set directly on the transaction line
    Line,
    /// Rate from the applied tax template
    Template,
    /// Default rate configured on the tax account
    AccountDefault,
}

/// A tax rate together with the place it was resolved from
///
/// Immutable once resolved for a given line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTaxRate {
    pub rate: BigDecimal,
    pub source: RateSource,
}

/// Candidate rates for a line, in resolution precedence order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxRateContext {
    pub line_rate: Option<BigDecimal>,
    pub template_rate: Option<BigDecimal>,
    pub account_default_rate: Option<BigDecimal>,
}

/// Tax calculation errors
#[derive(Debug, thiserror::Error)]
pub enum TaxError {
    #[error("No tax rate found for line")]
    NoRateFound,
    #[error("Row {row} references row {referenced}, which is missing or not yet computed")]
    InvalidRowReference { row: usize, referenced: usize },
    #[error("Calculation error: {0}")]
    Calculation(String),
}

/// Resolve the rate for a line: line rate, then template, then account default
pub fn resolve_tax_rate(context: &TaxRateContext) -> Result<ResolvedTaxRate, TaxError> {
    if let Some(rate) = &context.line_rate {
        return Ok(ResolvedTaxRate {
            rate: rate.clone(),
            source: RateSource::Line,
        });
    }
    if let Some(rate) = &context.template_rate {
        return Ok(ResolvedTaxRate {
            rate: rate.clone(),
            source: RateSource::Template,
        });
    }
    if let Some(rate) = &context.account_default_rate {
        return Ok(ResolvedTaxRate {
            rate: rate.clone(),
            source: RateSource::AccountDefault,
        });
    }
    Err(TaxError::NoRateFound)
}

/// Compute the tax for one charge row
///
/// `prior_rows` must hold the already-computed results for rows
/// `0..row_index` in document order. Rounding is applied once per line,
/// half away from zero.
pub fn calculate_line_tax(
    net_total_minor: i64,
    total_quantity: &BigDecimal,
    charge: &TaxCharge,
    row_index: usize,
    prior_rows: &[TaxLineResult],
) -> Result<TaxLineResult, TaxError> {
    let tax_amount_minor = match &charge.basis {
        ChargeBasis::Actual { amount_minor } => *amount_minor,
        ChargeBasis::OnNetTotal { rate } => {
            round_tax(&(BigDecimal::from(net_total_minor) * rate))?
        }
        ChargeBasis::OnPreviousRowAmount { row, rate } => {
            let prior = referenced_row(prior_rows, row_index, *row)?;
            round_tax(&(BigDecimal::from(prior.tax_amount_minor) * rate))?
        }
        ChargeBasis::OnPreviousRowTotal { row, rate } => {
            let prior = referenced_row(prior_rows, row_index, *row)?;
            round_tax(&(BigDecimal::from(prior.running_total_minor) * rate))?
        }
        ChargeBasis::OnItemQuantity { per_unit } => round_tax(&(total_quantity * per_unit))?,
    };

    let total_through_prior = prior_rows
        .last()
        .map(|r| r.running_total_minor)
        .unwrap_or(net_total_minor);
    let running_total_minor = if charge.inclusive {
        total_through_prior
    } else {
        total_through_prior + tax_amount_minor
    };

    Ok(TaxLineResult {
        net_amount_minor: net_total_minor,
        tax_amount_minor,
        charge_type: charge.basis.charge_type(),
        row_reference: charge.basis.row_reference(),
        inclusive: charge.inclusive,
        running_total_minor,
    })
}

/// Compute all charge rows of a document in order
pub fn calculate_document_taxes(
    net_total_minor: i64,
    total_quantity: &BigDecimal,
    charges: &[TaxCharge],
) -> Result<Vec<TaxLineResult>, TaxError> {
    let mut results: Vec<TaxLineResult> = Vec::with_capacity(charges.len());
    for (row_index, charge) in charges.iter().enumerate() {
        let result =
            calculate_line_tax(net_total_minor, total_quantity, charge, row_index, &results)?;
        results.push(result);
    }
    Ok(results)
}

/// Resolve a rate and compute tax for a single standalone line
pub fn calculate_tax_for_line(
    net_amount_minor: i64,
    context: &TaxRateContext,
    inclusive: bool,
) -> Result<TaxLineResult, TaxError> {
    let resolved = resolve_tax_rate(context)?;
    let charge = TaxCharge {
        description: String::new(),
        basis: ChargeBasis::OnNetTotal {
            rate: resolved.rate,
        },
        inclusive,
    };
    calculate_line_tax(net_amount_minor, &BigDecimal::from(0), &charge, 0, &[])
}

/// Document grand total after all charge rows
pub fn grand_total_minor(net_total_minor: i64, results: &[TaxLineResult]) -> i64 {
    results
        .last()
        .map(|r| r.running_total_minor)
        .unwrap_or(net_total_minor)
}

fn referenced_row<'a>(
    prior_rows: &'a [TaxLineResult],
    row_index: usize,
    referenced: usize,
) -> Result<&'a TaxLineResult, TaxError> {
    // In document order, exactly rows 0..row_index have been computed
    if referenced >= row_index || referenced >= prior_rows.len() {
        return Err(TaxError::InvalidRowReference {
            row: row_index,
            referenced,
        });
    }
    Ok(&prior_rows[referenced])
}

fn round_tax(value: &BigDecimal) -> Result<i64, TaxError> {
    round_half_up_minor(value).map_err(|e| TaxError::Calculation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn rate(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn exclusive(basis: ChargeBasis) -> TaxCharge {
        TaxCharge {
            description: "test charge".to_string(),
            basis,
            inclusive: false,
        }
    }

    #[test]
    fn test_on_net_total() {
        let results = calculate_document_taxes(
            100_000,
            &rate("0"),
            &[exclusive(ChargeBasis::OnNetTotal { rate: rate("0.18") })],
        )
        .unwrap();

        assert_eq!(results[0].tax_amount_minor, 18_000);
        assert_eq!(results[0].running_total_minor, 118_000);
        assert_eq!(results[0].charge_type, ChargeType::OnNetTotal);
    }

    #[test]
    fn test_rounding_is_half_up_once_per_line() {
        // 12345 * 0.1 = 1234.5 -> 1235
        let results = calculate_document_taxes(
            12_345,
            &rate("0"),
            &[exclusive(ChargeBasis::OnNetTotal { rate: rate("0.1") })],
        )
        .unwrap();
        assert_eq!(results[0].tax_amount_minor, 1_235);
    }

    #[test]
    fn test_actual_amount_taken_as_given() {
        let results = calculate_document_taxes(
            100_000,
            &rate("0"),
            &[exclusive(ChargeBasis::Actual { amount_minor: 777 })],
        )
        .unwrap();
        assert_eq!(results[0].tax_amount_minor, 777);
        assert_eq!(results[0].running_total_minor, 100_777);
    }

    #[test]
    fn test_on_previous_row_amount_uses_computed_tax() {
        let results = calculate_document_taxes(
            100_000,
            &rate("0"),
            &[
                exclusive(ChargeBasis::OnNetTotal { rate: rate("0.10") }),
                exclusive(ChargeBasis::OnPreviousRowAmount {
                    row: 0,
                    rate: rate("0.5"),
                }),
            ],
        )
        .unwrap();

        assert_eq!(results[0].tax_amount_minor, 10_000);
        // 50% surcharge on row 0's tax amount, not on the base
        assert_eq!(results[1].tax_amount_minor, 5_000);
        assert_eq!(results[1].row_reference, Some(0));
        assert_eq!(results[1].running_total_minor, 115_000);
    }

    #[test]
    fn test_on_previous_row_total_uses_running_total() {
        let results = calculate_document_taxes(
            100_000,
            &rate("0"),
            &[
                exclusive(ChargeBasis::OnNetTotal { rate: rate("0.10") }),
                exclusive(ChargeBasis::OnPreviousRowTotal {
                    row: 0,
                    rate: rate("0.02"),
                }),
            ],
        )
        .unwrap();

        // 2% of 110000, the total through row 0
        assert_eq!(results[1].tax_amount_minor, 2_200);
        assert_eq!(results[1].running_total_minor, 112_200);
    }

    #[test]
    fn test_on_item_quantity_per_unit_charge() {
        let results = calculate_document_taxes(
            100_000,
            &rate("3.5"),
            &[exclusive(ChargeBasis::OnItemQuantity {
                per_unit: rate("200"),
            })],
        )
        .unwrap();
        assert_eq!(results[0].tax_amount_minor, 700);
    }

    #[test]
    fn test_forward_reference_is_an_error() {
        let err = calculate_document_taxes(
            100_000,
            &rate("0"),
            &[
                exclusive(ChargeBasis::OnPreviousRowAmount {
                    row: 1,
                    rate: rate("0.5"),
                }),
                exclusive(ChargeBasis::OnNetTotal { rate: rate("0.10") }),
            ],
        )
        .unwrap_err();

        assert!(matches!(
            err,
            TaxError::InvalidRowReference {
                row: 0,
                referenced: 1
            }
        ));
    }

    #[test]
    fn test_missing_reference_is_an_error() {
        let err = calculate_document_taxes(
            100_000,
            &rate("0"),
            &[
                exclusive(ChargeBasis::OnNetTotal { rate: rate("0.10") }),
                exclusive(ChargeBasis::OnPreviousRowTotal {
                    row: 5,
                    rate: rate("0.02"),
                }),
            ],
        )
        .unwrap_err();

        assert!(matches!(err, TaxError::InvalidRowReference { .. }));
    }

    #[test]
    fn test_inclusive_row_does_not_grow_total() {
        let results = calculate_document_taxes(
            118_000,
            &rate("0"),
            &[TaxCharge {
                description: "VAT included".to_string(),
                basis: ChargeBasis::OnNetTotal { rate: rate("0.18") },
                inclusive: true,
            }],
        )
        .unwrap();

        assert_eq!(results[0].tax_amount_minor, 21_240);
        assert_eq!(results[0].running_total_minor, 118_000);
        assert_eq!(grand_total_minor(118_000, &results), 118_000);
    }

    #[test]
    fn test_rate_resolution_precedence() {
        let context = TaxRateContext {
            line_rate: Some(rate("0.05")),
            template_rate: Some(rate("0.18")),
            account_default_rate: Some(rate("0.12")),
        };
        let resolved = resolve_tax_rate(&context).unwrap();
        assert_eq!(resolved.rate, rate("0.05"));
        assert_eq!(resolved.source, RateSource::Line);

        let context = TaxRateContext {
            line_rate: None,
            template_rate: Some(rate("0.18")),
            account_default_rate: Some(rate("0.12")),
        };
        let resolved = resolve_tax_rate(&context).unwrap();
        assert_eq!(resolved.source, RateSource::Template);

        let empty = TaxRateContext::default();
        assert!(matches!(
            resolve_tax_rate(&empty),
            Err(TaxError::NoRateFound)
        ));
    }

    #[test]
    fn test_calculate_tax_for_line_composes_resolution() {
        let context = TaxRateContext {
            line_rate: None,
            template_rate: Some(rate("0.18")),
            account_default_rate: None,
        };
        let result = calculate_tax_for_line(50_000, &context, false).unwrap();
        assert_eq!(result.tax_amount_minor, 9_000);
        assert_eq!(result.running_total_minor, 59_000);
    }
}
