//! Depreciation scheduling examples

use ledger_engine::{
    generate_schedule, generate_straight_line_schedule, DepreciationMethod,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🏭 Ledger Engine - Depreciation Schedule Examples\n");

    // 1. Straight-line: 1200.00 over 12 months, no residual
    println!("📉 Straight-line, cost 120000 minor units, 12 months:");
    let periods = generate_schedule(120_000, 0, 12, DepreciationMethod::StraightLine)?;
    for period in &periods {
        println!(
            "  period {:>2}: depreciation {:>6}  accumulated {:>6}  book value {:>6}",
            period.period_index,
            period.depreciation_minor,
            period.accum_depreciation_minor,
            period.book_value_minor
        );
    }
    let total: i64 = periods.iter().map(|p| p.depreciation_minor).sum();
    println!("  total depreciated: {}\n", total);

    // 2. Uneven division: the final period absorbs the remainder
    println!("📐 Straight-line, cost 100000 over 7 months (uneven):");
    let periods = generate_schedule(100_000, 0, 7, DepreciationMethod::StraightLine)?;
    for period in &periods {
        println!(
            "  period {}: depreciation {}",
            period.period_index, period.depreciation_minor
        );
    }
    let total: i64 = periods.iter().map(|p| p.depreciation_minor).sum();
    println!("  total depreciated: {} (no drift)\n", total);

    // 3. Declining balance front-loads the charge
    println!("📊 Double-declining balance, cost 120000 over 12 months:");
    let periods = generate_schedule(120_000, 0, 12, DepreciationMethod::DecliningBalance)?;
    for period in &periods {
        println!(
            "  period {:>2}: depreciation {:>6}  book value {:>6}",
            period.period_index, period.depreciation_minor, period.book_value_minor
        );
    }
    println!();

    // 4. Revenue recognition follows the same integer discipline
    println!("💰 Straight-line revenue recognition, 100000 over 7 periods:");
    let lines = generate_straight_line_schedule(100_000, 7)?;
    for line in &lines {
        println!(
            "  period {}: recognized {:>6}  remaining {:>6}",
            line.period_index, line.recognized_minor, line.remaining_minor
        );
    }

    Ok(())
}
