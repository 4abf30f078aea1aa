//! # Ledger Engine
//!
//! A deterministic financial calculation engine: the algorithms that compute
//! money eventually posted to a general ledger.
//!
//! ## Features
//!
//! - **Tax calculation**: per-line tax under five charge-type policies,
//!   including row-to-row dependencies
//! - **Depreciation schedules**: straight-line and declining-balance, with
//!   drift-free integer rounding
//! - **Revenue recognition**: straight-line amortization of deferred revenue
//! - **Payment allocation**: greedy allocation of a payment across
//!   outstanding receivables/payables
//! - **Bank reconciliation**: confidence-scored matching of statement lines
//!   against ledger candidates
//! - **FX rates**: point-in-time, effective-dated rate lookup
//! - **Fiscal period guard**: no component can post into a closed period
//! - **Storage abstraction**: database-agnostic design with trait-based
//!   storage handles owned by the caller's transaction
//!
//! All money is signed 64-bit integers in minor currency units; no floating
//! point arithmetic ever touches a monetary amount.
//!
//! ## Quick Start
//!
//! ```rust
//! use ledger_engine::{generate_schedule, DepreciationMethod};
//!
//! // 120000 minor units over 12 months, straight-line
//! let periods = generate_schedule(120_000, 0, 12, DepreciationMethod::StraightLine).unwrap();
//! let total: i64 = periods.iter().map(|p| p.depreciation_minor).sum();
//! assert_eq!(total, 120_000);
//! ```

pub mod allocation;
pub mod fiscal;
pub mod fx;
pub mod reconciliation;
pub mod schedule;
pub mod tax;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use allocation::*;
pub use fiscal::*;
pub use fx::*;
pub use reconciliation::*;
pub use schedule::*;
pub use tax::*;
pub use traits::*;
pub use types::*;
