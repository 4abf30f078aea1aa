//! Schedule module containing depreciation and revenue-recognition schedulers

pub mod depreciation;
pub mod revenue;

pub use depreciation::*;
pub use revenue::*;
