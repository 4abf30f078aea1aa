//! Tax module containing rate resolution and per-line charge calculation

pub mod charges;

pub use charges::*;
