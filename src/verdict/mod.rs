//! Verdict aggregation
//!
//! Derives the request-level verdict as a pure function over outcomes.

pub mod verdict;

pub use verdict::VerdictAggregator;
