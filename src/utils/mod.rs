//! Utilities
//!
//! Output bounding for captured streams and diagnostics.

pub mod output;
