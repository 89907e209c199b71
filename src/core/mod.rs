//! Language-agnostic runner core.
//!
//! Core owns the isolation context: process model, lifecycle, the result
//! channel, and forced termination. Language-specific harness logic lives in
//! judge adapters.

pub mod channel;
pub mod supervisor;
pub mod types;
