//! judgebox: run untrusted Python submissions against independent test
//! statements and report a structured, per-test verdict
//!
//! # Architecture
//!
//! Each request gets one isolation context: a fresh interpreter process in its
//! own process group, fed the submission on stdin and answering on a dedicated
//! result channel. The host enforces the wall-clock limit from outside and
//! never trusts the context to clean up after itself.
//!
//! ## Execution Control ([`exec`])
//! - [`exec::executor`]: Request orchestration, from validation to verdict
//! - [`exec::preexec`]: Child-side setup between fork and exec
//!
//! ## Runner Core ([`core`])
//! - [`core::supervisor`]: Isolation context lifecycle and forced termination
//! - [`core::channel`]: Result channel and bounded stream draining
//! - [`core::types`]: Launch payload, kill reports, context outcomes
//!
//! ## Program Loader ([`loader`])
//! - Host-side pre-flight and the compile/load short-circuit outcomes
//!
//! ## Test Harness ([`harness`])
//! - [`harness::report`]: Report written by the in-context harness
//! - [`harness::assertion`]: Structural reading of `assert call(...) == value`
//! - [`harness::literal`]: Python literal displays as JSON values
//!
//! ## Judge Adapters ([`judge`])
//! - [`judge::languages::python`]: Embedded CPython harness
//!
//! ## Verdict ([`verdict`])
//! - [`verdict::verdict`]: Pure aggregation of outcomes
//!
//! ## Observability ([`observability`])
//! - [`observability::audit`]: Structured audit events
//!
//! ## Configuration ([`config`])
//! - [`config::config`]: Configuration loading
//! - [`config::validator`]: Config and request validation
//! - [`config::types`]: Shared request/response types
//! - [`config::presets`]: Versioned interpreter envelopes
//!
//! ## Utilities ([`utils`])
//! - [`utils::output`]: Bounded output fields
//!
//! # Design Principles
//!
//! 1. **Every path ends in a result** - failures after validation are outcomes, not errors
//! 2. **Kill from outside** - the deadline never depends on the submission cooperating
//! 3. **Parsing is advisory** - assertion structure never changes a verdict

// Execution Control
pub mod exec;

// Isolated runner core
pub mod core;

// Program loader
pub mod loader;

// Test harness (host side)
pub mod harness;

// Judge adapters (language-specific harness launch)
pub mod judge;

// Verdict
pub mod verdict;

// Observability
pub mod observability;

// Configuration
pub mod config;

// Utilities
pub mod utils;

// CLI entrypoint wiring for the judgebox binary.
pub mod cli;

// Re-export commonly used types for convenience
pub use config::config::JudgeConfig;
pub use config::types::*;
pub use exec::executor::{execute, Judge};
