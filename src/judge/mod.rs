//! Judge adapters.
//!
//! The runner stays language-agnostic. Adapters define how an interpreter is
//! started so that it hosts the in-context harness.

pub mod adapter;
pub mod languages;
pub mod registry;

pub use adapter::HarnessAdapter;
