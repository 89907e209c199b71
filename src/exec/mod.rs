//! Execution control
//!
//! Drives one request through the isolated runner and pre-exec setup.

pub mod executor;
pub mod preexec;
