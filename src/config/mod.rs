//! Configuration
//!
//! Engine configuration, interpreter envelopes, shared types, and validation.

#[allow(clippy::module_inception)]
pub mod config;
pub mod presets;
pub mod types;
pub mod validator;
