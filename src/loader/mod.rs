//! Program loader
//!
//! Compilation and top-level execution happen inside the isolation context;
//! the host side checks what can be rejected without spawning anything,
//! builds the launch payload, and turns a failed compile or load into the
//! single outcome that stands in for the whole request.

use crate::config::types::{
    ErrorKind, ExecutionRequest, JudgeError, Result, TestOutcome, COMPILATION_TEST_TEXT,
    EXECUTION_TEST_TEXT,
};
use crate::core::types::ContextLaunch;
use crate::utils::output::OutputLimits;

/// Submission accepted for loading
#[derive(Debug, Clone, Copy)]
pub struct ProgramUnit<'a> {
    pub source: &'a str,
    pub tests: &'a [String],
}

impl<'a> ProgramUnit<'a> {
    /// Host-side pre-flight. Source that can never compile becomes the
    /// compilation outcome directly.
    pub fn prepare(request: &'a ExecutionRequest) -> std::result::Result<Self, TestOutcome> {
        if let Some(offset) = request.source.find('\0') {
            return Err(compilation_failure(format!(
                "SyntaxError: source code cannot contain null bytes (byte offset {})",
                offset
            )));
        }
        Ok(Self {
            source: &request.source,
            tests: &request.tests,
        })
    }

    /// Serialized payload for the context's stdin
    pub fn launch_payload(&self, limits: &OutputLimits, report_limit: usize) -> Result<Vec<u8>> {
        let launch = ContextLaunch {
            source: self.source,
            tests: self.tests,
            output_limit: limits.field_limit,
            report_limit,
        };
        serde_json::to_vec(&launch)
            .map_err(|e| JudgeError::Process(format!("failed to encode launch payload: {}", e)))
    }
}

pub fn compilation_failure(message: String) -> TestOutcome {
    TestOutcome::synthetic(
        COMPILATION_TEST_TEXT,
        ErrorKind::CompilationError,
        message,
        None,
    )
}

/// Top-level code raised while loading; `output` is what it printed first.
pub fn load_failure(message: String, output: String) -> TestOutcome {
    TestOutcome::synthetic(
        EXECUTION_TEST_TEXT,
        ErrorKind::RuntimeError,
        message,
        Some(output),
    )
}

pub fn log_defined_names(names: &[String]) {
    if log::log_enabled!(log::Level::Debug) {
        log::debug!("submission defines: {}", names.join(", "));
    }
}
