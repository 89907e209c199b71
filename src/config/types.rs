/// Core types and structures for judgebox
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Test text used for outcomes that stand in for the whole request.
pub const COMPILATION_TEST_TEXT: &str = "<code compilation>";
pub const EXECUTION_TEST_TEXT: &str = "<code execution>";
pub const TIMEOUT_TEST_TEXT: &str = "<timeout>";
pub const UNKNOWN_TEST_TEXT: &str = "<unknown>";

/// One submission plus the assertions to run against it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Program text, loaded once before any test runs
    #[serde(alias = "code")]
    pub source: String,
    /// Independent test statements, executed in order
    pub tests: Vec<String>,
    /// Wall-clock budget for the whole request; config default when absent
    #[serde(alias = "timeout", default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl ExecutionRequest {
    pub fn new(source: impl Into<String>, tests: Vec<String>, timeout_seconds: u64) -> Self {
        Self {
            source: source.into(),
            tests,
            timeout_seconds: Some(timeout_seconds),
        }
    }

    /// Stable digest of source and tests, used to correlate identical submissions.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source.as_bytes());
        for test in &self.tests {
            hasher.update([0u8]);
            hasher.update(test.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
}

/// Error category attached to a failed outcome.
///
/// The fixed categories come from the engine itself; everything else is the
/// class name of the exception the submission raised.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum ErrorKind {
    CompilationError,
    RuntimeError,
    AssertionError,
    TimeLimitExceeded,
    UnknownError,
    Exception(String),
}

impl ErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::CompilationError => "CompilationError",
            ErrorKind::RuntimeError => "RuntimeError",
            ErrorKind::AssertionError => "AssertionError",
            ErrorKind::TimeLimitExceeded => "TimeLimitExceeded",
            ErrorKind::UnknownError => "UnknownError",
            ErrorKind::Exception(name) => name,
        }
    }
}

impl From<String> for ErrorKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "CompilationError" => ErrorKind::CompilationError,
            "RuntimeError" => ErrorKind::RuntimeError,
            "AssertionError" => ErrorKind::AssertionError,
            "TimeLimitExceeded" => ErrorKind::TimeLimitExceeded,
            "UnknownError" => ErrorKind::UnknownError,
            _ => ErrorKind::Exception(name),
        }
    }
}

impl From<&str> for ErrorKind {
    fn from(name: &str) -> Self {
        ErrorKind::from(name.to_string())
    }
}

impl From<ErrorKind> for String {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Exception(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured pass/fail record for one test statement
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    #[serde(rename = "test")]
    pub test_text: String,
    pub status: TestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_args: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<Value>,
}

impl TestOutcome {
    /// Failed outcome standing in for the whole request.
    pub fn synthetic(
        test_text: &str,
        kind: ErrorKind,
        message: String,
        captured_output: Option<String>,
    ) -> Self {
        Self {
            test_text: test_text.to_string(),
            status: TestStatus::Failed,
            error_kind: Some(kind),
            diagnostic_message: Some(message),
            captured_output: captured_output.filter(|output| !output.is_empty()),
            input_args: None,
            expected_value: None,
            actual_value: None,
        }
    }

    pub fn time_limit_exceeded(limit: Duration) -> Self {
        Self::synthetic(
            TIMEOUT_TEST_TEXT,
            ErrorKind::TimeLimitExceeded,
            format!(
                "Execution exceeded time limit of {} seconds.",
                limit.as_secs()
            ),
            None,
        )
    }

    pub fn unknown_error(message: String, captured_output: Option<String>) -> Self {
        Self::synthetic(
            UNKNOWN_TEST_TEXT,
            ErrorKind::UnknownError,
            message,
            captured_output,
        )
    }

    pub fn passed(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

/// Request-level summary
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Verdict {
    #[serde(rename = "All tests passed")]
    AllPassed,
    #[serde(rename = "At least one test error")]
    AtLeastOneFailed,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::AllPassed => f.write_str("All tests passed"),
            Verdict::AtLeastOneFailed => f.write_str("At least one test error"),
        }
    }
}

/// Final answer handed back to the caller
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub verdict: Verdict,
    pub outcomes: Vec<TestOutcome>,
    pub elapsed_seconds: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
}

impl ExecutionResult {
    pub fn all_passed(&self) -> bool {
        self.verdict == Verdict::AllPassed
    }

    pub fn summary(&self) -> Summary {
        let passed = self.outcomes.iter().filter(|o| o.passed()).count();
        Summary {
            passed,
            failed: self.outcomes.len() - passed,
        }
    }
}

/// How much of a captured stream survived collection
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub enum OutputIntegrity {
    #[default]
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "truncated_by_judge_limit")]
    TruncatedByJudgeLimit,
    #[serde(rename = "write_error")]
    WriteError,
}

impl fmt::Display for OutputIntegrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputIntegrity::Complete => write!(f, "complete"),
            OutputIntegrity::TruncatedByJudgeLimit => write!(f, "truncated_by_judge_limit"),
            OutputIntegrity::WriteError => write!(f, "write_error"),
        }
    }
}

/// Custom error types for judgebox
#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Result channel error: {0}")]
    Channel(String),
}

pub type Result<T> = std::result::Result<T, JudgeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_kind_string_mapping() {
        assert_eq!(ErrorKind::from("AssertionError"), ErrorKind::AssertionError);
        assert_eq!(
            ErrorKind::from("ZeroDivisionError"),
            ErrorKind::Exception("ZeroDivisionError".to_string())
        );
        assert_eq!(
            serde_json::to_value(ErrorKind::TimeLimitExceeded).unwrap(),
            json!("TimeLimitExceeded")
        );
        assert_eq!(
            serde_json::to_value(ErrorKind::Exception("KeyError".into())).unwrap(),
            json!("KeyError")
        );
    }

    #[test]
    fn test_request_accepts_original_field_names() {
        let request: ExecutionRequest = serde_json::from_value(json!({
            "code": "def f(): return 1",
            "tests": ["assert f() == 1"],
            "timeout": 5
        }))
        .unwrap();

        assert_eq!(request.source, "def f(): return 1");
        assert_eq!(request.timeout_seconds, Some(5));

        let request: ExecutionRequest = serde_json::from_value(json!({
            "source": "x = 1",
            "tests": ["assert x == 1"]
        }))
        .unwrap();
        assert_eq!(request.timeout_seconds, None);
    }

    #[test]
    fn test_outcome_omits_absent_fields() {
        let outcome = TestOutcome::time_limit_exceeded(Duration::from_secs(3));
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(
            value,
            json!({
                "test": "<timeout>",
                "status": "failed",
                "errorKind": "TimeLimitExceeded",
                "diagnosticMessage": "Execution exceeded time limit of 3 seconds."
            })
        );
    }

    #[test]
    fn test_verdict_wire_strings() {
        assert_eq!(
            serde_json::to_value(Verdict::AllPassed).unwrap(),
            json!("All tests passed")
        );
        assert_eq!(
            serde_json::to_value(Verdict::AtLeastOneFailed).unwrap(),
            json!("At least one test error")
        );
    }

    #[test]
    fn test_fingerprint_separates_tests() {
        let a = ExecutionRequest::new("x", vec!["ab".into(), "c".into()], 5);
        let b = ExecutionRequest::new("x", vec!["a".into(), "bc".into()], 5);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_summary_counts() {
        let mut passed = TestOutcome::unknown_error("x".into(), None);
        passed.status = TestStatus::Passed;
        let failed = TestOutcome::unknown_error("y".into(), Some(String::new()));
        assert_eq!(failed.captured_output, None);

        let result = ExecutionResult {
            verdict: Verdict::AtLeastOneFailed,
            outcomes: vec![passed, failed],
            elapsed_seconds: 0.1,
        };
        assert_eq!(result.summary(), Summary { passed: 1, failed: 1 });
        assert!(!result.all_passed());
    }
}
