/// Report written by the in-context harness
///
/// The embedded harness serializes exactly one of these to the result channel
/// before it exits.
use crate::config::types::TestStatus;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HarnessReport {
    /// The submission did not compile; nothing ran
    CompileError { error: String, message: String },
    /// Top-level code raised while loading
    LoadError {
        error: String,
        message: String,
        #[serde(default)]
        output: String,
    },
    /// Load succeeded and every test ran
    Completed {
        #[serde(default)]
        defined_names: Vec<String>,
        #[serde(default)]
        load_output: String,
        tests: Vec<TestRecord>,
    },
    /// The harness itself failed outside any submitted code
    InternalError { message: String },
}

/// Raw result for one test statement, before host-side enrichment
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TestRecord {
    pub status: TestStatus,
    /// Exception class name when failed
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub output: String,
}

impl HarnessReport {
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessReport::CompileError { .. } => "compile_error",
            HarnessReport::LoadError { .. } => "load_error",
            HarnessReport::Completed { .. } => "completed",
            HarnessReport::InternalError { .. } => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_report_decodes() {
        let report: HarnessReport = serde_json::from_str(
            r#"{"kind":"completed","defined_names":["add"],"load_output":"",
                "tests":[{"status":"passed","output":"3\n"},
                         {"status":"failed","error":"AssertionError","message":"AssertionError: \nTraceback:\n...","output":""}]}"#,
        )
        .unwrap();

        match report {
            HarnessReport::Completed {
                defined_names,
                tests,
                ..
            } => {
                assert_eq!(defined_names, vec!["add".to_string()]);
                assert_eq!(tests.len(), 2);
                assert_eq!(tests[0].status, TestStatus::Passed);
                assert_eq!(tests[0].error, None);
                assert_eq!(tests[1].error.as_deref(), Some("AssertionError"));
            }
            other => panic!("unexpected report: {:?}", other),
        }
    }

    #[test]
    fn test_short_circuit_reports_decode() {
        let report: HarnessReport = serde_json::from_str(
            r#"{"kind":"compile_error","error":"SyntaxError","message":"SyntaxError: invalid syntax"}"#,
        )
        .unwrap();
        assert_eq!(report.kind(), "compile_error");

        let report: HarnessReport = serde_json::from_str(
            r#"{"kind":"load_error","error":"ValueError","message":"ValueError: boom"}"#,
        )
        .unwrap();
        assert_eq!(
            report,
            HarnessReport::LoadError {
                error: "ValueError".to_string(),
                message: "ValueError: boom".to_string(),
                output: String::new(),
            }
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(serde_json::from_str::<HarnessReport>(r#"{"kind":"partial"}"#).is_err());
    }
}
