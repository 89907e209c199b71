//! Test harness (host side)
//!
//! The statements themselves run inside the isolation context; this module
//! turns the raw per-test records it reports into ordered [`TestOutcome`]s and
//! attaches the structural reading of each assertion. That reading is computed
//! from the test text alone and never influences status or error kind.

pub mod assertion;
pub mod literal;
pub mod report;

use crate::config::types::{ErrorKind, TestOutcome, TestStatus};
use crate::utils::output::OutputLimits;
use assertion::parse_assertion;
use report::TestRecord;
use serde_json::Value;

/// Pair each test statement with its record, in submission order.
///
/// Callers check that both sequences have the same length.
pub fn assemble_outcomes(
    tests: &[String],
    records: Vec<TestRecord>,
    limits: &OutputLimits,
) -> Vec<TestOutcome> {
    tests
        .iter()
        .zip(records)
        .map(|(test, record)| test_outcome(test, record, limits))
        .collect()
}

pub fn test_outcome(test_text: &str, record: TestRecord, limits: &OutputLimits) -> TestOutcome {
    let shape = parse_assertion(test_text);
    let (input_args, expected_value) = match shape {
        Some(shape) => (Some(shape.input_args), Some(shape.expected_value)),
        None => (None, None),
    };

    let (error_kind, diagnostic_message, actual_value) = match record.status {
        TestStatus::Passed => (
            None,
            None,
            Some(Value::String(limits.bound(record.output.trim()))),
        ),
        TestStatus::Failed => {
            let kind = record
                .error
                .filter(|name| !name.is_empty())
                .map(ErrorKind::from)
                .unwrap_or(ErrorKind::UnknownError);
            (Some(kind), record.message.map(|m| limits.bound(&m)), None)
        }
    };

    let captured_output = if record.output.is_empty() {
        None
    } else {
        Some(limits.bound(&record.output))
    };

    TestOutcome {
        test_text: test_text.to_string(),
        status: record.status,
        error_kind,
        diagnostic_message,
        captured_output,
        input_args,
        expected_value,
        actual_value,
    }
}
