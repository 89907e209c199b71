/// Verdict aggregation
/// Folds ordered per-test outcomes into the request-level result.
/// Pure: elapsed time is measured by the caller and only recorded here.
use crate::config::types::*;
use std::time::Duration;

/// Verdict aggregator - pure function over outcomes
pub struct VerdictAggregator;

impl VerdictAggregator {
    /// Full run: one outcome per test, in submission order
    pub fn aggregate(outcomes: Vec<TestOutcome>, elapsed: Duration) -> ExecutionResult {
        ExecutionResult {
            verdict: Self::verdict_for(&outcomes, false),
            outcomes,
            elapsed_seconds: elapsed.as_secs_f64(),
        }
    }

    /// Compile, load, timeout or unknown failure standing in for every test
    pub fn short_circuit(outcome: TestOutcome, elapsed: Duration) -> ExecutionResult {
        ExecutionResult {
            verdict: Self::verdict_for(std::slice::from_ref(&outcome), true),
            outcomes: vec![outcome],
            elapsed_seconds: elapsed.as_secs_f64(),
        }
    }

    /// `AllPassed` iff nothing short-circuited and every outcome passed
    pub fn verdict_for(outcomes: &[TestOutcome], short_circuited: bool) -> Verdict {
        if !short_circuited && outcomes.iter().all(TestOutcome::passed) {
            Verdict::AllPassed
        } else {
            Verdict::AtLeastOneFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(test: &str, status: TestStatus) -> TestOutcome {
        TestOutcome {
            test_text: test.to_string(),
            status,
            error_kind: (status == TestStatus::Failed).then_some(ErrorKind::AssertionError),
            diagnostic_message: None,
            captured_output: None,
            input_args: None,
            expected_value: None,
            actual_value: None,
        }
    }

    #[test]
    fn test_all_passed() {
        let result = VerdictAggregator::aggregate(
            vec![
                outcome("a", TestStatus::Passed),
                outcome("b", TestStatus::Passed),
            ],
            Duration::from_millis(250),
        );
        assert_eq!(result.verdict, Verdict::AllPassed);
        assert_eq!(result.outcomes.len(), 2);
        assert!((result.elapsed_seconds - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_one_failure_fails_request() {
        let result = VerdictAggregator::aggregate(
            vec![
                outcome("a", TestStatus::Passed),
                outcome("b", TestStatus::Failed),
                outcome("c", TestStatus::Passed),
            ],
            Duration::ZERO,
        );
        assert_eq!(result.verdict, Verdict::AtLeastOneFailed);
        let order: Vec<_> = result.outcomes.iter().map(|o| o.test_text.as_str()).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn test_short_circuit_always_fails() {
        let result = VerdictAggregator::short_circuit(
            TestOutcome::time_limit_exceeded(Duration::from_secs(2)),
            Duration::from_secs(2),
        );
        assert_eq!(result.verdict, Verdict::AtLeastOneFailed);
        assert_eq!(result.outcomes.len(), 1);

        // Even a passed placeholder cannot turn a short-circuit into success.
        assert_eq!(
            VerdictAggregator::verdict_for(&[outcome("x", TestStatus::Passed)], true),
            Verdict::AtLeastOneFailed
        );
    }

    #[test]
    fn test_verdict_is_deterministic() {
        let outcomes = vec![outcome("a", TestStatus::Failed)];
        assert_eq!(
            VerdictAggregator::verdict_for(&outcomes, false),
            VerdictAggregator::verdict_for(&outcomes, false)
        );
    }
}
