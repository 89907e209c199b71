//! Request execution: loader, isolated runner, harness and verdict in one pass

use crate::config::config::JudgeConfig;
use crate::config::types::{ExecutionRequest, ExecutionResult, Result, TestOutcome};
use crate::config::validator::{validate_config, validate_request};
use crate::core::supervisor::run_isolated;
use crate::core::types::{ContextOutcome, ContextSpec, RESULT_FD};
use crate::harness::assemble_outcomes;
use crate::harness::report::HarnessReport;
use crate::judge::adapter::HarnessAdapter;
use crate::judge::registry::adapter_for;
use crate::loader::{self, ProgramUnit};
use crate::observability::audit::{AuditEvent, AuditEventType, AuditLog, CorrelationIds};
use crate::utils::output::OutputLimits;
use crate::verdict::VerdictAggregator;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Execution engine bound to one validated configuration.
///
/// Cheap to share across threads; every call to [`Judge::execute`] gets its
/// own isolation context.
pub struct Judge {
    config: JudgeConfig,
    adapter: Box<dyn HarnessAdapter>,
    audit: AuditLog,
    limits: OutputLimits,
}

impl Judge {
    /// Validate `config` and resolve its harness adapter
    pub fn new(config: JudgeConfig) -> Result<Self> {
        validate_config(&config)?;
        let adapter = adapter_for(&config.interpreter.language)?;
        let audit = AuditLog::from_config(config.audit_file.as_ref())?;
        let limits = OutputLimits::new(config.output_limit_bytes);

        Ok(Self {
            config,
            adapter,
            audit,
            limits,
        })
    }

    /// Evaluate one request.
    ///
    /// Only request-shape errors come back as `Err`; every failure after
    /// validation, including a panic inside the engine, is a well-formed
    /// result with an `UnknownError` outcome.
    pub fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let wall_limit = validate_request(request, &self.config)?;
        let started = Instant::now();
        let mut ids = CorrelationIds::new(request.fingerprint());

        self.audit.record(
            AuditEvent::new(
                AuditEventType::ExecutionStart,
                &ids,
                format!(
                    "{} tests, limit {}s",
                    request.tests.len(),
                    wall_limit.as_secs()
                ),
            )
            .with_envelope_id(&self.config.interpreter.id),
        );

        let result = catch_unwind(AssertUnwindSafe(|| {
            self.evaluate(request, wall_limit, started, &mut ids)
        }))
        .unwrap_or_else(|panic| {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("engine panicked while evaluating request {}: {}", ids.request_id, reason);
            VerdictAggregator::short_circuit(
                TestOutcome::unknown_error(format!("Internal engine failure: {}", reason), None),
                started.elapsed(),
            )
        });

        let summary = result.summary();
        log::info!(
            "request {}: {} ({} passed, {} failed, {:.3}s)",
            ids.request_id,
            result.verdict,
            summary.passed,
            summary.failed,
            result.elapsed_seconds
        );
        self.audit.record(AuditEvent::new(
            AuditEventType::ExecutionEnd,
            &ids,
            format!("{} in {:.3}s", result.verdict, result.elapsed_seconds),
        ));

        Ok(result)
    }

    fn evaluate(
        &self,
        request: &ExecutionRequest,
        wall_limit: Duration,
        started: Instant,
        ids: &mut CorrelationIds,
    ) -> ExecutionResult {
        let unit = match ProgramUnit::prepare(request) {
            Ok(unit) => unit,
            Err(outcome) => return self.short_circuit(outcome, started, ids),
        };

        let spec = match unit.launch_payload(&self.limits, self.config.report_limit_bytes) {
            Ok(payload) => self.context_spec(payload, wall_limit),
            Err(e) => {
                return self.short_circuit(TestOutcome::unknown_error(e.to_string(), None), started, ids)
            }
        };

        let run = run_isolated(&spec, |pid| {
            ids.attach_context(pid);
            self.audit.record(AuditEvent::new(
                AuditEventType::ContextSpawned,
                ids,
                format!("pid {}", pid),
            ));
        });

        let outcome = match run {
            Ok(run) => {
                log::debug!(
                    "request {}: context {} {} after {:.3}s",
                    ids.request_id,
                    run.pid,
                    run.outcome.label(),
                    run.elapsed.as_secs_f64()
                );
                run.outcome
            }
            Err(e) => {
                log::error!("isolation context failed for request {}: {}", ids.request_id, e);
                let outcome = TestOutcome::unknown_error(
                    format!("Failed to run isolation context: {}", e),
                    None,
                );
                return self.short_circuit(outcome, started, ids);
            }
        };

        self.interpret(&unit, outcome, started, ids)
    }

    fn context_spec(&self, payload: Vec<u8>, wall_limit: Duration) -> ContextSpec {
        let envelope = &self.config.interpreter;
        ContextSpec {
            command: self.adapter.harness_command(envelope, RESULT_FD),
            environment: envelope.environment.clone(),
            inherit_environment: envelope.inherit_environment,
            workdir: envelope.workdir.clone(),
            payload,
            wall_limit,
            output_limit: self.config.output_limit_bytes,
            report_limit: self.config.report_limit_bytes,
            drain_grace: self.config.drain_grace(),
        }
    }

    /// Map what happened to the context onto outcomes.
    fn interpret(
        &self,
        unit: &ProgramUnit<'_>,
        outcome: ContextOutcome,
        started: Instant,
        ids: &CorrelationIds,
    ) -> ExecutionResult {
        let limits = &self.limits;
        match outcome {
            ContextOutcome::Reported {
                report,
                stdout,
                stderr,
                ..
            } => {
                if !stdout.is_empty() || !stderr.is_empty() {
                    log::debug!(
                        "request {}: output outside capture scope (stdout {} bytes, stderr {} bytes)",
                        ids.request_id,
                        stdout.len(),
                        stderr.len()
                    );
                }
                self.interpret_report(unit, report, started, ids)
            }
            ContextOutcome::TimedOut { limit, kill } => {
                self.audit.record(AuditEvent::new(
                    AuditEventType::ForcedKill,
                    ids,
                    format!(
                        "wall limit {}s exceeded; kill_sent={} group={} waited {}ms{}",
                        limit.as_secs(),
                        kill.kill_sent,
                        kill.group_kill,
                        kill.waited_ms,
                        if kill.notes.is_empty() {
                            String::new()
                        } else {
                            format!(" ({})", kill.notes.join("; "))
                        }
                    ),
                ));
                self.short_circuit(TestOutcome::time_limit_exceeded(limit), started, ids)
            }
            ContextOutcome::Vanished {
                exit,
                stdout,
                stderr,
            } => {
                let message = with_stderr(
                    format!("Isolation context exited without a report ({}).", exit),
                    &stderr,
                    limits,
                );
                let outcome = TestOutcome::unknown_error(message, Some(limits.bound(&stdout)));
                self.short_circuit(outcome, started, ids)
            }
            ContextOutcome::Malformed {
                exit,
                reason,
                stderr,
            } => {
                let message = with_stderr(
                    format!("Isolation context returned an unusable report ({}): {}", exit, reason),
                    &stderr,
                    limits,
                );
                self.short_circuit(TestOutcome::unknown_error(message, None), started, ids)
            }
        }
    }

    fn interpret_report(
        &self,
        unit: &ProgramUnit<'_>,
        report: HarnessReport,
        started: Instant,
        ids: &CorrelationIds,
    ) -> ExecutionResult {
        let limits = &self.limits;
        log::debug!("request {}: harness report {}", ids.request_id, report.kind());
        match report {
            HarnessReport::CompileError { message, .. } => {
                self.short_circuit(loader::compilation_failure(limits.bound(&message)), started, ids)
            }
            HarnessReport::LoadError {
                message, output, ..
            } => self.short_circuit(
                loader::load_failure(limits.bound(&message), limits.bound(&output)),
                started,
                ids,
            ),
            HarnessReport::InternalError { message } => self.short_circuit(
                TestOutcome::unknown_error(limits.bound(&message), None),
                started,
                ids,
            ),
            HarnessReport::Completed {
                defined_names,
                load_output,
                tests,
            } => {
                if tests.len() != unit.tests.len() {
                    let outcome = TestOutcome::unknown_error(
                        format!(
                            "Harness reported {} results for {} tests",
                            tests.len(),
                            unit.tests.len()
                        ),
                        None,
                    );
                    return self.short_circuit(outcome, started, ids);
                }
                loader::log_defined_names(&defined_names);
                if !load_output.is_empty() {
                    log::debug!(
                        "request {}: load printed {} bytes",
                        ids.request_id,
                        load_output.len()
                    );
                }
                let outcomes = assemble_outcomes(unit.tests, tests, limits);
                VerdictAggregator::aggregate(outcomes, started.elapsed())
            }
        }
    }

    fn short_circuit(
        &self,
        outcome: TestOutcome,
        started: Instant,
        ids: &CorrelationIds,
    ) -> ExecutionResult {
        self.audit.record(AuditEvent::new(
            AuditEventType::ShortCircuit,
            ids,
            format!(
                "{} {}",
                outcome.test_text,
                outcome
                    .error_kind
                    .as_ref()
                    .map(|kind| kind.as_str())
                    .unwrap_or_default()
            ),
        ));
        VerdictAggregator::short_circuit(outcome, started.elapsed())
    }
}

fn with_stderr(message: String, stderr: &str, limits: &OutputLimits) -> String {
    if stderr.trim().is_empty() {
        message
    } else {
        format!("{}\nStderr:\n{}", message, limits.tail(stderr))
    }
}

/// One-shot convenience: build a [`Judge`] for `config` and run `request`.
pub fn execute(request: &ExecutionRequest, config: &JudgeConfig) -> Result<ExecutionResult> {
    Judge::new(config.clone())?.execute(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{ErrorKind, JudgeError, Verdict};

    /// Interpreter stand-in: a shell script playing the harness role.
    fn shell_judge(script: &str) -> Judge {
        let mut config = JudgeConfig::default();
        config.drain_grace_ms = 2000;
        let mut judge = Judge::new(config).unwrap();
        judge.adapter = Box::new(ShellAdapter(script.to_string()));
        judge
    }

    struct ShellAdapter(String);

    impl HarnessAdapter for ShellAdapter {
        fn language(&self) -> &'static str {
            "sh"
        }

        fn harness_command(
            &self,
            _envelope: &crate::config::presets::InterpreterEnvelope,
            _channel_fd: std::os::unix::io::RawFd,
        ) -> Vec<String> {
            vec!["/bin/sh".to_string(), "-c".to_string(), self.0.clone()]
        }
    }

    fn request(tests: &[&str], timeout: u64) -> ExecutionRequest {
        ExecutionRequest::new(
            "def f(x): return x",
            tests.iter().map(|t| t.to_string()).collect(),
            timeout,
        )
    }

    #[test]
    fn test_shape_errors_are_rejected_before_spawn() {
        let judge = shell_judge("exit 99");
        let err = judge
            .execute(&ExecutionRequest::new("x = 1", vec![], 5))
            .unwrap_err();
        assert!(matches!(err, JudgeError::InvalidRequest(_)));
    }

    #[test]
    fn test_completed_report_is_enriched() {
        let judge = shell_judge(
            r#"cat >/dev/null; printf '{"kind":"completed","defined_names":["f"],"load_output":"","tests":[{"status":"passed","output":"2\n"},{"status":"failed","error":"AssertionError","message":"AssertionError: ","output":""}]}' >&3"#,
        );
        let result = judge
            .execute(&request(&["assert f(2) == 2", "assert f(1) == 3"], 5))
            .unwrap();

        assert_eq!(result.verdict, Verdict::AtLeastOneFailed);
        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.outcomes[0].actual_value, Some(serde_json::json!("2")));
        assert_eq!(result.outcomes[1].error_kind, Some(ErrorKind::AssertionError));
        assert_eq!(result.outcomes[1].expected_value, Some(serde_json::json!(3)));
    }

    #[test]
    fn test_record_count_mismatch_is_unknown_error() {
        let judge = shell_judge(
            r#"cat >/dev/null; printf '{"kind":"completed","tests":[]}' >&3"#,
        );
        let result = judge.execute(&request(&["assert f(1) == 1"], 5)).unwrap();
        assert_eq!(result.outcomes.len(), 1);
        assert_eq!(result.outcomes[0].test_text, "<unknown>");
        assert_eq!(result.outcomes[0].error_kind, Some(ErrorKind::UnknownError));
    }

    #[test]
    fn test_crash_without_report_carries_stderr() {
        let judge = shell_judge("cat >/dev/null; echo 'Segmentation fault' >&2; kill -SEGV $$");
        let result = judge.execute(&request(&["assert f(1) == 1"], 5)).unwrap();

        let outcome = &result.outcomes[0];
        assert_eq!(outcome.error_kind, Some(ErrorKind::UnknownError));
        let message = outcome.diagnostic_message.as_deref().unwrap();
        assert!(message.contains("SIGSEGV"), "{}", message);
        assert!(message.contains("Segmentation fault"), "{}", message);
    }

    #[test]
    fn test_timeout_is_single_outcome() {
        let judge = shell_judge("sleep 30");
        let started = Instant::now();
        let result = judge.execute(&request(&["a", "b", "c"], 1)).unwrap();

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(result.verdict, Verdict::AtLeastOneFailed);
        assert_eq!(result.outcomes.len(), 1);
        assert_eq!(result.outcomes[0].test_text, "<timeout>");
        assert_eq!(
            result.outcomes[0].diagnostic_message.as_deref(),
            Some("Execution exceeded time limit of 1 seconds.")
        );
        assert!(result.elapsed_seconds >= 1.0);
    }

    #[test]
    fn test_missing_interpreter_is_unknown_error() {
        let mut config = JudgeConfig::default();
        config.interpreter.executable = "/nonexistent/python3".to_string();
        let result = execute(&request(&["assert f(1) == 1"], 5), &config).unwrap();

        assert_eq!(result.outcomes.len(), 1);
        assert_eq!(result.outcomes[0].error_kind, Some(ErrorKind::UnknownError));
        assert!(result.outcomes[0]
            .diagnostic_message
            .as_deref()
            .unwrap()
            .starts_with("Failed to run isolation context"));
    }
}
