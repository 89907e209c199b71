// Config and request validation
// Invalid configuration fails fast at startup; malformed requests are rejected
// before any isolation context is created.

use crate::config::config::{JudgeConfig, HARD_MAX_TIMEOUT_SECONDS};
use crate::config::types::{ExecutionRequest, JudgeError, Result};
use std::time::Duration;

/// Validation result with detailed errors
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate config at startup
pub fn validate_config(config: &JudgeConfig) -> Result<ValidationResult> {
    let mut result = ValidationResult::default();

    validate_timeouts(config, &mut result);
    validate_interpreter(config, &mut result);
    validate_bounds(config, &mut result);

    for warning in &result.warnings {
        log::warn!("config: {}", warning);
    }

    if !result.is_valid() {
        return Err(JudgeError::Config(format!(
            "Config validation failed:\n{}",
            result.errors.join("\n")
        )));
    }

    Ok(result)
}

fn validate_timeouts(config: &JudgeConfig, result: &mut ValidationResult) {
    if config.max_timeout_seconds == 0 || config.max_timeout_seconds > HARD_MAX_TIMEOUT_SECONDS {
        result.add_error(format!(
            "max_timeout_seconds must be within 1..={}, got {}",
            HARD_MAX_TIMEOUT_SECONDS, config.max_timeout_seconds
        ));
    }
    if config.default_timeout_seconds == 0
        || config.default_timeout_seconds > config.max_timeout_seconds
    {
        result.add_error(format!(
            "default_timeout_seconds must be within 1..={}, got {}",
            config.max_timeout_seconds, config.default_timeout_seconds
        ));
    }
}

fn validate_interpreter(config: &JudgeConfig, result: &mut ValidationResult) {
    let interpreter = &config.interpreter;
    if interpreter.executable.trim().is_empty() {
        result.add_error("interpreter.executable cannot be empty".to_string());
    }
    if interpreter.executable.contains('\0')
        || interpreter.args.iter().any(|arg| arg.contains('\0'))
    {
        result.add_error("interpreter command contains NUL byte".to_string());
    }
    if !interpreter.inherit_environment
        && !interpreter.environment.iter().any(|(key, _)| key == "PATH")
        && !interpreter.executable.starts_with('/')
    {
        result.add_warning(format!(
            "interpreter '{}' is not absolute and no PATH is passed to the child",
            interpreter.executable
        ));
    }
    if let Some(workdir) = &interpreter.workdir {
        if !workdir.is_dir() {
            result.add_error(format!(
                "interpreter.workdir does not exist: {}",
                workdir.display()
            ));
        }
    }
}

fn validate_bounds(config: &JudgeConfig, result: &mut ValidationResult) {
    if config.output_limit_bytes == 0 {
        result.add_error("output_limit_bytes cannot be zero".to_string());
    }
    if config.report_limit_bytes < config.output_limit_bytes {
        result.add_error(format!(
            "report_limit_bytes ({}) must be at least output_limit_bytes ({})",
            config.report_limit_bytes, config.output_limit_bytes
        ));
    }
    if config.workers == 0 {
        result.add_error("workers cannot be zero".to_string());
    }
    if config.drain_grace_ms > 10_000 {
        result.add_warning(format!(
            "drain_grace_ms {} delays every crashed request",
            config.drain_grace_ms
        ));
    }
}

/// Reject malformed requests and resolve the effective wall-clock limit
pub fn validate_request(request: &ExecutionRequest, config: &JudgeConfig) -> Result<Duration> {
    if request.source.trim().is_empty() {
        return Err(JudgeError::InvalidRequest("No code provided".to_string()));
    }
    if request.tests.is_empty() {
        return Err(JudgeError::InvalidRequest("No tests provided".to_string()));
    }

    let seconds = request
        .timeout_seconds
        .unwrap_or(config.default_timeout_seconds);
    if seconds == 0 || seconds > config.max_timeout_seconds {
        return Err(JudgeError::InvalidRequest(format!(
            "timeoutSeconds must be within 1..={}, got {}",
            config.max_timeout_seconds, seconds
        )));
    }

    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(source: &str, tests: &[&str], timeout: Option<u64>) -> ExecutionRequest {
        ExecutionRequest {
            source: source.to_string(),
            tests: tests.iter().map(|t| t.to_string()).collect(),
            timeout_seconds: timeout,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let result = validate_config(&JudgeConfig::default()).unwrap();
        assert!(result.is_valid());
    }

    #[test]
    fn test_config_rejects_timeout_above_hard_cap() {
        let mut config = JudgeConfig::default();
        config.max_timeout_seconds = 31;
        assert!(validate_config(&config).is_err());

        let mut config = JudgeConfig::default();
        config.default_timeout_seconds = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_config_rejects_empty_interpreter() {
        let mut config = JudgeConfig::default();
        config.interpreter.executable = "  ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("executable"));
    }

    #[test]
    fn test_request_shape_errors() {
        let config = JudgeConfig::default();

        let err = validate_request(&request("  ", &["assert True"], None), &config).unwrap_err();
        assert!(matches!(err, JudgeError::InvalidRequest(ref m) if m == "No code provided"));

        let err = validate_request(&request("x = 1", &[], None), &config).unwrap_err();
        assert!(matches!(err, JudgeError::InvalidRequest(ref m) if m == "No tests provided"));
    }

    #[test]
    fn test_request_timeout_bounds() {
        let config = JudgeConfig::default();

        assert!(validate_request(&request("x = 1", &["assert x"], Some(0)), &config).is_err());
        assert!(validate_request(&request("x = 1", &["assert x"], Some(31)), &config).is_err());
        assert_eq!(
            validate_request(&request("x = 1", &["assert x"], Some(30)), &config).unwrap(),
            Duration::from_secs(30)
        );
        assert_eq!(
            validate_request(&request("x = 1", &["assert x"], None), &config).unwrap(),
            Duration::from_secs(config.default_timeout_seconds)
        );
    }
}
