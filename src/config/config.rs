use crate::config::presets::{self, InterpreterEnvelope};
use crate::config::types::{JudgeError, Result};
/// Configuration loading from a judgebox JSON file
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on any request timeout, whatever the config says
pub const HARD_MAX_TIMEOUT_SECONDS: u64 = 30;

/// Timeout applied when a request does not carry one
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 20;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JudgeConfig {
    /// Interpreter used as the isolation context
    pub interpreter: InterpreterEnvelope,
    /// Timeout used when a request omits `timeoutSeconds`
    pub default_timeout_seconds: u64,
    /// Largest accepted `timeoutSeconds`
    pub max_timeout_seconds: u64,
    /// Per-field bound on captured output and diagnostics (bytes)
    pub output_limit_bytes: usize,
    /// Bound on the serialized report read back from the context (bytes)
    pub report_limit_bytes: usize,
    /// How long to wait for pipes to drain after the context exits
    pub drain_grace_ms: u64,
    /// Worker threads for batch evaluation
    pub workers: usize,
    /// Append-only JSONL audit trail
    pub audit_file: Option<PathBuf>,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            interpreter: presets::python3(),
            default_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_timeout_seconds: HARD_MAX_TIMEOUT_SECONDS,
            output_limit_bytes: 64 * 1024,
            report_limit_bytes: 16 * 1024 * 1024,
            drain_grace_ms: 500,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            audit_file: None,
        }
    }
}

impl JudgeConfig {
    /// Load configuration from a JSON file; omitted keys keep their defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            JudgeError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: JudgeConfig = serde_json::from_str(&content)
            .map_err(|e| JudgeError::Config(format!("Failed to parse config JSON: {}", e)))?;

        crate::config::validator::validate_config(&config)?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise the built-in defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_millis(self.drain_grace_ms)
    }
}
