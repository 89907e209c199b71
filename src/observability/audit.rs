/// Audit events for judgebox
///
/// Every request leaves a short trail: start, context spawn, forced kill,
/// short-circuit, end. Events go to the `judgebox::audit` log target and,
/// when configured, to an append-only JSON Lines file.
use crate::config::types::{JudgeError, Result};
use chrono::{SecondsFormat, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const AUDIT_TARGET: &str = "judgebox::audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditSeverity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditEventType {
    ExecutionStart,
    ContextSpawned,
    ForcedKill,
    ShortCircuit,
    ExecutionEnd,
}

impl AuditEventType {
    pub fn default_severity(&self) -> AuditSeverity {
        match self {
            AuditEventType::ExecutionStart => AuditSeverity::Low,
            AuditEventType::ContextSpawned => AuditSeverity::Low,
            AuditEventType::ForcedKill => AuditSeverity::High,
            AuditEventType::ShortCircuit => AuditSeverity::Medium,
            AuditEventType::ExecutionEnd => AuditSeverity::Low,
        }
    }
}

/// Correlation identifiers for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationIds {
    /// Unique per evaluation, even for identical submissions
    pub request_id: String,
    /// Digest of source and tests
    pub fingerprint: String,
    /// Isolation context pid once spawned
    pub context_pid: Option<u32>,
}

impl CorrelationIds {
    pub fn new(fingerprint: String) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            fingerprint,
            context_pid: None,
        }
    }

    /// Tag every later event with the isolation context's pid
    pub fn attach_context(&mut self, pid: u32) {
        self.context_pid = Some(pid);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub severity: AuditSeverity,
    /// RFC 3339, UTC
    pub timestamp: String,
    pub details: String,
    pub correlation: CorrelationIds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope_id: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, correlation: &CorrelationIds, details: String) -> Self {
        Self {
            event_type,
            severity: event_type.default_severity(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            details,
            correlation: correlation.clone(),
            envelope_id: None,
        }
    }

    pub fn with_envelope_id(mut self, envelope_id: &str) -> Self {
        self.envelope_id = Some(envelope_id.to_string());
        self
    }
}

/// Audit sink shared by every request of one engine
#[derive(Clone, Default)]
pub struct AuditLog {
    file: Option<Arc<Mutex<File>>>,
}

impl AuditLog {
    /// Log-only sink
    pub fn disabled() -> Self {
        Self { file: None }
    }

    /// Append to `path` in addition to the log target.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                JudgeError::Config(format!("Failed to create audit log directory: {}", e))
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| JudgeError::Config(format!("Failed to open audit log: {}", e)))?;
        Ok(Self {
            file: Some(Arc::new(Mutex::new(file))),
        })
    }

    pub fn from_config(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::open(path),
            None => Ok(Self::disabled()),
        }
    }

    pub fn record(&self, event: AuditEvent) {
        match event.severity {
            AuditSeverity::High => warn!(
                target: AUDIT_TARGET,
                "{:?} request={} - {}", event.event_type, event.correlation.request_id, event.details
            ),
            AuditSeverity::Medium | AuditSeverity::Low => info!(
                target: AUDIT_TARGET,
                "{:?} request={} - {}", event.event_type, event.correlation.request_id, event.details
            ),
        }

        let Some(file) = &self.file else {
            return;
        };
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                warn!(target: AUDIT_TARGET, "Failed to encode audit event: {}", e);
                return;
            }
        };
        match file.lock() {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{}", line).and_then(|_| file.flush()) {
                    warn!(target: AUDIT_TARGET, "Failed to write audit log: {}", e);
                }
            }
            Err(_) => warn!(target: AUDIT_TARGET, "Audit log lock poisoned"),
        }
    }
}
