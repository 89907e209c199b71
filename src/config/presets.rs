/// Interpreter Runtime Envelopes
///
/// Versioned, explicit presets describing how the isolation context's
/// interpreter is started. The envelope id is recorded in audit events.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Deterministic PATH handed to the child interpreter
pub const DETERMINISTIC_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Interpreter runtime envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterpreterEnvelope {
    /// Envelope ID (e.g. "python3-v1")
    pub id: String,
    /// Language family, used to pick the harness adapter
    pub language: String,
    /// Interpreter executable (looked up on PATH when not absolute)
    pub executable: String,
    /// Interpreter arguments placed before the harness bootstrap
    pub args: Vec<String>,
    /// Environment passed to the child
    pub environment: Vec<(String, String)>,
    /// Keep the host environment underneath `environment`
    #[serde(default)]
    pub inherit_environment: bool,
    /// Working directory for the child (host cwd when absent)
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

impl Default for InterpreterEnvelope {
    fn default() -> Self {
        python3()
    }
}

/// CPython 3 envelope.
///
/// `PYTHONHASHSEED` is pinned so set/dict iteration order, and therefore
/// printed output, is identical across repeated runs of the same request.
pub fn python3() -> InterpreterEnvelope {
    InterpreterEnvelope {
        id: "python3-v1".to_string(),
        language: "python".to_string(),
        executable: "python3".to_string(),
        args: vec!["-B".to_string()],
        environment: vec![
            ("PATH".to_string(), DETERMINISTIC_PATH.to_string()),
            ("LANG".to_string(), "C.UTF-8".to_string()),
            ("LC_ALL".to_string(), "C.UTF-8".to_string()),
            ("PYTHONIOENCODING".to_string(), "utf-8".to_string()),
            ("PYTHONHASHSEED".to_string(), "0".to_string()),
            ("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string()),
        ],
        inherit_environment: false,
        workdir: None,
    }
}

/// Look up a built-in envelope by id
pub fn envelope_by_id(id: &str) -> Option<InterpreterEnvelope> {
    match id {
        "python3-v1" | "python3" | "python" => Some(python3()),
        _ => None,
    }
}
