use crate::config::types::OutputIntegrity;
use crate::harness::report::HarnessReport;
use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::time::Duration;

/// Descriptor number the result channel occupies inside the context.
pub const RESULT_FD: i32 = 3;

/// Payload written to the context's stdin.
#[derive(Debug, Serialize)]
pub struct ContextLaunch<'a> {
    pub source: &'a str,
    pub tests: &'a [String],
    /// Per-field cap in UTF-8 bytes the harness applies before reporting
    pub output_limit: usize,
    /// Size the encoded report must fit in; fields shrink until it does
    pub report_limit: usize,
}

/// Everything the runner needs to start one isolation context.
#[derive(Debug, Clone)]
pub struct ContextSpec {
    /// Full argv, executable first
    pub command: Vec<String>,
    pub environment: Vec<(String, String)>,
    pub inherit_environment: bool,
    pub workdir: Option<std::path::PathBuf>,
    /// Serialized [`ContextLaunch`]
    pub payload: Vec<u8>,
    pub wall_limit: Duration,
    pub output_limit: usize,
    pub report_limit: usize,
    pub drain_grace: Duration,
}

/// Kill report emitted by the supervisor
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct KillReport {
    pub kill_sent: bool,
    /// The signal reached the whole process group, not only the leader
    pub group_kill: bool,
    pub waited_ms: u64,
    pub notes: Vec<String>,
}

/// How the context's leader process ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextExit {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl From<ExitStatus> for ContextExit {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }
}

impl ContextExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for ContextExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {}", code),
            (None, Some(sig)) => match Signal::try_from(sig) {
                Ok(signal) => write!(f, "killed by signal {} ({})", sig, signal.as_str()),
                Err(_) => write!(f, "killed by signal {}", sig),
            },
            (None, None) => write!(f, "unknown exit status"),
        }
    }
}

/// Bytes collected from one of the context's streams
#[derive(Clone, Debug, Default)]
pub struct StreamCapture {
    pub bytes: Vec<u8>,
    pub integrity: OutputIntegrity,
}

/// What happened to one isolation context.
#[derive(Debug)]
pub enum ContextOutcome {
    /// The harness wrote a well-formed report
    Reported {
        report: HarnessReport,
        exit: ContextExit,
        stdout: String,
        stderr: String,
    },
    /// The wall-clock limit expired and the context was killed
    TimedOut { limit: Duration, kill: KillReport },
    /// The context exited without writing anything to the result channel
    Vanished {
        exit: ContextExit,
        stdout: String,
        stderr: String,
    },
    /// Something arrived on the result channel but it is not a usable report
    Malformed {
        exit: ContextExit,
        reason: String,
        stderr: String,
    },
}

impl ContextOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ContextOutcome::Reported { .. } => "reported",
            ContextOutcome::TimedOut { .. } => "timed_out",
            ContextOutcome::Vanished { .. } => "vanished",
            ContextOutcome::Malformed { .. } => "malformed",
        }
    }
}

/// Result of [`crate::core::supervisor::run_isolated`]
#[derive(Debug)]
pub struct ContextRun {
    pub pid: u32,
    pub outcome: ContextOutcome,
    /// Spawn to reap
    pub elapsed: Duration,
}
