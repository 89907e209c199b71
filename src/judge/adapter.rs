use crate::config::presets::InterpreterEnvelope;
use std::os::unix::io::RawFd;

/// Language-specific harness contract.
///
/// An adapter knows how to start an interpreter so that it loads the
/// submission, runs every test statement against the resulting namespace and
/// writes one JSON report to `channel_fd`. The request payload arrives on the
/// child's stdin.
pub trait HarnessAdapter: Send + Sync {
    fn language(&self) -> &'static str;

    /// Full argv for the isolation context, executable first.
    fn harness_command(&self, envelope: &InterpreterEnvelope, channel_fd: RawFd) -> Vec<String>;
}
