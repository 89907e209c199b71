use crate::config::presets::InterpreterEnvelope;
use crate::judge::adapter::HarnessAdapter;
use std::os::unix::io::RawFd;

/// Harness program run with `python3 -c`; the report fd is its only argument.
pub const PYTHON_HARNESS: &str = include_str!("python_harness.py");

#[derive(Debug, Clone, Default)]
pub struct PythonAdapter;

impl HarnessAdapter for PythonAdapter {
    fn language(&self) -> &'static str {
        "python"
    }

    fn harness_command(&self, envelope: &InterpreterEnvelope, channel_fd: RawFd) -> Vec<String> {
        let mut command = Vec::with_capacity(envelope.args.len() + 4);
        command.push(envelope.executable.clone());
        command.extend(envelope.args.iter().cloned());
        command.push("-c".to_string());
        command.push(PYTHON_HARNESS.to_string());
        command.push(channel_fd.to_string());
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::presets;

    #[test]
    fn test_command_layout() {
        let command = PythonAdapter.harness_command(&presets::python3(), 3);
        assert_eq!(command[0], "python3");
        assert_eq!(command[1], "-B");
        assert_eq!(command[2], "-c");
        assert_eq!(command[3], PYTHON_HARNESS);
        assert_eq!(command[4], "3");
    }

    #[test]
    fn test_harness_reports_through_fd_argument() {
        assert!(PYTHON_HARNESS.contains("sys.argv[1]"));
        assert!(PYTHON_HARNESS.contains("\"<submission>\""));
        assert!(!PYTHON_HARNESS.contains('\0'));
    }
}
