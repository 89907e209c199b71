use crate::config::types::{JudgeError, Result};
use crate::core::channel::{decode_report, drain_async, feed_stdin, result_pipe, Drained, StreamDrain};
use crate::core::types::{
    ContextExit, ContextOutcome, ContextRun, ContextSpec, KillReport, RESULT_FD,
};
use crate::exec::preexec::enter_isolation_context;
use crate::utils::output::lossy_text;
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

fn to_process_error(prefix: &str, err: impl std::fmt::Display) -> JudgeError {
    JudgeError::Process(format!("{prefix}: {err}"))
}

/// One child process group hosting a single request.
///
/// The leader is never reaped before its group has been signalled: its zombie
/// pins the group id, so the group kill cannot hit a recycled pid.
pub struct IsolationContext {
    child: Child,
    pgid: Pid,
    reaped: bool,
}

impl IsolationContext {
    /// Start the context with `channel` inherited as [`RESULT_FD`].
    pub fn spawn(spec: &ContextSpec, channel: &OwnedFd) -> Result<Self> {
        let (program, args) = spec
            .command
            .split_first()
            .ok_or_else(|| JudgeError::Config("empty harness command".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);

        if !spec.inherit_environment {
            cmd.env_clear();
        }
        for (key, value) in &spec.environment {
            cmd.env(key, value);
        }
        if let Some(workdir) = &spec.workdir {
            cmd.current_dir(workdir);
        }

        let channel_fd = channel.as_raw_fd();
        unsafe {
            cmd.pre_exec(move || enter_isolation_context(channel_fd, RESULT_FD));
        }

        let child = cmd
            .spawn()
            .map_err(|e| to_process_error(&format!("spawn({program})"), e))?;
        let pgid = Pid::from_raw(child.id() as i32);

        Ok(Self {
            child,
            pgid,
            reaped: false,
        })
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Poll until the leader exits or `limit` has elapsed since `started`.
    /// Returns `false` on timeout. The leader is left unreaped either way.
    fn wait_for_exit(&self, started: Instant, limit: Duration) -> Result<bool> {
        loop {
            if self.leader_exited()? {
                return Ok(true);
            }
            let elapsed = started.elapsed();
            if elapsed >= limit {
                return Ok(false);
            }
            std::thread::sleep(POLL_INTERVAL.min(limit - elapsed));
        }
    }

    fn leader_exited(&self) -> Result<bool> {
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        let rc = unsafe {
            libc::waitid(
                libc::P_PID,
                self.child.id() as libc::id_t,
                &mut info,
                libc::WEXITED | libc::WNOHANG | libc::WNOWAIT,
            )
        };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(to_process_error("waitid(context)", err));
        }
        Ok(unsafe { info.si_pid() } != 0)
    }

    /// SIGKILL the whole group, then reap the leader.
    pub fn terminate_group(&mut self) -> (KillReport, Option<ContextExit>) {
        let mut report = KillReport::default();
        let start = Instant::now();

        match killpg(self.pgid, Signal::SIGKILL) {
            Ok(()) => {
                report.kill_sent = true;
                report.group_kill = true;
            }
            Err(Errno::ESRCH) => {
                report.notes.push("process group already gone".to_string());
            }
            Err(e) => {
                report.notes.push(format!("group SIGKILL failed: {e}"));
                match self.child.kill() {
                    Ok(()) => report.kill_sent = true,
                    Err(e) => report.notes.push(format!("leader SIGKILL failed: {e}")),
                }
            }
        }

        let exit = self.reap(&mut report.notes);
        report.waited_ms = start.elapsed().as_millis() as u64;
        (report, exit)
    }

    fn reap(&mut self, notes: &mut Vec<String>) -> Option<ContextExit> {
        match self.child.wait() {
            Ok(status) => {
                self.reaped = true;
                Some(ContextExit::from(status))
            }
            Err(e) => {
                notes.push(format!("wait(context): {e}"));
                None
            }
        }
    }
}

impl Drop for IsolationContext {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = killpg(self.pgid, Signal::SIGKILL);
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Run one isolation context to completion or to its wall-clock limit.
///
/// `on_spawn` is told the context pid as soon as it exists.
pub fn run_isolated(spec: &ContextSpec, on_spawn: impl FnOnce(u32)) -> Result<ContextRun> {
    let started = Instant::now();

    let (report_read, report_write) = result_pipe()?;
    let mut context = IsolationContext::spawn(spec, &report_write)?;
    // The host must not hold a write end, or the channel never reaches EOF.
    drop(report_write);

    let pid = context.pid();
    on_spawn(pid);
    log::debug!("isolation context {} started", pid);

    let report_drain = drain_async(Some(report_read), spec.report_limit);
    let stdout_drain = drain_async(context.child.stdout.take(), spec.output_limit);
    let stderr_drain = drain_async(context.child.stderr.take(), spec.output_limit);
    feed_stdin(context.child.stdin.take(), spec.payload.clone());

    if !context.wait_for_exit(started, spec.wall_limit)? {
        let (kill, _) = context.terminate_group();
        log::debug!(
            "isolation context {} killed after {:?} (kill_sent={}, waited {}ms)",
            pid,
            spec.wall_limit,
            kill.kill_sent,
            kill.waited_ms
        );
        return Ok(ContextRun {
            pid,
            outcome: ContextOutcome::TimedOut {
                limit: spec.wall_limit,
                kill,
            },
            elapsed: started.elapsed(),
        });
    }

    // Sweep whatever the leader left behind in its group so the pipes close.
    let (sweep, exit) = context.terminate_group();
    let exit = exit.ok_or_else(|| to_process_error("reap(context)", sweep.notes.join("; ")))?;
    let elapsed = started.elapsed();

    let stdout = collect_text(&stdout_drain, spec.drain_grace);
    let stderr = collect_text(&stderr_drain, spec.drain_grace);
    let outcome = match report_drain.finish(spec.drain_grace) {
        Drained::Closed(capture) if capture.bytes.is_empty() => ContextOutcome::Vanished {
            exit,
            stdout,
            stderr,
        },
        Drained::Closed(capture) => match decode_report(&capture, spec.report_limit) {
            Ok(report) => ContextOutcome::Reported {
                report,
                exit,
                stdout,
                stderr,
            },
            Err(e) => ContextOutcome::Malformed {
                exit,
                reason: e.to_string(),
                stderr,
            },
        },
        // A descendant outside the group still holds the channel. A report
        // that already arrived in full is still usable.
        Drained::Open(capture) => match decode_report(&capture, spec.report_limit) {
            Ok(report) => {
                log::warn!(
                    "isolation context {}: result channel held open after exit; using the report received",
                    pid
                );
                ContextOutcome::Reported {
                    report,
                    exit,
                    stdout,
                    stderr,
                }
            }
            Err(_) => ContextOutcome::Malformed {
                exit,
                reason: "result channel still open after the context exited".to_string(),
                stderr,
            },
        },
    };

    Ok(ContextRun {
        pid,
        outcome,
        elapsed,
    })
}

fn collect_text(drain: &StreamDrain, grace: Duration) -> String {
    lossy_text(&drain.finish(grace).into_capture().bytes)
}
