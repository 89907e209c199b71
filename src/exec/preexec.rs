/// Pre-Exec Setup
///
/// Runs in the forked child between `fork` and `exec`. Only async-signal-safe
/// calls belong here: no allocation, no locks, no logging.
///
/// Fixed order:
/// 1. prctl(PR_SET_PDEATHSIG, SIGKILL) so the context dies with the host
/// 2. place the result channel on its well-known descriptor, inheritable
///
/// Process-group placement happens through `CommandExt::process_group`
/// before these steps run.
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::unistd::dup2;
use std::io;
use std::os::unix::io::RawFd;

/// Prepare the child side of an isolation context.
pub fn enter_isolation_context(channel_fd: RawFd, target_fd: RawFd) -> io::Result<()> {
    setup_parent_death_signal()?;
    install_channel(channel_fd, target_fd)
}

/// Setup parent death signal for the child process.
/// Must be called in the child after fork.
pub fn setup_parent_death_signal() -> io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        use nix::sys::prctl;
        use nix::sys::signal::Signal;

        prctl::set_pdeathsig(Signal::SIGKILL).map_err(io::Error::from)
    }

    #[cfg(not(target_os = "linux"))]
    {
        Ok(())
    }
}

fn install_channel(channel_fd: RawFd, target_fd: RawFd) -> io::Result<()> {
    if channel_fd == target_fd {
        // Already in place; only the close-on-exec flag has to go.
        let flags = FdFlag::from_bits_truncate(fcntl(channel_fd, FcntlArg::F_GETFD)?);
        fcntl(channel_fd, FcntlArg::F_SETFD(flags - FdFlag::FD_CLOEXEC))?;
        return Ok(());
    }

    // dup2 clears FD_CLOEXEC on the new descriptor.
    dup2(channel_fd, target_fd)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::channel::result_pipe;
    use std::os::fd::AsRawFd;

    fn cloexec(fd: RawFd) -> bool {
        let flags = FdFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFD).unwrap());
        flags.contains(FdFlag::FD_CLOEXEC)
    }

    #[test]
    fn test_install_channel_on_same_fd_clears_cloexec() {
        let (_read, write) = result_pipe().unwrap();
        let fd = write.as_raw_fd();
        assert!(cloexec(fd));

        install_channel(fd, fd).unwrap();
        assert!(!cloexec(fd));
    }

    #[test]
    fn test_install_channel_duplicates_onto_target() {
        let (_read, write) = result_pipe().unwrap();
        let target = nix::unistd::dup(write.as_raw_fd()).unwrap();
        nix::unistd::close(target).unwrap();

        install_channel(write.as_raw_fd(), target).unwrap();
        assert!(!cloexec(target));
        nix::unistd::close(target).unwrap();
    }
}
