//! Process lifecycle wrappers
//!
//! This module provides POSIX-named wrappers (fork, exec, waitpid, kill)
//! plus the small conveniences the scheduler and its jobs need: holding a
//! freshly forked child with SIGSTOP, probing whether a pid still exists,
//! and self-suspending until a controlling process sends SIGCONT.

use std::ffi::CStr;

use crate::error::{Errno, Error};

/// OS process id.
pub type Pid = libc::pid_t;

/// Result of a `fork()` call.
pub enum ForkResult {
    /// We are the parent; contains the child's PID.
    Parent(Pid),
    /// We are the child.
    Child,
}

/// Create a child process.
///
/// Returns `Ok(ForkResult::Parent(child_pid))` in the parent and
/// `Ok(ForkResult::Child)` in the child.
pub fn fork() -> Result<ForkResult, Error> {
    match unsafe { libc::fork() } {
        -1 => Err(Error::last_os()),
        0 => Ok(ForkResult::Child),
        pid => Ok(ForkResult::Parent(pid)),
    }
}

/// Replace the current process image with `path`, passing a single-entry
/// argv of the path itself.
///
/// Only returns on failure. Safe to call between fork and exec: `execvp`
/// is async-signal-safe.
pub fn exec_single_arg(path: &CStr) -> Error {
    let argv = [path.as_ptr(), std::ptr::null()];
    unsafe {
        libc::execvp(path.as_ptr(), argv.as_ptr());
    }
    Error::last_os()
}

/// Reset the handlers a forked child must not inherit from the front-end.
///
/// Called between fork and exec, where only async-signal-safe operations
/// are allowed.
pub fn reset_inherited_handlers() {
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_DFL);
        libc::signal(libc::SIGTERM, libc::SIG_DFL);
    }
}

/// Send `sig` to `pid`.
pub fn send_signal(pid: Pid, sig: libc::c_int) -> Result<(), Error> {
    Error::check(unsafe { libc::kill(pid, sig) }).map(|_| ())
}

/// Whether `pid` still names a process. Zombies count as existing; only an
/// ESRCH answer to the null signal means the process is gone.
pub fn exists(pid: Pid) -> bool {
    let ret = unsafe { libc::kill(pid, 0) };
    ret == 0 || Errno::last() != Errno(libc::ESRCH)
}

/// Non-blocking reap of `pid`.
///
/// `Ok(Some(status))` when the child has exited and was collected,
/// `Ok(None)` when it is still alive (stopped children report as alive).
pub fn try_reap(pid: Pid) -> Result<Option<libc::c_int>, Error> {
    let mut status: libc::c_int = 0;
    match unsafe { libc::waitpid(pid, &mut status, libc::WNOHANG) } {
        -1 => Err(Error::last_os()),
        0 => Ok(None),
        _ => Ok(Some(status)),
    }
}

/// Block until `pid` exits and return its raw wait status. Retries on
/// EINTR.
pub fn await_exit(pid: Pid) -> Result<libc::c_int, Error> {
    let mut status: libc::c_int = 0;
    loop {
        let ret = unsafe { libc::waitpid(pid, &mut status, 0) };
        if ret == pid {
            return Ok(status);
        }
        if ret == -1 {
            let e = Errno::last();
            if e == Errno(libc::EINTR) {
                continue;
            }
            return Err(Error::Os(e));
        }
    }
}

/// Raise SIGSTOP on the calling process so a controlling scheduler decides
/// when it first runs. A later SIGCONT resumes execution right here.
///
/// Jobs that skip this still work: the scheduler sends its own SIGSTOP
/// straight after fork, and the second STOP to land is a no-op.
pub fn stop_self() {
    unsafe {
        libc::raise(libc::SIGSTOP);
    }
}

/// Immediate process exit without running atexit handlers or flushing
/// stdio. The only safe way out of a forked child that failed to exec.
pub fn exit_now(code: i32) -> ! {
    unsafe { libc::_exit(code) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn fork_exec_failure_is_observable_as_exit_127() {
        let path = CString::new("/definitely/not/a/real/binary").unwrap();
        match fork().unwrap() {
            ForkResult::Child => {
                let _err = exec_single_arg(&path);
                exit_now(127);
            }
            ForkResult::Parent(pid) => {
                let status = await_exit(pid).unwrap();
                assert!(libc::WIFEXITED(status));
                assert_eq!(libc::WEXITSTATUS(status), 127);
            }
        }
    }

    #[test]
    fn exists_is_false_for_reaped_children() {
        match fork().unwrap() {
            ForkResult::Child => exit_now(0),
            ForkResult::Parent(pid) => {
                assert!(exists(pid));
                let _ = await_exit(pid).unwrap();
                assert!(!exists(pid));
            }
        }
    }

    #[test]
    fn try_reap_reports_alive_then_exited() {
        match fork().unwrap() {
            ForkResult::Child => {
                // hold until the parent kills us
                stop_self();
                exit_now(0);
            }
            ForkResult::Parent(pid) => {
                assert_eq!(try_reap(pid).unwrap(), None);
                send_signal(pid, libc::SIGKILL).unwrap();
                let status = await_exit(pid).unwrap();
                assert!(libc::WIFSIGNALED(status));
            }
        }
    }
}
