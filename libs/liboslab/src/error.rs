//! Unified error type for liboslab operations.
//!
//! All public functions in liboslab return `Result<T, Error>` for consistent
//! error handling across the fork/exec, signal, and mapping wrappers.

use std::fmt;
use std::io;

/// A raw OS errno captured from a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Errno(pub i32);

impl Errno {
    /// Capture the calling thread's current errno.
    ///
    /// Must be called immediately after the failing libc call, before any
    /// other call can clobber the thread's errno.
    pub fn last() -> Self {
        Errno(io::Error::last_os_error().raw_os_error().unwrap_or(0))
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", io::Error::from_raw_os_error(self.0))
    }
}

/// Unified error type for liboslab operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A POSIX errno from a failed OS call.
    Os(Errno),
}

impl Error {
    /// Capture the current errno as an `Error`.
    pub fn last_os() -> Self {
        Error::Os(Errno::last())
    }

    /// Convert a raw `-1`-on-failure return value to `Result`, capturing
    /// errno on failure.
    pub fn check(ret: libc::c_int) -> Result<libc::c_int, Error> {
        if ret == -1 {
            Err(Error::last_os())
        } else {
            Ok(ret)
        }
    }

    /// The errno behind this error.
    pub fn errno(&self) -> Errno {
        match self {
            Error::Os(e) => *e,
        }
    }
}

impl From<Errno> for Error {
    fn from(e: Errno) -> Self {
        Error::Os(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Os(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_passes_through_success() {
        assert_eq!(Error::check(0), Ok(0));
        assert_eq!(Error::check(42), Ok(42));
    }

    #[test]
    fn check_captures_errno_on_failure() {
        // close(-1) reliably fails with EBADF
        let ret = unsafe { libc::close(-1) };
        let err = Error::check(ret).unwrap_err();
        assert_eq!(err.errno(), Errno(libc::EBADF));
    }

    #[test]
    fn display_names_the_os_error() {
        let err = Error::Os(Errno(libc::ESRCH));
        let text = err.to_string();
        assert!(!text.is_empty());
    }
}
