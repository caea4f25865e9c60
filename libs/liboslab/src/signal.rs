//! Signal-handler installation
//!
//! Two installation shapes cover everything the toolkit needs: a plain
//! handler for flag-setting (SIGTERM/SIGINT) and a siginfo-style handler
//! for faults where the handler must see the faulting address.
//!
//! Handlers are installed without SA_RESTART so a signal interrupts
//! blocking reads with EINTR; the front-end's prompt loop relies on that
//! to notice an interrupt request.

use crate::error::Error;

/// Plain signal handler type.
pub type Handler = extern "C" fn(libc::c_int);

/// Siginfo-style handler type, as installed with SA_SIGINFO.
pub type SiginfoHandler =
    unsafe extern "C" fn(libc::c_int, *mut libc::siginfo_t, *mut libc::c_void);

fn install_raw(sig: libc::c_int, action: usize, flags: libc::c_int) -> Result<(), Error> {
    let mut sa: libc::sigaction = unsafe { std::mem::zeroed() };
    sa.sa_sigaction = action;
    sa.sa_flags = flags;
    unsafe {
        libc::sigemptyset(&mut sa.sa_mask);
    }
    Error::check(unsafe { libc::sigaction(sig, &sa, std::ptr::null_mut()) }).map(|_| ())
}

/// Install `handler` for `sig`.
///
/// The handler must restrict itself to async-signal-safe work; setting an
/// atomic flag polled by the main loop is the intended shape.
pub fn install(sig: libc::c_int, handler: Handler) -> Result<(), Error> {
    install_raw(sig, handler as usize, 0)
}

/// Install a siginfo-style `handler` for `sig` with SA_SIGINFO, so the
/// handler receives the faulting address in `siginfo_t`.
pub fn install_siginfo(sig: libc::c_int, handler: SiginfoHandler) -> Result<(), Error> {
    install_raw(sig, handler as usize, libc::SA_SIGINFO)
}

/// Restore the default disposition for `sig`.
pub fn restore_default(sig: libc::c_int) -> Result<(), Error> {
    install_raw(sig, libc::SIG_DFL, 0)
}
