//! Userspace process-control support library
//!
//! This library provides safe(r) wrappers around the raw OS interface used
//! by the scheduler and the demand-paged loader: process lifecycle
//! (fork/exec/wait), job-control signals, signal-handler installation, and
//! shared or fixed-address memory mappings.
//!
//! All fallible wrappers return `Result<T, Error>` for consistent error
//! handling. Use the `?` operator freely across modules.
//!
//! # Usage
//!
//! ```rust,ignore
//! use liboslab::process::{self, ForkResult};
//!
//! match process::fork()? {
//!     ForkResult::Child => {
//!         process::reset_inherited_handlers();
//!         let err = process::exec_single_arg(&path);
//!         process::exit_now(127);
//!     }
//!     ForkResult::Parent(pid) => {
//!         process::send_signal(pid, libc::SIGSTOP)?;
//!     }
//! }
//! ```

pub use error::{Errno, Error};

pub mod error;
pub mod mem;
pub mod process;
pub mod signal;
