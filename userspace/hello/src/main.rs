//! hello - fast demo job
//!
//! Stops itself so the scheduler controls when it first runs, prints one
//! line, and exits within its first slice.

fn main() {
    liboslab::process::stop_self();
    println!("Hello from job with PID {}.", std::process::id());
}
