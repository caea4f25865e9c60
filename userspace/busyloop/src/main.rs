//! busyloop - long-running demo job
//!
//! Stops itself so the scheduler controls when it first runs, then burns a
//! few seconds of CPU in a loop the optimizer cannot remove.

use std::hint::black_box;

fn main() {
    liboslab::process::stop_self();

    let pid = std::process::id();
    println!("Job with PID {pid} has started its long computation.");

    let mut sum: u64 = 0;
    for _ in 0..4 {
        for i in 0..2_000_000_000u64 {
            sum = black_box(sum.wrapping_add(i));
        }
    }

    println!("Job with PID {pid} finished its computation ({sum:#x}).");
}
