//! End-of-run execution report.
//!
//! Printed by the front-end after the scheduler child has been reaped, so
//! the job table is quiescent by the time it is read.

use std::io::{self, Write};

use crate::job::{Job, JobState};
use crate::shared::SharedState;

/// Turnarounds outside `[0, TURNAROUND_SANE_MAX]` ticks are treated as
/// counter corruption and reported as `slices_ran` instead.
const TURNAROUND_SANE_MAX: i64 = 60_000;

/// Turnaround in ticks, falling back to `slices_ran` when the recorded
/// interval is corrupt or the job never completed.
pub fn turnaround_ticks(job: &Job) -> u32 {
    if job.state == JobState::Done {
        let span = i64::from(job.completion_slice) - i64::from(job.submission_slice);
        if (0..=TURNAROUND_SANE_MAX).contains(&span) {
            return span as u32;
        }
    }
    job.slices_ran
}

/// Write the report: one row per job in submission order.
pub fn write_report<W: Write>(out: &mut W, state: &SharedState) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Execution Report:")?;
    writeln!(
        out,
        "{:<20}\t{:<10}\t{:<15}\t\t{:<15}",
        "Name", "PID", "Turnaround Time", "Wait Time"
    )?;
    for i in 0..state.job_count() {
        let job = &state.jobs[i];
        writeln!(
            out,
            "{:<20}\t{:<10}\t{:<5} TSLICES\t\t{:<5} TSLICES",
            job.name(),
            job.pid,
            turnaround_ticks(job),
            job.slices_waited
        )?;
    }
    Ok(())
}

/// Print the report to stdout.
pub fn print_report(state: &SharedState) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let _ = write_report(&mut out, state);
    let _ = out.flush();
}
