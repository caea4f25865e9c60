//! The scheduler child: one loop iteration per time slice.
//!
//! Each iteration is one tick. The tick admits newly submitted paths
//! (fork, hold with SIGSTOP, enqueue), preempts everything that ran during
//! the previous slice, refills the running set from the ready queue, and
//! charges a wait tick to everyone still queued. Preempt-before-dispatch
//! means the job that just ran re-enters the queue at the tail, so a
//! single-CPU two-job workload alternates strictly.
//!
//! Termination is cooperative: SIGTERM sets a flag polled between ticks.

use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use liboslab::process::{self, ForkResult, Pid};
use liboslab::signal;

use crate::job::{JobState, MAX_JOBS, NAME_CAP};
use crate::shared::{SharedRegion, SharedState};

static EXIT_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigterm(_sig: libc::c_int) {
    EXIT_REQUESTED.store(true, Ordering::SeqCst);
}

/// Scheduler-process state that never crosses the fork boundary.
pub struct Scheduler<'a> {
    shared: &'a mut SharedState,
    ncpu: usize,
    slice: Duration,
    /// Indices of jobs currently issued a CONT and not yet preempted.
    running: Vec<u32>,
    /// Monotonic tick counter; every loop iteration is a tick, idle ones
    /// included.
    tick: u32,
}

impl<'a> Scheduler<'a> {
    pub fn new(shared: &'a mut SharedState, ncpu: usize, slice_ms: u64) -> Self {
        Scheduler {
            shared,
            ncpu,
            slice: Duration::from_millis(slice_ms),
            running: Vec::with_capacity(ncpu),
            tick: 0,
        }
    }

    /// Run until a termination request, then kill and reap survivors.
    pub fn run(&mut self) -> Result<(), liboslab::Error> {
        signal::install(libc::SIGTERM, on_sigterm)?;
        while !EXIT_REQUESTED.load(Ordering::SeqCst) {
            self.tick_once();
            std::thread::sleep(self.slice);
        }
        log::info!("termination requested, reaping survivors");
        self.reap_survivors();
        Ok(())
    }

    /// One tick, without the trailing sleep. Exposed so tests can drive
    /// the loop at their own pace.
    pub fn tick_once(&mut self) {
        self.tick += 1;
        self.drain_submissions();
        if self.running.is_empty()
            && self.shared.ready.is_empty()
            && self.shared.submissions.is_empty()
        {
            return;
        }
        self.preempt_running();
        self.dispatch();
        self.account_waiters();
    }

    pub fn current_tick(&self) -> u32 {
        self.tick
    }

    /// Admit queued submissions: fork each path, hold the child with
    /// SIGSTOP before it can exec user code, and enqueue it READY.
    fn drain_submissions(&mut self) {
        let mut path = [0u8; NAME_CAP];
        while self.shared.job_count() < MAX_JOBS && self.shared.submissions.pop(&mut path) {
            match spawn_held(&path) {
                Ok(pid) => {
                    let idx = self.shared.append_job(pid, path_bytes(&path), self.tick);
                    self.shared.ready.push(idx);
                    log::info!(
                        "admitted job {} (pid {}) at tick {}",
                        String::from_utf8_lossy(path_bytes(&path)),
                        pid,
                        self.tick
                    );
                }
                Err(err) => {
                    log::error!(
                        "fork failed for {}: {err}; submission dropped",
                        String::from_utf8_lossy(path_bytes(&path))
                    );
                }
            }
        }
    }

    /// Stop everything that ran during the last slice and sort it into
    /// DONE or back into the ready queue.
    fn preempt_running(&mut self) {
        let batch = std::mem::take(&mut self.running);
        for idx in batch {
            let i = idx as usize;
            self.shared.jobs[i].slices_ran += 1;
            let pid = self.shared.jobs[i].pid;
            // harmless if the child already exited; the reap below is what
            // authoritatively detects completion
            let _ = process::send_signal(pid, libc::SIGSTOP);
            let reaped = matches!(process::try_reap(pid), Ok(Some(_)));
            if reaped || !process::exists(pid) {
                self.shared.jobs[i].state = JobState::Done;
                self.shared.jobs[i].completion_slice = self.tick;
                log::info!("job {idx} (pid {pid}) finished at tick {}", self.tick);
            } else {
                self.shared.jobs[i].state = JobState::Ready;
                self.shared.ready.push(idx);
            }
        }
    }

    /// Refill the running set from the head of the ready queue.
    fn dispatch(&mut self) {
        while self.running.len() < self.ncpu {
            let Some(idx) = self.shared.ready.pop() else {
                break;
            };
            let i = idx as usize;
            if self.shared.jobs[i].state == JobState::Done {
                // exited while queued; detected late
                continue;
            }
            let _ = process::send_signal(self.shared.jobs[i].pid, libc::SIGCONT);
            self.shared.jobs[i].state = JobState::Running;
            self.shared.jobs[i].started = true;
            self.running.push(idx);
        }
    }

    /// Everyone still queued after dispatch waited out this tick.
    fn account_waiters(&mut self) {
        let waiting: Vec<u32> = self.shared.ready.iter().collect();
        for idx in waiting {
            self.shared.jobs[idx as usize].slices_waited += 1;
        }
    }

    /// Kill and reap every job that has not reached DONE. Runs once, after
    /// the loop exits; the scheduler owns its children until they are
    /// reaped.
    pub fn reap_survivors(&mut self) {
        for i in 0..self.shared.job_count() {
            if self.shared.jobs[i].state == JobState::Done {
                continue;
            }
            let pid = self.shared.jobs[i].pid;
            let _ = process::send_signal(pid, libc::SIGKILL);
            let _ = process::await_exit(pid);
            self.shared.jobs[i].state = JobState::Done;
            self.shared.jobs[i].completion_slice = self.tick;
        }
    }
}

fn path_bytes(slot: &[u8; NAME_CAP]) -> &[u8] {
    let end = slot.iter().position(|&b| b == 0).unwrap_or(NAME_CAP);
    &slot[..end]
}

/// Fork a child that execs `path`. The parent stops it immediately so it
/// cannot run user code before its first dispatch; well-behaved jobs also
/// stop themselves, and the second STOP to land is a no-op.
fn spawn_held(path: &[u8; NAME_CAP]) -> Result<Pid, liboslab::Error> {
    let cpath = CString::new(path_bytes(path)).unwrap_or_default();
    match process::fork()? {
        ForkResult::Child => {
            process::reset_inherited_handlers();
            let _err = process::exec_single_arg(&cpath);
            process::exit_now(127);
        }
        ForkResult::Parent(pid) => {
            let _ = process::send_signal(pid, libc::SIGSTOP);
            Ok(pid)
        }
    }
}

/// Entry point for the forked scheduler child. Never returns; exits the
/// process directly so the front-end's cleanup never runs twice.
pub fn run_child(region: &mut SharedRegion, ncpu: usize, slice_ms: u64) -> ! {
    // the prompt's interrupt handling belongs to the front-end only
    let _ = signal::restore_default(libc::SIGINT);
    let mut sched = Scheduler::new(region.state_mut(), ncpu, slice_ms);
    match sched.run() {
        Ok(()) => process::exit_now(0),
        Err(err) => {
            log::error!("scheduler loop failed: {err}");
            process::exit_now(1);
        }
    }
}
