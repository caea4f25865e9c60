//! Submission front-end binary.
//!
//! Creates the shared region, forks the scheduler child, and then owns the
//! prompt until `exit`, end of input, or Ctrl-C. Shutdown lets in-flight
//! submissions drain, stops the scheduler with SIGTERM, reaps it, and
//! prints the execution report.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use liboslab::process::{self, ForkResult, Pid};
use liboslab::signal;
use oslab_scheduler::report;
use oslab_scheduler::sched;
use oslab_scheduler::shared::SharedRegion;
use oslab_scheduler::shell::{parse_command, Command, LineReader, ReadOutcome};

/// Round-robin job scheduler: multiplexes submitted executables onto NCPU
/// logical CPUs with a TSLICE-millisecond quantum.
#[derive(Parser)]
#[command(name = "scheduler")]
struct Cli {
    /// Number of logical CPUs
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    ncpu: u32,
    /// Time slice in milliseconds
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    tslice_ms: u32,
}

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_sig: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

fn main() {
    env_logger::init();
    let cli = Cli::try_parse().unwrap_or_else(|err| {
        let _ = err.print();
        // argument errors exit 1, not clap's default 2
        let code = if err.use_stderr() { 1 } else { 0 };
        std::process::exit(code);
    });
    if let Err(err) = run(&cli) {
        eprintln!("scheduler: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut region = SharedRegion::create().context("mapping shared state failed")?;
    signal::install(libc::SIGINT, on_sigint).context("installing the SIGINT handler failed")?;

    let sched_pid = match process::fork().context("forking the scheduler failed")? {
        ForkResult::Child => {
            sched::run_child(&mut region, cli.ncpu as usize, u64::from(cli.tslice_ms))
        }
        ForkResult::Parent(pid) => pid,
    };
    log::info!(
        "scheduler child {} started with ncpu={} tslice={}ms",
        sched_pid,
        cli.ncpu,
        cli.tslice_ms
    );

    let mut front = FrontEnd { region, sched_pid };
    front.prompt_loop()
}

struct FrontEnd {
    region: SharedRegion,
    sched_pid: Pid,
}

impl FrontEnd {
    fn prompt_loop(&mut self) -> Result<()> {
        println!("Job scheduler shell");
        println!("Commands: submit <path>, exit");
        println!();

        let mut lines = LineReader::new(libc::STDIN_FILENO);
        loop {
            print!("sched> ");
            std::io::stdout().flush()?;
            match lines.next_line().context("reading from stdin failed")? {
                ReadOutcome::Interrupted => {
                    if INTERRUPTED.load(Ordering::SeqCst) {
                        println!();
                        println!("Caught interrupt. Exiting");
                        self.shutdown();
                        return Ok(());
                    }
                }
                ReadOutcome::Eof => {
                    println!();
                    println!("Exiting...");
                    self.shutdown();
                    return Ok(());
                }
                ReadOutcome::Line(line) => match parse_command(&line) {
                    Command::Empty => {}
                    Command::Exit => {
                        self.shutdown();
                        return Ok(());
                    }
                    Command::SubmitMissingPath => {
                        println!("Usage: submit <path-to-executable>");
                    }
                    Command::Submit(path) => self.submit(path),
                    Command::Unknown(cmd) => println!("Unknown command: {cmd}"),
                },
            }
        }
    }

    fn submit(&self, path: &str) {
        match self.region.state().submit(path.as_bytes()) {
            Ok(()) => println!("Job submitted: {path}"),
            Err(err) => println!("Error: {err}."),
        }
    }

    /// Orderly shutdown: give queued submissions up to a second to drain,
    /// stop the scheduler, reap it, then report from the quiescent table.
    fn shutdown(&mut self) {
        let mut waited = Duration::ZERO;
        while !self.region.state().submissions.is_empty() && waited < Duration::from_secs(1) {
            std::thread::sleep(Duration::from_millis(100));
            waited += Duration::from_millis(100);
        }

        let _ = process::send_signal(self.sched_pid, libc::SIGTERM);
        // grace period for the scheduler to finish its current tick
        std::thread::sleep(Duration::from_millis(200));
        if let Err(err) = process::await_exit(self.sched_pid) {
            log::warn!("reaping the scheduler failed: {err}");
        }

        report::print_report(self.region.state());
    }
}
