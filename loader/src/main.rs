//! Demand-paged ELF32 loader binary.
//!
//! Parses the image, installs the fault handler, and jumps to the entry
//! point; pages arrive as they are touched. Exit code 1 on any I/O or
//! parse failure, 0 after a successful run.

use std::fs::File;
use std::io;
use std::os::fd::IntoRawFd;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use oslab_loader::elf;
use oslab_loader::pager::{self, PagerState};

/// Load a statically linked ELF32 executable one page at a time and run it
/// from its entry point.
#[derive(Parser)]
#[command(name = "loader")]
struct Cli {
    /// Path to a statically linked ELF32 executable
    elf: PathBuf,
}

fn main() {
    env_logger::init();
    let cli = Cli::try_parse().unwrap_or_else(|err| {
        let _ = err.print();
        // argument errors exit 1, not clap's default 2
        let code = if err.use_stderr() { 1 } else { 0 };
        std::process::exit(code);
    });
    match run(&cli.elf) {
        Ok(()) => {
            pager::cleanup();
        }
        Err(err) => {
            eprintln!("loader: {err:#}");
            pager::cleanup();
            std::process::exit(1);
        }
    }
}

fn run(path: &Path) -> Result<()> {
    let mut file =
        File::open(path).with_context(|| format!("opening {} failed", path.display()))?;
    let image = elf::parse(&mut file)
        .with_context(|| format!("loading {} failed", path.display()))?;
    log::info!(
        "entry {:#x}, {} loadable segment(s)",
        image.entry,
        image.segments.len()
    );

    // the pager owns the descriptor from here; cleanup closes it
    let fd = file.into_raw_fd();
    pager::install(PagerState::new(fd, &image.segments))
        .context("installing the fault handler failed")?;

    // even the entry's first instruction is on an unmapped page; the
    // handler populates it and the hardware retries
    let ret = unsafe { call_entry(image.entry) };
    println!("User entry return value = {ret}");

    let stats = pager::stats().unwrap_or_default();
    let stdout = io::stdout();
    stats.write_summary(&mut stdout.lock())?;
    Ok(())
}

/// Interpret the ELF entry address as a zero-argument function returning a
/// machine word and call it.
///
/// # Safety
///
/// Sound only with the fault handler installed over the parsed segment
/// table: every instruction fetch or data access inside a loadable segment
/// is paged in on demand, and anything outside terminates the process.
unsafe fn call_entry(entry: u32) -> i32 {
    let f: extern "C" fn() -> i32 = std::mem::transmute(entry as usize);
    f()
}
