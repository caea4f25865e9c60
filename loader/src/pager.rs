//! SIGSEGV-driven demand paging.
//!
//! Everything the fault handler touches lives in a process-scoped cell
//! installed before control transfers to the loaded program. The handler
//! runs synchronously on the faulting thread, never allocates, and calls
//! only async-signal-safe primitives: mmap, lseek, read, write to stderr,
//! and _exit. Its own state (segment table, mapped-page list) sits in
//! already-resident memory, so the handler cannot fault recursively.

use std::cell::UnsafeCell;
use std::os::fd::RawFd;

use crate::elf::{LoadSegment, MAX_SEGMENTS};
use crate::stats::PagerStats;

/// Hardware page size the loader maps in.
pub const PAGE_SIZE: usize = 4096;

/// Capacity of the mapped-page list; adequate for the programs the loader
/// is designed to run.
pub const MAX_MAPPED_PAGES: usize = 1024;

/// Everything the fault handler reads or writes.
pub struct PagerState {
    fd: RawFd,
    segments: [LoadSegment; MAX_SEGMENTS],
    nsegments: usize,
    mapped: [usize; MAX_MAPPED_PAGES],
    nmapped: usize,
    stats: PagerStats,
}

impl PagerState {
    pub fn new(fd: RawFd, segments: &[LoadSegment]) -> Self {
        assert!(segments.len() <= MAX_SEGMENTS);
        let mut table = [LoadSegment::ZERO; MAX_SEGMENTS];
        table[..segments.len()].copy_from_slice(segments);
        PagerState {
            fd,
            segments: table,
            nsegments: segments.len(),
            mapped: [0; MAX_MAPPED_PAGES],
            nmapped: 0,
            stats: PagerStats::default(),
        }
    }
}

struct PagerCell(UnsafeCell<Option<PagerState>>);

// Single-threaded process: the handler is the only other entry into the
// cell, and it runs on the faulting thread itself.
unsafe impl Sync for PagerCell {}

static PAGER: PagerCell = PagerCell(UnsafeCell::new(None));

/// Install the pager state and the SIGSEGV handler. From here until
/// [`cleanup`], every unmapped access inside a loadable segment is
/// serviced transparently.
pub fn install(state: PagerState) -> Result<(), liboslab::Error> {
    unsafe {
        *PAGER.0.get() = Some(state);
    }
    liboslab::signal::install_siginfo(libc::SIGSEGV, on_fault)
}

/// Snapshot of the counters; `None` before [`install`] or after
/// [`cleanup`].
pub fn stats() -> Option<PagerStats> {
    unsafe { (*PAGER.0.get()).as_ref().map(|s| s.stats) }
}

/// Release every page the pager mapped and close the image file. Safe to
/// call more than once; later calls find nothing to release.
pub fn cleanup() {
    let state = unsafe { (*PAGER.0.get()).take() };
    let Some(state) = state else { return };
    for &page in &state.mapped[..state.nmapped] {
        unsafe {
            let _ = liboslab::mem::unmap(page as *mut libc::c_void, PAGE_SIZE);
        }
    }
    unsafe {
        libc::close(state.fd);
    }
}

/// Page base containing `addr`.
pub fn page_floor(addr: usize) -> usize {
    (addr / PAGE_SIZE) * PAGE_SIZE
}

/// Index of the segment whose memory range `[vaddr, vaddr + memsz)`
/// contains `addr`. An address exactly at `vaddr + memsz` is outside.
pub fn classify(segments: &[LoadSegment], addr: usize) -> Option<usize> {
    segments.iter().position(|seg| {
        let start = seg.vaddr as usize;
        addr >= start && addr < start + seg.memsz as usize
    })
}

/// File bytes destined for the page at `page_base`: where they land, where
/// they come from, and how many. The span is the intersection of the page
/// with the segment's in-memory extent; trailing page bytes stay zero.
#[derive(Debug, PartialEq, Eq)]
pub struct FileSpan {
    pub dest: usize,
    pub offset: u64,
    pub len: usize,
}

pub fn file_span(seg: &LoadSegment, page_base: usize) -> Option<FileSpan> {
    let seg_start = seg.vaddr as usize;
    let seg_end = seg_start + seg.memsz as usize;
    let start = page_base.max(seg_start);
    let end = (page_base + PAGE_SIZE).min(seg_end);
    if start >= end {
        return None;
    }
    Some(FileSpan {
        dest: start,
        offset: u64::from(seg.offset) + (start - seg_start) as u64,
        len: end - start,
    })
}

/// Bytes of the page at `page_base` beyond the segment's logical end, or
/// zero when this is not the segment's final page.
pub fn trailing_fragmentation(seg: &LoadSegment, page_base: usize) -> usize {
    let seg_end = seg.vaddr as usize + seg.memsz as usize;
    let page_end = page_base + PAGE_SIZE;
    if page_base < seg_end && page_end > seg_end {
        page_end - seg_end
    } else {
        0
    }
}

/// Write a diagnostic and terminate. Both calls are async-signal-safe.
fn die(msg: &[u8]) -> ! {
    unsafe {
        libc::write(
            libc::STDERR_FILENO,
            msg.as_ptr() as *const libc::c_void,
            msg.len(),
        );
        libc::_exit(1);
    }
}

unsafe extern "C" fn on_fault(
    _sig: libc::c_int,
    info: *mut libc::siginfo_t,
    _ctx: *mut libc::c_void,
) {
    let state = match (*PAGER.0.get()).as_mut() {
        Some(state) => state,
        None => die(b"Segmentation fault (core dumped)\n"),
    };
    state.stats.page_faults += 1;

    let addr = (*info).si_addr() as usize;
    let seg = match classify(&state.segments[..state.nsegments], addr) {
        Some(i) => state.segments[i],
        None => die(b"Segmentation fault (core dumped)\n"),
    };

    let base = page_floor(addr);
    if state.mapped[..state.nmapped].contains(&base) {
        // a racing refault on a page mapped since the fault was raised
        return;
    }

    if liboslab::mem::map_fixed_rwx(base, PAGE_SIZE).is_err() {
        die(b"loader: mmap failed in fault handler\n");
    }
    state.stats.page_allocations += 1;
    if state.nmapped == MAX_MAPPED_PAGES {
        die(b"loader: mapped-page table overflow\n");
    }
    state.mapped[state.nmapped] = base;
    state.nmapped += 1;

    if let Some(span) = file_span(&seg, base) {
        if libc::lseek(state.fd, span.offset as libc::off_t, libc::SEEK_SET) < 0 {
            die(b"loader: lseek failed in fault handler\n");
        }
        if libc::read(state.fd, span.dest as *mut libc::c_void, span.len) < 0 {
            die(b"loader: read failed in fault handler\n");
        }
    }

    state.stats.fragmentation_bytes += trailing_fragmentation(&seg, base) as u64;
}
