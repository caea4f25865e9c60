//! Demand-paged ELF32 loader
//!
//! Loads a statically linked ELF32 executable lazily, one page per first
//! touch. The program-header table is parsed up front; a SIGSEGV handler
//! classifies each fault against the loadable segments, maps one anonymous
//! page at the faulting page boundary, fills it from the file, and
//! returns so the hardware can retry. Control transfers straight to the
//! ELF entry point; even its first instruction is paged in this way.

pub mod elf;
pub mod pager;
pub mod stats;
