//! Paging counters and the end-of-run summary.

use std::io::{self, Write};

/// Counters the fault handler maintains while the loaded program runs.
///
/// Allocations can only trail faults: a spurious duplicate fault counts a
/// fault but maps nothing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PagerStats {
    pub page_faults: u64,
    pub page_allocations: u64,
    /// Bytes in mapped pages beyond their segment's logical end.
    pub fragmentation_bytes: u64,
}

impl PagerStats {
    pub fn fragmentation_kb(&self) -> f64 {
        self.fragmentation_bytes as f64 / 1024.0
    }

    /// Write the three summary lines.
    pub fn write_summary<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "--- Demand Pager Statistics ---")?;
        writeln!(out, "Total Page Faults: {}", self.page_faults)?;
        writeln!(out, "Total Page Allocations: {}", self.page_allocations)?;
        writeln!(
            out,
            "Total Internal Fragmentation: {:.2} KB",
            self.fragmentation_kb()
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_reports_fragmentation_in_kb_with_two_digits() {
        let stats = PagerStats {
            page_faults: 3,
            page_allocations: 2,
            fragmentation_bytes: 1536,
        };
        let mut buf = Vec::new();
        stats.write_summary(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Total Page Faults: 3"));
        assert!(text.contains("Total Page Allocations: 2"));
        assert!(text.contains("Total Internal Fragmentation: 1.50 KB"));
    }

    #[test]
    fn zero_fragmentation_prints_as_0_00() {
        let mut buf = Vec::new();
        PagerStats::default().write_summary(&mut buf).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("0.00 KB"));
    }
}
