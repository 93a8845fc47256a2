use std::fmt;

/// Where a conversion run is, or where it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionState {
    #[default]
    Idle,
    Scanning,
    /// The world folder has no region files; the void generator was installed.
    NoRegions,
    Converting,
    Done,
    /// Stopped at a region boundary by a shutdown request.
    Interrupted,
}

/// Region files processed out of the total, for reporting only.
#[derive(Debug, Clone, Copy)]
pub struct ConversionProgress {
    processed: usize,
    total: usize,
}

impl ConversionProgress {
    pub fn new(total: usize) -> Self {
        Self { processed: 0, total }
    }

    /// Count one more file as processed and return the new percentage.
    pub fn advance(&mut self) -> u32 {
        self.processed = (self.processed + 1).min(self.total);
        self.percent()
    }

    /// Truncated integer percentage.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        (self.processed * 100 / self.total) as u32
    }
}

/// Outcome of one conversion run.
#[derive(Debug, Clone, Default)]
pub struct ConversionReport {
    /// Region files found by the scan.
    pub total: usize,
    pub converted: usize,
    /// Region files that could not be decoded.
    pub failed: usize,
    /// Chunk units that errored or timed out.
    pub chunk_failures: usize,
    /// Every percentage logged, in order.
    pub progress_log: Vec<u32>,
    pub peak_cached_regions: usize,
    pub state: ConversionState,
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {}/{} regions converted, {} failed, {} chunk failures",
            self.state, self.converted, self.total, self.failed, self.chunk_failures
        )
    }
}
