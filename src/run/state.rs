/// Acquisition loop lifecycle: `Idle -> Running -> Stopping -> Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoopPhase {
    #[default]
    Idle,
    Running,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The operator stopped the run.
    Cancelled,
    /// Too many cycles in a row without a complete record.
    SensorsSilent,
}

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub cycles: u64,
    pub records_written: u64,
    pub skipped_cycles: u64,
    pub write_failures: u64,
    /// Skipped cycles since the last complete record; reset on success.
    pub consecutive_rejections: u32,
}

impl RunStats {
    pub fn record_written(&mut self) {
        self.cycles += 1;
        self.records_written += 1;
        self.consecutive_rejections = 0;
    }

    pub fn record_skipped(&mut self) {
        self.cycles += 1;
        self.skipped_cycles += 1;
        self.consecutive_rejections = self.consecutive_rejections.saturating_add(1);
    }

    /// A failed write still means both boards answered.
    pub fn record_write_failure(&mut self) {
        self.cycles += 1;
        self.write_failures += 1;
        self.consecutive_rejections = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_starts_idle() {
        assert_eq!(LoopPhase::default(), LoopPhase::Idle);
    }

    #[test]
    fn success_resets_consecutive_rejections() {
        let mut stats = RunStats::default();
        stats.record_skipped();
        stats.record_skipped();
        assert_eq!(stats.consecutive_rejections, 2);

        stats.record_written();
        assert_eq!(stats.consecutive_rejections, 0);
        assert_eq!(stats.cycles, 3);
        assert_eq!(stats.skipped_cycles, 2);
        assert_eq!(stats.records_written, 1);
    }

    #[test]
    fn write_failure_counts_as_answered_cycle() {
        let mut stats = RunStats::default();
        stats.record_skipped();
        stats.record_write_failure();
        assert_eq!(stats.consecutive_rejections, 0);
        assert_eq!(stats.write_failures, 1);
    }
}
