//! Run statistics for the scoring pipeline.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::info;

/// Counters and timings collected over one scoring run.
#[derive(Debug)]
pub struct RunMetrics {
    rows_evaluated: u64,
    rows_skipped: u64,
    header_rows: u64,
    label_counts: BTreeMap<String, u64>,
    eval_times_us: Vec<u64>,
    start: Instant,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            rows_evaluated: 0,
            rows_skipped: 0,
            header_rows: 0,
            label_counts: BTreeMap::new(),
            eval_times_us: Vec::new(),
            start: Instant::now(),
        }
    }

    /// Record one evaluated row and its predicted label.
    pub fn record_row(&mut self, label: &str, elapsed: Duration) {
        self.rows_evaluated += 1;
        *self.label_counts.entry(label.to_string()).or_insert(0) += 1;
        self.eval_times_us.push(elapsed.as_micros() as u64);
    }

    /// Record a malformed row that was silently skipped.
    pub fn record_skipped(&mut self) {
        self.rows_skipped += 1;
    }

    /// Record a header line.
    pub fn record_header(&mut self) {
        self.header_rows += 1;
    }

    pub fn rows_evaluated(&self) -> u64 {
        self.rows_evaluated
    }

    pub fn rows_skipped(&self) -> u64 {
        self.rows_skipped
    }

    pub fn header_rows(&self) -> u64 {
        self.header_rows
    }

    /// Predicted-label counts, in label order.
    pub fn label_counts(&self) -> &BTreeMap<String, u64> {
        &self.label_counts
    }

    /// Per-row evaluation timing statistics.
    pub fn timing(&self) -> TimingStats {
        if self.eval_times_us.is_empty() {
            return TimingStats::default();
        }

        let mut sorted = self.eval_times_us.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();

        TimingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            max_us: sorted[count - 1],
        }
    }

    /// Log summary statistics for the run.
    pub fn print_summary(&self) {
        let elapsed = self.start.elapsed().as_secs_f64();
        let timing = self.timing();

        info!(
            rows_evaluated = self.rows_evaluated,
            rows_skipped = self.rows_skipped,
            header_rows = self.header_rows,
            elapsed_ms = (elapsed * 1000.0) as u64,
            "Scoring run complete"
        );
        if timing.count > 0 {
            info!(
                mean_us = timing.mean_us,
                p50_us = timing.p50_us,
                p95_us = timing.p95_us,
                max_us = timing.max_us,
                "Evaluation timing"
            );
        }
        for (label, count) in &self.label_counts {
            let pct = if self.rows_evaluated > 0 {
                (*count as f64 / self.rows_evaluated as f64) * 100.0
            } else {
                0.0
            };
            info!("  {label}: {count} ({pct:.1}%)");
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluation timing statistics.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TimingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub max_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_recording() {
        let mut metrics = RunMetrics::new();
        metrics.record_header();
        metrics.record_row("no play", Duration::from_micros(100));
        metrics.record_row("no play", Duration::from_micros(300));
        metrics.record_row("will play", Duration::from_micros(200));
        metrics.record_skipped();

        assert_eq!(metrics.rows_evaluated(), 3);
        assert_eq!(metrics.rows_skipped(), 1);
        assert_eq!(metrics.header_rows(), 1);
        assert_eq!(metrics.label_counts().get("no play"), Some(&2));
        assert_eq!(metrics.label_counts().get("will play"), Some(&1));
    }

    #[test]
    fn test_timing_stats() {
        let mut metrics = RunMetrics::new();
        for us in [100, 200, 300, 400] {
            metrics.record_row("x", Duration::from_micros(us));
        }

        let timing = metrics.timing();
        assert_eq!(timing.count, 4);
        assert_eq!(timing.mean_us, 250);
        assert_eq!(timing.max_us, 400);
    }

    #[test]
    fn test_empty_timing() {
        assert_eq!(RunMetrics::new().timing(), TimingStats::default());
    }
}
