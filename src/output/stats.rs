//! Load statistics
//!
//! Tracks what one load run requested, merged and lost, and renders a
//! human-readable report of it.

use chrono::{DateTime, Utc};
use std::fmt::Write;

/// A session that could not be loaded, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSession {
    pub id: String,
    pub reason: String,
}

/// Load run statistics summary
#[derive(Debug, Clone)]
pub struct LoadStatistics {
    /// Identifiers supplied for the run, duplicates included
    pub requested: usize,

    /// Distinct identifiers actually dispatched
    pub unique: usize,

    /// Sessions merged into the catalog
    pub loaded: usize,

    /// Sessions dropped after exhausting their retries
    pub failed: Vec<FailedSession>,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl LoadStatistics {
    pub fn begin(requested: usize) -> Self {
        Self {
            requested,
            unique: 0,
            loaded: 0,
            failed: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record_success(&mut self) {
        self.loaded += 1;
    }

    pub fn record_failure(&mut self, id: impl Into<String>, reason: impl Into<String>) {
        self.failed.push(FailedSession {
            id: id.into(),
            reason: reason.into(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
        self.failed.sort_by(|a, b| a.id.cmp(&b.id));
    }

    /// Wall-clock duration of the run, if it has finished
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|finished| finished - self.started_at)
    }

    pub fn success_rate(&self) -> f64 {
        if self.unique == 0 {
            0.0
        } else {
            (self.loaded as f64 / self.unique as f64) * 100.0
        }
    }
}

/// Renders statistics as a multi-line report
pub fn render_statistics(stats: &LoadStatistics) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "=== Load Statistics ===\n");
    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Requested identifiers: {}", stats.requested);
    let _ = writeln!(out, "  Unique identifiers: {}", stats.unique);
    let _ = writeln!(out, "  Sessions loaded: {}", stats.loaded);
    let _ = writeln!(out, "  Sessions failed: {}", stats.failed.len());
    let _ = writeln!(out, "  Started: {}", stats.started_at.to_rfc3339());
    if let Some(elapsed) = stats.elapsed() {
        let _ = writeln!(
            out,
            "  Elapsed: {:.1}s",
            elapsed.num_milliseconds() as f64 / 1000.0
        );
    }

    if !stats.failed.is_empty() {
        let _ = writeln!(out, "\nFailed Sessions ({}):", stats.failed.len());
        for failed in &stats.failed {
            let _ = writeln!(out, "  - {}: {}", failed.id, failed.reason);
        }
    }

    let _ = writeln!(
        out,
        "\nSuccess Rate: {:.1}% ({} / {} sessions loaded)",
        stats.success_rate(),
        stats.loaded,
        stats.unique
    );

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &LoadStatistics) {
    print!("{}", render_statistics(stats));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_counts() {
        let mut stats = LoadStatistics::begin(4);
        stats.unique = 3;
        stats.record_success();
        stats.record_success();
        stats.record_failure("3", "timeout");
        stats.finish();

        assert_eq!(stats.loaded, 2);
        assert_eq!(stats.failed.len(), 1);
        assert!(stats.elapsed().is_some());
        assert!((stats.success_rate() - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_success_rate_empty_run() {
        let stats = LoadStatistics::begin(0);
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn test_failures_sorted_on_finish() {
        let mut stats = LoadStatistics::begin(2);
        stats.record_failure("b", "x");
        stats.record_failure("a", "y");
        stats.finish();
        assert_eq!(stats.failed[0].id, "a");
    }

    #[test]
    fn test_render_lists_failures() {
        let mut stats = LoadStatistics::begin(2);
        stats.unique = 2;
        stats.record_success();
        stats.record_failure("1557197", "Request timeout");
        stats.finish();

        let report = render_statistics(&stats);
        assert!(report.contains("Sessions loaded: 1"));
        assert!(report.contains("1557197: Request timeout"));
        assert!(report.contains("Success Rate: 50.0%"));
    }
}
