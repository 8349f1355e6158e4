//! Latency summary over a run.

use std::fmt;
use std::time::Duration;

/// Summary statistics for a set of round-trip samples.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySummary {
    pub count: usize,
    pub errors: usize,
    pub mean: Duration,
    pub p50: Duration,
    pub p99: Duration,
    pub max: Duration,
}

impl LatencySummary {
    /// Summarize successful samples plus a count of failed calls.
    pub fn from_samples(samples: &[Duration], errors: usize) -> Self {
        if samples.is_empty() {
            return Self {
                count: 0,
                errors,
                mean: Duration::ZERO,
                p50: Duration::ZERO,
                p99: Duration::ZERO,
                max: Duration::ZERO,
            };
        }

        let mut sorted = samples.to_vec();
        sorted.sort_unstable();

        let total: Duration = sorted.iter().sum();
        let count = sorted.len();

        Self {
            count,
            errors,
            mean: total / count as u32,
            p50: percentile(&sorted, 50),
            p99: percentile(&sorted, 99),
            max: sorted[count - 1],
        }
    }
}

/// Nearest-rank percentile over an already sorted, non-empty slice: the
/// smallest sample with at least `pct`% of the samples at or below it.
fn percentile(sorted: &[Duration], pct: usize) -> Duration {
    let rank = (sorted.len() * pct).div_ceil(100).max(1);
    sorted[rank.min(sorted.len()) - 1]
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} calls, {} errors, mean {:?}, p50 {:?}, p99 {:?}, max {:?}",
            self.count, self.errors, self.mean, self.p50, self.p99, self.max
        )
    }
}
