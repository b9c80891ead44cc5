/*!
 * Range Analytics
 * Busy/idle range queries over the CPU timeline
 *
 * Lives next to the scheduler and mutates only in response to committed
 * timeline changes: the engine diffs the new timeline against the prefix
 * it has already indexed and appends, or rebuilds when the prefix no
 * longer matches (reset, removal, policy change).
 */

pub mod fenwick;
pub mod segtree;

pub use fenwick::Fenwick;
pub use segtree::{RunNode, RunSegTree};

use crate::core::types::IDLE;
use log::debug;
use serde::Serialize;

/// Busy/idle statistics for one timeline window
#[derive(Debug, Clone, Serialize)]
pub struct RangeStats {
    pub busy: u64,
    pub idle: u64,
    pub util_percent: f64,
    pub longest_busy_run: u32,
    pub longest_idle_run: u32,
}

/// Incremental index over the CPU timeline
#[derive(Debug, Clone, Default)]
pub struct TimelineAnalytics {
    seen: Vec<String>,
    sums: Fenwick,
    runs: RunSegTree,
}

impl TimelineAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Bring the index up to date with a committed timeline
    pub fn sync(&mut self, timeline: &[String]) {
        let prefix_intact = timeline.len() >= self.seen.len()
            && self
                .seen
                .iter()
                .zip(timeline.iter())
                .all(|(seen, token)| seen == token);

        if !prefix_intact {
            debug!(
                "timeline prefix mismatch (indexed {}, now {}), rebuilding analytics",
                self.seen.len(),
                timeline.len()
            );
            self.seen.clear();
            self.sums.clear();
            self.runs.clear();
        }

        for token in &timeline[self.seen.len()..] {
            let busy = token != IDLE;
            self.sums.append(busy);
            self.runs.append(busy);
            self.seen.push(token.clone());
        }
    }

    /// Query the inclusive window `[l, r]`
    pub fn range_stats(&self, l: usize, r: usize) -> RangeStats {
        if self.seen.is_empty() || l > r {
            return RangeStats {
                busy: 0,
                idle: 0,
                util_percent: 0.0,
                longest_busy_run: 0,
                longest_idle_run: 0,
            };
        }
        let r = r.min(self.seen.len() - 1);
        if l > r {
            return RangeStats {
                busy: 0,
                idle: 0,
                util_percent: 0.0,
                longest_busy_run: 0,
                longest_idle_run: 0,
            };
        }

        let busy = self.sums.range_sum(l, r);
        let width = (r - l + 1) as u64;
        let node = self.runs.query(l, r);
        RangeStats {
            busy,
            idle: width - busy,
            util_percent: busy as f64 / width as f64 * 100.0,
            longest_busy_run: node.best1,
            longest_idle_run: node.best0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tl(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sync_and_query() {
        let mut analytics = TimelineAnalytics::new();
        analytics.sync(&tl(&["P1", "P1", "IDLE", "P2", "P2", "P2", "IDLE", "IDLE"]));

        let stats = analytics.range_stats(0, 7);
        assert_eq!(stats.busy, 5);
        assert_eq!(stats.idle, 3);
        assert_eq!(stats.longest_busy_run, 3);
        assert_eq!(stats.longest_idle_run, 2);

        let window = analytics.range_stats(2, 4);
        assert_eq!(window.busy, 2);
        assert_eq!(window.longest_busy_run, 2);
        assert_eq!(window.longest_idle_run, 1);
    }

    #[test]
    fn test_incremental_append() {
        let mut analytics = TimelineAnalytics::new();
        let mut timeline = tl(&["P1", "IDLE"]);
        analytics.sync(&timeline);

        timeline.push("P1".into());
        timeline.push("P1".into());
        analytics.sync(&timeline);

        assert_eq!(analytics.len(), 4);
        let stats = analytics.range_stats(0, 3);
        assert_eq!(stats.busy, 3);
        assert_eq!(stats.longest_busy_run, 2);
    }

    #[test]
    fn test_prefix_mismatch_triggers_rebuild() {
        let mut analytics = TimelineAnalytics::new();
        analytics.sync(&tl(&["P1", "P1", "P1"]));

        // Timeline restarted with different content
        let fresh = tl(&["P2", "IDLE"]);
        analytics.sync(&fresh);
        assert_eq!(analytics.len(), 2);
        let stats = analytics.range_stats(0, 1);
        assert_eq!(stats.busy, 1);
        assert_eq!(stats.idle, 1);
    }

    #[test]
    fn test_utilization_percent() {
        let mut analytics = TimelineAnalytics::new();
        analytics.sync(&tl(&["P1", "IDLE", "P1", "IDLE"]));
        let stats = analytics.range_stats(0, 3);
        assert!((stats.util_percent - 50.0).abs() < 1e-9);
    }
}
