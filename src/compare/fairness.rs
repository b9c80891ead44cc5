/*!
 * Fairness Metrics
 * Wait-time dispersion statistics per comparison run
 */

use serde::Serialize;

/// Wait-time fairness summary over completed processes
#[derive(Debug, Clone, Default, Serialize)]
pub struct FairnessMetrics {
    pub max_wt: u64,
    pub p95_wt: u64,
    pub wt_std: f64,
    pub starvation: bool,
}

impl FairnessMetrics {
    /// Compute from the completed processes' wait times
    pub fn from_waits(waits: &[u64]) -> Self {
        if waits.is_empty() {
            return Self::default();
        }

        let n = waits.len();
        let max_wt = waits.iter().copied().max().unwrap_or(0);
        let avg = waits.iter().sum::<u64>() as f64 / n as f64;

        let variance =
            waits.iter().map(|&w| (w as f64 - avg).powi(2)).sum::<f64>() / n as f64;
        let wt_std = variance.sqrt();

        // Nearest-rank p95: the ceil(0.95 n)-th smallest
        let mut sorted = waits.to_vec();
        sorted.sort_unstable();
        let rank = ((0.95 * n as f64).ceil() as usize).clamp(1, n);
        let p95_wt = sorted[rank - 1];

        let starvation = (max_wt as f64) >= (2.0 * avg).max(10.0);

        Self {
            max_wt,
            p95_wt,
            wt_std,
            starvation,
        }
    }
}
