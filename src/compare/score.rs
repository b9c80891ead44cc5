/*!
 * Weighted Ranking
 * Mode-aware scoring with robust per-cohort normalization
 *
 * Weights start from a mode-specific base and shift on workload signals;
 * each metric is normalized with a median/IQR z passed through a sigmoid
 * (min-max when the IQR collapses) so outliers cannot dominate. Lower
 * score is better.
 */

use super::{CompareRow, WorkloadProfile};
use serde::Serialize;

const METRIC_COUNT: usize = 9;

/// Metric order used throughout scoring; the last two are higher-is-better
const METRIC_NAMES: [&str; METRIC_COUNT] = [
    "avg_wt", "avg_tat", "avg_rt", "makespan", "p95_wt", "max_wt", "wt_std", "cpu_util",
    "throughput",
];

const HIGHER_IS_BETTER: [bool; METRIC_COUNT] =
    [false, false, false, false, false, false, false, true, true];

/// Optimization target for the weighted ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizeMode {
    Throughput,
    Responsiveness,
    Fairness,
}

impl OptimizeMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "throughput" => Some(Self::Throughput),
            "responsiveness" => Some(Self::Responsiveness),
            "fairness" => Some(Self::Fairness),
            _ => None,
        }
    }

    fn base_weights(&self) -> [f64; METRIC_COUNT] {
        match self {
            //                      wt    tat   rt    mksp  p95   max   std   util  thru
            Self::Throughput => [0.10, 0.15, 0.05, 0.20, 0.02, 0.02, 0.01, 0.15, 0.30],
            Self::Responsiveness => [0.20, 0.10, 0.30, 0.05, 0.15, 0.10, 0.02, 0.03, 0.05],
            Self::Fairness => [0.15, 0.05, 0.05, 0.03, 0.20, 0.20, 0.25, 0.02, 0.05],
        }
    }
}

/// Ranking confidence from the relative gap of the two best scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// One scored policy
#[derive(Debug, Clone, Serialize)]
pub struct ScoredPolicy {
    pub algorithm: String,
    pub score: f64,
}

/// Weighted-ranking result for one mode
#[derive(Debug, Clone, Serialize)]
pub struct Ranking {
    pub mode: OptimizeMode,
    pub entries: Vec<ScoredPolicy>,
    pub best: String,
    pub confidence: Confidence,
    pub weights: Vec<(String, f64)>,
}

/// Workload-adaptive weights: the mode base shifted by cohort signals,
/// then renormalized to sum 1
pub fn effective_weights(mode: OptimizeMode, workload: &WorkloadProfile) -> [f64; METRIC_COUNT] {
    let mut weights = mode.base_weights();

    // I/O-heavy workloads reward keeping the CPU busy
    if workload.io_ratio >= 0.6 {
        weights[7] += 0.05; // cpu_util
        weights[8] += 0.05; // throughput
    }
    // High burst variance punishes tail waits
    if workload.burst_variance >= 0.8 {
        weights[4] += 0.05; // p95_wt
        weights[6] += 0.05; // wt_std
    }
    // Spread-out arrivals emphasize response time
    if workload.arrival_spread >= 10.0 {
        weights[2] += 0.05; // avg_rt
    }
    // Large cohorts surface starvation
    if workload.n_procs >= 12.0 {
        weights[5] += 0.05; // max_wt
        weights[6] += 0.05; // wt_std
    }

    let total: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

fn metric_values(row: &CompareRow) -> [f64; METRIC_COUNT] {
    [
        row.avg_wt,
        row.avg_tat,
        row.avg_rt,
        row.makespan as f64,
        row.fairness.p95_wt as f64,
        row.fairness.max_wt as f64,
        row.fairness.wt_std,
        row.cpu_util,
        row.throughput,
    ]
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    }
}

/// Robust normalization of one metric across the cohort: median/IQR z
/// through a sigmoid; min-max when IQR is zero; 0.5 when all equal
pub fn normalize_cohort(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = percentile(&sorted, 0.5);
    let iqr = percentile(&sorted, 0.75) - percentile(&sorted, 0.25);

    if iqr > f64::EPSILON {
        values
            .iter()
            .map(|&v| {
                let z = (v - median) / iqr;
                1.0 / (1.0 + (-z).exp())
            })
            .collect()
    } else {
        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        if (max - min).abs() <= f64::EPSILON {
            vec![0.5; values.len()]
        } else {
            values.iter().map(|&v| (v - min) / (max - min)).collect()
        }
    }
}

/// Score every row under a mode; lower is better
pub fn rank(rows: &[CompareRow], mode: OptimizeMode, workload: &WorkloadProfile) -> Ranking {
    let weights = effective_weights(mode, workload);

    // Normalize each metric across the cohort, flipping direction so that
    // every normalized column reads "lower is better"
    let mut norm_columns: Vec<Vec<f64>> = Vec::with_capacity(METRIC_COUNT);
    for m in 0..METRIC_COUNT {
        let column: Vec<f64> = rows.iter().map(|row| metric_values(row)[m]).collect();
        let mut normalized = normalize_cohort(&column);
        if HIGHER_IS_BETTER[m] {
            for v in &mut normalized {
                *v = 1.0 - *v;
            }
        }
        norm_columns.push(normalized);
    }

    let mut entries: Vec<(usize, ScoredPolicy)> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let score: f64 = (0..METRIC_COUNT).map(|m| weights[m] * norm_columns[m][i]).sum();
            (
                i,
                ScoredPolicy {
                    algorithm: row.algorithm.clone(),
                    score,
                },
            )
        })
        .collect();

    entries.sort_by(|(i, a), (j, b)| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| tie_break(mode, &rows[*i], &rows[*j]))
    });

    let scored: Vec<ScoredPolicy> = entries.into_iter().map(|(_, e)| e).collect();
    let best = scored
        .first()
        .map(|e| e.algorithm.clone())
        .unwrap_or_default();
    let confidence = confidence_from_gap(&scored);

    Ranking {
        mode,
        entries: scored,
        best,
        confidence,
        weights: METRIC_NAMES
            .iter()
            .zip(weights.iter())
            .map(|(name, &w)| (name.to_string(), w))
            .collect(),
    }
}

/// Mode-specific lexicographic tie-break on raw metrics
fn tie_break(mode: OptimizeMode, a: &CompareRow, b: &CompareRow) -> std::cmp::Ordering {
    let cmp = |x: f64, y: f64| x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal);
    let chain = match mode {
        OptimizeMode::Throughput => cmp(b.throughput, a.throughput)
            .then(cmp(a.makespan as f64, b.makespan as f64))
            .then(cmp(a.avg_wt, b.avg_wt)),
        OptimizeMode::Responsiveness => cmp(a.avg_rt, b.avg_rt)
            .then(cmp(a.avg_wt, b.avg_wt))
            .then(cmp(a.fairness.p95_wt as f64, b.fairness.p95_wt as f64)),
        OptimizeMode::Fairness => cmp(a.fairness.wt_std, b.fairness.wt_std)
            .then(cmp(a.fairness.max_wt as f64, b.fairness.max_wt as f64))
            .then(cmp(a.avg_wt, b.avg_wt)),
    };
    chain.then_with(|| a.algorithm.cmp(&b.algorithm))
}

fn confidence_from_gap(scored: &[ScoredPolicy]) -> Confidence {
    if scored.len() < 2 {
        return Confidence::High;
    }
    let best = scored[0].score;
    let second = scored[1].score;
    let gap = (second - best) / second.abs().max(1e-9);
    if gap >= 0.08 {
        Confidence::High
    } else if gap >= 0.04 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}
