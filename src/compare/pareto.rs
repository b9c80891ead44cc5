/*!
 * Pareto Front
 * Non-dominated policy selection across directed metrics
 */

use super::CompareRow;

/// Metric vector with all directions flipped to "lower is better"
fn objective_vector(row: &CompareRow) -> [f64; 9] {
    [
        row.avg_wt,
        row.avg_tat,
        row.avg_rt,
        row.makespan as f64,
        row.fairness.p95_wt as f64,
        row.fairness.max_wt as f64,
        row.fairness.wt_std,
        -row.cpu_util,
        -row.throughput,
    ]
}

/// `a` dominates `b`: no worse everywhere, strictly better somewhere
fn dominates(a: &[f64; 9], b: &[f64; 9]) -> bool {
    let mut strictly_better = false;
    for (x, y) in a.iter().zip(b.iter()) {
        if x > y {
            return false;
        }
        if x < y {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Indices of the rows on the Pareto front, in input order
pub fn pareto_front(rows: &[CompareRow]) -> Vec<usize> {
    let vectors: Vec<[f64; 9]> = rows.iter().map(objective_vector).collect();
    (0..rows.len())
        .filter(|&i| {
            !vectors
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && dominates(other, &vectors[i]))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::fairness::FairnessMetrics;
    use super::*;

    fn row(algorithm: &str, avg_wt: f64, makespan: u64, throughput: f64) -> CompareRow {
        CompareRow {
            algorithm: algorithm.to_string(),
            avg_wt,
            avg_tat: avg_wt + 5.0,
            avg_rt: avg_wt / 2.0,
            cpu_util: 100.0,
            makespan,
            throughput,
            per_process: Vec::new(),
            fairness: FairnessMetrics::from_waits(&[avg_wt as u64]),
        }
    }

    #[test]
    fn test_dominated_row_excluded() {
        // B is strictly worse than A on every directed metric
        let rows = vec![
            row("A", 2.0, 10, 0.4),
            row("B", 5.0, 14, 0.2),
        ];
        assert_eq!(pareto_front(&rows), vec![0]);
    }

    #[test]
    fn test_incomparable_rows_both_kept() {
        // A better on waits, B better on throughput/makespan
        let rows = vec![
            row("A", 2.0, 16, 0.2),
            row("B", 5.0, 10, 0.5),
        ];
        assert_eq!(pareto_front(&rows), vec![0, 1]);
    }

    #[test]
    fn test_identical_rows_all_kept() {
        let rows = vec![row("A", 3.0, 12, 0.3), row("B", 3.0, 12, 0.3)];
        assert_eq!(pareto_front(&rows), vec![0, 1]);
    }
}
