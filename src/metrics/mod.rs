/*!
 * Metrics
 * Per-process WT/TAT/RT rows and aggregate run statistics
 *
 * Everything here is recomputed lazily from the process table and the CPU
 * timeline at serialization time; averages cover completed processes only.
 */

use crate::core::types::{Pid, Tick, IDLE};
use crate::process::{Process, QueueClass};
use serde::Serialize;

/// Per-process metric row; unfinished fields stay `None`
#[derive(Debug, Clone, Serialize)]
pub struct ProcessRow {
    pub pid: Pid,
    pub at: Tick,
    pub pr: u32,
    pub queue: QueueClass,
    pub st: Option<Tick>,
    pub ct: Option<Tick>,
    pub tat: Option<u64>,
    pub wt: Option<u64>,
    pub rt: Option<u64>,
}

/// Aggregate run metrics
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metrics {
    pub avg_wt: f64,
    pub avg_tat: f64,
    pub avg_rt: f64,
    pub cpu_util: f64,
    pub makespan: Tick,
    pub throughput: f64,
}

/// Build metric rows in stable (arrival, pid) display order
pub fn compute_rows(processes: &[Process]) -> Vec<ProcessRow> {
    let mut ordered: Vec<&Process> = processes.iter().collect();
    ordered.sort_by(|a, b| (a.arrival_time, &a.pid).cmp(&(b.arrival_time, &b.pid)));

    ordered
        .into_iter()
        .map(|p| {
            let rt = p.start_time.map(|st| st - p.arrival_time);
            match p.completion_time {
                Some(ct) => ProcessRow {
                    pid: p.pid.clone(),
                    at: p.arrival_time,
                    pr: p.priority,
                    queue: p.queue,
                    st: p.start_time,
                    ct: Some(ct),
                    tat: Some(ct - p.arrival_time),
                    wt: Some(p.wt_ticks),
                    rt,
                },
                None => ProcessRow {
                    pid: p.pid.clone(),
                    at: p.arrival_time,
                    pr: p.priority,
                    queue: p.queue,
                    st: p.start_time,
                    ct: None,
                    tat: None,
                    wt: None,
                    rt,
                },
            }
        })
        .collect()
}

/// Aggregate metrics from rows and the CPU timeline
pub fn compute_aggregate(rows: &[ProcessRow], gantt: &[String]) -> Metrics {
    let completed: Vec<&ProcessRow> = rows.iter().filter(|row| row.ct.is_some()).collect();
    let n = completed.len();

    let (avg_wt, avg_tat, avg_rt) = if n > 0 {
        let sum = |f: fn(&ProcessRow) -> Option<u64>| {
            completed.iter().filter_map(|row| f(row)).sum::<u64>() as f64 / n as f64
        };
        (sum(|r| r.wt), sum(|r| r.tat), sum(|r| r.rt))
    } else {
        (0.0, 0.0, 0.0)
    };

    let makespan = gantt.len() as Tick;
    let busy = gantt.iter().filter(|token| *token != IDLE).count();
    let cpu_util = if gantt.is_empty() {
        0.0
    } else {
        busy as f64 / gantt.len() as f64 * 100.0
    };
    let throughput = if makespan > 0 {
        n as f64 / makespan as f64
    } else {
        0.0
    };

    Metrics {
        avg_wt,
        avg_tat,
        avg_rt,
        cpu_util,
        makespan,
        throughput,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessSpec;

    fn done_proc(pid: &str, at: Tick, burst: u64, st: Tick, ct: Tick, wt: u64) -> Process {
        let spec = ProcessSpec {
            pid: pid.into(),
            arrival_time: at as i64,
            burst_time: Some(burst as i64),
            ..Default::default()
        };
        let mut p = Process::from_spec(&spec, 4096).unwrap();
        p.start_time = Some(st);
        p.completion_time = Some(ct);
        p.wt_ticks = wt;
        p
    }

    #[test]
    fn test_rows_sorted_by_arrival_then_pid() {
        let procs = vec![
            done_proc("B", 2, 1, 2, 3, 0),
            done_proc("A", 2, 1, 3, 4, 1),
            done_proc("C", 0, 2, 0, 2, 0),
        ];
        let rows = compute_rows(&procs);
        let pids: Vec<&str> = rows.iter().map(|r| r.pid.as_str()).collect();
        assert_eq!(pids, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_tat_and_rt_derivation() {
        let rows = compute_rows(&[done_proc("P1", 1, 3, 5, 8, 4)]);
        assert_eq!(rows[0].tat, Some(7));
        assert_eq!(rows[0].rt, Some(4));
        assert_eq!(rows[0].wt, Some(4));
    }

    #[test]
    fn test_unfinished_rows_have_placeholders() {
        let spec = ProcessSpec {
            pid: "P1".into(),
            burst_time: Some(5),
            ..Default::default()
        };
        let p = Process::from_spec(&spec, 4096).unwrap();
        let rows = compute_rows(&[p]);
        assert_eq!(rows[0].tat, None);
        assert_eq!(rows[0].wt, None);
        assert_eq!(rows[0].rt, None);
    }

    #[test]
    fn test_aggregate_over_completed_only() {
        let spec = ProcessSpec {
            pid: "P2".into(),
            burst_time: Some(5),
            ..Default::default()
        };
        let unfinished = Process::from_spec(&spec, 4096).unwrap();
        let procs = vec![done_proc("P1", 0, 5, 0, 5, 0), unfinished];
        let rows = compute_rows(&procs);
        let gantt: Vec<String> = (0..5).map(|_| "P1".to_string()).collect();
        let metrics = compute_aggregate(&rows, &gantt);
        assert_eq!(metrics.avg_wt, 0.0);
        assert_eq!(metrics.avg_tat, 5.0);
        assert_eq!(metrics.cpu_util, 100.0);
        assert_eq!(metrics.makespan, 5);
        assert!((metrics.throughput - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_idle_ticks_lower_utilization() {
        let rows: Vec<ProcessRow> = Vec::new();
        let gantt = vec![
            "P1".to_string(),
            IDLE.to_string(),
            "P1".to_string(),
            IDLE.to_string(),
        ];
        let metrics = compute_aggregate(&rows, &gantt);
        assert_eq!(metrics.cpu_util, 50.0);
    }
}
