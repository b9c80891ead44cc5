/*!
 * Policy Comparator
 * Runs every policy on the same workload snapshot and ranks the results
 *
 * Comparison runs are CPU-only: memory faults depend on live runtime
 * state that is not replayed here. Each run is bounded by a tick budget.
 */

pub mod fairness;
pub mod pareto;
pub mod score;

pub use fairness::FairnessMetrics;
pub use pareto::pareto_front;
pub use score::{rank, Confidence, OptimizeMode, Ranking, ScoredPolicy};

use crate::core::limits::COMPARE_TICK_BUDGET;
use crate::core::types::SimResult;
use crate::memory::{MemoryConfig, MemoryMode};
use crate::metrics::{compute_aggregate, compute_rows, ProcessRow};
use crate::process::Process;
use crate::sched::{SchedConfig, SchedPolicy, Scheduler};
use log::{info, warn};
use serde::Serialize;

/// Tunables shared across comparison runs
#[derive(Debug, Clone)]
pub struct CompareOptions {
    pub rr_quantum: u64,
    pub preemptive_priority: bool,
    pub mlq_sys_quantum: u64,
    pub mlq_user_quantum: u64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            rr_quantum: 2,
            preemptive_priority: true,
            mlq_sys_quantum: 2,
            mlq_user_quantum: 4,
        }
    }
}

/// One policy's full-run summary
#[derive(Debug, Clone, Serialize)]
pub struct CompareRow {
    pub algorithm: String,
    pub avg_wt: f64,
    pub avg_tat: f64,
    pub avg_rt: f64,
    pub cpu_util: f64,
    pub makespan: u64,
    pub throughput: f64,
    pub per_process: Vec<ProcessRow>,
    pub fairness: FairnessMetrics,
}

/// Workload shape signals feeding the adaptive weights
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkloadProfile {
    pub total_cpu: f64,
    pub total_io: f64,
    pub io_ratio: f64,
    pub avg_cpu_burst: f64,
    pub std_cpu_burst: f64,
    pub burst_variance: f64,
    pub n_procs: f64,
    pub arrival_spread: f64,
    pub burst_count_total: f64,
}

impl WorkloadProfile {
    pub fn from_processes(processes: &[Process]) -> Self {
        let mut cpu_bursts: Vec<u64> = Vec::new();
        let mut total_io = 0u64;
        let mut arrivals: Vec<u64> = Vec::new();

        for p in processes {
            arrivals.push(p.arrival_time);
            cpu_bursts.extend(&p.cpu_bursts);
            total_io += p.io_bursts.iter().sum::<u64>();
        }

        let total_cpu: u64 = cpu_bursts.iter().sum();
        let burst_count = cpu_bursts.len();
        let avg_cpu = if burst_count > 0 {
            total_cpu as f64 / burst_count as f64
        } else {
            0.0
        };
        let var_cpu = if burst_count > 0 {
            cpu_bursts
                .iter()
                .map(|&b| (b as f64 - avg_cpu).powi(2))
                .sum::<f64>()
                / burst_count as f64
        } else {
            0.0
        };
        let std_cpu = var_cpu.sqrt();
        let arrival_spread = match (arrivals.iter().max(), arrivals.iter().min()) {
            (Some(&max), Some(&min)) => (max - min) as f64,
            _ => 0.0,
        };

        Self {
            total_cpu: total_cpu as f64,
            total_io: total_io as f64,
            io_ratio: total_io as f64 / (total_cpu.max(1)) as f64,
            avg_cpu_burst: avg_cpu,
            std_cpu_burst: std_cpu,
            burst_variance: std_cpu / avg_cpu.max(1.0),
            n_procs: processes.len() as f64,
            arrival_spread,
            burst_count_total: burst_count as f64,
        }
    }
}

/// Complete comparison output
#[derive(Debug, Clone, Serialize)]
pub struct CompareReport {
    pub results: Vec<CompareRow>,
    pub workload: WorkloadProfile,
    /// Algorithms on the Pareto front, in policy order
    pub pareto: Vec<String>,
    pub rankings: Vec<Ranking>,
}

/// Run one policy to completion (bounded) on a fresh clone of the workload
pub fn run_policy_once(
    processes: &[Process],
    policy: SchedPolicy,
    opts: &CompareOptions,
) -> SimResult<CompareRow> {
    let mut clones: Vec<Process> = processes.to_vec();
    for p in &mut clones {
        p.reset();
    }

    let config = SchedConfig {
        policy,
        // Priority is always compared preemptive, whatever the live
        // session is configured to
        preemptive_priority: true,
        quantum: if policy == SchedPolicy::Rr {
            opts.rr_quantum.max(1)
        } else {
            2
        },
        mlq_sys_quantum: opts.mlq_sys_quantum.max(1),
        mlq_user_quantum: opts.mlq_user_quantum.max(1),
        memory: MemoryConfig {
            mode: MemoryMode::CpuOnly,
            ..MemoryConfig::default()
        },
        ..SchedConfig::default()
    };

    let mut sched = Scheduler::new(config, clones)?;
    let mut guard = 0u64;
    while !sched.done() && guard < COMPARE_TICK_BUDGET {
        sched.tick();
        guard += 1;
    }
    if guard == COMPARE_TICK_BUDGET {
        warn!(
            "comparison run for {} hit the tick budget at t={}",
            policy.as_str(),
            sched.time()
        );
    }

    let rows = compute_rows(sched.processes());
    let aggregate = compute_aggregate(&rows, sched.gantt());
    let waits: Vec<u64> = rows.iter().filter_map(|row| row.wt).collect();

    Ok(CompareRow {
        algorithm: policy.as_str().to_string(),
        avg_wt: aggregate.avg_wt,
        avg_tat: aggregate.avg_tat,
        avg_rt: aggregate.avg_rt,
        cpu_util: aggregate.cpu_util,
        makespan: aggregate.makespan,
        throughput: aggregate.throughput,
        per_process: rows,
        fairness: FairnessMetrics::from_waits(&waits),
    })
}

/// Run all supported policies and derive the front and per-mode rankings
pub fn compare_all(processes: &[Process], opts: &CompareOptions) -> SimResult<CompareReport> {
    info!(
        "comparing {} policies over {} processes",
        SchedPolicy::all().len(),
        processes.len()
    );

    let mut results = Vec::with_capacity(SchedPolicy::all().len());
    for policy in SchedPolicy::all() {
        results.push(run_policy_once(processes, policy, opts)?);
    }

    let workload = WorkloadProfile::from_processes(processes);
    let pareto = pareto_front(&results)
        .into_iter()
        .map(|i| results[i].algorithm.clone())
        .collect();
    let rankings = [
        OptimizeMode::Throughput,
        OptimizeMode::Responsiveness,
        OptimizeMode::Fairness,
    ]
    .into_iter()
    .map(|mode| rank(&results, mode, &workload))
    .collect();

    Ok(CompareReport {
        results,
        workload,
        pareto,
        rankings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessSpec;

    fn proc(pid: &str, arrival: i64, bursts: Vec<i64>) -> Process {
        let spec = ProcessSpec {
            pid: pid.into(),
            arrival_time: arrival,
            bursts: Some(crate::process::BurstList::Flat(bursts)),
            ..Default::default()
        };
        Process::from_spec(&spec, 4096).unwrap()
    }

    #[test]
    fn test_compare_runs_every_policy() {
        let procs = vec![
            proc("P1", 0, vec![5]),
            proc("P2", 1, vec![3]),
            proc("P3", 2, vec![1]),
        ];
        let report = compare_all(&procs, &CompareOptions::default()).unwrap();
        let algos: Vec<&str> = report.results.iter().map(|r| r.algorithm.as_str()).collect();
        assert_eq!(algos, vec!["FCFS", "SJF", "PRIORITY", "RR", "MLQ"]);
        assert!(!report.pareto.is_empty());
        assert_eq!(report.rankings.len(), 3);
    }

    #[test]
    fn test_workload_profile_signals() {
        let procs = vec![
            proc("P1", 0, vec![4, 6, 4]),
            proc("P2", 12, vec![2]),
        ];
        let profile = WorkloadProfile::from_processes(&procs);
        assert_eq!(profile.total_cpu, 10.0);
        assert_eq!(profile.total_io, 6.0);
        assert!((profile.io_ratio - 0.6).abs() < 1e-9);
        assert_eq!(profile.arrival_spread, 12.0);
        assert_eq!(profile.n_procs, 2.0);
    }

    #[test]
    fn test_runs_are_isolated_from_input() {
        let procs = vec![proc("P1", 0, vec![5])];
        let _ = compare_all(&procs, &CompareOptions::default()).unwrap();
        // Inputs untouched: comparator clones and resets internally
        assert_eq!(procs[0].state, crate::process::ProcessState::New);
        assert_eq!(procs[0].remaining, 5);
    }

    #[test]
    fn test_sjf_beats_fcfs_on_convoy_workload() {
        // Long job first, short jobs behind it
        let procs = vec![
            proc("P1", 0, vec![20]),
            proc("P2", 1, vec![1]),
            proc("P3", 2, vec![1]),
        ];
        let report = compare_all(&procs, &CompareOptions::default()).unwrap();
        let wt_of = |name: &str| {
            report
                .results
                .iter()
                .find(|r| r.algorithm == name)
                .unwrap()
                .avg_wt
        };
        // All policies finish the convoy; SJF cannot be worse than FCFS here
        assert!(wt_of("SJF") <= wt_of("FCFS"));
    }
}
