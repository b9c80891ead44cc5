/*!
 * schedos - Demo Entry Point
 *
 * Brings up a session worker, loads a small mixed workload, runs it to
 * completion, and prints the final snapshot plus a policy comparison.
 */

use log::info;
use schedos::process::ProcessSpec;
use schedos::session::Command;
use schedos::{compare_all, spawn_session, CompareOptions, Process, SchedConfig};
use std::error::Error;

const DEMO_WORKLOAD: &str = r#"{
    "type": "init",
    "algorithm": "RR",
    "quantum": 2,
    "tick_ms": 200,
    "memory_mode": "FULL",
    "mem_algo": "LRU",
    "frames": 8,
    "page_size": 4096,
    "fault_penalty": 3,
    "processes": [
        {"pid": "P1", "arrival_time": 0, "bursts": [5, 2, 3], "priority": 2},
        {"pid": "P2", "arrival_time": 1, "burst_time": 3, "priority": 1, "queue": "SYS"},
        {"pid": "P3", "arrival_time": 2, "burst_time": 6, "priority": 3},
        {"pid": "P4", "arrival_time": 4, "bursts": [2, 1, 2], "priority": 0, "queue": "SYS"}
    ]
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("schedos starting");
    let handle = spawn_session(SchedConfig::default())?;
    let mut subscriber = handle.subscribe();

    handle.send_json(DEMO_WORKLOAD).await?;
    info!("workload loaded, running to completion");

    let mut last = handle.send(Command::Run { steps: 500 }).await?;
    let mut rounds = 0;
    while last.completed.len() < last.processes.len() && rounds < 20 {
        last = handle.send(Command::Run { steps: 500 }).await?;
        rounds += 1;
    }

    let snapshot = subscriber.current();
    info!(
        "run finished at t={}: completed={:?} cpu_util={:.1}% faults={}",
        snapshot.time,
        snapshot.completed,
        snapshot.metrics.cpu_util,
        snapshot.memory.faults
    );

    println!("{}", serde_json::to_string_pretty(&*snapshot)?);

    // Side-by-side policy comparison over the same workload
    let workload: serde_json::Value = serde_json::from_str(DEMO_WORKLOAD)?;
    let specs: Vec<ProcessSpec> = serde_json::from_value(workload["processes"].clone())?;
    let processes = specs
        .iter()
        .map(|spec| Process::from_spec(spec, 4096))
        .collect::<Result<Vec<_>, _>>()?;
    let report = compare_all(&processes, &CompareOptions::default())?;

    info!("pareto front: {:?}", report.pareto);
    for ranking in &report.rankings {
        info!(
            "mode {:?}: best={} confidence={:?}",
            ranking.mode, ranking.best, ranking.confidence
        );
    }

    Ok(())
}
