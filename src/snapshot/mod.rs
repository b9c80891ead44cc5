/*!
 * State Snapshot
 * The outbound wire contract: a full value copy of simulator state
 *
 * Built after every committed mutation; observers never share mutable
 * references with the scheduler.
 */

use crate::core::limits::RECENT_STEPS_SNAPSHOT;
use crate::core::types::{Pid, Tick, IDLE};
use crate::memory::{
    AddrPattern, Frame, MemoryMode, PageTableRow, ReplacementPolicy, TranslationStep,
};
use crate::metrics::{compute_aggregate, compute_rows, Metrics, ProcessRow};
use crate::process::{Process, ProcessState, QueueClass};
use crate::sched::{SchedConfig, SchedPolicy, Scheduler};
use serde::Serialize;
use std::collections::BTreeMap;

/// Static process descriptor plus live runtime fields
#[derive(Debug, Clone, Serialize)]
pub struct ProcessSummary {
    pub pid: Pid,
    pub state: ProcessState,
    pub arrival_time: Tick,
    pub priority: u32,
    pub queue: QueueClass,
    pub burst_index: usize,
    pub remaining_in_current_burst: u64,
    pub bursts: Vec<u64>,
    pub working_set_pages: Vec<u64>,
    pub refs_per_cpu_tick: u32,
    pub addr_pattern: AddrPattern,
    pub vm_size_bytes: u64,
    pub address_base: u64,
}

impl ProcessSummary {
    fn from_process(p: &Process) -> Self {
        Self {
            pid: p.pid.clone(),
            state: p.state,
            arrival_time: p.arrival_time,
            priority: p.priority,
            queue: p.queue,
            burst_index: p.cpu_index,
            remaining_in_current_burst: p.remaining,
            bursts: p.merged_bursts(),
            working_set_pages: p.profile.working_set_pages.clone(),
            refs_per_cpu_tick: p.profile.refs_per_cpu_tick,
            addr_pattern: p.profile.addr_pattern,
            vm_size_bytes: p.profile.vm_size_bytes,
            address_base: p.profile.address_base,
        }
    }
}

/// Memory section of the snapshot
#[derive(Debug, Clone, Serialize)]
pub struct MemorySnapshot {
    pub mode: MemoryMode,
    pub algo: ReplacementPolicy,
    pub page_size: u64,
    pub num_frames: usize,
    pub frames: Vec<Frame>,
    pub fault_penalty: u64,
    pub faults: u64,
    pub hits: u64,
    pub hit_ratio: f64,
    pub page_tables: BTreeMap<Pid, Vec<PageTableRow>>,
    pub recent_steps: Vec<TranslationStep>,
    pub last_translation_log: Vec<String>,
    pub mem_gantt: Vec<String>,
}

impl MemorySnapshot {
    fn from_scheduler(sched: &Scheduler) -> Self {
        let memory = sched.memory();
        let config = memory.config();
        Self {
            mode: config.mode,
            algo: config.policy,
            page_size: config.page_size,
            num_frames: config.num_frames,
            frames: memory.frames().to_vec(),
            fault_penalty: config.fault_penalty,
            faults: memory.faults(),
            hits: memory.hits(),
            hit_ratio: memory.hit_ratio(),
            page_tables: memory.page_table_rows().into_iter().collect(),
            recent_steps: memory.recent_steps(RECENT_STEPS_SNAPSHOT),
            last_translation_log: memory.translation_log(),
            mem_gantt: memory.mem_gantt().to_vec(),
        }
    }

    fn default_state(config: &SchedConfig) -> Self {
        let mem = &config.memory;
        Self {
            mode: mem.mode,
            algo: mem.policy,
            page_size: mem.page_size,
            num_frames: mem.num_frames,
            frames: (0..mem.num_frames).map(Frame::empty).collect(),
            fault_penalty: mem.fault_penalty,
            faults: 0,
            hits: 0,
            hit_ratio: 0.0,
            page_tables: BTreeMap::new(),
            recent_steps: Vec::new(),
            last_translation_log: Vec::new(),
            mem_gantt: Vec::new(),
        }
    }
}

/// Full simulator state; exactly this shape is the wire contract
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub time: Tick,
    pub algorithm: SchedPolicy,
    pub preemptive: bool,
    pub tick_ms: u64,
    pub quantum: u64,
    pub running: String,
    pub ready_queue: Vec<Pid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sys_queue: Option<Vec<Pid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_queue: Option<Vec<Pid>>,
    pub io_active: String,
    pub io_queue: Vec<Pid>,
    pub gantt: Vec<String>,
    pub io_gantt: Vec<String>,
    pub mem_gantt: Vec<String>,
    pub completed: Vec<Pid>,
    pub metrics: Metrics,
    pub per_process: Vec<ProcessRow>,
    pub processes: Vec<ProcessSummary>,
    pub event_log: Vec<String>,
    pub memory: MemorySnapshot,
}

impl StateSnapshot {
    /// Serialize the live scheduler into a value snapshot
    pub fn from_scheduler(sched: &Scheduler) -> Self {
        let config = sched.config();
        let per_process = compute_rows(sched.processes());
        let metrics = compute_aggregate(&per_process, sched.gantt());

        let (sys_queue, user_queue) = if config.policy == SchedPolicy::Mlq {
            let (sys, user) = sched.mlq_pids();
            (Some(sys), Some(user))
        } else {
            (None, None)
        };

        Self {
            time: sched.time(),
            algorithm: config.policy,
            preemptive: config.preemptive_priority,
            tick_ms: config.tick_ms,
            quantum: config.quantum,
            running: sched.running_pid().unwrap_or(IDLE).to_string(),
            ready_queue: sched.ready_pids(),
            sys_queue,
            user_queue,
            io_active: sched.io_active_pid().unwrap_or(IDLE).to_string(),
            io_queue: sched.io_waiting_pids(),
            gantt: sched.gantt().to_vec(),
            io_gantt: sched.io_gantt().to_vec(),
            mem_gantt: sched.mem_gantt().to_vec(),
            completed: sched.completed_pids(),
            metrics,
            per_process,
            processes: sched
                .processes()
                .iter()
                .map(ProcessSummary::from_process)
                .collect(),
            event_log: sched.event_log(),
            memory: MemorySnapshot::from_scheduler(sched),
        }
    }

    /// Snapshot for a session with no scheduler yet
    pub fn default_state(config: &SchedConfig, event_log: Vec<String>) -> Self {
        Self {
            time: 0,
            algorithm: config.policy,
            preemptive: config.preemptive_priority,
            tick_ms: config.tick_ms,
            quantum: config.quantum,
            running: IDLE.to_string(),
            ready_queue: Vec::new(),
            sys_queue: None,
            user_queue: None,
            io_active: IDLE.to_string(),
            io_queue: Vec::new(),
            gantt: Vec::new(),
            io_gantt: Vec::new(),
            mem_gantt: Vec::new(),
            completed: Vec::new(),
            metrics: Metrics::default(),
            per_process: Vec::new(),
            processes: Vec::new(),
            event_log,
            memory: MemorySnapshot::default_state(config),
        }
    }
}
