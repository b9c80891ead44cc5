/*!
 * Scheduler Core
 * Tick-driven CPU scheduler with pluggable policies
 *
 * Owns all runtime state: the process table, ready discipline, I/O
 * device, memory runtime, timelines, and the event log. Readers only
 * ever see value snapshots.
 */

use crate::core::errors::ProcessError;
use crate::core::limits::EVENT_LOG_LIMIT;
use crate::core::types::{Pid, SimResult, Tick, IDLE};
use crate::memory::MemoryManager;
use crate::process::{Process, ProcessState};
use ahash::AHashMap;
use log::info;
use std::collections::VecDeque;

mod device;
mod operations;
mod policy;
mod queue;
mod tick;

pub use device::IoDevice;
pub use policy::{SchedConfig, SchedPolicy};
pub use queue::ReadyQueue;

/// The tick-driven scheduler
pub struct Scheduler {
    config: SchedConfig,
    procs: Vec<Process>,
    index: AHashMap<Pid, usize>,
    time: Tick,
    ready: ReadyQueue,
    running: Option<usize>,
    slice_left: u64,
    io: IoDevice,
    mem_waiting: Vec<usize>,
    memory: MemoryManager,
    gantt: Vec<String>,
    io_gantt: Vec<String>,
    completed: Vec<usize>,
    event_log: VecDeque<String>,
}

impl Scheduler {
    /// Build a scheduler over a validated configuration and process set
    pub fn new(config: SchedConfig, processes: Vec<Process>) -> SimResult<Self> {
        config.validate()?;

        let mut index = AHashMap::with_capacity(processes.len());
        for (idx, proc) in processes.iter().enumerate() {
            if index.insert(proc.pid.clone(), idx).is_some() {
                return Err(ProcessError::DuplicatePid(proc.pid.clone()).into());
            }
        }

        info!(
            "scheduler initialized: policy={} processes={} memory={}",
            config.policy.as_str(),
            processes.len(),
            config.memory.mode.as_str()
        );

        Ok(Self {
            ready: ReadyQueue::new(config.policy),
            memory: MemoryManager::new(config.memory),
            config,
            procs: processes,
            index,
            time: 0,
            running: None,
            slice_left: 0,
            io: IoDevice::new(),
            mem_waiting: Vec::new(),
            gantt: Vec::new(),
            io_gantt: Vec::new(),
            completed: Vec::new(),
            event_log: VecDeque::new(),
        })
    }

    #[inline]
    pub fn time(&self) -> Tick {
        self.time
    }

    #[inline]
    pub fn config(&self) -> &SchedConfig {
        &self.config
    }

    #[inline]
    pub fn policy(&self) -> SchedPolicy {
        self.config.policy
    }

    pub fn processes(&self) -> &[Process] {
        &self.procs
    }

    pub fn process(&self, pid: &str) -> Option<&Process> {
        self.index.get(pid).map(|&idx| &self.procs[idx])
    }

    #[inline]
    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    /// All processes finished?
    pub fn done(&self) -> bool {
        self.completed.len() == self.procs.len()
    }

    pub fn running_pid(&self) -> Option<&str> {
        self.running.map(|idx| self.procs[idx].pid.as_str())
    }

    pub fn ready_pids(&self) -> Vec<Pid> {
        self.ready
            .iter_indexes()
            .into_iter()
            .map(|idx| self.procs[idx].pid.clone())
            .collect()
    }

    /// (SYS, USER) queue views; empty outside MLQ
    pub fn mlq_pids(&self) -> (Vec<Pid>, Vec<Pid>) {
        let (sys, user) = self.ready.mlq_indexes();
        let to_pids =
            |v: Vec<usize>| v.into_iter().map(|idx| self.procs[idx].pid.clone()).collect();
        (to_pids(sys), to_pids(user))
    }

    pub fn io_active_pid(&self) -> Option<&str> {
        self.io.active().map(|idx| self.procs[idx].pid.as_str())
    }

    pub fn io_waiting_pids(&self) -> Vec<Pid> {
        self.io
            .waiting()
            .map(|idx| self.procs[idx].pid.clone())
            .collect()
    }

    pub fn completed_pids(&self) -> Vec<Pid> {
        self.completed
            .iter()
            .map(|&idx| self.procs[idx].pid.clone())
            .collect()
    }

    pub fn gantt(&self) -> &[String] {
        &self.gantt
    }

    pub fn io_gantt(&self) -> &[String] {
        &self.io_gantt
    }

    pub fn mem_gantt(&self) -> &[String] {
        self.memory.mem_gantt()
    }

    pub fn event_log(&self) -> Vec<String> {
        self.event_log.iter().cloned().collect()
    }

    /// Busy ticks on the CPU timeline
    pub fn busy_ticks(&self) -> u64 {
        self.gantt.iter().filter(|token| *token != IDLE).count() as u64
    }

    /// Append a free-form session note to the event log
    pub fn note(&mut self, line: String) {
        self.log_event(line);
    }

    pub(crate) fn log_event(&mut self, line: String) {
        self.event_log.push_back(line);
        while self.event_log.len() > EVENT_LOG_LIMIT {
            self.event_log.pop_front();
        }
    }

    /// Record a lifecycle transition with the event-log grammar
    /// `t=<n>: <pid> <FROM> -> <TO> [(<reason>)]`
    pub(crate) fn set_state(&mut self, idx: usize, state: ProcessState, reason: Option<&str>) {
        let old = self.procs[idx].state;
        if old == state {
            return;
        }
        self.procs[idx].state = state;
        let line = match reason {
            Some(reason) => format!(
                "t={}: {} {} -> {} ({})",
                self.time,
                self.procs[idx].pid,
                old.as_str(),
                state.as_str(),
                reason
            ),
            None => format!(
                "t={}: {} {} -> {}",
                self.time,
                self.procs[idx].pid,
                old.as_str(),
                state.as_str()
            ),
        };
        self.log_event(line);
    }
}
