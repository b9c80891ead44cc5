/*!
 * Scheduler Operations
 * Process admission, removal, reset, and live reconfiguration
 */

use super::{ReadyQueue, SchedPolicy, Scheduler};
use crate::core::errors::{ProcessError, SimError};
use crate::core::types::SimResult;
use crate::process::{Process, ProcessState};
use log::info;

impl Scheduler {
    /// Insert a process into the pending set; admitted immediately when its
    /// arrival time is not in the future
    pub fn add_process(&mut self, process: Process) -> SimResult<()> {
        if self.index.contains_key(&process.pid) {
            return Err(ProcessError::DuplicatePid(process.pid).into());
        }

        let idx = self.procs.len();
        self.index.insert(process.pid.clone(), idx);
        info!(
            "process {} added (arrival={} queue={})",
            process.pid,
            process.arrival_time,
            process.queue.as_str()
        );
        self.procs.push(process);

        if self.procs[idx].arrival_time <= self.time {
            self.procs[idx].arrived = true;
            self.set_state(idx, ProcessState::Ready, None);
            self.enqueue_ready(idx);
        }
        Ok(())
    }

    /// Remove a process, then restart the run from t=0 with the remaining
    /// set re-admitted from their original arrival times
    pub fn remove_process(&mut self, pid: &str) -> SimResult<()> {
        let Some(&idx) = self.index.get(pid) else {
            return Err(ProcessError::UnknownPid(pid.to_string()).into());
        };
        self.procs.remove(idx);
        self.rebuild_index();
        info!("process {pid} removed; restarting timeline");
        self.reset();
        Ok(())
    }

    /// Restore initial conditions: t=0, cleared timelines and queues,
    /// every process back to NEW
    pub fn reset(&mut self) {
        self.time = 0;
        self.running = None;
        self.slice_left = 0;
        self.ready = ReadyQueue::new(self.config.policy);
        self.io.clear();
        self.mem_waiting.clear();
        self.gantt.clear();
        self.io_gantt.clear();
        self.completed.clear();
        self.event_log.clear();
        self.memory.reconfigure(self.config.memory);
        for p in &mut self.procs {
            p.reset();
        }
    }

    /// Apply a new configuration atomically.
    ///
    /// Time is preserved unless the policy changes (which restarts the
    /// run); a memory-configuration change resets the memory runtime only.
    pub fn reconfigure(&mut self, config: super::SchedConfig) -> SimResult<()> {
        config.validate()?;
        let policy_changed = config.policy != self.config.policy
            || (config.policy == SchedPolicy::Priority
                && config.preemptive_priority != self.config.preemptive_priority);
        let memory_changed = config.memory != self.config.memory;

        self.config = config;
        if policy_changed {
            info!(
                "policy changed to {}; restarting timeline",
                self.config.policy.as_str()
            );
            self.reset();
        } else if memory_changed {
            self.memory.reconfigure(self.config.memory);
            self.mem_waiting.clear();
        }
        Ok(())
    }

    /// Re-arm the RR quantum
    pub fn set_quantum(&mut self, quantum: u64) -> SimResult<()> {
        if quantum < 1 {
            return Err(SimError::config("quantum must be >= 1"));
        }
        self.config.quantum = quantum;
        if self.running.is_some() && self.config.policy == SchedPolicy::Rr {
            self.slice_left = quantum;
        }
        Ok(())
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .procs
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.pid.clone(), idx))
            .collect();
    }
}
