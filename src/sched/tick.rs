/*!
 * Tick Machine
 * The fixed per-tick phase ordering
 *
 * Phases: admit arrivals, release memory-waiters, advance I/O,
 * preemption check, dispatch, execute, post-execute, advance time.
 * Nothing in here can fail; faults and waits are modeled outcomes.
 */

use super::{SchedPolicy, Scheduler};
use crate::core::types::IDLE;
use crate::process::{ProcessState, QueueClass};

/// What the execute phase did this tick
enum Executed {
    IdleCpu,
    Ran(usize),
    Faulted,
}

impl Scheduler {
    /// Advance logical time by exactly one unit
    pub fn tick(&mut self) {
        self.admit_arrivals();
        self.release_mem_waiters();
        self.advance_io();
        self.preemption_check();
        self.dispatch();
        let executed = self.execute();
        if let Executed::Ran(idx) = executed {
            self.post_execute(idx);
        }
        self.account_waits();
        self.time += 1;
    }

    /// Phase 1: NEW -> READY for every pending arrival due at or before now,
    /// ordered by (arrival_time, pid)
    fn admit_arrivals(&mut self) {
        let mut due: Vec<usize> = (0..self.procs.len())
            .filter(|&idx| {
                let p = &self.procs[idx];
                !p.arrived && p.arrival_time <= self.time
            })
            .collect();
        due.sort_by(|&a, &b| {
            let pa = &self.procs[a];
            let pb = &self.procs[b];
            (pa.arrival_time, &pa.pid).cmp(&(pb.arrival_time, &pb.pid))
        });

        for idx in due {
            self.procs[idx].arrived = true;
            self.set_state(idx, ProcessState::Ready, None);
            self.enqueue_ready(idx);
        }
    }

    /// Phase 2: decrement each memory-waiter, release those reaching zero
    fn release_mem_waiters(&mut self) {
        let waiters = std::mem::take(&mut self.mem_waiting);
        for idx in waiters {
            let left = self.procs[idx].mem_wait_left.saturating_sub(1);
            self.procs[idx].mem_wait_left = left;
            if left == 0 {
                self.set_state(idx, ProcessState::Ready, None);
                self.enqueue_ready(idx);
            } else {
                self.mem_waiting.push(idx);
            }
        }
    }

    /// Phase 3: serve one I/O tick; release on completion and keep the
    /// device busy whenever jobs are waiting
    fn advance_io(&mut self) {
        self.io.promote();

        let token = match self.io.active() {
            Some(idx) => {
                let pid = self.procs[idx].pid.clone();
                let remaining = self.procs[idx].io_remaining.saturating_sub(1);
                self.procs[idx].io_remaining = remaining;

                if remaining == 0 {
                    self.io.release();
                    let p = &mut self.procs[idx];
                    if p.has_more_cpu() {
                        p.remaining = p.cpu_bursts[p.cpu_index];
                    }
                    if self.procs[idx].completion_time.is_none() {
                        self.set_state(idx, ProcessState::Ready, None);
                        self.enqueue_ready(idx);
                    }
                }
                pid
            }
            None => IDLE.to_string(),
        };
        self.io_gantt.push(token);
    }

    /// Phase 4: policy-specific preemption and deferred quantum rotation
    fn preemption_check(&mut self) {
        let Some(run) = self.running else { return };

        match self.config.policy {
            SchedPolicy::Rr => {
                if self.slice_left == 0 {
                    if !self.ready.is_empty() {
                        self.set_state(run, ProcessState::Ready, Some("time slice"));
                        self.enqueue_ready(run);
                        self.running = None;
                    } else {
                        self.slice_left = self.config.quantum;
                    }
                }
            }
            SchedPolicy::Mlq => {
                let class = self.procs[run].queue;
                if class == QueueClass::User && self.ready.sys_pending() {
                    self.set_state(run, ProcessState::Ready, Some("preempt"));
                    self.ready.push_front_user(run);
                    self.running = None;
                    self.slice_left = 0;
                } else if self.slice_left == 0 {
                    if self.ready.class_pending(class) {
                        self.set_state(run, ProcessState::Ready, Some("time slice"));
                        self.enqueue_ready(run);
                        self.running = None;
                    } else {
                        self.slice_left = self.class_quantum(class);
                    }
                }
            }
            SchedPolicy::Priority if self.config.preemptive_priority => {
                if let Some(best) = self.select_by(|s, idx| {
                    let p = &s.procs[idx];
                    (p.priority as u64, p.arrival_time, p.pid.clone())
                }) {
                    // Strictly better only; ties never preempt
                    if self.procs[best].priority < self.procs[run].priority {
                        self.set_state(run, ProcessState::Ready, Some("preempt"));
                        self.enqueue_ready(run);
                        self.running = None;
                    }
                }
            }
            _ => {}
        }
    }

    /// Phase 5: move the policy's best candidate to RUNNING
    fn dispatch(&mut self) {
        if self.running.is_some() || self.ready.is_empty() {
            return;
        }

        let next = match self.config.policy {
            SchedPolicy::Fcfs | SchedPolicy::Rr | SchedPolicy::Mlq => self.ready.pop_front(),
            SchedPolicy::Sjf => self.select_by(|s, idx| {
                let p = &s.procs[idx];
                (p.remaining, p.arrival_time, p.pid.clone())
            }),
            SchedPolicy::Priority => self.select_by(|s, idx| {
                let p = &s.procs[idx];
                (p.priority as u64, p.arrival_time, p.pid.clone())
            }),
        };

        let Some(idx) = next else { return };
        self.ready.take(idx);

        self.slice_left = match self.config.policy {
            SchedPolicy::Rr => self.config.quantum,
            SchedPolicy::Mlq => self.class_quantum(self.procs[idx].queue),
            _ => 0,
        };

        self.set_state(idx, ProcessState::Running, None);
        if self.procs[idx].start_time.is_none() {
            self.procs[idx].start_time = Some(self.time);
        }
        self.running = Some(idx);
    }

    /// Phase 6: one CPU tick; in FULL mode each reference may fault,
    /// aborting the tick after charging it to the attempting process
    fn execute(&mut self) -> Executed {
        let Some(idx) = self.running else {
            self.gantt.push(IDLE.to_string());
            self.memory.push_gantt(IDLE);
            return Executed::IdleCpu;
        };

        let pid = self.procs[idx].pid.clone();
        self.gantt.push(pid.clone());

        if self.memory.mode().is_full() {
            let page_size = self.memory.page_size();
            let now = self.time;
            let (addrs, base, vm_size) = {
                let p = &mut self.procs[idx];
                let base = p.profile.address_base;
                let vm_size = p.profile.vm_size_bytes;
                let addrs = p.profile.generate_tick_addrs(&pid, now, page_size);
                (addrs, base, vm_size)
            };

            for va in addrs {
                let step = self.memory.access(self.time, &pid, va, base, vm_size);
                if step.fault {
                    self.memory.push_gantt(format!("FAULT:{pid}"));
                    let penalty = self.procs[idx]
                        .fault_penalty
                        .unwrap_or_else(|| self.memory.fault_penalty());
                    self.set_state(idx, ProcessState::WaitingMem, Some("page fault"));
                    let p = &mut self.procs[idx];
                    p.mem_wait_left = penalty;
                    // The attempted tick is charged to the fault
                    p.mem_wait_ticks += 1;
                    self.mem_waiting.push(idx);
                    self.running = None;
                    self.slice_left = 0;
                    return Executed::Faulted;
                }
            }
            self.memory.push_gantt(format!("HIT:{pid}"));
        } else {
            self.memory.push_gantt(IDLE);
        }

        self.procs[idx].remaining -= 1;
        if self.config.policy.uses_quantum() {
            self.slice_left = self.slice_left.saturating_sub(1);
        }
        Executed::Ran(idx)
    }

    /// Phase 7: burst-completion transitions (quantum rotation is deferred
    /// to the next tick's preemption check)
    fn post_execute(&mut self, idx: usize) {
        if self.procs[idx].remaining > 0 {
            return;
        }

        self.running = None;
        self.slice_left = 0;
        self.procs[idx].cpu_index += 1;

        if self.procs[idx].has_pending_io() {
            let p = &mut self.procs[idx];
            p.io_remaining = p.io_bursts[p.io_index];
            p.io_index += 1;
            self.set_state(idx, ProcessState::WaitingIo, None);
            self.io.enqueue(idx);
            return;
        }

        if self.procs[idx].has_more_cpu() {
            let p = &mut self.procs[idx];
            p.remaining = p.cpu_bursts[p.cpu_index];
            self.set_state(idx, ProcessState::Ready, None);
            self.enqueue_ready(idx);
            return;
        }

        self.set_state(idx, ProcessState::Done, None);
        self.procs[idx].completion_time = Some(self.time + 1);
        self.completed.push(idx);
    }

    /// Phase 8 (before advancing time): wait accounting per process.
    ///
    /// WT accrues in READY and while queued at the I/O device; the served
    /// I/O tick and the fault-attempt tick are charged to their own
    /// counters, keeping TAT = cpu + io_served + wt + mem_wait.
    fn account_waits(&mut self) {
        let cpu_token = self.gantt.last().cloned().unwrap_or_default();
        let io_token = self.io_gantt.last().cloned().unwrap_or_default();

        for p in &mut self.procs {
            if !p.arrived || matches!(p.state, ProcessState::New | ProcessState::Done) {
                continue;
            }
            if cpu_token == p.pid {
                // Ran, or fault-attempted (already charged at fault time)
                continue;
            }
            if io_token == p.pid {
                p.io_served_ticks += 1;
                continue;
            }
            match p.state {
                ProcessState::Ready => p.wt_ticks += 1,
                ProcessState::WaitingIo => p.wt_ticks += 1,
                ProcessState::WaitingMem => p.mem_wait_ticks += 1,
                _ => {}
            }
        }
    }

    /// Route a process into the ready structure
    pub(super) fn enqueue_ready(&mut self, idx: usize) {
        let class = self.procs[idx].queue;
        self.ready.push(idx, class);
    }

    fn class_quantum(&self, class: QueueClass) -> u64 {
        match class {
            QueueClass::Sys => self.config.mlq_sys_quantum,
            QueueClass::User => self.config.mlq_user_quantum,
        }
    }

    /// Best ready candidate under an ascending key
    fn select_by<K: Ord>(&self, key: impl Fn(&Self, usize) -> K) -> Option<usize> {
        self.ready
            .iter_indexes()
            .into_iter()
            .min_by_key(|&idx| key(self, idx))
    }
}
