/*!
 * Session
 * Owns one simulator instance and applies the inbound command contract
 *
 * The session is the single writer: every state-mutating command flows
 * through `handle_command`, which returns the snapshot to broadcast.
 * Boundary errors leave state untouched and produce no broadcast.
 */

pub mod command;
pub mod publisher;
pub mod worker;

pub use command::{Command, ConfigPayload};
pub use publisher::{Publisher, PublisherStats, Subscription};
pub use worker::{spawn_session, SessionHandle};

use crate::analytics::{RangeStats, TimelineAnalytics};
use crate::compare::{compare_all, CompareOptions, CompareReport};
use crate::core::errors::{ProcessError, SimError};
use crate::core::types::SimResult;
use crate::process::{Process, ProcessSpec};
use crate::sched::{SchedConfig, Scheduler};
use crate::snapshot::StateSnapshot;
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-writer simulator session
pub struct Session {
    config: SchedConfig,
    scheduler: Option<Scheduler>,
    default_specs: Vec<ProcessSpec>,
    added_specs: Vec<ProcessSpec>,
    analytics: TimelineAnalytics,
    idle_log: Vec<String>,
}

impl Session {
    pub fn new(config: SchedConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scheduler: None,
            default_specs: Vec::new(),
            added_specs: Vec::new(),
            analytics: TimelineAnalytics::new(),
            idle_log: Vec::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &SchedConfig {
        &self.config
    }

    #[inline]
    pub fn scheduler(&self) -> Option<&Scheduler> {
        self.scheduler.as_ref()
    }

    /// Apply one command; the returned snapshot is the broadcast payload
    pub fn handle_command(
        &mut self,
        cmd: Command,
        cancel: &AtomicBool,
    ) -> SimResult<Arc<StateSnapshot>> {
        match cmd {
            Command::Init(payload) => self.init(payload)?,
            Command::Tick => self.tick()?,
            Command::Run { steps } => self.run(steps, cancel)?,
            Command::AddProcess { process } => self.add_process(process)?,
            Command::RemoveProcess { pid } => self.remove_process(&pid)?,
            Command::ClearAdded => self.clear_added()?,
            Command::SetSpeed { tick_ms } => self.set_speed(tick_ms)?,
            Command::SetQuantum { quantum } => self.set_quantum(quantum)?,
            Command::Config(payload) => self.configure(payload)?,
            Command::Reset => self.reset()?,
            Command::Sync => {}
        }
        Ok(self.snapshot())
    }

    /// Value snapshot of the current state (syncs analytics first)
    pub fn snapshot(&mut self) -> Arc<StateSnapshot> {
        match &self.scheduler {
            Some(sched) => {
                self.analytics.sync(sched.gantt());
                Arc::new(StateSnapshot::from_scheduler(sched))
            }
            None => Arc::new(StateSnapshot::default_state(
                &self.config,
                self.idle_log.clone(),
            )),
        }
    }

    /// Busy/idle range query over the committed CPU timeline
    pub fn range_stats(&self, l: usize, r: usize) -> RangeStats {
        self.analytics.range_stats(l, r)
    }

    /// Run every policy on the current workload snapshot
    pub fn compare(&self, opts: Option<CompareOptions>) -> SimResult<CompareReport> {
        let opts = opts.unwrap_or(CompareOptions {
            rr_quantum: self.config.quantum,
            preemptive_priority: self.config.preemptive_priority,
            mlq_sys_quantum: self.config.mlq_sys_quantum,
            mlq_user_quantum: self.config.mlq_user_quantum,
        });
        let procs = self.build_processes()?;
        compare_all(&procs, &opts)
    }

    fn init(&mut self, payload: ConfigPayload) -> SimResult<()> {
        let config = payload.merge_into(&self.config)?;
        config.validate()?;

        // Validate the whole process list before committing anything
        let specs = payload.processes.unwrap_or_default();
        let mut procs = Vec::with_capacity(specs.len());
        for spec in &specs {
            procs.push(Process::from_spec(spec, config.memory.page_size)?);
        }
        let scheduler = Scheduler::new(config.clone(), procs)?;

        self.config = config;
        self.default_specs = specs;
        self.added_specs.clear();
        self.scheduler = Some(scheduler);
        self.analytics = TimelineAnalytics::new();
        self.note(format!(
            "Initialized algorithm={} processes={}",
            self.config.policy.as_str(),
            self.default_specs.len()
        ));
        info!(
            "session initialized: {} with {} processes",
            self.config.policy.as_str(),
            self.default_specs.len()
        );
        Ok(())
    }

    fn tick(&mut self) -> SimResult<()> {
        let sched = self.scheduler.as_mut().ok_or(SimError::NotInitialized)?;
        if !sched.done() {
            sched.tick();
            let t = sched.time();
            self.note(format!("Tick -> t={t}"));
        }
        Ok(())
    }

    fn run(&mut self, steps: u64, cancel: &AtomicBool) -> SimResult<()> {
        let sched = self.scheduler.as_mut().ok_or(SimError::NotInitialized)?;

        let mut executed = 0;
        for _ in 0..steps {
            if sched.done() {
                break;
            }
            // Cancellation is honored between ticks, never mid-tick;
            // completed ticks stay committed
            if cancel.swap(false, Ordering::SeqCst) {
                info!("run cancelled after {executed} ticks");
                break;
            }
            sched.tick();
            executed += 1;
        }
        let t = sched.time();
        self.note(format!("Run steps={executed} -> t={t}"));
        Ok(())
    }

    fn add_process(&mut self, spec: ProcessSpec) -> SimResult<()> {
        let process = Process::from_spec(&spec, self.config.memory.page_size)?;

        match self.scheduler.as_mut() {
            Some(sched) => {
                sched.add_process(process)?;
                let pid = spec.pid.trim().to_string();
                self.added_specs.push(spec);
                self.note(format!("Added {pid}"));
            }
            None => {
                // First contact: bootstrap a session around this process
                let sched = Scheduler::new(self.config.clone(), vec![process])?;
                self.scheduler = Some(sched);
                let pid = spec.pid.trim().to_string();
                self.added_specs.push(spec);
                self.note(format!("Added {pid} (bootstrap)"));
            }
        }
        Ok(())
    }

    fn remove_process(&mut self, pid: &str) -> SimResult<()> {
        let target = pid.trim();
        if target.is_empty() {
            return Err(ProcessError::MissingPid.into());
        }
        let Some(pos) = self
            .added_specs
            .iter()
            .position(|spec| spec.pid.trim() == target)
        else {
            return Err(ProcessError::UnknownPid(target.to_string()).into());
        };

        self.added_specs.remove(pos);
        self.rebuild_scheduler()?;
        self.note(format!("Removed added process {target}"));
        Ok(())
    }

    fn clear_added(&mut self) -> SimResult<()> {
        self.added_specs.clear();
        self.rebuild_scheduler()?;
        self.note("Cleared all user-added processes".to_string());
        Ok(())
    }

    fn set_speed(&mut self, tick_ms: u64) -> SimResult<()> {
        self.config.tick_ms = tick_ms.max(1);
        if let Some(sched) = self.scheduler.as_mut() {
            sched.reconfigure(self.config.clone())?;
        }
        Ok(())
    }

    fn set_quantum(&mut self, quantum: u64) -> SimResult<()> {
        if quantum < 1 {
            return Err(SimError::config("quantum must be >= 1"));
        }
        self.config.quantum = quantum;
        if let Some(sched) = self.scheduler.as_mut() {
            sched.set_quantum(quantum)?;
        }
        Ok(())
    }

    fn configure(&mut self, payload: ConfigPayload) -> SimResult<()> {
        let config = payload.merge_into(&self.config)?;
        config.validate()?;

        match self.scheduler.as_mut() {
            Some(sched) => sched.reconfigure(config.clone())?,
            None => {}
        }
        self.config = config;
        self.note(format!(
            "Config algorithm={} preemptive={} quantum={} mem={}:{}/{}",
            self.config.policy.as_str(),
            self.config.preemptive_priority,
            self.config.quantum,
            self.config.memory.mode.as_str(),
            self.config.memory.policy.as_str(),
            self.config.memory.num_frames
        ));
        Ok(())
    }

    fn reset(&mut self) -> SimResult<()> {
        self.rebuild_scheduler()?;
        self.note("Session reset".to_string());
        Ok(())
    }

    /// Rebuild the scheduler from the retained descriptors at t=0
    fn rebuild_scheduler(&mut self) -> SimResult<()> {
        let procs = self.build_processes()?;
        if self.scheduler.is_some() || !procs.is_empty() {
            self.scheduler = Some(Scheduler::new(self.config.clone(), procs)?);
        }
        self.analytics = TimelineAnalytics::new();
        Ok(())
    }

    fn build_processes(&self) -> SimResult<Vec<Process>> {
        let mut procs = Vec::with_capacity(self.default_specs.len() + self.added_specs.len());
        for spec in self.default_specs.iter().chain(self.added_specs.iter()) {
            procs.push(Process::from_spec(spec, self.config.memory.page_size)?);
        }
        Ok(procs)
    }

    fn note(&mut self, line: String) {
        match self.scheduler.as_mut() {
            Some(sched) => sched.note(line),
            None => self.idle_log.push(line),
        }
    }
}
