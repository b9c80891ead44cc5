/*!
 * Control Messages
 * Inbound command contract (JSON, tagged by `type`)
 */

use crate::core::errors::SimError;
use crate::core::types::SimResult;
use crate::memory::{MemoryConfig, MemoryMode, ReplacementPolicy};
use crate::process::ProcessSpec;
use crate::sched::{SchedConfig, SchedPolicy};
use serde::Deserialize;

/// Configuration fields shared by `init` and `config`; every field is
/// optional and falls back to the current settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigPayload {
    pub algorithm: Option<String>,
    #[serde(alias = "preemptive_priority")]
    pub preemptive: Option<bool>,
    pub tick_ms: Option<u64>,
    pub quantum: Option<u64>,
    pub mlq_sys_quantum: Option<u64>,
    pub mlq_user_quantum: Option<u64>,
    #[serde(alias = "mem_enabled")]
    pub memory_mode: Option<MemoryMode>,
    #[serde(alias = "num_frames", alias = "frames_count")]
    pub frames: Option<usize>,
    #[serde(alias = "memory_algo")]
    pub mem_algo: Option<ReplacementPolicy>,
    pub page_size: Option<u64>,
    #[serde(alias = "fault_penalty_ticks")]
    pub fault_penalty: Option<u64>,
    pub processes: Option<Vec<ProcessSpec>>,
}

impl ConfigPayload {
    /// Merge onto an existing configuration; validated by the caller
    pub fn merge_into(&self, current: &SchedConfig) -> SimResult<SchedConfig> {
        let (policy, pinned_preemptive) = match &self.algorithm {
            Some(name) => SchedPolicy::parse(name)
                .ok_or_else(|| SimError::config(format!("invalid policy '{name}'")))?,
            None => (current.policy, None),
        };

        let preemptive_priority = pinned_preemptive
            .or(self.preemptive)
            .unwrap_or(current.preemptive_priority);

        Ok(SchedConfig {
            policy,
            preemptive_priority,
            tick_ms: self.tick_ms.unwrap_or(current.tick_ms).max(1),
            quantum: self.quantum.unwrap_or(current.quantum),
            mlq_sys_quantum: self.mlq_sys_quantum.unwrap_or(current.mlq_sys_quantum),
            mlq_user_quantum: self.mlq_user_quantum.unwrap_or(current.mlq_user_quantum),
            memory: MemoryConfig {
                mode: self.memory_mode.unwrap_or(current.memory.mode),
                policy: self.mem_algo.unwrap_or(current.memory.policy),
                page_size: self.page_size.unwrap_or(current.memory.page_size),
                num_frames: self.frames.unwrap_or(current.memory.num_frames),
                fault_penalty: self.fault_penalty.unwrap_or(current.memory.fault_penalty),
            },
        })
    }
}

fn default_steps() -> u64 {
    1
}

/// Inbound control message
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Reset + configure + admit processes
    Init(ConfigPayload),
    /// Advance one tick
    Tick,
    /// Advance N ticks (cancellable between ticks)
    Run {
        #[serde(default = "default_steps")]
        steps: u64,
    },
    /// Append to pending arrivals
    AddProcess { process: ProcessSpec },
    /// Remove a user-added process and restart from t=0
    RemoveProcess { pid: String },
    /// Drop the user-added set only
    ClearAdded,
    /// Pacing hint for observers
    SetSpeed { tick_ms: u64 },
    /// Re-arm the RR quantum
    SetQuantum {
        #[serde(alias = "q")]
        quantum: u64,
    },
    /// Live reconfigure; time preserved unless the policy changes
    Config(ConfigPayload),
    /// Restore initial conditions
    Reset,
    /// Read: broadcast the current state
    Sync,
}
