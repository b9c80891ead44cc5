/*!
 * Scheduling Policies
 * Policy kinds and validated scheduler configuration
 */

use crate::core::errors::SimError;
use crate::core::types::SimResult;
use crate::memory::{MemoryConfig, MemoryMode, ReplacementPolicy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// CPU scheduling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedPolicy {
    #[default]
    Fcfs,
    Sjf,
    Priority,
    Rr,
    Mlq,
}

impl SchedPolicy {
    /// Parse a policy name; `PRIORITY_NP`/`PRIORITY_P` additionally pin the
    /// preemption flag
    pub fn parse(s: &str) -> Option<(Self, Option<bool>)> {
        match s.trim().to_uppercase().as_str() {
            "FCFS" => Some((Self::Fcfs, None)),
            "SJF" => Some((Self::Sjf, None)),
            "PRIORITY" => Some((Self::Priority, None)),
            "PRIORITY_NP" => Some((Self::Priority, Some(false))),
            "PRIORITY_P" => Some((Self::Priority, Some(true))),
            "RR" => Some((Self::Rr, None)),
            "MLQ" => Some((Self::Mlq, None)),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fcfs => "FCFS",
            Self::Sjf => "SJF",
            Self::Priority => "PRIORITY",
            Self::Rr => "RR",
            Self::Mlq => "MLQ",
        }
    }

    /// Policies that consume a time quantum
    #[inline]
    pub const fn uses_quantum(&self) -> bool {
        matches!(self, Self::Rr | Self::Mlq)
    }

    /// All supported policies in comparison order
    pub const fn all() -> [Self; 5] {
        [Self::Fcfs, Self::Sjf, Self::Priority, Self::Rr, Self::Mlq]
    }
}

impl Serialize for SchedPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SchedPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SchedPolicy::parse(&s)
            .map(|(policy, _)| policy)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid policy '{s}'")))
    }
}

/// Validated scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedConfig {
    pub policy: SchedPolicy,
    pub preemptive_priority: bool,
    pub tick_ms: u64,
    pub quantum: u64,
    pub mlq_sys_quantum: u64,
    pub mlq_user_quantum: u64,
    pub memory: MemoryConfig,
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            policy: SchedPolicy::Fcfs,
            preemptive_priority: true,
            tick_ms: 200,
            quantum: 2,
            mlq_sys_quantum: 2,
            mlq_user_quantum: 4,
            memory: MemoryConfig::default(),
        }
    }
}

impl SchedConfig {
    /// Reject invalid policy/quantum/memory combinations; atomic — the
    /// caller applies the config only after this passes
    pub fn validate(&self) -> SimResult<()> {
        if self.policy.uses_quantum() && self.quantum < 1 {
            return Err(SimError::config(format!(
                "{} requires quantum >= 1",
                self.policy.as_str()
            )));
        }
        if self.policy == SchedPolicy::Mlq
            && (self.mlq_sys_quantum < 1 || self.mlq_user_quantum < 1)
        {
            return Err(SimError::config("MLQ requires per-queue quantum >= 1"));
        }
        if self.memory.num_frames < 1 {
            return Err(SimError::config("frames must be >= 1"));
        }
        if self.memory.page_size < 1 || !self.memory.page_size.is_power_of_two() {
            return Err(SimError::config("page_size must be a power of two"));
        }
        if self.memory.fault_penalty < 1 {
            return Err(SimError::config("fault_penalty must be >= 1"));
        }
        if self.memory.mode == MemoryMode::Full
            && self.memory.policy == ReplacementPolicy::Opt
        {
            return Err(SimError::config(
                "OPT requires the full reference string and is unsupported in live simulation",
            ));
        }
        Ok(())
    }
}
