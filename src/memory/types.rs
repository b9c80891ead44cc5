/*!
 * Memory Types
 * Frames, page-table entries, modes, and replacement policies
 */

use crate::core::types::{Pfn, Pid, Tick, VirtAddr, Vpn};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Memory simulation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryMode {
    #[default]
    CpuOnly,
    Full,
}

impl MemoryMode {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "FULL" | "FULL_SYSTEM" | "CPU+MEMORY" => Self::Full,
            _ => Self::CpuOnly,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CpuOnly => "CPU_ONLY",
            Self::Full => "FULL",
        }
    }

    #[inline]
    pub const fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }
}

impl Serialize for MemoryMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MemoryMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(MemoryMode::parse(&String::deserialize(deserializer)?))
    }
}

/// Page replacement policy
///
/// OPT needs the full future reference string and is only available in the
/// offline trace runners; the live configuration boundary rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacementPolicy {
    Fifo,
    #[default]
    Lru,
    Lfu,
    Clock,
    Opt,
}

impl ReplacementPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "FIFO" => Some(Self::Fifo),
            "LRU" => Some(Self::Lru),
            "LFU" => Some(Self::Lfu),
            "CLOCK" => Some(Self::Clock),
            "OPT" => Some(Self::Opt),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fifo => "FIFO",
            Self::Lru => "LRU",
            Self::Lfu => "LFU",
            Self::Clock => "CLOCK",
            Self::Opt => "OPT",
        }
    }
}

impl Serialize for ReplacementPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReplacementPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ReplacementPolicy::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid replacement policy '{s}'")))
    }
}

/// One physical frame; ownership is exclusive per (pid, vpn)
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub pfn: Pfn,
    pub pid: Option<Pid>,
    pub vpn: Option<Vpn>,
    pub loaded_at: Tick,
    pub last_used: Tick,
    pub freq: u64,
    pub ref_bit: u8,
}

impl Frame {
    pub fn empty(pfn: Pfn) -> Self {
        Self {
            pfn,
            pid: None,
            vpn: None,
            loaded_at: 0,
            last_used: 0,
            freq: 0,
            ref_bit: 0,
        }
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.pid.is_none()
    }
}

/// Per-process page-table entry
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageTableEntry {
    pub present: bool,
    pub pfn: Option<Pfn>,
    pub last_used: Tick,
    pub freq: u64,
    pub dirty: bool,
}

/// Serialized page-table row (sorted by vpn in snapshots)
#[derive(Debug, Clone, Serialize)]
pub struct PageTableRow {
    pub vpn: Vpn,
    pub present: bool,
    pub pfn: Option<Pfn>,
    pub last_used: Tick,
    pub freq: u64,
    pub dirty: bool,
}

/// Record of an eviction performed to satisfy a fault
#[derive(Debug, Clone, Serialize)]
pub struct Eviction {
    pub pid: Pid,
    pub vpn: Vpn,
    pub pfn: Pfn,
}

/// One translated memory reference
#[derive(Debug, Clone, Serialize)]
pub struct TranslationStep {
    pub t: Tick,
    pub pid: Pid,
    pub va: VirtAddr,
    pub vpn: Vpn,
    pub offset: u64,
    pub pfn: Pfn,
    pub hit: bool,
    pub fault: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evicted: Option<Eviction>,
    #[serde(skip)]
    pub out_of_range: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(MemoryMode::parse("full"), MemoryMode::Full);
        assert_eq!(MemoryMode::parse("FULL_SYSTEM"), MemoryMode::Full);
        assert_eq!(MemoryMode::parse("cpu_only"), MemoryMode::CpuOnly);
        assert_eq!(MemoryMode::parse("nonsense"), MemoryMode::CpuOnly);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(ReplacementPolicy::parse("lru"), Some(ReplacementPolicy::Lru));
        assert_eq!(
            ReplacementPolicy::parse("CLOCK"),
            Some(ReplacementPolicy::Clock)
        );
        assert_eq!(ReplacementPolicy::parse("random"), None);
    }
}
