/*!
 * Process Types
 * Descriptors, lifecycle states, and runtime records
 */

use crate::core::errors::ProcessError;
use crate::core::limits::{MAX_REFS_PER_TICK, MIN_REFS_PER_TICK};
use crate::core::types::{Pid, Tick, VirtAddr, Vpn};
use crate::memory::pattern::{
    build_working_set, dedupe_pages, pid_seed, AddrPattern, MemoryProfile,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Process lifecycle state
///
/// DONE is terminal; at most one process is RUNNING at any tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    New,
    Ready,
    Running,
    WaitingIo,
    WaitingMem,
    Done,
}

impl ProcessState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Ready => "READY",
            Self::Running => "RUNNING",
            Self::WaitingIo => "WAITING_IO",
            Self::WaitingMem => "WAITING_MEM",
            Self::Done => "DONE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "NEW" => Some(Self::New),
            "READY" => Some(Self::Ready),
            "RUNNING" => Some(Self::Running),
            "WAITING_IO" => Some(Self::WaitingIo),
            "WAITING_MEM" => Some(Self::WaitingMem),
            "DONE" => Some(Self::Done),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl Serialize for ProcessState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// MLQ queue class; SYS strictly dominates USER
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueClass {
    Sys,
    #[default]
    User,
}

impl QueueClass {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sys => "SYS",
            Self::User => "USER",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ProcessError> {
        match s.trim().to_uppercase().as_str() {
            "SYS" => Ok(Self::Sys),
            "USER" => Ok(Self::User),
            _ => Err(ProcessError::InvalidQueue),
        }
    }
}

impl Serialize for QueueClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for QueueClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        QueueClass::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Burst list as accepted on the wire: a flat alternating sequence or
/// typed `{type, len}` segments
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BurstList {
    Flat(Vec<i64>),
    Typed(Vec<BurstSegment>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BurstSegment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(alias = "length")]
    pub len: i64,
}

/// Inbound process descriptor (wire shape)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessSpec {
    #[serde(default)]
    pub pid: String,
    #[serde(default)]
    pub arrival_time: i64,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default, alias = "queue_type")]
    pub queue: QueueClass,
    #[serde(default, alias = "burst_segments")]
    pub bursts: Option<BurstList>,
    #[serde(default)]
    pub burst_time: Option<i64>,

    // Memory profile fields (all optional; deterministic defaults per pid)
    #[serde(default)]
    pub vm_size_bytes: Option<i64>,
    #[serde(default)]
    pub address_base: Option<i64>,
    #[serde(default)]
    pub working_set_pages: Option<Vec<i64>>,
    #[serde(default)]
    pub working_set_size: Option<i64>,
    #[serde(default)]
    pub addr_pattern: Option<String>,
    #[serde(default)]
    pub custom_addrs: Option<Vec<i64>>,
    #[serde(default, alias = "memory_ref_rate")]
    pub refs_per_cpu_tick: Option<i64>,
    #[serde(default, alias = "fault_penalty_ticks")]
    pub fault_penalty: Option<i64>,
}

fn default_priority() -> i64 {
    1
}

impl ProcessSpec {
    /// Parse the burst fields into (cpu_bursts, io_bursts).
    ///
    /// Accepted: a flat odd-length list of positive ints alternating
    /// CPU/IO, a typed segment list with the same alternation, or a
    /// `burst_time` scalar (single CPU burst).
    pub fn parse_bursts(&self) -> Result<(Vec<u64>, Vec<u64>), ProcessError> {
        let seq: Vec<u64> = match &self.bursts {
            Some(BurstList::Flat(values)) => {
                if values.is_empty() {
                    return Err(ProcessError::InvalidBursts(
                        "bursts must be a non-empty list".into(),
                    ));
                }
                let mut seq = Vec::with_capacity(values.len());
                for &v in values {
                    if v <= 0 {
                        return Err(ProcessError::InvalidBursts(
                            "all bursts must be positive integers".into(),
                        ));
                    }
                    seq.push(v as u64);
                }
                seq
            }
            Some(BurstList::Typed(parts)) => {
                if parts.is_empty() {
                    return Err(ProcessError::InvalidBursts(
                        "bursts must be a non-empty list".into(),
                    ));
                }
                let mut seq = Vec::with_capacity(parts.len());
                let mut expect_cpu = true;
                for part in parts {
                    let kind = part.kind.trim().to_uppercase();
                    if kind != "CPU" && kind != "IO" {
                        return Err(ProcessError::InvalidBursts(
                            "burst type must be CPU or IO".into(),
                        ));
                    }
                    if (kind == "CPU") != expect_cpu {
                        return Err(ProcessError::InvalidBursts(
                            "bursts must alternate CPU/IO and start with CPU".into(),
                        ));
                    }
                    if part.len <= 0 {
                        return Err(ProcessError::InvalidBursts(
                            "burst lengths must be positive".into(),
                        ));
                    }
                    seq.push(part.len as u64);
                    expect_cpu = !expect_cpu;
                }
                seq
            }
            None => {
                let bt = self.burst_time.unwrap_or(1);
                if bt <= 0 {
                    return Err(ProcessError::InvalidBursts(
                        "burst_time must be a positive integer".into(),
                    ));
                }
                vec![bt as u64]
            }
        };

        if seq.len() % 2 == 0 {
            return Err(ProcessError::InvalidBursts(
                "bursts must start with CPU and end with CPU".into(),
            ));
        }

        let cpu: Vec<u64> = seq.iter().step_by(2).copied().collect();
        let io: Vec<u64> = seq.iter().skip(1).step_by(2).copied().collect();
        Ok((cpu, io))
    }

    /// Build and validate the memory profile against a page size
    pub fn build_profile(&self, page_size: u64) -> Result<MemoryProfile, ProcessError> {
        let invalid = |msg: String| ProcessError::InvalidMemoryProfile(msg);
        let page_size = page_size.max(1);

        // No memory fields at all: the deterministic per-pid default
        if self.vm_size_bytes.is_none()
            && self.address_base.is_none()
            && self.working_set_pages.is_none()
            && self.working_set_size.is_none()
            && self.addr_pattern.is_none()
            && self.custom_addrs.is_none()
            && self.refs_per_cpu_tick.is_none()
        {
            return Ok(MemoryProfile::default_for(&self.pid, page_size));
        }

        let seed = pid_seed(&self.pid);

        let explicit = self.working_set_pages.as_ref().filter(|p| !p.is_empty());
        let mut ws_pages: Vec<Vpn> = match explicit {
            Some(pages) => dedupe_pages(
                &pages.iter().map(|&p| p.max(0) as Vpn).collect::<Vec<_>>(),
            ),
            None => {
                let size = self.working_set_size.unwrap_or(8).clamp(1, 100) as usize;
                build_working_set(&self.pid, size)
            }
        };
        if ws_pages.is_empty() {
            ws_pages = build_working_set(&self.pid, 8);
        }

        let refs_per_cpu_tick = self
            .refs_per_cpu_tick
            .unwrap_or(1)
            .clamp(MIN_REFS_PER_TICK as i64, MAX_REFS_PER_TICK as i64)
            as u32;

        let custom_addrs: Vec<VirtAddr> = self
            .custom_addrs
            .as_ref()
            .map(|addrs| addrs.iter().map(|&a| a.max(0) as VirtAddr).collect())
            .unwrap_or_default();

        let mut addr_pattern = self
            .addr_pattern
            .as_deref()
            .map(|s| {
                AddrPattern::parse(s)
                    .ok_or_else(|| invalid(format!("addr_pattern '{s}' is not recognized")))
            })
            .transpose()?
            .unwrap_or(AddrPattern::Loop);
        if addr_pattern == AddrPattern::Custom && custom_addrs.is_empty() {
            addr_pattern = AddrPattern::Loop;
        }

        let max_ws = ws_pages.iter().copied().max().unwrap_or(0);
        let vm_size_default = ((max_ws + 1) * page_size).max(page_size * 32);
        let vm_size_bytes = self
            .vm_size_bytes
            .map(|v| v.max(0) as u64)
            .unwrap_or(vm_size_default);
        if vm_size_bytes <= page_size {
            return Err(invalid(format!(
                "vm_size_bytes must be greater than page_size ({page_size})"
            )));
        }
        let vm_pages = (vm_size_bytes / page_size).max(1);

        if let Some(hint) = self.working_set_size {
            if hint > vm_pages as i64 {
                return Err(invalid(format!(
                    "working_set_size cannot exceed total pages ({vm_pages})"
                )));
            }
        }
        if explicit.is_some() && max_ws >= vm_pages {
            return Err(invalid(format!(
                "working_set_pages values must be within 0..{}",
                vm_pages - 1
            )));
        }

        let ws_pages = {
            let wrapped: Vec<Vpn> = ws_pages.iter().map(|&p| p % vm_pages).collect();
            let deduped = dedupe_pages(&wrapped);
            if deduped.is_empty() {
                vec![0]
            } else {
                deduped
            }
        };

        let base_default = ((seed % 4096) + 1) * page_size;
        let mut address_base = self
            .address_base
            .map(|b| b.max(0) as VirtAddr)
            .unwrap_or(base_default);
        address_base -= address_base % page_size;

        if !custom_addrs.is_empty() {
            let upper = address_base + vm_size_bytes;
            if custom_addrs
                .iter()
                .any(|&addr| addr < address_base || addr >= upper)
            {
                return Err(invalid(
                    "custom_addrs must lie within [address_base, address_base + vm_size_bytes)"
                        .into(),
                ));
            }
        }

        Ok(MemoryProfile {
            working_set_pages: ws_pages,
            vm_size_bytes,
            address_base,
            refs_per_cpu_tick,
            addr_pattern,
            custom_addrs,
            rng_seed: seed,
            pc: 0,
        })
    }
}

/// Runtime process record owned by the scheduler
#[derive(Debug, Clone)]
pub struct Process {
    pub pid: Pid,
    pub arrival_time: Tick,
    pub priority: u32,
    pub queue: QueueClass,
    pub cpu_bursts: Vec<u64>,
    pub io_bursts: Vec<u64>,
    pub profile: MemoryProfile,
    /// Per-process fault penalty override (ticks); global when absent
    pub fault_penalty: Option<u64>,

    // Runtime fields
    pub state: ProcessState,
    pub arrived: bool,
    pub cpu_index: usize,
    pub io_index: usize,
    pub remaining: u64,
    pub io_remaining: u64,
    pub mem_wait_left: u64,
    pub start_time: Option<Tick>,
    pub completion_time: Option<Tick>,

    // Wait accounting (drives WT/io-served/memory-wait metrics)
    pub wt_ticks: u64,
    pub io_served_ticks: u64,
    pub mem_wait_ticks: u64,
}

impl Process {
    /// Validate a descriptor and produce the runtime record
    pub fn from_spec(spec: &ProcessSpec, page_size: u64) -> Result<Self, ProcessError> {
        let pid = spec.pid.trim().to_string();
        if pid.is_empty() {
            return Err(ProcessError::MissingPid);
        }
        if spec.arrival_time < 0 {
            return Err(ProcessError::InvalidArrival);
        }
        let (cpu_bursts, io_bursts) = spec.parse_bursts()?;
        let profile = spec.build_profile(page_size)?;
        let remaining = cpu_bursts[0];

        Ok(Self {
            pid,
            arrival_time: spec.arrival_time as Tick,
            priority: spec.priority.max(0) as u32,
            queue: spec.queue,
            cpu_bursts,
            io_bursts,
            profile,
            fault_penalty: spec.fault_penalty.filter(|&p| p > 0).map(|p| p as u64),
            state: ProcessState::New,
            arrived: false,
            cpu_index: 0,
            io_index: 0,
            remaining,
            io_remaining: 0,
            mem_wait_left: 0,
            start_time: None,
            completion_time: None,
            wt_ticks: 0,
            io_served_ticks: 0,
            mem_wait_ticks: 0,
        })
    }

    /// Restore initial runtime state (descriptor fields untouched)
    pub fn reset(&mut self) {
        self.state = ProcessState::New;
        self.arrived = false;
        self.cpu_index = 0;
        self.io_index = 0;
        self.remaining = self.cpu_bursts.first().copied().unwrap_or(0);
        self.io_remaining = 0;
        self.mem_wait_left = 0;
        self.start_time = None;
        self.completion_time = None;
        self.wt_ticks = 0;
        self.io_served_ticks = 0;
        self.mem_wait_ticks = 0;
        self.profile.reset(&self.pid);
    }

    /// Total CPU demand across all bursts
    #[inline]
    pub fn total_cpu_time(&self) -> u64 {
        self.cpu_bursts.iter().sum()
    }

    /// Interleaved `[c0, i0, c1, …]` view for serialization
    pub fn merged_bursts(&self) -> Vec<u64> {
        let mut merged = Vec::with_capacity(self.cpu_bursts.len() + self.io_bursts.len());
        for (idx, &cpu) in self.cpu_bursts.iter().enumerate() {
            merged.push(cpu);
            if let Some(&io) = self.io_bursts.get(idx) {
                merged.push(io);
            }
        }
        merged
    }

    /// Does an I/O burst follow the just-finished CPU burst?
    #[inline]
    pub fn has_pending_io(&self) -> bool {
        self.io_index < self.io_bursts.len()
    }

    #[inline]
    pub fn has_more_cpu(&self) -> bool {
        self.cpu_index < self.cpu_bursts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(pid: &str) -> ProcessSpec {
        ProcessSpec {
            pid: pid.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_flat_bursts_split() {
        let mut s = spec("P1");
        s.bursts = Some(BurstList::Flat(vec![3, 2, 4, 1, 5]));
        let (cpu, io) = s.parse_bursts().unwrap();
        assert_eq!(cpu, vec![3, 4, 5]);
        assert_eq!(io, vec![2, 1]);
    }

    #[test]
    fn test_even_length_rejected() {
        let mut s = spec("P1");
        s.bursts = Some(BurstList::Flat(vec![3, 2]));
        assert!(matches!(
            s.parse_bursts(),
            Err(ProcessError::InvalidBursts(_))
        ));
    }

    #[test]
    fn test_non_positive_burst_rejected() {
        let mut s = spec("P1");
        s.bursts = Some(BurstList::Flat(vec![3, 0, 4]));
        assert!(s.parse_bursts().is_err());
    }

    #[test]
    fn test_typed_segments_must_alternate() {
        let mut s = spec("P1");
        s.bursts = Some(BurstList::Typed(vec![
            BurstSegment {
                kind: "CPU".into(),
                len: 2,
            },
            BurstSegment {
                kind: "CPU".into(),
                len: 3,
            },
        ]));
        assert!(s.parse_bursts().is_err());
    }

    #[test]
    fn test_burst_time_scalar() {
        let mut s = spec("P1");
        s.burst_time = Some(7);
        let (cpu, io) = s.parse_bursts().unwrap();
        assert_eq!(cpu, vec![7]);
        assert!(io.is_empty());
    }

    #[test]
    fn test_empty_pid_rejected() {
        let s = spec("   ");
        assert!(matches!(
            Process::from_spec(&s, 4096),
            Err(ProcessError::MissingPid)
        ));
    }

    #[test]
    fn test_profile_vm_size_must_exceed_page() {
        let mut s = spec("P1");
        s.vm_size_bytes = Some(4096);
        assert!(s.build_profile(4096).is_err());
    }

    #[test]
    fn test_profile_explicit_pages_bounds_checked() {
        let mut s = spec("P1");
        s.working_set_pages = Some(vec![0, 1, 500]);
        s.vm_size_bytes = Some(4096 * 16);
        assert!(s.build_profile(4096).is_err());
    }

    #[test]
    fn test_custom_addrs_range_checked() {
        let mut s = spec("P1");
        s.addr_pattern = Some("CUSTOM".into());
        s.address_base = Some(4096);
        s.vm_size_bytes = Some(4096 * 8);
        s.custom_addrs = Some(vec![100]);
        assert!(s.build_profile(4096).is_err());
    }

    #[test]
    fn test_custom_without_addrs_falls_back_to_loop() {
        let mut s = spec("P1");
        s.addr_pattern = Some("CUSTOM".into());
        let profile = s.build_profile(4096).unwrap();
        assert_eq!(profile.addr_pattern, AddrPattern::Loop);
    }

    #[test]
    fn test_reset_restores_runtime() {
        let mut s = spec("P1");
        s.bursts = Some(BurstList::Flat(vec![3, 2, 4]));
        let mut p = Process::from_spec(&s, 4096).unwrap();
        p.state = ProcessState::Done;
        p.remaining = 0;
        p.cpu_index = 2;
        p.completion_time = Some(9);
        p.reset();
        assert_eq!(p.state, ProcessState::New);
        assert_eq!(p.remaining, 3);
        assert_eq!(p.completion_time, None);
    }
}
