/*!
 * Reference Patterns
 * Deterministic virtual-address generation per process
 *
 * Every stream is a pure function of (pid, tick, profile), so identical
 * workloads replay identically across runs and across policy comparisons.
 */

use crate::core::types::{Tick, VirtAddr, Vpn};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const SEED_MASK: u64 = 0x7FFF_FFFF;

/// Stable 31-bit seed derived from a pid (never zero)
pub fn pid_seed(pid: &str) -> u64 {
    let mut seed: u64 = 0;
    for (idx, byte) in pid.bytes().enumerate() {
        seed = (seed
            .wrapping_mul(131)
            .wrapping_add((idx as u64 + 17).wrapping_mul(byte as u64)))
            & SEED_MASK;
    }
    if seed == 0 {
        1
    } else {
        seed
    }
}

/// Deterministic pseudo-random mixer (no global RNG state)
#[inline]
pub fn mix_seed(seed: u64) -> u64 {
    (seed.wrapping_mul(1_103_515_245).wrapping_add(12_345)) & SEED_MASK
}

/// Address-pattern kind for the per-process reference generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrPattern {
    /// Walk the working set in order, wrapping
    Seq,
    /// Walk with a hot subset: 80% of references hit the first ~30%
    Loop,
    /// Seeded PRNG over the working set, same 80/20 locality mix
    Rand,
    /// Cycle a user-supplied address list
    Custom,
}

impl AddrPattern {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SEQ" => Some(Self::Seq),
            "LOOP" => Some(Self::Loop),
            "RAND" => Some(Self::Rand),
            "CUSTOM" => Some(Self::Custom),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Seq => "SEQ",
            Self::Loop => "LOOP",
            Self::Rand => "RAND",
            Self::Custom => "CUSTOM",
        }
    }
}

impl Serialize for AddrPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AddrPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AddrPattern::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid addr_pattern '{s}'")))
    }
}

/// Per-process memory profile plus generator state
///
/// The working set is stored deduplicated and already reduced modulo the
/// process's page count; `rng_seed` and `pc` evolve tick over tick.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryProfile {
    pub working_set_pages: Vec<Vpn>,
    pub vm_size_bytes: u64,
    pub address_base: VirtAddr,
    pub refs_per_cpu_tick: u32,
    pub addr_pattern: AddrPattern,
    pub custom_addrs: Vec<VirtAddr>,
    #[serde(skip)]
    pub rng_seed: u64,
    #[serde(skip)]
    pub pc: usize,
}

impl MemoryProfile {
    /// Deterministic default profile for a pid with no explicit memory fields
    pub fn default_for(pid: &str, page_size: u64) -> Self {
        let seed = pid_seed(pid);
        let working_set = build_working_set(pid, 8);
        let max_page = working_set.iter().copied().max().unwrap_or(0);
        let vm_size_bytes = ((max_page + 1) * page_size).max(page_size * 32);
        Self {
            working_set_pages: working_set,
            vm_size_bytes,
            address_base: ((seed % 4096) + 1) * page_size,
            refs_per_cpu_tick: 1,
            addr_pattern: AddrPattern::Loop,
            custom_addrs: Vec::new(),
            rng_seed: seed,
            pc: 0,
        }
    }

    /// Restart the generator (working set and layout are immutable)
    pub fn reset(&mut self, pid: &str) {
        self.rng_seed = pid_seed(pid);
        self.pc = 0;
    }

    /// Emit the virtual addresses referenced during one CPU tick.
    ///
    /// Advances `rng_seed` and `pc`; between 1 and 3 addresses per call.
    pub fn generate_tick_addrs(&mut self, pid: &str, now: Tick, page_size: u64) -> Vec<VirtAddr> {
        let ws: &[Vpn] = if self.working_set_pages.is_empty() {
            &[0]
        } else {
            &self.working_set_pages
        };
        let hot_len = hot_set_len(ws.len());
        let count = self.refs_per_cpu_tick.max(1) as usize;
        let seed_base = self.rng_seed;
        let base_seed = pid_seed(pid);
        let mut pc = self.pc;
        let mut refs = Vec::with_capacity(count);

        for idx in 0..count {
            let seed = mix_seed(
                seed_base
                    ^ (now + 1).wrapping_mul(104_729)
                    ^ ((idx as u64 + 1).wrapping_mul(31_337))
                    ^ (pc as u64).wrapping_mul(17),
            );

            let addr = match self.addr_pattern {
                AddrPattern::Custom if !self.custom_addrs.is_empty() => {
                    let addr = self.custom_addrs[pc % self.custom_addrs.len()];
                    pc = (pc + 1) % self.custom_addrs.len();
                    addr
                }
                pattern => {
                    let vpn = match pattern {
                        AddrPattern::Seq | AddrPattern::Custom => {
                            // CUSTOM with no list degrades to SEQ
                            let vpn = ws[pc % ws.len()];
                            pc = (pc + 1) % ws.len();
                            vpn
                        }
                        AddrPattern::Loop => {
                            let pool = if seed % 100 < 80 { &ws[..hot_len] } else { ws };
                            let vpn = pool[(seed / 101) as usize % pool.len()];
                            pc = (pc + 1) % ws.len();
                            vpn
                        }
                        AddrPattern::Rand => {
                            let vpn = if seed % 100 < 80 {
                                ws[..hot_len][(seed / 127) as usize % hot_len]
                            } else {
                                ws[(seed / 127) as usize % ws.len()]
                            };
                            pc = (pc + 1) % ws.len();
                            vpn
                        }
                    };
                    let offset_seed = mix_seed(
                        seed ^ base_seed
                            .wrapping_add((now + 1).wrapping_mul(2_654_435_761))
                            .wrapping_add((idx as u64 + 1).wrapping_mul(97_531)),
                    );
                    self.address_base + vpn * page_size + offset_seed % page_size
                }
            };
            refs.push(addr);
        }

        self.rng_seed = mix_seed(
            seed_base ^ (now + 1).wrapping_mul(65_537) ^ (pc as u64).wrapping_mul(97),
        );
        self.pc = pc;
        refs
    }
}

/// Hot-subset length: ~30% of the working set, at least one page
#[inline]
fn hot_set_len(ws_len: usize) -> usize {
    (((ws_len as f64) * 0.3).round() as usize).max(1).min(ws_len)
}

/// Deduplicate while preserving first-seen order
pub fn dedupe_pages(values: &[Vpn]) -> Vec<Vpn> {
    let mut seen = ahash::AHashSet::new();
    let mut out = Vec::with_capacity(values.len());
    for &page in values {
        if seen.insert(page) {
            out.push(page);
        }
    }
    out
}

/// Deterministically generate a working set of `size` pages for a pid
pub fn build_working_set(pid: &str, size: usize) -> Vec<Vpn> {
    let count = size.clamp(1, 100) as u64;
    let seed = pid_seed(pid);
    let start = seed % 100;
    let mut step = ((seed >> 5) % 99) + 1;
    if step % 2 == 0 {
        step += 1;
    }
    let pages: Vec<Vpn> = (0..count).map(|i| (start + i * step) % 100).collect();
    dedupe_pages(&pages)
}
