/*!
 * Memory Manager
 * Live paged-memory runtime: frame table, page tables, replacement
 *
 * Victim selection reads the flat frame table directly; only CLOCK keeps
 * extra state (the hand). Frame ownership is exclusive per (pid, vpn).
 */

use super::types::{
    Eviction, Frame, MemoryMode, PageTableEntry, PageTableRow, ReplacementPolicy, TranslationStep,
};
use crate::core::limits::{
    MEM_GANTT_LIMIT, RECENT_STEPS_LIMIT, TRANSLATION_LOG_LIMIT,
};
use crate::core::types::{Pfn, Pid, Tick, VirtAddr, Vpn};
use ahash::AHashMap;
use log::debug;
use std::collections::VecDeque;

/// Memory runtime configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    pub mode: MemoryMode,
    pub policy: ReplacementPolicy,
    pub page_size: u64,
    pub num_frames: usize,
    pub fault_penalty: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            mode: MemoryMode::CpuOnly,
            policy: ReplacementPolicy::Lru,
            page_size: 4096,
            num_frames: 8,
            fault_penalty: 5,
        }
    }
}

/// Live memory subsystem owned by the scheduler
pub struct MemoryManager {
    config: MemoryConfig,
    frames: Vec<Frame>,
    page_tables: AHashMap<Pid, AHashMap<Vpn, PageTableEntry>>,
    hits: u64,
    faults: u64,
    clock_hand: usize,
    recent_steps: VecDeque<TranslationStep>,
    translation_log: VecDeque<String>,
    mem_gantt: Vec<String>,
}

impl MemoryManager {
    pub fn new(config: MemoryConfig) -> Self {
        let num_frames = config.num_frames.max(1);
        Self {
            config: MemoryConfig {
                num_frames,
                page_size: config.page_size.max(1),
                fault_penalty: config.fault_penalty.max(1),
                ..config
            },
            frames: (0..num_frames).map(Frame::empty).collect(),
            page_tables: AHashMap::new(),
            hits: 0,
            faults: 0,
            clock_hand: 0,
            recent_steps: VecDeque::new(),
            translation_log: VecDeque::new(),
            mem_gantt: Vec::new(),
        }
    }

    /// Clear all frames, tables, counters, and logs
    pub fn reset(&mut self) {
        self.frames = (0..self.config.num_frames).map(Frame::empty).collect();
        self.page_tables.clear();
        self.hits = 0;
        self.faults = 0;
        self.clock_hand = 0;
        self.recent_steps.clear();
        self.translation_log.clear();
        self.mem_gantt.clear();
    }

    /// Replace the configuration and reset the runtime
    pub fn reconfigure(&mut self, config: MemoryConfig) {
        self.config = MemoryConfig {
            num_frames: config.num_frames.max(1),
            page_size: config.page_size.max(1),
            fault_penalty: config.fault_penalty.max(1),
            ..config
        };
        self.reset();
    }

    #[inline]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    #[inline]
    pub fn mode(&self) -> MemoryMode {
        self.config.mode
    }

    #[inline]
    pub fn page_size(&self) -> u64 {
        self.config.page_size
    }

    #[inline]
    pub fn fault_penalty(&self) -> u64 {
        self.config.fault_penalty
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    #[inline]
    pub fn faults(&self) -> u64 {
        self.faults
    }

    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.faults;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn mem_gantt(&self) -> &[String] {
        &self.mem_gantt
    }

    pub fn translation_log(&self) -> Vec<String> {
        self.translation_log.iter().cloned().collect()
    }

    pub fn recent_steps(&self, limit: usize) -> Vec<TranslationStep> {
        let skip = self.recent_steps.len().saturating_sub(limit);
        self.recent_steps.iter().skip(skip).cloned().collect()
    }

    /// Sorted page-table rows per pid for serialization
    pub fn page_table_rows(&self) -> Vec<(Pid, Vec<PageTableRow>)> {
        let mut out: Vec<(Pid, Vec<PageTableRow>)> = self
            .page_tables
            .iter()
            .map(|(pid, table)| {
                let mut rows: Vec<PageTableRow> = table
                    .iter()
                    .map(|(&vpn, entry)| PageTableRow {
                        vpn,
                        present: entry.present,
                        pfn: entry.pfn,
                        last_used: entry.last_used,
                        freq: entry.freq,
                        dirty: entry.dirty,
                    })
                    .collect();
                rows.sort_by_key(|row| row.vpn);
                (pid.clone(), rows)
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Append one token to the memory timeline (bounded)
    pub fn push_gantt(&mut self, token: impl Into<String>) {
        self.mem_gantt.push(token.into());
        if self.mem_gantt.len() > MEM_GANTT_LIMIT {
            let excess = self.mem_gantt.len() - MEM_GANTT_LIMIT;
            self.mem_gantt.drain(..excess);
        }
    }

    /// Translate one reference and service a fault if needed.
    ///
    /// Out-of-range addresses wrap to `(va mod vm_size) / page_size` and are
    /// logged with a warning reason; they never fail the simulation.
    pub fn access(
        &mut self,
        now: Tick,
        pid: &str,
        va: VirtAddr,
        address_base: VirtAddr,
        vm_size: u64,
    ) -> TranslationStep {
        let page_size = self.config.page_size;
        let vm_size = vm_size.max(page_size);

        let (relative, out_of_range) = if va >= address_base && va - address_base < vm_size {
            (va - address_base, false)
        } else {
            (va % vm_size, true)
        };
        let vpn = relative / page_size;
        let offset = relative % page_size;

        let entry = self
            .page_tables
            .entry(pid.to_string())
            .or_default()
            .entry(vpn)
            .or_default();

        let hit_pfn = match (entry.present, entry.pfn) {
            (true, Some(pfn)) => match self.frames.get(pfn) {
                Some(frame)
                    if frame.pid.as_deref() == Some(pid) && frame.vpn == Some(vpn) =>
                {
                    Some(pfn)
                }
                _ => None,
            },
            _ => None,
        };

        let (selected_pfn, hit, evicted) = match hit_pfn {
            Some(pfn) => {
                self.hits += 1;
                let frame = &mut self.frames[pfn];
                frame.last_used = now;
                frame.freq += 1;
                frame.ref_bit = 1;

                let entry = self.entry_mut(pid, vpn);
                entry.last_used = now;
                entry.freq += 1;
                (pfn, true, None)
            }
            None => {
                self.faults += 1;
                let pfn = self.choose_victim();
                let evicted = self.evict_frame(pfn);
                let frame = &mut self.frames[pfn];
                frame.pid = Some(pid.to_string());
                frame.vpn = Some(vpn);
                frame.loaded_at = now;
                frame.last_used = now;
                frame.freq = 1;
                frame.ref_bit = 1;

                let entry = self.entry_mut(pid, vpn);
                entry.present = true;
                entry.pfn = Some(pfn);
                entry.last_used = now;
                entry.freq += 1;
                (pfn, false, evicted)
            }
        };

        let step = TranslationStep {
            t: now,
            pid: pid.to_string(),
            va,
            vpn,
            offset,
            pfn: selected_pfn,
            hit,
            fault: !hit,
            evicted,
            out_of_range,
        };
        self.log_step(&step);
        step
    }

    fn entry_mut(&mut self, pid: &str, vpn: Vpn) -> &mut PageTableEntry {
        self.page_tables
            .entry(pid.to_string())
            .or_default()
            .entry(vpn)
            .or_default()
    }

    /// Pick the frame to load into: first free frame, else policy victim
    fn choose_victim(&mut self) -> Pfn {
        if let Some(frame) = self.frames.iter().find(|f| f.is_free()) {
            return frame.pfn;
        }

        match self.config.policy {
            ReplacementPolicy::Fifo => self.min_by_key(|f| (f.loaded_at, f.pfn as u64)),
            // OPT is rejected at the configuration boundary; the LRU rule
            // here keeps the arm total without a panic path.
            ReplacementPolicy::Lru | ReplacementPolicy::Opt => {
                self.min_by_key(|f| (f.last_used, f.pfn as u64))
            }
            ReplacementPolicy::Lfu => {
                let pfn = self
                    .frames
                    .iter()
                    .min_by_key(|f| (f.freq, f.last_used, f.pfn))
                    .map(|f| f.pfn)
                    .unwrap_or(0);
                pfn
            }
            ReplacementPolicy::Clock => self.clock_victim(),
        }
    }

    fn min_by_key(&self, key: impl Fn(&Frame) -> (u64, u64)) -> Pfn {
        self.frames
            .iter()
            .min_by_key(|f| key(f))
            .map(|f| f.pfn)
            .unwrap_or(0)
    }

    /// Circular scan: skip frames with the reference bit set, clearing it;
    /// take the first clear frame
    fn clock_victim(&mut self) -> Pfn {
        let size = self.frames.len();
        for _ in 0..size * 2 {
            let idx = self.clock_hand % size;
            if self.frames[idx].ref_bit == 0 {
                self.clock_hand = (idx + 1) % size;
                return idx;
            }
            self.frames[idx].ref_bit = 0;
            self.clock_hand = (idx + 1) % size;
        }
        let idx = self.clock_hand % size;
        self.clock_hand = (idx + 1) % size;
        idx
    }

    /// Mark the victim's page-table entry not-present; returns the record
    fn evict_frame(&mut self, pfn: Pfn) -> Option<Eviction> {
        let (victim_pid, victim_vpn) = {
            let frame = &self.frames[pfn];
            match (&frame.pid, frame.vpn) {
                (Some(pid), Some(vpn)) => (pid.clone(), vpn),
                _ => return None,
            }
        };

        if let Some(entry) = self
            .page_tables
            .get_mut(&victim_pid)
            .and_then(|t| t.get_mut(&victim_vpn))
        {
            entry.present = false;
            entry.pfn = None;
        }
        debug!("evicted {}/{} from frame {}", victim_pid, victim_vpn, pfn);

        Some(Eviction {
            pid: victim_pid,
            vpn: victim_vpn,
            pfn,
        })
    }

    fn log_step(&mut self, step: &TranslationStep) {
        let outcome = if step.hit { "HIT" } else { "FAULT" };
        let mut line = format!(
            "t={}: {} VA={} VPN={} PFN={} {}",
            step.t, step.pid, step.va, step.vpn, step.pfn, outcome
        );
        if let Some(evicted) = &step.evicted {
            line.push_str(&format!(" evict={}/{}", evicted.pid, evicted.vpn));
        }
        if step.out_of_range {
            line.push_str(" (out-of-range)");
        }

        self.translation_log.push_back(line);
        while self.translation_log.len() > TRANSLATION_LOG_LIMIT {
            self.translation_log.pop_front();
        }

        self.recent_steps.push_back(step.clone());
        while self.recent_steps.len() > RECENT_STEPS_LIMIT {
            self.recent_steps.pop_front();
        }
    }

    /// Frame-ownership bidirectional consistency (testing hook)
    #[cfg(test)]
    pub fn check_ownership_invariant(&self) -> bool {
        // Every occupied frame's owner maps back to it
        for frame in &self.frames {
            if let (Some(pid), Some(vpn)) = (&frame.pid, frame.vpn) {
                let ok = self
                    .page_tables
                    .get(pid)
                    .and_then(|t| t.get(&vpn))
                    .map(|e| e.present && e.pfn == Some(frame.pfn))
                    .unwrap_or(false);
                if !ok {
                    return false;
                }
            }
        }
        // Every present entry points at a frame owned by it
        for (pid, table) in &self.page_tables {
            for (&vpn, entry) in table {
                if entry.present {
                    let ok = entry
                        .pfn
                        .and_then(|pfn| self.frames.get(pfn))
                        .map(|f| f.pid.as_deref() == Some(pid.as_str()) && f.vpn == Some(vpn))
                        .unwrap_or(false);
                    if !ok {
                        return false;
                    }
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config(policy: ReplacementPolicy, frames: usize) -> MemoryConfig {
        MemoryConfig {
            mode: MemoryMode::Full,
            policy,
            page_size: 4096,
            num_frames: frames,
            fault_penalty: 2,
        }
    }

    fn touch(mgr: &mut MemoryManager, t: Tick, pid: &str, vpn: u64) -> TranslationStep {
        mgr.access(t, pid, vpn * 4096, 0, 4096 * 64)
    }

    #[test]
    fn test_cold_faults_then_hits() {
        let mut mgr = MemoryManager::new(full_config(ReplacementPolicy::Lru, 2));
        assert!(touch(&mut mgr, 0, "P1", 0).fault);
        assert!(touch(&mut mgr, 1, "P1", 1).fault);
        assert!(touch(&mut mgr, 2, "P1", 0).hit);
        assert_eq!(mgr.faults(), 2);
        assert_eq!(mgr.hits(), 1);
        assert!(mgr.check_ownership_invariant());
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let mut mgr = MemoryManager::new(full_config(ReplacementPolicy::Lru, 2));
        touch(&mut mgr, 0, "P1", 0);
        touch(&mut mgr, 1, "P1", 1);
        touch(&mut mgr, 2, "P1", 0); // refresh vpn 0

        let step = touch(&mut mgr, 3, "P1", 2);
        assert!(step.fault);
        let evicted = step.evicted.expect("expected an eviction");
        assert_eq!(evicted.vpn, 1);
        assert!(mgr.check_ownership_invariant());
    }

    #[test]
    fn test_fifo_evicts_oldest_load() {
        let mut mgr = MemoryManager::new(full_config(ReplacementPolicy::Fifo, 2));
        touch(&mut mgr, 0, "P1", 0);
        touch(&mut mgr, 1, "P1", 1);
        touch(&mut mgr, 2, "P1", 0); // hit; FIFO ignores recency

        let step = touch(&mut mgr, 3, "P1", 2);
        assert_eq!(step.evicted.expect("eviction").vpn, 0);
    }

    #[test]
    fn test_lfu_evicts_least_frequent() {
        let mut mgr = MemoryManager::new(full_config(ReplacementPolicy::Lfu, 2));
        touch(&mut mgr, 0, "P1", 0);
        touch(&mut mgr, 1, "P1", 1);
        touch(&mut mgr, 2, "P1", 0);
        touch(&mut mgr, 3, "P1", 0); // vpn 0 freq 3, vpn 1 freq 1

        let step = touch(&mut mgr, 4, "P1", 2);
        assert_eq!(step.evicted.expect("eviction").vpn, 1);
    }

    #[test]
    fn test_clock_skips_referenced_frames() {
        let mut mgr = MemoryManager::new(full_config(ReplacementPolicy::Clock, 2));
        touch(&mut mgr, 0, "P1", 0);
        touch(&mut mgr, 1, "P1", 1);
        // Both ref bits set; the hand clears both and takes frame 0
        let step = touch(&mut mgr, 2, "P1", 2);
        assert!(step.fault);
        assert_eq!(step.pfn, 0);
        assert_eq!(step.evicted.expect("eviction").vpn, 0);
    }

    #[test]
    fn test_out_of_range_wraps_with_warning() {
        let mut mgr = MemoryManager::new(full_config(ReplacementPolicy::Lru, 2));
        let step = mgr.access(0, "P1", 100, 4096, 4096 * 8);
        assert!(step.out_of_range);
        assert_eq!(step.vpn, 100 / 4096);
        let log = mgr.translation_log();
        assert!(log.last().unwrap().contains("(out-of-range)"));
    }

    #[test]
    fn test_translation_log_format() {
        let mut mgr = MemoryManager::new(full_config(ReplacementPolicy::Lru, 1));
        touch(&mut mgr, 0, "P1", 0);
        touch(&mut mgr, 1, "P2", 3);
        let log = mgr.translation_log();
        assert_eq!(log[0], "t=0: P1 VA=0 VPN=0 PFN=0 FAULT");
        assert_eq!(log[1], "t=1: P2 VA=12288 VPN=3 PFN=0 FAULT evict=P1/0");
    }

    #[test]
    fn test_frame_exclusivity_across_pids() {
        let mut mgr = MemoryManager::new(full_config(ReplacementPolicy::Lru, 3));
        for t in 0..12 {
            let pid = if t % 2 == 0 { "A" } else { "B" };
            touch(&mut mgr, t, pid, (t % 5) as u64);
            assert!(mgr.check_ownership_invariant());
        }
    }
}
