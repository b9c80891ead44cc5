/*!
 * Trace Runners
 * Offline page-replacement simulation over a complete reference string
 *
 * These runners see the whole future, so OPT is exact here (the live
 * manager rejects it). Used for side-by-side algorithm studies and as a
 * reference oracle in tests.
 */

use super::types::ReplacementPolicy;
use serde::Serialize;
use std::collections::VecDeque;

/// One step of an offline run: the frame image after servicing the reference
#[derive(Debug, Clone, Serialize)]
pub struct TraceStep {
    pub t: usize,
    #[serde(rename = "ref")]
    pub page: u64,
    pub frames: Vec<Option<u64>>,
    pub hit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evicted: Option<u64>,
}

/// Result of replaying a full reference string
#[derive(Debug, Clone, Serialize)]
pub struct TraceResult {
    pub steps: Vec<TraceStep>,
    pub faults: u64,
    pub hits: u64,
    pub hit_ratio: f64,
}

impl TraceResult {
    fn new(steps: Vec<TraceStep>, faults: u64, hits: u64) -> Self {
        let total = faults + hits;
        Self {
            steps,
            faults,
            hits,
            hit_ratio: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

/// Replay `refs` through the given policy with `frame_count` frames
pub fn run_trace(policy: ReplacementPolicy, frame_count: usize, refs: &[u64]) -> TraceResult {
    let frames = frame_count.max(1);
    match policy {
        ReplacementPolicy::Fifo => run_fifo(frames, refs),
        ReplacementPolicy::Lru => run_lru(frames, refs),
        ReplacementPolicy::Lfu => run_lfu(frames, refs),
        ReplacementPolicy::Opt => run_opt(frames, refs),
        ReplacementPolicy::Clock => run_clock(frames, refs),
    }
}

fn step(
    t: usize,
    page: u64,
    frames: &[Option<u64>],
    hit: bool,
    evicted: Option<u64>,
) -> TraceStep {
    TraceStep {
        t,
        page,
        frames: frames.to_vec(),
        hit,
        evicted,
    }
}

fn run_fifo(frame_count: usize, refs: &[u64]) -> TraceResult {
    let mut frames: Vec<Option<u64>> = vec![None; frame_count];
    let mut pointer = 0usize;
    let mut steps = Vec::with_capacity(refs.len());
    let (mut faults, mut hits) = (0u64, 0u64);

    for (t, &page) in refs.iter().enumerate() {
        let hit = frames.contains(&Some(page));
        let mut evicted = None;
        if hit {
            hits += 1;
        } else {
            faults += 1;
            if let Some(idx) = frames.iter().position(Option::is_none) {
                frames[idx] = Some(page);
            } else {
                evicted = frames[pointer];
                frames[pointer] = Some(page);
                pointer = (pointer + 1) % frame_count;
            }
        }
        steps.push(step(t, page, &frames, hit, evicted));
    }

    TraceResult::new(steps, faults, hits)
}

fn run_lru(frame_count: usize, refs: &[u64]) -> TraceResult {
    let mut frames: Vec<Option<u64>> = vec![None; frame_count];
    let mut usage: VecDeque<u64> = VecDeque::new();
    let mut steps = Vec::with_capacity(refs.len());
    let (mut faults, mut hits) = (0u64, 0u64);

    let touch = |usage: &mut VecDeque<u64>, page: u64| {
        if let Some(pos) = usage.iter().position(|&p| p == page) {
            usage.remove(pos);
        }
        usage.push_back(page);
    };

    for (t, &page) in refs.iter().enumerate() {
        let hit = frames.contains(&Some(page));
        let mut evicted = None;
        if hit {
            hits += 1;
            touch(&mut usage, page);
        } else {
            faults += 1;
            if let Some(idx) = frames.iter().position(Option::is_none) {
                frames[idx] = Some(page);
            } else {
                let victim = usage.pop_front().unwrap_or_else(|| {
                    frames[0].unwrap_or_default()
                });
                let idx = frames
                    .iter()
                    .position(|&f| f == Some(victim))
                    .unwrap_or(0);
                evicted = frames[idx];
                frames[idx] = Some(page);
            }
            touch(&mut usage, page);
        }
        steps.push(step(t, page, &frames, hit, evicted));
    }

    TraceResult::new(steps, faults, hits)
}

fn run_lfu(frame_count: usize, refs: &[u64]) -> TraceResult {
    let mut frames: Vec<Option<u64>> = vec![None; frame_count];
    let mut freq: ahash::AHashMap<u64, u64> = ahash::AHashMap::new();
    let mut stamp: ahash::AHashMap<u64, u64> = ahash::AHashMap::new();
    let mut counter = 0u64;
    let mut steps = Vec::with_capacity(refs.len());
    let (mut faults, mut hits) = (0u64, 0u64);

    for (t, &page) in refs.iter().enumerate() {
        counter += 1;
        let hit = frames.contains(&Some(page));
        let mut evicted = None;
        if hit {
            hits += 1;
            *freq.entry(page).or_insert(0) += 1;
            stamp.insert(page, counter);
        } else {
            faults += 1;
            if let Some(idx) = frames.iter().position(Option::is_none) {
                frames[idx] = Some(page);
            } else {
                let victim = frames
                    .iter()
                    .flatten()
                    .copied()
                    .min_by_key(|p| {
                        (
                            freq.get(p).copied().unwrap_or(0),
                            stamp.get(p).copied().unwrap_or(0),
                            *p,
                        )
                    })
                    .unwrap_or_default();
                let idx = frames
                    .iter()
                    .position(|&f| f == Some(victim))
                    .unwrap_or(0);
                evicted = frames[idx];
                frames[idx] = Some(page);
                freq.remove(&victim);
                stamp.remove(&victim);
            }
            freq.insert(page, 1);
            stamp.insert(page, counter);
        }
        steps.push(step(t, page, &frames, hit, evicted));
    }

    TraceResult::new(steps, faults, hits)
}

fn run_opt(frame_count: usize, refs: &[u64]) -> TraceResult {
    let mut frames: Vec<Option<u64>> = vec![None; frame_count];
    let mut steps = Vec::with_capacity(refs.len());
    let (mut faults, mut hits) = (0u64, 0u64);

    // Precompute future positions per page
    let mut future: ahash::AHashMap<u64, VecDeque<usize>> = ahash::AHashMap::new();
    for (idx, &page) in refs.iter().enumerate() {
        future.entry(page).or_default().push_back(idx);
    }

    for (t, &page) in refs.iter().enumerate() {
        if let Some(positions) = future.get_mut(&page) {
            if positions.front() == Some(&t) {
                positions.pop_front();
            }
        }

        let hit = frames.contains(&Some(page));
        let mut evicted = None;
        if hit {
            hits += 1;
        } else {
            faults += 1;
            if let Some(idx) = frames.iter().position(Option::is_none) {
                frames[idx] = Some(page);
            } else {
                // Victim: farthest next use; never referenced again wins
                let mut victim_index = 0usize;
                let mut best = -1i64;
                for (idx, slot) in frames.iter().enumerate() {
                    let next_use = slot
                        .and_then(|p| future.get(&p).and_then(|q| q.front().copied()))
                        .map(|n| n as i64)
                        .unwrap_or(i64::MAX);
                    if next_use > best {
                        best = next_use;
                        victim_index = idx;
                    }
                }
                evicted = frames[victim_index];
                frames[victim_index] = Some(page);
            }
        }
        steps.push(step(t, page, &frames, hit, evicted));
    }

    TraceResult::new(steps, faults, hits)
}

fn run_clock(frame_count: usize, refs: &[u64]) -> TraceResult {
    let mut frames: Vec<Option<u64>> = vec![None; frame_count];
    let mut ref_bits = vec![0u8; frame_count];
    let mut hand = 0usize;
    let mut steps = Vec::with_capacity(refs.len());
    let (mut faults, mut hits) = (0u64, 0u64);

    for (t, &page) in refs.iter().enumerate() {
        let mut evicted = None;
        let hit_idx = frames.iter().position(|&f| f == Some(page));
        let hit = hit_idx.is_some();
        if let Some(idx) = hit_idx {
            hits += 1;
            ref_bits[idx] = 1;
        } else {
            faults += 1;
            if let Some(idx) = frames.iter().position(Option::is_none) {
                frames[idx] = Some(page);
                ref_bits[idx] = 1;
            } else {
                while ref_bits[hand] == 1 {
                    ref_bits[hand] = 0;
                    hand = (hand + 1) % frame_count;
                }
                evicted = frames[hand];
                frames[hand] = Some(page);
                ref_bits[hand] = 1;
                hand = (hand + 1) % frame_count;
            }
        }
        steps.push(step(t, page, &frames, hit, evicted));
    }

    TraceResult::new(steps, faults, hits)
}
