/*!
 * Limits
 * Bounds for append-only buffers and runaway protection
 */

/// Maximum retained event-log entries
pub const EVENT_LOG_LIMIT: usize = 200;

/// Maximum retained memory-timeline tokens
pub const MEM_GANTT_LIMIT: usize = 5_000;

/// Maximum retained translation steps
pub const RECENT_STEPS_LIMIT: usize = 200;

/// Translation steps included in a serialized snapshot
pub const RECENT_STEPS_SNAPSHOT: usize = 80;

/// Maximum retained translation-log lines
pub const TRANSLATION_LOG_LIMIT: usize = 30;

/// Tick budget for a single comparison run
pub const COMPARE_TICK_BUDGET: u64 = 200_000;

/// References per CPU tick bounds
pub const MIN_REFS_PER_TICK: u32 = 1;
pub const MAX_REFS_PER_TICK: u32 = 3;
