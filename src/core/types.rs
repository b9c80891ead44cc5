/*!
 * Core Types
 * Common types used across the simulator
 */

/// Process identifier (unique, non-empty)
pub type Pid = String;

/// Logical simulation time (one tick = one unit)
pub type Tick = u64;

/// Virtual page number
pub type Vpn = u64;

/// Physical frame number
pub type Pfn = usize;

/// Virtual address
pub type VirtAddr = u64;

/// Common result type for simulator operations
pub type SimResult<T> = Result<T, super::errors::SimError>;

/// Timeline token for an idle slot
pub const IDLE: &str = "IDLE";
