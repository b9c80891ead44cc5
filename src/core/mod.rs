/*!
 * Core Module
 * Shared types, errors, and buffer limits
 */

pub mod errors;
pub mod limits;
pub mod types;

pub use errors::{ProcessError, SimError};
pub use types::{Pid, Pfn, SimResult, Tick, VirtAddr, Vpn, IDLE};
