/*!
 * Process Module
 * Descriptors, lifecycle states, and runtime process records
 */

pub mod types;

pub use types::{BurstList, BurstSegment, Process, ProcessSpec, ProcessState, QueueClass};
