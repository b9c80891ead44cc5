/*!
 * schedos
 * Deterministic tick-driven OS scheduling simulator kernel
 *
 * A single owning scheduler advances processes through the
 * NEW -> READY -> RUNNING -> WAITING_IO -> WAITING_MEM -> DONE lifecycle
 * under a chosen CPU policy, models an I/O device and a paged
 * virtual-memory subsystem, and publishes value snapshots of the full
 * state after every tick.
 */

pub mod analytics;
pub mod compare;
pub mod core;
pub mod memory;
pub mod metrics;
pub mod process;
pub mod replay;
pub mod sched;
pub mod session;
pub mod snapshot;

pub use crate::core::{ProcessError, SimError, SimResult};
pub use compare::{compare_all, CompareOptions, CompareReport, OptimizeMode};
pub use memory::{MemoryConfig, MemoryManager, MemoryMode, ReplacementPolicy};
pub use process::{Process, ProcessSpec, ProcessState, QueueClass};
pub use sched::{SchedConfig, SchedPolicy, Scheduler};
pub use session::{spawn_session, Command, Session, SessionHandle};
pub use snapshot::StateSnapshot;
