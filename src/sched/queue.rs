/*!
 * Ready Structures
 * Per-policy ready-queue disciplines over process-table indexes
 *
 * FCFS/RR keep insertion order; SJF/PRIORITY keep a selection set (the
 * pick key lives with the scheduler, which owns the process table); MLQ
 * keeps two FIFOs with SYS strictly dominating USER.
 */

use super::policy::SchedPolicy;
use crate::process::QueueClass;
use std::collections::VecDeque;

/// Ready discipline for the active policy
#[derive(Debug, Clone)]
pub enum ReadyQueue {
    /// Insertion-ordered FIFO (FCFS, RR)
    Fifo(VecDeque<usize>),
    /// Selection set; scanned with a policy key (SJF, PRIORITY)
    Set(Vec<usize>),
    /// Two FIFOs: SYS strictly dominates USER at every pick
    Mlq {
        sys: VecDeque<usize>,
        user: VecDeque<usize>,
    },
}

impl ReadyQueue {
    pub fn new(policy: SchedPolicy) -> Self {
        match policy {
            SchedPolicy::Fcfs | SchedPolicy::Rr => Self::Fifo(VecDeque::new()),
            SchedPolicy::Sjf | SchedPolicy::Priority => Self::Set(Vec::new()),
            SchedPolicy::Mlq => Self::Mlq {
                sys: VecDeque::new(),
                user: VecDeque::new(),
            },
        }
    }

    /// Append a process; MLQ routes by queue class
    pub fn push(&mut self, idx: usize, class: QueueClass) {
        match self {
            Self::Fifo(queue) => queue.push_back(idx),
            Self::Set(set) => set.push(idx),
            Self::Mlq { sys, user } => match class {
                QueueClass::Sys => sys.push_back(idx),
                QueueClass::User => user.push_back(idx),
            },
        }
    }

    /// Put a USER process back at the front (preempted by SYS)
    pub fn push_front_user(&mut self, idx: usize) {
        match self {
            Self::Mlq { user, .. } => user.push_front(idx),
            Self::Fifo(queue) => queue.push_front(idx),
            Self::Set(set) => set.insert(0, idx),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Fifo(queue) => queue.is_empty(),
            Self::Set(set) => set.is_empty(),
            Self::Mlq { sys, user } => sys.is_empty() && user.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Fifo(queue) => queue.len(),
            Self::Set(set) => set.len(),
            Self::Mlq { sys, user } => sys.len() + user.len(),
        }
    }

    /// Whether any SYS-class process is waiting (MLQ dominance check)
    pub fn sys_pending(&self) -> bool {
        matches!(self, Self::Mlq { sys, .. } if !sys.is_empty())
    }

    /// Whether a queue-mate of `class` is waiting (MLQ slice rotation)
    pub fn class_pending(&self, class: QueueClass) -> bool {
        match self {
            Self::Mlq { sys, user } => match class {
                QueueClass::Sys => !sys.is_empty(),
                QueueClass::User => !user.is_empty(),
            },
            other => !other.is_empty(),
        }
    }

    /// Pop the FIFO head (FCFS/RR) or the dominant MLQ head
    pub fn pop_front(&mut self) -> Option<usize> {
        match self {
            Self::Fifo(queue) => queue.pop_front(),
            Self::Set(set) => {
                if set.is_empty() {
                    None
                } else {
                    Some(set.remove(0))
                }
            }
            Self::Mlq { sys, user } => sys.pop_front().or_else(|| user.pop_front()),
        }
    }

    /// Remove the entry selected by a set scan
    pub fn take(&mut self, idx: usize) -> bool {
        let remove = |queue: &mut VecDeque<usize>| {
            queue
                .iter()
                .position(|&i| i == idx)
                .map(|pos| queue.remove(pos))
                .is_some()
        };
        match self {
            Self::Fifo(queue) => remove(queue),
            Self::Set(set) => set
                .iter()
                .position(|&i| i == idx)
                .map(|pos| set.remove(pos))
                .is_some(),
            Self::Mlq { sys, user } => remove(sys) || remove(user),
        }
    }

    /// All waiting indexes in display order (SYS before USER for MLQ)
    pub fn iter_indexes(&self) -> Vec<usize> {
        match self {
            Self::Fifo(queue) => queue.iter().copied().collect(),
            Self::Set(set) => set.clone(),
            Self::Mlq { sys, user } => sys.iter().chain(user.iter()).copied().collect(),
        }
    }

    /// MLQ views (empty for single-queue disciplines)
    pub fn mlq_indexes(&self) -> (Vec<usize>, Vec<usize>) {
        match self {
            Self::Mlq { sys, user } => (
                sys.iter().copied().collect(),
                user.iter().copied().collect(),
            ),
            _ => (Vec::new(), Vec::new()),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Self::Fifo(queue) => queue.clear(),
            Self::Set(set) => set.clear(),
            Self::Mlq { sys, user } => {
                sys.clear();
                user.clear();
            }
        }
    }
}
