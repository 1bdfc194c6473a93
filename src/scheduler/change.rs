//! Deferred state changes.
//!
//! Instructions executed during a tick never change another process's state
//! directly. They queue a [`StateChange`] which the scheduler applies after
//! every CPU has executed, so all CPUs see the same start-of-tick picture.

use super::process::{Pid, WaitTarget};

/// A pending state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    /// RUNNING to TERMINATED (exit, or `eip` out of bounds).
    Terminate(Pid),
    /// RUNNING to WAITING in `waitpid`.
    Block { pid: Pid, target: WaitTarget },
    /// RUNNING to READY in `sched_yield`.
    Yield(Pid),
    /// Drive `target` to TERMINATED on behalf of `killer`.
    Kill { killer: Pid, target: Pid },
    /// Reap `child` and wake `parent` if it is waiting for it.
    WakeAndReap { parent: Pid, child: Pid },
}

impl StateChange {
    /// Blocks are applied before anything else queued in the same tick.
    pub fn is_block(&self) -> bool {
        matches!(self, StateChange::Block { .. })
    }
}
