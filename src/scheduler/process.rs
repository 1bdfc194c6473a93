//! Processes and their lifecycle states.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::interpreter::RegisterFile;
use crate::isa::{Instruction, Program};

/// Process identifier.
pub type Pid = u32;

/// Pid of the permanent init process.
pub const INIT_PID: Pid = 1;

/// Lifecycle state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessState {
    /// Created by spawn or fork, promoted on the next tick.
    New,
    /// In the ready queue.
    Ready,
    /// Resident on a CPU.
    Running,
    /// Blocked in `waitpid`.
    Waiting,
    /// Finished, waiting to be reaped by its parent.
    Terminated,
}

impl ProcessState {
    /// Upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            ProcessState::New => "NEW",
            ProcessState::Ready => "READY",
            ProcessState::Running => "RUNNING",
            ProcessState::Waiting => "WAITING",
            ProcessState::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which children a blocked `waitpid` is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTarget {
    /// Any child (`ebx` = -1).
    Any,
    /// One specific child.
    Child(Pid),
}

impl WaitTarget {
    /// Check if the termination of `child` satisfies this wait.
    pub fn matches(self, child: Pid) -> bool {
        match self {
            WaitTarget::Any => true,
            WaitTarget::Child(pid) => pid == child,
        }
    }
}

/// A simulated process.
///
/// Owns its register file; the program is shared with every process spawned
/// from it and every forked descendant.
#[derive(Debug, Clone)]
pub struct Process {
    pub(super) pid: Pid,
    pub(super) ppid: Pid,
    pub(super) program: Arc<Program>,
    pub(super) registers: RegisterFile,
    pub(super) state: ProcessState,
    pub(super) cpu: Option<usize>,
    pub(super) waiting_for: Option<WaitTarget>,
}

impl Process {
    pub(super) fn new(pid: Pid, ppid: Pid, program: Arc<Program>) -> Self {
        Self {
            pid,
            ppid,
            program,
            registers: RegisterFile::new(),
            state: ProcessState::New,
            cpu: None,
            waiting_for: None,
        }
    }

    /// Process id.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Parent process id (0 for init).
    pub fn ppid(&self) -> Pid {
        self.ppid
    }

    /// Shared program.
    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// Register file.
    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Lifecycle state.
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// CPU index, set exactly while RUNNING.
    pub fn cpu(&self) -> Option<usize> {
        self.cpu
    }

    /// Wait condition, set exactly while WAITING.
    pub fn waiting_for(&self) -> Option<WaitTarget> {
        self.waiting_for
    }

    /// Instruction at `eip`, or `None` when `eip` is past the end.
    pub fn current_instruction(&self) -> Option<&Instruction> {
        self.program.get(self.registers.pc())
    }
}
