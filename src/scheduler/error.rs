//! Errors from the manual-control API.

use thiserror::Error;

use super::process::{Pid, ProcessState};

/// Errors returned by front-end operations such as
/// [`Computer::force_running`](super::Computer::force_running).
///
/// Invariant violations inside the scheduler are not represented here; they
/// panic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// No process with this pid.
    #[error("no such process: {0}")]
    NoSuchProcess(Pid),

    /// The process is not in a state the operation accepts.
    #[error("process {pid} is {state}, expected {expected}")]
    InvalidState {
        pid: Pid,
        state: ProcessState,
        expected: &'static str,
    },

    /// The computer has no CPUs.
    #[error("no CPUs")]
    NoCpus,

    /// No installed program with this name.
    #[error("unknown program '{0}'")]
    UnknownProgram(String),
}
