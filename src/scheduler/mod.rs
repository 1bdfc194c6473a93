//! Multi-CPU round-robin process scheduler.
//!
//! # Module Organization
//!
//! - [`computer`]: process table, CPUs, ready queue and the tick loop
//! - [`process`]: processes and lifecycle states
//! - [`cpu`]: CPU slots
//! - `syscall`: exit, fork, waitpid, kill and sched_yield
//! - [`change`]: state changes deferred to the end of a tick
//! - [`snapshot`]: serializable views of the machine
//!
//! # Lifecycle
//!
//! ```text
//!   NEW ──► READY ◄──────────► RUNNING ──► TERMINATED ──► (reaped)
//!             ▲                  │
//!             └──── WAITING ◄────┘
//! ```
//!
//! A terminated process stays in the table until its parent collects it with
//! `waitpid`, or until the parent is already waiting when it terminates.
//! Orphans are adopted by init (pid 1), which waits for children forever.
//!
//! # Example
//!
//! ```
//! use rrsim::asm::compile;
//! use rrsim::scheduler::{Computer, INIT_PID};
//!
//! let mut computer = Computer::new(2, Some(5));
//! let program = compile("mov ebx, 3\nbegin: sub ebx, 1\njne begin").unwrap();
//! computer.spawn(program.shared(), INIT_PID);
//!
//! computer.run(100);
//! assert!(computer.is_settled());
//! ```

pub mod change;
pub mod computer;
pub mod cpu;
pub mod error;
pub mod process;
pub mod snapshot;
mod syscall;

pub use change::StateChange;
pub use computer::{Computer, INIT_PROGRAM, INIT_SOURCE};
pub use cpu::{get_free_cpu, Cpu};
pub use error::ScheduleError;
pub use process::{Pid, Process, ProcessState, WaitTarget, INIT_PID};
pub use snapshot::{CpuView, ProcessView, RegisterView, Snapshot};
