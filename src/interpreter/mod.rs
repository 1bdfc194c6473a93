//! Instruction interpreter.
//!
//! Executes one [`Instruction`](crate::isa::Instruction) at a time against a
//! process's [`RegisterFile`]. The interpreter knows nothing about processes
//! or CPUs: system calls come back as [`ExecuteResult::Syscall`] for the
//! scheduler to carry out.
//!
//! - [`state`]: registers and flags
//! - [`execute`]: ALU and control units
//!
//! # Example
//!
//! ```
//! use rrsim::interpreter::{execute, ExecuteResult, RegisterFile};
//! use rrsim::isa::{Instruction, Register, Value};
//!
//! let mut regs = RegisterFile::new();
//! let inst = Instruction::Mov { dst: Register::Ebx, src: Value::Immediate(3) };
//! assert_eq!(execute(&inst, &mut regs), ExecuteResult::Continue);
//! assert_eq!(regs.read(Register::Ebx), 3);
//! assert_eq!(regs.pc(), 1);
//! ```

pub mod execute;
pub mod state;

pub use execute::{execute, ControlUnit, ExecuteResult, ScalarAlu};
pub use state::{Flags, RegisterFile};
