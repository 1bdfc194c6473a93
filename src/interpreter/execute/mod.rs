//! Execution units.
//!
//! | Unit    | Instructions                                  |
//! |---------|-----------------------------------------------|
//! | ALU     | `mov`, arithmetic, logic, shifts              |
//! | Control | jumps, loops, `int`, `call`                   |
//!
//! [`execute`] runs one instruction and applies the program-counter update
//! for everything except system calls. A system call leaves `eip` on the
//! calling instruction; the scheduler decides when to step past it.

mod alu;
mod control;

pub use alu::ScalarAlu;
pub use control::ControlUnit;

use crate::interpreter::state::RegisterFile;
use crate::isa::{Instruction, Syscall};

/// Result of executing an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteResult {
    /// Continue to the next instruction.
    Continue,

    /// Branch to an instruction index.
    Branch {
        /// Target instruction index.
        target: usize,
    },

    /// The instruction requests a system call. `eip` is unchanged.
    Syscall(Syscall),
}

/// Execute one instruction against a register file.
///
/// `Continue` and `Branch` results have already been applied to `eip` when
/// this returns.
pub fn execute(instruction: &Instruction, regs: &mut RegisterFile) -> ExecuteResult {
    let result = if ScalarAlu::execute(instruction, regs) {
        ExecuteResult::Continue
    } else {
        ControlUnit::execute(instruction, regs).unwrap_or(ExecuteResult::Continue)
    };

    match result {
        ExecuteResult::Continue => regs.advance_pc(),
        ExecuteResult::Branch { target } => regs.set_pc(target),
        ExecuteResult::Syscall(_) => {}
    }

    result
}
