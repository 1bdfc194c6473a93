//! Control unit execution.
//!
//! Handles control flow and system-call entry:
//!
//! - **Jump**: Conditional and unconditional jumps on the flags word
//! - **Loop**: Decrement `ecx` and branch while non-zero
//! - **Int/Call**: Hand a system call to the scheduler

use log::warn;

use crate::interpreter::state::{Flags, RegisterFile};
use crate::isa::{Condition, Instruction, LoopKind, Register, Syscall, ENOSYS};

use super::ExecuteResult;

/// Control unit for jumps, loops, and system calls.
pub struct ControlUnit;

impl ControlUnit {
    /// Execute a control instruction.
    ///
    /// Returns `Some(result)` if handled, `None` if not a control instruction.
    pub fn execute(instruction: &Instruction, regs: &mut RegisterFile) -> Option<ExecuteResult> {
        match instruction {
            Instruction::Jump { condition, target } => {
                if Self::evaluate_condition(*condition, regs.flags()) {
                    Some(ExecuteResult::Branch { target: target.index })
                } else {
                    Some(ExecuteResult::Continue)
                }
            }

            Instruction::Loop { kind, target } => {
                // ecx decrement leaves flags alone
                let ecx = regs.read(Register::Ecx).wrapping_sub(1);
                regs.write(Register::Ecx, ecx);

                let zf = regs.flags().zf;
                let taken = ecx != 0
                    && match kind {
                        LoopKind::Loop => true,
                        LoopKind::WhileZero => zf,
                        LoopKind::WhileNotZero => !zf,
                    };

                if taken {
                    Some(ExecuteResult::Branch { target: target.index })
                } else {
                    Some(ExecuteResult::Continue)
                }
            }

            Instruction::Int { .. } => {
                let code = regs.read(Register::Eax);
                match Syscall::from_code(code) {
                    Some(call) => Some(ExecuteResult::Syscall(call)),
                    None => {
                        warn!("unknown system call {}", code as i32);
                        regs.write_signed(Register::Eax, ENOSYS);
                        Some(ExecuteResult::Continue)
                    }
                }
            }

            Instruction::Call { syscall } => Some(ExecuteResult::Syscall(*syscall)),

            _ => None,
        }
    }

    /// Evaluate a jump condition against flags.
    pub fn evaluate_condition(condition: Condition, flags: Flags) -> bool {
        match condition {
            Condition::Always => true,
            Condition::Equal => flags.zf,
            Condition::NotEqual => !flags.zf,
            Condition::Greater => !flags.zf && (flags.sf == flags.of), // Signed >
            Condition::GreaterEqual => flags.sf == flags.of,            // Signed >=
            Condition::Less => flags.sf != flags.of,                    // Signed <
            Condition::LessEqual => flags.zf || (flags.sf != flags.of), // Signed <=
            Condition::Above => !flags.cf && !flags.zf,                 // Unsigned >
            Condition::AboveEqual => !flags.cf,
            Condition::Below => flags.cf,
            Condition::BelowEqual => flags.cf || flags.zf,
            Condition::Overflow => flags.of,
            Condition::NoOverflow => !flags.of,
            Condition::Sign => flags.sf,
            Condition::NoSign => !flags.sf,
        }
    }
}
