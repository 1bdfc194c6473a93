//! Integer ALU.
//!
//! Handles data movement, arithmetic, logic and shift instructions on 32-bit
//! registers. Flag updates follow x86:
//!
//! - **mov**: no flags
//! - **add/sub/cmp/neg**: ZF, SF, CF, OF from the full result
//! - **inc/dec**: like add/sub by one, but CF is preserved
//! - **and/or/xor/test**: ZF, SF from the result, CF and OF cleared
//! - **not**: no flags
//! - **shifts**: CF is the last bit shifted out; OF is only defined for a
//!   count of exactly one and is left alone otherwise; a zero count changes
//!   nothing

use crate::interpreter::state::{Flags, RegisterFile};
use crate::isa::{BinaryOp, CompareOp, Instruction, ShiftOp, UnaryOp};

/// Integer ALU execution unit.
pub struct ScalarAlu;

impl ScalarAlu {
    /// Execute a register-only instruction.
    ///
    /// Returns `true` if the instruction was handled, `false` if it is not an
    /// ALU instruction. Handled instructions never move the program counter.
    pub fn execute(instruction: &Instruction, regs: &mut RegisterFile) -> bool {
        match instruction {
            Instruction::Mov { dst, src } => {
                let value = regs.value(*src);
                regs.write(*dst, value);
                true
            }

            Instruction::Binary { op, dst, src } => {
                let a = regs.read(*dst);
                let b = regs.value(*src);
                let (result, flags) = Self::binary(*op, a, b);
                regs.write(*dst, result);
                regs.set_flags(flags);
                true
            }

            Instruction::Compare { op, lhs, rhs } => {
                let a = regs.read(*lhs);
                let b = regs.value(*rhs);
                let flags = match op {
                    CompareOp::Cmp => Self::binary(BinaryOp::Sub, a, b).1,
                    CompareOp::Test => Flags::from_logic(a & b),
                };
                regs.set_flags(flags);
                true
            }

            Instruction::Unary { op, dst } => {
                let a = regs.read(*dst);
                let previous = regs.flags();
                let (result, flags) = Self::unary(*op, a, previous);
                regs.write(*dst, result);
                regs.set_flags(flags);
                true
            }

            Instruction::Shift { op, dst, count } => {
                let a = regs.read(*dst);
                let count = count.map_or(1, |c| regs.value(c));
                let previous = regs.flags();
                let (result, flags) = Self::shift(*op, a, count, previous);
                regs.write(*dst, result);
                regs.set_flags(flags);
                true
            }

            _ => false,
        }
    }

    fn binary(op: BinaryOp, a: u32, b: u32) -> (u32, Flags) {
        match op {
            BinaryOp::Add => {
                let result = a.wrapping_add(b);
                (result, Flags::from_add(a, b, result))
            }
            BinaryOp::Sub => {
                let result = a.wrapping_sub(b);
                (result, Flags::from_sub(a, b, result))
            }
            BinaryOp::And => (a & b, Flags::from_logic(a & b)),
            BinaryOp::Or => (a | b, Flags::from_logic(a | b)),
            BinaryOp::Xor => (a ^ b, Flags::from_logic(a ^ b)),
        }
    }

    fn unary(op: UnaryOp, a: u32, previous: Flags) -> (u32, Flags) {
        match op {
            UnaryOp::Inc => {
                let result = a.wrapping_add(1);
                let mut flags = Flags::from_add(a, 1, result);
                flags.cf = previous.cf;
                (result, flags)
            }
            UnaryOp::Dec => {
                let result = a.wrapping_sub(1);
                let mut flags = Flags::from_sub(a, 1, result);
                flags.cf = previous.cf;
                (result, flags)
            }
            UnaryOp::Not => (!a, previous),
            UnaryOp::Neg => {
                let result = 0u32.wrapping_sub(a);
                (result, Flags::from_sub(0, a, result))
            }
        }
    }

    fn shift(op: ShiftOp, a: u32, count: u32, previous: Flags) -> (u32, Flags) {
        let count = count & 0x1F;
        if count == 0 {
            return (a, previous);
        }

        let (result, carry, overflow) = match op {
            ShiftOp::Sal | ShiftOp::Shl => {
                let result = a << count;
                let carry = (a >> (32 - count)) & 1 != 0;
                (result, carry, ((result >> 31) != 0) != carry)
            }
            ShiftOp::Shr => {
                let result = a >> count;
                let carry = (a >> (count - 1)) & 1 != 0;
                (result, carry, (a >> 31) != 0)
            }
            ShiftOp::Sar => {
                let result = ((a as i32) >> count) as u32;
                let carry = ((a as i32) >> (count - 1)) & 1 != 0;
                (result, carry, false)
            }
        };

        let flags = Flags {
            zf: result == 0,
            sf: (result as i32) < 0,
            cf: carry,
            of: if count == 1 { overflow } else { previous.of },
        };
        (result, flags)
    }
}
