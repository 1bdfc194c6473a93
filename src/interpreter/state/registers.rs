//! Per-process register file.
//!
//! Eight 32-bit registers indexed by [`Register`]. Values are stored as
//! `u32`; signed readers reinterpret them as two's complement.

use std::fmt;

use crate::isa::{Register, Value, NUM_REGISTERS};

use super::flags::Flags;

/// Register file of a single process.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegisterFile {
    regs: [u32; NUM_REGISTERS],
}

impl RegisterFile {
    /// Create a new zeroed register file.
    pub const fn new() -> Self {
        Self {
            regs: [0; NUM_REGISTERS],
        }
    }

    /// Read a register.
    #[inline]
    pub fn read(&self, reg: Register) -> u32 {
        self.regs[reg.index()]
    }

    /// Write a register.
    #[inline]
    pub fn write(&mut self, reg: Register, value: u32) {
        self.regs[reg.index()] = value;
    }

    /// Read a register as a signed value.
    #[inline]
    pub fn read_signed(&self, reg: Register) -> i32 {
        self.read(reg) as i32
    }

    /// Write a signed value.
    #[inline]
    pub fn write_signed(&mut self, reg: Register, value: i32) {
        self.write(reg, value as u32);
    }

    /// Evaluate a value operand.
    #[inline]
    pub fn value(&self, value: Value) -> u32 {
        match value {
            Value::Register(reg) => self.read(reg),
            Value::Immediate(imm) => imm,
        }
    }

    /// Program counter as an instruction index.
    #[inline]
    pub fn pc(&self) -> usize {
        self.read(Register::Eip) as usize
    }

    /// Set the program counter.
    #[inline]
    pub fn set_pc(&mut self, pc: usize) {
        self.write(Register::Eip, pc as u32);
    }

    /// Step past the current instruction.
    #[inline]
    pub fn advance_pc(&mut self) {
        let pc = self.read(Register::Eip).wrapping_add(1);
        self.write(Register::Eip, pc);
    }

    /// Decoded flags word.
    #[inline]
    pub fn flags(&self) -> Flags {
        Flags::from_word(self.read(Register::Flags))
    }

    /// Replace the flags word.
    #[inline]
    pub fn set_flags(&mut self, flags: Flags) {
        self.write(Register::Flags, flags.to_word());
    }

    /// Iterate `(register, value)` pairs in register order.
    pub fn iter(&self) -> impl Iterator<Item = (Register, u32)> + '_ {
        Register::ALL.iter().map(move |reg| (*reg, self.read(*reg)))
    }
}

impl fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only show non-zero registers
        let non_zero: Vec<_> = self.iter().filter(|(_, v)| *v != 0).collect();

        if non_zero.is_empty() {
            write!(f, "RegisterFile {{ all zero }}")
        } else {
            write!(f, "RegisterFile {{ ")?;
            for (i, (reg, val)) in non_zero.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: 0x{:08X}", reg, val)?;
            }
            write!(f, " }}")
        }
    }
}
