//! Registers and operands.
//!
//! The register set is deliberately tiny: four general purpose registers
//! named after their x86 counterparts, two index registers, the program
//! counter and the flags word. Every register is 32 bits wide.
//!
//! Operands come in three lexical classes:
//!
//! | Class     | Examples                      |
//! |-----------|-------------------------------|
//! | Register  | `eax`, `EBX`, `flags`         |
//! | Immediate | `42`, `-1`, `0x80`, `0ffh`    |
//! | Label     | `begin`, `.loop`, `_done`     |

use std::fmt;

use serde::Serialize;

/// Number of registers in a register file.
pub const NUM_REGISTERS: usize = 8;

/// An architectural register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Register {
    /// Accumulator. Holds the system-call number and its return value.
    Eax,
    /// System-call argument.
    Ebx,
    /// Counter used by the `loop` family.
    Ecx,
    Edx,
    Esi,
    Edi,
    /// Program counter (instruction index, not a byte address).
    Eip,
    /// Flags word.
    Flags,
}

impl Register {
    /// All registers in register-file order.
    pub const ALL: [Register; NUM_REGISTERS] = [
        Register::Eax,
        Register::Ebx,
        Register::Ecx,
        Register::Edx,
        Register::Esi,
        Register::Edi,
        Register::Eip,
        Register::Flags,
    ];

    /// Look up a register by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|reg| reg.name().eq_ignore_ascii_case(name))
    }

    /// Canonical lower-case name.
    pub fn name(self) -> &'static str {
        match self {
            Register::Eax => "eax",
            Register::Ebx => "ebx",
            Register::Ecx => "ecx",
            Register::Edx => "edx",
            Register::Esi => "esi",
            Register::Edi => "edi",
            Register::Eip => "eip",
            Register::Flags => "flags",
        }
    }

    /// Index into a register file.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value-producing operand: a register or an immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// Read the current contents of a register.
    Register(Register),
    /// A 32-bit literal, stored wrapped.
    Immediate(u32),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Register(reg) => write!(f, "{}", reg),
            // Signed rendering keeps `-1` readable and re-assembles to the same bits
            Value::Immediate(imm) => write!(f, "{}", *imm as i32),
        }
    }
}

/// Operand kind, used by the mnemonic catalog to describe signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Register,
    Immediate,
    Label,
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandKind::Register => f.write_str("register"),
            OperandKind::Immediate => f.write_str("immediate"),
            OperandKind::Label => f.write_str("label"),
        }
    }
}

/// A parsed operand, before label resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Register(Register),
    Immediate(u32),
    /// Symbolic name, lower-cased.
    Label(String),
}

impl Operand {
    /// Kind of this operand.
    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::Register(_) => OperandKind::Register,
            Operand::Immediate(_) => OperandKind::Immediate,
            Operand::Label(_) => OperandKind::Label,
        }
    }

    /// Convert to a value operand. Labels have no value.
    pub fn as_value(&self) -> Option<Value> {
        match self {
            Operand::Register(reg) => Some(Value::Register(*reg)),
            Operand::Immediate(imm) => Some(Value::Immediate(*imm)),
            Operand::Label(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(reg) => write!(f, "{}", reg),
            Operand::Immediate(imm) => write!(f, "{}", *imm as i32),
            Operand::Label(name) => f.write_str(name),
        }
    }
}
