//! Instruction representation.
//!
//! Instructions are a tagged variant over instruction families, each carrying
//! its resolved operands. Mnemonic aliases (`jz`/`je`, `jnae`/`jb`, ...) are
//! folded into the same variant at assembly time, so two sources that differ
//! only in alias choice compile to equal instruction lists.

use std::fmt;

use super::operand::{Register, Value};
use super::syscall::Syscall;

/// Two-operand ALU operation writing its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }
}

/// Flags-only comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Subtract, keep only the flags.
    Cmp,
    /// Bitwise and, keep only the flags.
    Test,
}

impl CompareOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            CompareOp::Cmp => "cmp",
            CompareOp::Test => "test",
        }
    }
}

/// Single-operand ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Inc,
    Dec,
    Not,
    Neg,
}

impl UnaryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            UnaryOp::Inc => "inc",
            UnaryOp::Dec => "dec",
            UnaryOp::Not => "not",
            UnaryOp::Neg => "neg",
        }
    }
}

/// Bit shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    /// Arithmetic left (identical to `Shl`).
    Sal,
    /// Logical left.
    Shl,
    /// Arithmetic right (sign-filling).
    Sar,
    /// Logical right (zero-filling).
    Shr,
}

impl ShiftOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            ShiftOp::Sal => "sal",
            ShiftOp::Shl => "shl",
            ShiftOp::Sar => "sar",
            ShiftOp::Shr => "shr",
        }
    }
}

/// Branch condition, a pure predicate over the flags word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Condition {
    /// Unconditional (`jmp`).
    #[default]
    Always,
    /// ZF=1.
    Equal,
    /// ZF=0.
    NotEqual,
    /// Signed: ZF=0 and SF=OF.
    Greater,
    /// Signed: SF=OF.
    GreaterEqual,
    /// Signed: SF!=OF.
    Less,
    /// Signed: ZF=1 or SF!=OF.
    LessEqual,
    /// Unsigned: CF=0 and ZF=0.
    Above,
    /// Unsigned: CF=0.
    AboveEqual,
    /// Unsigned: CF=1.
    Below,
    /// Unsigned: CF=1 or ZF=1.
    BelowEqual,
    /// OF=1.
    Overflow,
    /// OF=0.
    NoOverflow,
    /// SF=1.
    Sign,
    /// SF=0.
    NoSign,
}

impl Condition {
    /// Canonical jump mnemonic for this condition.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Condition::Always => "jmp",
            Condition::Equal => "je",
            Condition::NotEqual => "jne",
            Condition::Greater => "jg",
            Condition::GreaterEqual => "jge",
            Condition::Less => "jl",
            Condition::LessEqual => "jle",
            Condition::Above => "ja",
            Condition::AboveEqual => "jae",
            Condition::Below => "jb",
            Condition::BelowEqual => "jbe",
            Condition::Overflow => "jo",
            Condition::NoOverflow => "jno",
            Condition::Sign => "js",
            Condition::NoSign => "jns",
        }
    }
}

/// `loop` family variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    /// Branch while `ecx != 0`.
    Loop,
    /// Branch while `ecx != 0` and ZF=1.
    WhileZero,
    /// Branch while `ecx != 0` and ZF=0.
    WhileNotZero,
}

impl LoopKind {
    pub fn mnemonic(self) -> &'static str {
        match self {
            LoopKind::Loop => "loop",
            LoopKind::WhileZero => "loopz",
            LoopKind::WhileNotZero => "loopnz",
        }
    }
}

/// A resolved branch target.
///
/// Keeps the label name the source used so the disassembler can restore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Instruction index to continue at.
    pub index: usize,
    /// Lower-cased label name.
    pub label: String,
}

impl Target {
    /// Create a target whose index is filled in by the second assembler pass.
    pub fn unresolved(label: impl Into<String>) -> Self {
        Self {
            index: 0,
            label: label.into(),
        }
    }
}

/// A single decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `mov dst, src`. Never touches flags.
    Mov { dst: Register, src: Value },
    /// `add/sub/and/or/xor dst, src`.
    Binary { op: BinaryOp, dst: Register, src: Value },
    /// `cmp/test lhs, rhs`.
    Compare { op: CompareOp, lhs: Register, rhs: Value },
    /// `inc/dec/not/neg dst`.
    Unary { op: UnaryOp, dst: Register },
    /// `sal/shl/sar/shr dst[, count]`. A missing count shifts by one.
    Shift {
        op: ShiftOp,
        dst: Register,
        count: Option<Value>,
    },
    /// `jmp` and `j<cond>`.
    Jump { condition: Condition, target: Target },
    /// `loop/loopz/loopnz`.
    Loop { kind: LoopKind, target: Target },
    /// Software interrupt. Only the system-call vector assembles.
    Int { vector: u32 },
    /// Direct system call by name.
    Call { syscall: Syscall },
}

impl Instruction {
    /// Canonical mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Mov { .. } => "mov",
            Instruction::Binary { op, .. } => op.mnemonic(),
            Instruction::Compare { op, .. } => op.mnemonic(),
            Instruction::Unary { op, .. } => op.mnemonic(),
            Instruction::Shift { op, .. } => op.mnemonic(),
            Instruction::Jump { condition, .. } => condition.mnemonic(),
            Instruction::Loop { kind, .. } => kind.mnemonic(),
            Instruction::Int { .. } => "int",
            Instruction::Call { .. } => "call",
        }
    }

    /// Branch target, for jump-family instructions.
    pub fn target(&self) -> Option<&Target> {
        match self {
            Instruction::Jump { target, .. } | Instruction::Loop { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Mutable branch target, used by label resolution.
    pub fn target_mut(&mut self) -> Option<&mut Target> {
        match self {
            Instruction::Jump { target, .. } | Instruction::Loop { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Check if this instruction can enter the scheduler.
    pub fn is_syscall(&self) -> bool {
        matches!(self, Instruction::Int { .. } | Instruction::Call { .. })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.mnemonic();
        match self {
            Instruction::Mov { dst, src } | Instruction::Binary { dst, src, .. } => {
                write!(f, "{} {}, {}", mnemonic, dst, src)
            }
            Instruction::Compare { lhs, rhs, .. } => write!(f, "{} {}, {}", mnemonic, lhs, rhs),
            Instruction::Unary { dst, .. } => write!(f, "{} {}", mnemonic, dst),
            Instruction::Shift { dst, count, .. } => match count {
                Some(count) => write!(f, "{} {}, {}", mnemonic, dst, count),
                None => write!(f, "{} {}", mnemonic, dst),
            },
            Instruction::Jump { target, .. } | Instruction::Loop { target, .. } => {
                write!(f, "{} {}", mnemonic, target.label)
            }
            Instruction::Int { vector } => write!(f, "int 0x{:x}", vector),
            Instruction::Call { syscall } => write!(f, "call {}", syscall),
        }
    }
}
