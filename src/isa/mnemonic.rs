//! Mnemonic catalog.
//!
//! Each mnemonic declares its operand signature: a list of required operand
//! positions and a list of optional ones, where every position accepts one or
//! more [`OperandKind`]s. [`Mnemonic::build`] checks operands against the
//! signature and produces an [`Instruction`]. Branch targets come out
//! unresolved; the assembler patches their indices once all labels are known.

use thiserror::Error;

use super::instruction::{
    BinaryOp, CompareOp, Condition, Instruction, LoopKind, ShiftOp, Target, UnaryOp,
};
use super::operand::{Operand, OperandKind, Register, Value};
use super::syscall::{Syscall, SYSCALL_VECTOR};

/// Operand signature of a mnemonic.
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    /// Positions that must be present.
    pub required: &'static [&'static [OperandKind]],
    /// Positions that may follow the required ones.
    pub optional: &'static [&'static [OperandKind]],
}

impl Signature {
    /// Maximum number of operands.
    pub fn max_operands(&self) -> usize {
        self.required.len() + self.optional.len()
    }

    /// Accepted kinds at `position`, if the position exists.
    pub fn accepts(&self, position: usize) -> Option<&'static [OperandKind]> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .nth(position)
            .copied()
    }

    fn describe_count(&self) -> String {
        if self.optional.is_empty() {
            self.required.len().to_string()
        } else {
            format!("{}-{}", self.required.len(), self.max_operands())
        }
    }
}

const REG: &[OperandKind] = &[OperandKind::Register];
const VALUE: &[OperandKind] = &[OperandKind::Register, OperandKind::Immediate];
const IMM: &[OperandKind] = &[OperandKind::Immediate];
const LABEL: &[OperandKind] = &[OperandKind::Label];

const DST_SRC: Signature = Signature { required: &[REG, VALUE], optional: &[] };
const DST: Signature = Signature { required: &[REG], optional: &[] };
const DST_COUNT: Signature = Signature { required: &[REG], optional: &[VALUE] };
const BRANCH: Signature = Signature { required: &[LABEL], optional: &[] };
const VECTOR: Signature = Signature { required: &[IMM], optional: &[] };

/// Operand errors reported by [`Mnemonic::build`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OperandError {
    /// Too few or too many operands.
    #[error("'{mnemonic}' takes {expected} operand(s), found {found}")]
    WrongCount {
        mnemonic: &'static str,
        expected: String,
        found: usize,
    },

    /// An operand of the wrong kind at some position.
    #[error("operand {position} of '{mnemonic}' must be {expected}, found {found}")]
    WrongKind {
        mnemonic: &'static str,
        /// 1-based operand position.
        position: usize,
        expected: String,
        found: OperandKind,
    },

    /// Lexically fine but not meaningful for this mnemonic.
    #[error("unrecognized operand '{0}'")]
    Unrecognized(String),
}

/// A source-level mnemonic, after alias folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Mov,
    Binary(BinaryOp),
    Compare(CompareOp),
    Unary(UnaryOp),
    Shift(ShiftOp),
    Jump(Condition),
    Loop(LoopKind),
    Int,
    Call,
}

/// Every accepted spelling, aliases included.
const CATALOG: &[(&str, Mnemonic)] = &[
    ("mov", Mnemonic::Mov),
    ("add", Mnemonic::Binary(BinaryOp::Add)),
    ("sub", Mnemonic::Binary(BinaryOp::Sub)),
    ("and", Mnemonic::Binary(BinaryOp::And)),
    ("or", Mnemonic::Binary(BinaryOp::Or)),
    ("xor", Mnemonic::Binary(BinaryOp::Xor)),
    ("cmp", Mnemonic::Compare(CompareOp::Cmp)),
    ("test", Mnemonic::Compare(CompareOp::Test)),
    ("inc", Mnemonic::Unary(UnaryOp::Inc)),
    ("dec", Mnemonic::Unary(UnaryOp::Dec)),
    ("not", Mnemonic::Unary(UnaryOp::Not)),
    ("neg", Mnemonic::Unary(UnaryOp::Neg)),
    ("sal", Mnemonic::Shift(ShiftOp::Sal)),
    ("shl", Mnemonic::Shift(ShiftOp::Shl)),
    ("sar", Mnemonic::Shift(ShiftOp::Sar)),
    ("shr", Mnemonic::Shift(ShiftOp::Shr)),
    ("jmp", Mnemonic::Jump(Condition::Always)),
    ("je", Mnemonic::Jump(Condition::Equal)),
    ("jz", Mnemonic::Jump(Condition::Equal)),
    ("jne", Mnemonic::Jump(Condition::NotEqual)),
    ("jnz", Mnemonic::Jump(Condition::NotEqual)),
    ("jg", Mnemonic::Jump(Condition::Greater)),
    ("jnle", Mnemonic::Jump(Condition::Greater)),
    ("jge", Mnemonic::Jump(Condition::GreaterEqual)),
    ("jnl", Mnemonic::Jump(Condition::GreaterEqual)),
    ("jl", Mnemonic::Jump(Condition::Less)),
    ("jnge", Mnemonic::Jump(Condition::Less)),
    ("jle", Mnemonic::Jump(Condition::LessEqual)),
    ("jng", Mnemonic::Jump(Condition::LessEqual)),
    ("ja", Mnemonic::Jump(Condition::Above)),
    ("jnbe", Mnemonic::Jump(Condition::Above)),
    ("jae", Mnemonic::Jump(Condition::AboveEqual)),
    ("jnb", Mnemonic::Jump(Condition::AboveEqual)),
    ("jnc", Mnemonic::Jump(Condition::AboveEqual)),
    ("jb", Mnemonic::Jump(Condition::Below)),
    ("jnae", Mnemonic::Jump(Condition::Below)),
    ("jc", Mnemonic::Jump(Condition::Below)),
    ("jbe", Mnemonic::Jump(Condition::BelowEqual)),
    ("jna", Mnemonic::Jump(Condition::BelowEqual)),
    ("jo", Mnemonic::Jump(Condition::Overflow)),
    ("jno", Mnemonic::Jump(Condition::NoOverflow)),
    ("js", Mnemonic::Jump(Condition::Sign)),
    ("jns", Mnemonic::Jump(Condition::NoSign)),
    ("loop", Mnemonic::Loop(LoopKind::Loop)),
    ("loopz", Mnemonic::Loop(LoopKind::WhileZero)),
    ("loope", Mnemonic::Loop(LoopKind::WhileZero)),
    ("loopnz", Mnemonic::Loop(LoopKind::WhileNotZero)),
    ("loopne", Mnemonic::Loop(LoopKind::WhileNotZero)),
    ("int", Mnemonic::Int),
    ("call", Mnemonic::Call),
];

impl Mnemonic {
    /// Look up a mnemonic (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        CATALOG
            .iter()
            .find(|(spelling, _)| spelling.eq_ignore_ascii_case(name))
            .map(|(_, mnemonic)| *mnemonic)
    }

    /// Canonical spelling.
    pub fn name(self) -> &'static str {
        match self {
            Mnemonic::Mov => "mov",
            Mnemonic::Binary(op) => op.mnemonic(),
            Mnemonic::Compare(op) => op.mnemonic(),
            Mnemonic::Unary(op) => op.mnemonic(),
            Mnemonic::Shift(op) => op.mnemonic(),
            Mnemonic::Jump(condition) => condition.mnemonic(),
            Mnemonic::Loop(kind) => kind.mnemonic(),
            Mnemonic::Int => "int",
            Mnemonic::Call => "call",
        }
    }

    /// Operand signature.
    pub fn signature(self) -> Signature {
        match self {
            Mnemonic::Mov | Mnemonic::Binary(_) | Mnemonic::Compare(_) => DST_SRC,
            Mnemonic::Unary(_) => DST,
            Mnemonic::Shift(_) => DST_COUNT,
            Mnemonic::Jump(_) | Mnemonic::Loop(_) | Mnemonic::Call => BRANCH,
            Mnemonic::Int => VECTOR,
        }
    }

    /// Check operand count and kinds against the signature.
    pub fn check(self, operands: &[Operand]) -> Result<(), OperandError> {
        let signature = self.signature();
        if operands.len() < signature.required.len() || operands.len() > signature.max_operands() {
            return Err(OperandError::WrongCount {
                mnemonic: self.name(),
                expected: signature.describe_count(),
                found: operands.len(),
            });
        }

        for (i, operand) in operands.iter().enumerate() {
            let accepted = signature.accepts(i).unwrap_or(&[]);
            if !accepted.contains(&operand.kind()) {
                let expected = accepted
                    .iter()
                    .map(|kind| kind.to_string())
                    .collect::<Vec<_>>()
                    .join(" or ");
                return Err(OperandError::WrongKind {
                    mnemonic: self.name(),
                    position: i + 1,
                    expected,
                    found: operand.kind(),
                });
            }
        }

        Ok(())
    }

    /// Build an instruction from checked operands.
    ///
    /// Branch targets are left unresolved.
    pub fn build(self, operands: &[Operand]) -> Result<Instruction, OperandError> {
        self.check(operands)?;

        let instruction = match self {
            Mnemonic::Mov => Instruction::Mov {
                dst: register_at(operands, 0)?,
                src: value_at(operands, 1)?,
            },
            Mnemonic::Binary(op) => Instruction::Binary {
                op,
                dst: register_at(operands, 0)?,
                src: value_at(operands, 1)?,
            },
            Mnemonic::Compare(op) => Instruction::Compare {
                op,
                lhs: register_at(operands, 0)?,
                rhs: value_at(operands, 1)?,
            },
            Mnemonic::Unary(op) => Instruction::Unary {
                op,
                dst: register_at(operands, 0)?,
            },
            Mnemonic::Shift(op) => Instruction::Shift {
                op,
                dst: register_at(operands, 0)?,
                count: match operands.get(1) {
                    Some(_) => Some(value_at(operands, 1)?),
                    None => None,
                },
            },
            Mnemonic::Jump(condition) => Instruction::Jump {
                condition,
                target: Target::unresolved(label_at(operands, 0)?),
            },
            Mnemonic::Loop(kind) => Instruction::Loop {
                kind,
                target: Target::unresolved(label_at(operands, 0)?),
            },
            Mnemonic::Int => match value_at(operands, 0)? {
                Value::Immediate(SYSCALL_VECTOR) => Instruction::Int { vector: SYSCALL_VECTOR },
                _ => return Err(OperandError::Unrecognized(operands[0].to_string())),
            },
            Mnemonic::Call => {
                let name = label_at(operands, 0)?;
                let syscall = Syscall::from_name(name)
                    .ok_or_else(|| OperandError::Unrecognized(name.to_string()))?;
                Instruction::Call { syscall }
            }
        };

        Ok(instruction)
    }
}

fn register_at(operands: &[Operand], i: usize) -> Result<Register, OperandError> {
    match operands.get(i) {
        Some(Operand::Register(reg)) => Ok(*reg),
        Some(other) => Err(OperandError::Unrecognized(other.to_string())),
        None => Err(OperandError::Unrecognized(String::new())),
    }
}

fn value_at(operands: &[Operand], i: usize) -> Result<Value, OperandError> {
    match operands.get(i) {
        Some(operand) => operand
            .as_value()
            .ok_or_else(|| OperandError::Unrecognized(operand.to_string())),
        None => Err(OperandError::Unrecognized(String::new())),
    }
}

fn label_at(operands: &[Operand], i: usize) -> Result<&str, OperandError> {
    match operands.get(i) {
        Some(Operand::Label(name)) => Ok(name),
        Some(other) => Err(OperandError::Unrecognized(other.to_string())),
        None => Err(OperandError::Unrecognized(String::new())),
    }
}
