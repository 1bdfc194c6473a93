//! Two-pass assembler.
//!
//! Pass 1 walks the source line by line, declaring labels and building
//! instructions with unresolved branch targets. Pass 2 resolves every target
//! against the label table. Compilation stops at the first error.

use std::collections::HashMap;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use smallvec::SmallVec;
use thiserror::Error;

use crate::isa::{Instruction, Mnemonic, Operand, OperandError, Program, Register};

/// Compiled regex patterns for source lines and operands.
struct Patterns {
    /// Matches a comment-free line: `[label:] [mnemonic [operands]]`
    /// Captures: 1=label, 2=mnemonic, 3=operand text
    line: Regex,
    /// Matches a label identifier: `begin`, `.loop_2`
    label: Regex,
    /// Matches a decimal literal: `42`, `-1`
    decimal: Regex,
    /// Matches a prefixed hex literal: `0x80`
    hex_prefix: Regex,
    /// Matches a suffixed hex literal: `80h`, `0ffh`
    hex_suffix: Regex,
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    line: Regex::new(
        r"(?i)^\s*(?:([a-z_.][a-z0-9_.]*)\s*:)?\s*(?:([a-z]+)(?:\s+(\S.*?))?)?\s*$",
    )
    .unwrap(),
    label: Regex::new(r"(?i)^[a-z_.][a-z0-9_.]*$").unwrap(),
    decimal: Regex::new(r"^-?[0-9]+$").unwrap(),
    hex_prefix: Regex::new(r"(?i)^0x([0-9a-f]+)$").unwrap(),
    hex_suffix: Regex::new(r"(?i)^([0-9][0-9a-f]*)h$").unwrap(),
});

/// What went wrong on a source line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// The line does not have the `[label:] [mnemonic [operands]]` shape.
    #[error("syntax error")]
    Syntax,

    /// A label declared twice.
    #[error("duplicate label '{0}'")]
    DuplicateLabel(String),

    /// Not in the mnemonic catalog.
    #[error("unknown mnemonic '{0}'")]
    UnknownMnemonic(String),

    /// Not a register, immediate or label.
    #[error("unrecognized operand '{0}'")]
    UnrecognizedOperand(String),

    /// Operand count or kind does not fit the mnemonic.
    #[error(transparent)]
    Operand(#[from] OperandError),

    /// A branch names a label that is never declared.
    #[error("undeclared label '{0}'")]
    UndeclaredLabel(String),
}

/// A compile error with its 1-based source line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct CompileError {
    /// 1-based line number.
    pub line: usize,
    /// Error detail.
    pub kind: CompileErrorKind,
}

impl CompileError {
    fn new(line: usize, kind: impl Into<CompileErrorKind>) -> Self {
        Self {
            line,
            kind: kind.into(),
        }
    }
}

/// One parsed source line.
#[derive(Debug, Default)]
struct Line {
    label: Option<String>,
    instruction: Option<Instruction>,
}

/// Compile program text into a [`Program`].
///
/// Mnemonics, registers and labels are case-insensitive. A label refers to
/// the index of the next instruction after its declaration, so a label on
/// the last line points one past the end.
///
/// # Example
///
/// ```
/// use rrsim::asm::compile;
///
/// let program = compile("mov ebx, 3\nbegin: sub ebx, 1\njne begin").unwrap();
/// assert_eq!(program.len(), 3);
/// assert_eq!(program.label("begin"), Some(1));
///
/// let err = compile("mov ebx, 3\nfoo eax").unwrap_err();
/// assert_eq!(err.line, 2);
/// ```
pub fn compile(source: &str) -> Result<Program, CompileError> {
    let mut instructions: Vec<Instruction> = Vec::new();
    let mut lines: Vec<usize> = Vec::new();
    let mut labels: HashMap<String, usize> = HashMap::new();

    for (i, text) in source.lines().enumerate() {
        let line_no = i + 1;
        let line = parse_line(text).map_err(|kind| CompileError::new(line_no, kind))?;

        if let Some(label) = line.label {
            if labels.contains_key(&label) {
                return Err(CompileError::new(line_no, CompileErrorKind::DuplicateLabel(label)));
            }
            labels.insert(label, instructions.len());
        }

        if let Some(instruction) = line.instruction {
            instructions.push(instruction);
            lines.push(line_no);
        }
    }

    for (instruction, line_no) in instructions.iter_mut().zip(&lines) {
        if let Some(target) = instruction.target_mut() {
            target.index = *labels.get(&target.label).ok_or_else(|| {
                CompileError::new(*line_no, CompileErrorKind::UndeclaredLabel(target.label.clone()))
            })?;
        }
    }

    debug!(
        "compiled {} instruction(s), {} label(s)",
        instructions.len(),
        labels.len()
    );
    Ok(Program::new(source, instructions, labels))
}

fn parse_line(text: &str) -> Result<Line, CompileErrorKind> {
    let code = match text.find([';', '#']) {
        Some(pos) => &text[..pos],
        None => text,
    };

    let caps = PATTERNS.line.captures(code).ok_or(CompileErrorKind::Syntax)?;
    let mut line = Line::default();

    if let Some(label) = caps.get(1) {
        let label = label.as_str().to_ascii_lowercase();
        if Register::from_name(&label).is_some() {
            return Err(CompileErrorKind::Syntax);
        }
        line.label = Some(label);
    }

    let Some(name) = caps.get(2) else {
        return Ok(line);
    };
    let mnemonic = Mnemonic::from_name(name.as_str())
        .ok_or_else(|| CompileErrorKind::UnknownMnemonic(name.as_str().to_ascii_lowercase()))?;

    let mut operands: SmallVec<[Operand; 2]> = SmallVec::new();
    if let Some(list) = caps.get(3) {
        for piece in list.as_str().split(',') {
            let piece = piece.trim();
            if piece.is_empty() {
                return Err(CompileErrorKind::Syntax);
            }
            let operand = parse_operand(piece)
                .ok_or_else(|| CompileErrorKind::UnrecognizedOperand(piece.to_string()))?;
            operands.push(operand);
        }
    }

    line.instruction = Some(mnemonic.build(&operands)?);
    Ok(line)
}

/// Classify one operand: register, then immediate, then label.
fn parse_operand(text: &str) -> Option<Operand> {
    if let Some(reg) = Register::from_name(text) {
        return Some(Operand::Register(reg));
    }

    if PATTERNS.decimal.is_match(text) {
        return parse_decimal(text).map(Operand::Immediate);
    }
    if let Some(caps) = PATTERNS.hex_prefix.captures(text) {
        return parse_hex(&caps[1]).map(Operand::Immediate);
    }
    if let Some(caps) = PATTERNS.hex_suffix.captures(text) {
        return parse_hex(&caps[1]).map(Operand::Immediate);
    }

    if PATTERNS.label.is_match(text) {
        return Some(Operand::Label(text.to_ascii_lowercase()));
    }

    None
}

/// Decimal literal in the signed or unsigned 32-bit range, stored wrapped.
fn parse_decimal(text: &str) -> Option<u32> {
    let value: i64 = text.parse().ok()?;
    if value < i64::from(i32::MIN) || value > i64::from(u32::MAX) {
        return None;
    }
    Some(value as u32)
}

fn parse_hex(digits: &str) -> Option<u32> {
    u32::from_str_radix(digits, 16).ok()
}
