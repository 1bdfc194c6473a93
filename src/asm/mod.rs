//! Assembler and disassembler.
//!
//! Source is line oriented and case-insensitive:
//!
//! ```text
//! [label:] [mnemonic [operand [, operand]]] [; or # comment]
//! ```
//!
//! | Operand   | Forms                                   |
//! |-----------|-----------------------------------------|
//! | Register  | `eax ebx ecx edx esi edi eip flags`     |
//! | Immediate | `42`, `-1`, `0x80`, `80h`               |
//! | Label     | `[a-z_.][a-z0-9_.]*`, not a register    |
//!
//! [`compile`] produces a [`Program`](crate::isa::Program) or the first
//! [`CompileError`] with its 1-based line. [`decompile`] renders a program
//! back to text that compiles to the same instructions.

mod disasm;
mod parser;

pub use disasm::decompile;
pub use parser::{compile, CompileError, CompileErrorKind};
