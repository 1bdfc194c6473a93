//! Operand and instruction set.
//!
//! A deliberately small x86-flavoured instruction set:
//!
//! | Family        | Mnemonics                                    |
//! |---------------|----------------------------------------------|
//! | Data movement | `mov`                                        |
//! | Arithmetic    | `add`, `sub`, `cmp`, `inc`, `dec`, `neg`     |
//! | Logic         | `and`, `or`, `xor`, `not`, `test`            |
//! | Shifts        | `sal`, `shl`, `sar`, `shr`                   |
//! | Branches      | `jmp`, `j<cond>`, `loop`, `loopz`, `loopnz`  |
//! | System calls  | `int 0x80`, `call <name>`                    |
//!
//! - [`operand`]: registers and operand kinds
//! - [`instruction`]: the [`Instruction`] tagged variant and its rendering
//! - [`mnemonic`]: the catalog of spellings and operand signatures
//! - [`syscall`]: system-call numbers
//! - [`program`]: immutable, shareable compiled programs

pub mod instruction;
pub mod mnemonic;
pub mod operand;
pub mod program;
pub mod syscall;

pub use instruction::{
    BinaryOp, CompareOp, Condition, Instruction, LoopKind, ShiftOp, Target, UnaryOp,
};
pub use mnemonic::{Mnemonic, OperandError, Signature};
pub use operand::{Operand, OperandKind, Register, Value, NUM_REGISTERS};
pub use program::Program;
pub use syscall::{Syscall, ENOSYS, SYSCALL_VECTOR};
