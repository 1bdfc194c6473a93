//! Process register state.
//!
//! | Register | Purpose                                  |
//! |----------|------------------------------------------|
//! | `eax`    | Accumulator, system-call number/result   |
//! | `ebx`    | System-call argument                     |
//! | `ecx`    | `loop` counter                           |
//! | `edx`, `esi`, `edi` | General purpose               |
//! | `eip`    | Program counter (instruction index)      |
//! | `flags`  | CF/ZF/SF/OF flags word                   |
//!
//! # Example
//!
//! ```
//! use rrsim::interpreter::state::RegisterFile;
//! use rrsim::isa::Register;
//!
//! let mut regs = RegisterFile::new();
//! regs.write(Register::Eax, 42);
//! regs.advance_pc();
//! assert_eq!(regs.pc(), 1);
//! ```

mod flags;
mod registers;

pub use flags::{Flags, CF, OF, SF, ZF};
pub use registers::RegisterFile;
