//! System-call numbering.
//!
//! Calls are numbered like Linux i386 so that `int 0x80` programs read
//! naturally: the call number goes in `eax`, the argument in `ebx`, and the
//! result comes back in `eax`.

use std::fmt;

/// Vector that `int` must use to reach the scheduler.
pub const SYSCALL_VECTOR: u32 = 0x80;

/// Return value for an unrecognized call number (`-ENOSYS`).
pub const ENOSYS: i32 = -38;

/// A scheduler-mediated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syscall {
    /// Terminate the calling process.
    Exit,
    /// Clone the calling process.
    Fork,
    /// Wait for a child (`ebx` = -1 for any child, or a child pid).
    Waitpid,
    /// Terminate the process named by `ebx`.
    Kill,
    /// Give up the CPU if anyone else is ready.
    SchedYield,
}

/// Static table of `(number, canonical name, call)`.
const TABLE: [(u32, &str, Syscall); 5] = [
    (1, "exit", Syscall::Exit),
    (2, "fork", Syscall::Fork),
    (7, "waitpid", Syscall::Waitpid),
    (37, "kill", Syscall::Kill),
    (158, "sched_yield", Syscall::SchedYield),
];

impl Syscall {
    /// Decode an `eax` value.
    pub fn from_code(code: u32) -> Option<Self> {
        TABLE.iter().find(|(c, _, _)| *c == code).map(|(_, _, call)| *call)
    }

    /// Look up a call by the name used with `call` (case-insensitive).
    ///
    /// `wait` and `yield` are accepted as short aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "wait" => return Some(Syscall::Waitpid),
            "yield" => return Some(Syscall::SchedYield),
            _ => {}
        }
        TABLE.iter().find(|(_, n, _)| *n == name).map(|(_, _, call)| *call)
    }

    /// Call number.
    pub fn code(self) -> u32 {
        TABLE
            .iter()
            .find(|(_, _, call)| *call == self)
            .map(|(c, _, _)| *c)
            .unwrap_or_default()
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        TABLE
            .iter()
            .find(|(_, _, call)| *call == self)
            .map(|(_, n, _)| *n)
            .unwrap_or("?")
    }
}

impl fmt::Display for Syscall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
