//! rrsim library
//!
//! A multi-CPU preemptive round-robin scheduler simulator. Processes run
//! programs written in a tiny x86-flavoured instruction set and interact with
//! the scheduler through Linux-style system calls.

pub mod asm;
pub mod config;
pub mod interpreter;
pub mod isa;
pub mod scheduler;
