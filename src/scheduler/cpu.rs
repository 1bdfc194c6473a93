//! Virtual CPU slots.

use super::process::Pid;

/// One CPU: the resident process and how long it has held the CPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cpu {
    /// Resident process, if any.
    pub pid: Option<Pid>,
    /// Ticks executed since the resident was dispatched.
    pub elapsed: u32,
}

impl Cpu {
    /// Check if no process is resident.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.pid.is_none()
    }
}

/// First CPU without a resident process.
///
/// Only manual placement uses this; the tick fills idle CPUs itself.
pub fn get_free_cpu(cpus: &[Cpu]) -> Option<usize> {
    cpus.iter().position(Cpu::is_idle)
}
