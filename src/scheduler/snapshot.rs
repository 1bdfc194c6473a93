//! Point-in-time views of a [`Computer`] for display and serialization.

use std::fmt;

use serde::Serialize;

use crate::interpreter::RegisterFile;
use crate::isa::Register;

use super::computer::Computer;
use super::process::{Pid, Process, ProcessState};

/// Register values of one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegisterView {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
    pub esi: u32,
    pub edi: u32,
    pub eip: u32,
    pub flags: u32,
}

impl From<&RegisterFile> for RegisterView {
    fn from(regs: &RegisterFile) -> Self {
        Self {
            eax: regs.read(Register::Eax),
            ebx: regs.read(Register::Ebx),
            ecx: regs.read(Register::Ecx),
            edx: regs.read(Register::Edx),
            esi: regs.read(Register::Esi),
            edi: regs.read(Register::Edi),
            eip: regs.read(Register::Eip),
            flags: regs.read(Register::Flags),
        }
    }
}

/// One row of the process table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessView {
    pub pid: Pid,
    pub ppid: Pid,
    pub state: ProcessState,
    /// Instruction at `eip`, or `-` past the end.
    pub instruction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<usize>,
    pub registers: RegisterView,
}

impl From<&Process> for ProcessView {
    fn from(process: &Process) -> Self {
        Self {
            pid: process.pid(),
            ppid: process.ppid(),
            state: process.state(),
            instruction: process
                .current_instruction()
                .map_or_else(|| "-".to_string(), ToString::to_string),
            cpu: process.cpu(),
            registers: RegisterView::from(process.registers()),
        }
    }
}

/// One CPU slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CpuView {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<Pid>,
    pub elapsed: u32,
}

/// Whole-machine snapshot.
///
/// Scalar fields come before the tables so the TOML form stays flat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantum: Option<u32>,
    pub ready_queue: Vec<Pid>,
    pub processes: Vec<ProcessView>,
    pub cpus: Vec<CpuView>,
}

impl Computer {
    /// Capture the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.total_ticks(),
            quantum: self.quantum(),
            ready_queue: self.ready_queue().collect(),
            processes: self.processes().map(ProcessView::from).collect(),
            cpus: self
                .cpus()
                .iter()
                .enumerate()
                .map(|(index, cpu)| CpuView {
                    index,
                    pid: cpu.pid,
                    elapsed: cpu.elapsed,
                })
                .collect(),
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quantum = match self.quantum {
            Some(q) if q > 0 => q.to_string(),
            _ => "off".to_string(),
        };
        writeln!(f, "tick {}  quantum {}", self.tick, quantum)?;

        for cpu in &self.cpus {
            match cpu.pid {
                Some(pid) => writeln!(f, "CPU{}: pid {} ({} ticks)", cpu.index, pid, cpu.elapsed)?,
                None => writeln!(f, "CPU{}: idle", cpu.index)?,
            }
        }

        let queue: Vec<String> = self.ready_queue.iter().map(Pid::to_string).collect();
        writeln!(f, "ready: [{}]", queue.join(", "))?;
        writeln!(f)?;

        writeln!(
            f,
            "{:>5} {:>5} {:<10} {:<4} {:<20} {:>10} {:>10} {:>10} {:>10} {:>5}",
            "PID", "PPID", "STATE", "CPU", "INSTRUCTION", "EAX", "EBX", "ECX", "EDX", "EIP"
        )?;
        for p in &self.processes {
            let cpu = p.cpu.map_or_else(|| "-".to_string(), |c| c.to_string());
            writeln!(
                f,
                "{:>5} {:>5} {:<10} {:<4} {:<20} {:>10} {:>10} {:>10} {:>10} {:>5}",
                p.pid,
                p.ppid,
                p.state.name(),
                cpu,
                p.instruction,
                p.registers.eax as i32,
                p.registers.ebx as i32,
                p.registers.ecx as i32,
                p.registers.edx as i32,
                p.registers.eip
            )?;
        }
        Ok(())
    }
}
