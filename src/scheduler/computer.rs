//! The simulated computer: process table, CPUs, ready queue and tick loop.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use log::{debug, info, trace, warn};

use crate::config::Config;
use crate::interpreter::{execute, ExecuteResult};
use crate::isa::{Condition, Instruction, Program, Register, Syscall, Target, Value};

use super::change::StateChange;
use super::cpu::{get_free_cpu, Cpu};
use super::error::ScheduleError;
use super::process::{Pid, Process, ProcessState, WaitTarget, INIT_PID};

/// Source of the init program.
pub const INIT_SOURCE: &str = "mov ebx, -1\nbegin: call waitpid\njmp begin";

/// Name the init program is installed under.
pub const INIT_PROGRAM: &str = "init";

/// First pid handed out after init.
const FIRST_USER_PID: Pid = 2;

/// Build the init program without going through the assembler.
fn init_program() -> Program {
    let instructions = vec![
        Instruction::Mov {
            dst: Register::Ebx,
            src: Value::Immediate(u32::MAX),
        },
        Instruction::Call {
            syscall: Syscall::Waitpid,
        },
        Instruction::Jump {
            condition: Condition::Always,
            target: Target {
                index: 1,
                label: "begin".to_string(),
            },
        },
    ];
    let labels = HashMap::from([("begin".to_string(), 1)]);
    Program::new(INIT_SOURCE, instructions, labels)
}

/// A multi-CPU machine running a preemptive round-robin scheduler.
///
/// Each [`tick`](Self::tick):
///
/// 1. Promotes every NEW process to READY, in pid order
/// 2. Executes one instruction on every occupied CPU, in CPU order, or
///    terminates the resident if its `eip` is out of bounds
/// 3. Applies the state changes queued in step 2 (blocks first)
/// 4. Preempts residents whose quantum is used up, if anyone is ready
/// 5. Fills idle CPUs from the head of the ready queue
///
/// Pid 1 is a permanent init process that waits for children in a loop and
/// adopts orphans.
pub struct Computer {
    /// Process table, including terminated processes not yet reaped.
    pub(super) processes: BTreeMap<Pid, Process>,
    /// CPU slots.
    pub(super) cpus: Vec<Cpu>,
    /// READY processes in dispatch order.
    pub(super) ready_queue: VecDeque<Pid>,
    /// Next pid to hand out.
    next_pid: Pid,
    /// Ticks a process may hold a CPU while others wait. `None` or 0 disables.
    quantum: Option<u32>,
    /// Named program library.
    programs: BTreeMap<String, Arc<Program>>,
    /// Program every init process runs.
    init: Arc<Program>,
    /// Changes waiting for the apply step of the current tick.
    pub(super) pending: VecDeque<StateChange>,
    /// Ticks since construction or the last reset.
    total_ticks: u64,
}

impl Computer {
    /// Create a computer with `cpus` idle CPUs and a NEW init process.
    pub fn new(cpus: usize, quantum: Option<u32>) -> Self {
        let init = init_program().shared();
        let mut programs = BTreeMap::new();
        programs.insert(INIT_PROGRAM.to_string(), Arc::clone(&init));

        let mut computer = Self {
            processes: BTreeMap::new(),
            cpus: vec![Cpu::default(); cpus],
            ready_queue: VecDeque::new(),
            next_pid: FIRST_USER_PID,
            quantum,
            programs,
            init,
            pending: VecDeque::new(),
            total_ticks: 0,
        };
        computer.create_init();
        computer
    }

    /// Create a computer from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cpus(), Some(config.quantum()))
    }

    // --- Accessors ---

    /// Process by pid.
    pub fn process(&self, pid: Pid) -> Option<&Process> {
        self.processes.get(&pid)
    }

    /// All processes in pid order.
    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    /// CPU slots.
    pub fn cpus(&self) -> &[Cpu] {
        &self.cpus
    }

    /// READY pids in dispatch order.
    pub fn ready_queue(&self) -> impl Iterator<Item = Pid> + '_ {
        self.ready_queue.iter().copied()
    }

    /// Configured quantum.
    pub fn quantum(&self) -> Option<u32> {
        self.quantum
    }

    /// Change the quantum. `None` or `Some(0)` disables preemption.
    pub fn set_quantum(&mut self, quantum: Option<u32>) {
        debug!("quantum set to {:?}", quantum);
        self.quantum = quantum;
    }

    /// Ticks executed since construction or the last reset.
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// First idle CPU, if any.
    pub fn get_free_cpu(&self) -> Option<usize> {
        get_free_cpu(&self.cpus)
    }

    /// Check if every process except init has been reaped.
    pub fn is_settled(&self) -> bool {
        self.processes.keys().all(|&pid| pid == INIT_PID)
    }

    // --- Program library ---

    /// Install a program under `name`, returning any program it replaces.
    pub fn install_program(
        &mut self,
        name: impl Into<String>,
        program: Arc<Program>,
    ) -> Option<Arc<Program>> {
        self.programs.insert(name.into(), program)
    }

    /// Remove a named program. Running processes keep their copy.
    pub fn remove_program(&mut self, name: &str) -> Option<Arc<Program>> {
        self.programs.remove(name)
    }

    /// Look up a named program.
    pub fn program(&self, name: &str) -> Option<&Arc<Program>> {
        self.programs.get(name)
    }

    /// Installed program names in sorted order.
    pub fn program_names(&self) -> impl Iterator<Item = &str> {
        self.programs.keys().map(String::as_str)
    }

    // --- Process creation ---

    /// Create a NEW process running `program` as a child of `ppid`.
    ///
    /// An unknown or terminated `ppid` is replaced by init. The process is
    /// promoted to READY on the next tick.
    pub fn spawn(&mut self, program: Arc<Program>, ppid: Pid) -> Pid {
        let parent_alive = self
            .processes
            .get(&ppid)
            .is_some_and(|p| p.state != ProcessState::Terminated);
        let ppid = if parent_alive {
            ppid
        } else {
            warn!("spawn: parent {} is not alive, adopting by init", ppid);
            INIT_PID
        };

        let pid = self.allocate_pid();
        self.processes.insert(pid, Process::new(pid, ppid, program));
        info!("spawned pid {} (parent {})", pid, ppid);
        pid
    }

    /// Spawn an installed program by name.
    pub fn spawn_named(&mut self, name: &str, ppid: Pid) -> Result<Pid, ScheduleError> {
        let program = self
            .programs
            .get(name)
            .cloned()
            .ok_or_else(|| ScheduleError::UnknownProgram(name.to_string()))?;
        Ok(self.spawn(program, ppid))
    }

    /// Drop every process and restart with a fresh init.
    ///
    /// CPUs, quantum and the program library are kept.
    pub fn reset(&mut self) {
        self.processes.clear();
        self.ready_queue.clear();
        self.pending.clear();
        for cpu in &mut self.cpus {
            *cpu = Cpu::default();
        }
        self.next_pid = FIRST_USER_PID;
        self.total_ticks = 0;
        self.create_init();
        info!("computer reset");
    }

    pub(super) fn allocate_pid(&mut self) -> Pid {
        let pid = self.next_pid;
        self.next_pid += 1;
        pid
    }

    fn create_init(&mut self) {
        let init = Process::new(INIT_PID, 0, Arc::clone(&self.init));
        self.processes.insert(INIT_PID, init);
    }

    // --- Tick loop ---

    /// Advance the machine by one scheduling cycle.
    pub fn tick(&mut self) {
        self.total_ticks += 1;
        trace!("tick {}", self.total_ticks);

        let fresh: Vec<Pid> = self
            .processes
            .values()
            .filter(|p| p.state == ProcessState::New)
            .map(|p| p.pid)
            .collect();
        for pid in fresh {
            self.to_ready(pid);
        }

        for cpu in 0..self.cpus.len() {
            if let Some(pid) = self.cpus[cpu].pid {
                self.step(pid, cpu);
            }
        }

        self.apply_pending();

        let quantum = self.quantum.unwrap_or(0);
        for cpu in 0..self.cpus.len() {
            let Some(pid) = self.cpus[cpu].pid else {
                continue;
            };
            self.cpus[cpu].elapsed += 1;
            if quantum > 0 && self.cpus[cpu].elapsed >= quantum && !self.ready_queue.is_empty() {
                debug!("pid {} preempted on CPU{}", pid, cpu);
                self.to_ready(pid);
            }
        }

        for cpu in 0..self.cpus.len() {
            if !self.cpus[cpu].is_idle() {
                continue;
            }
            let Some(&pid) = self.ready_queue.front() else {
                break;
            };
            self.to_running(pid, cpu);
        }
    }

    /// Tick until only init is left or `max_ticks` is reached.
    ///
    /// Returns the number of ticks executed.
    pub fn run(&mut self, max_ticks: u64) -> u64 {
        let mut ticks = 0;
        while ticks < max_ticks && !self.is_settled() {
            self.tick();
            ticks += 1;
        }
        debug!("ran {} tick(s)", ticks);
        ticks
    }

    /// Execute one instruction of the process resident on `cpu`.
    fn step(&mut self, pid: Pid, cpu: usize) {
        let process = self.process_mut(pid);
        let program = Arc::clone(&process.program);
        let pc = process.registers.pc();

        let Some(instruction) = program.get(pc) else {
            debug!("pid {} ran off its program at eip {}", pid, pc);
            self.pending.push_back(StateChange::Terminate(pid));
            return;
        };

        trace!("CPU{} pid {} [{}] {}", cpu, pid, pc, instruction);
        if let ExecuteResult::Syscall(call) = execute(instruction, &mut process.registers) {
            self.syscall(pid, call);
        }
    }

    /// Apply queued changes, blocks first, until nothing is left.
    ///
    /// Terminations queue further wake-ups, which are applied in the same
    /// pass.
    fn apply_pending(&mut self) {
        let (blocks, rest): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(StateChange::is_block);
        self.pending.extend(blocks);
        self.pending.extend(rest);

        while let Some(change) = self.pending.pop_front() {
            debug!("applying {:?}", change);
            self.apply(change);
        }
    }

    fn apply(&mut self, change: StateChange) {
        match change {
            StateChange::Terminate(pid) => {
                if self.state_of(pid) == Some(ProcessState::Running) {
                    self.to_terminated(pid);
                } else {
                    debug!("skip terminate of pid {}: not running", pid);
                }
            }
            StateChange::Block { pid, target } => {
                if self.state_of(pid) == Some(ProcessState::Running) {
                    self.to_waiting(pid, target);
                } else {
                    debug!("skip block of pid {}: not running", pid);
                }
            }
            StateChange::Yield(pid) => {
                if self.state_of(pid) == Some(ProcessState::Running) {
                    self.to_ready(pid);
                } else {
                    debug!("skip yield of pid {}: not running", pid);
                }
            }
            StateChange::Kill { killer, target } => self.apply_kill(killer, target),
            StateChange::WakeAndReap { parent, child } => self.apply_wake(parent, child),
        }
    }

    /// Drive `target` through READY and RUNNING into TERMINATED.
    ///
    /// A target that is not already on a CPU borrows the killer's CPU, or the
    /// first free one if the killer is no longer running. The killer gets its
    /// CPU and elapsed quantum back afterwards.
    fn apply_kill(&mut self, killer: Pid, target: Pid) {
        let state = match self.state_of(target) {
            None | Some(ProcessState::Terminated) => {
                debug!("skip kill of pid {}: already gone", target);
                return;
            }
            Some(state) => state,
        };

        let mut borrowed = None;
        if state != ProcessState::Running {
            if matches!(state, ProcessState::New | ProcessState::Waiting) {
                self.to_ready(target);
            }

            let killer_cpu = self.process(killer).and_then(|p| p.cpu);
            let cpu = match killer_cpu {
                Some(cpu) => {
                    borrowed = Some((cpu, self.cpus[cpu].elapsed));
                    self.to_ready(killer);
                    cpu
                }
                None => match self.get_free_cpu() {
                    Some(cpu) => cpu,
                    None => {
                        warn!("kill: no CPU available to terminate pid {}", target);
                        return;
                    }
                },
            };
            self.to_running(target, cpu);
        }

        self.to_terminated(target);
        info!("pid {} killed by pid {}", target, killer);

        if let Some((cpu, elapsed)) = borrowed {
            self.to_running(killer, cpu);
            self.cpus[cpu].elapsed = elapsed;
        }
    }

    /// Reap `child` and wake `parent` if it is blocked waiting for it.
    fn apply_wake(&mut self, parent: Pid, child: Pid) {
        let waiting = self.process(parent).is_some_and(|p| {
            p.state == ProcessState::Waiting && p.waiting_for.is_some_and(|t| t.matches(child))
        });
        let reapable = self
            .process(child)
            .is_some_and(|c| c.ppid == parent && c.state == ProcessState::Terminated);
        if !waiting || !reapable {
            trace!("pid {} not waiting for pid {}", parent, child);
            return;
        }

        self.reap(child);
        let process = self.process_mut(parent);
        process.registers.write(Register::Eax, child);
        process.registers.advance_pc();
        self.to_ready(parent);
    }

    /// Remove a terminated process from the table.
    pub(super) fn reap(&mut self, pid: Pid) {
        let Some(process) = self.processes.remove(&pid) else {
            return;
        };
        assert_eq!(
            process.state,
            ProcessState::Terminated,
            "reaped pid {} while {}",
            pid,
            process.state
        );
        self.reparent_children(pid);
        info!("reaped pid {}", pid);
    }

    /// Hand every child of `pid` to init. Returns the adopted pids.
    fn reparent_children(&mut self, pid: Pid) -> Vec<Pid> {
        let mut adopted = Vec::new();
        for child in self.processes.values_mut().filter(|p| p.ppid == pid) {
            child.ppid = INIT_PID;
            adopted.push(child.pid);
        }
        adopted
    }

    // --- Manual controls ---

    /// Put a READY process on a CPU now.
    ///
    /// Uses the first free CPU; if none is free, the resident of CPU 0 is
    /// preempted. Returns the CPU index.
    pub fn force_running(&mut self, pid: Pid) -> Result<usize, ScheduleError> {
        let state = self.state_of(pid).ok_or(ScheduleError::NoSuchProcess(pid))?;
        if state != ProcessState::Ready {
            return Err(ScheduleError::InvalidState {
                pid,
                state,
                expected: "READY",
            });
        }
        if self.cpus.is_empty() {
            return Err(ScheduleError::NoCpus);
        }

        let cpu = match self.get_free_cpu() {
            Some(cpu) => cpu,
            None => {
                if let Some(resident) = self.cpus[0].pid {
                    debug!("force_running: preempting pid {} on CPU0", resident);
                    self.to_ready(resident);
                }
                0
            }
        };
        self.to_running(pid, cpu);
        Ok(cpu)
    }

    /// Move a NEW, WAITING or RUNNING process to the back of the ready queue.
    ///
    /// A forced-ready waiter re-executes its `waitpid` when it next runs.
    pub fn force_ready(&mut self, pid: Pid) -> Result<(), ScheduleError> {
        let state = self.state_of(pid).ok_or(ScheduleError::NoSuchProcess(pid))?;
        match state {
            ProcessState::New | ProcessState::Waiting | ProcessState::Running => {
                self.to_ready(pid);
                Ok(())
            }
            _ => Err(ScheduleError::InvalidState {
                pid,
                state,
                expected: "NEW/WAITING/RUNNING",
            }),
        }
    }

    /// Add an idle CPU. Returns its index.
    pub fn add_cpu(&mut self) -> usize {
        self.cpus.push(Cpu::default());
        debug!("added CPU{}", self.cpus.len() - 1);
        self.cpus.len() - 1
    }

    /// Remove the last CPU, returning its resident to the ready queue.
    pub fn remove_cpu(&mut self) -> Result<(), ScheduleError> {
        let cpu = self.cpus.last().copied().ok_or(ScheduleError::NoCpus)?;
        if let Some(pid) = cpu.pid {
            self.to_ready(pid);
        }
        self.cpus.pop();
        debug!("removed CPU{}", self.cpus.len());
        Ok(())
    }

    // --- State transitions ---
    //
    // Each transition checks its precondition and panics on violation: an
    // illegal transition is a scheduler bug, not bad input.

    pub(super) fn state_of(&self, pid: Pid) -> Option<ProcessState> {
        self.processes.get(&pid).map(|p| p.state)
    }

    pub(super) fn process_mut(&mut self, pid: Pid) -> &mut Process {
        self.processes
            .get_mut(&pid)
            .unwrap_or_else(|| panic!("no process with pid {}", pid))
    }

    /// NEW, WAITING or RUNNING to READY. Frees the CPU and joins the queue.
    pub(super) fn to_ready(&mut self, pid: Pid) {
        let process = self.process_mut(pid);
        let from = process.state;
        if !matches!(
            from,
            ProcessState::New | ProcessState::Waiting | ProcessState::Running
        ) {
            panic!("invalid state transition for pid {}: {} => READY", pid, from);
        }

        process.state = ProcessState::Ready;
        process.waiting_for = None;
        if let Some(cpu) = process.cpu.take() {
            self.cpus[cpu].pid = None;
        }
        self.ready_queue.push_back(pid);
        debug!("pid {}: {} => READY", pid, from);
    }

    /// READY to RUNNING on an idle CPU.
    pub(super) fn to_running(&mut self, pid: Pid, cpu: usize) {
        if let Some(resident) = self.cpus[cpu].pid {
            panic!("CPU{} occupied by pid {}", cpu, resident);
        }

        let process = self.process_mut(pid);
        if process.state != ProcessState::Ready {
            panic!(
                "invalid state transition for pid {}: {} => RUNNING",
                pid, process.state
            );
        }
        process.state = ProcessState::Running;
        process.cpu = Some(cpu);

        self.cpus[cpu] = Cpu {
            pid: Some(pid),
            elapsed: 0,
        };
        self.ready_queue.retain(|&queued| queued != pid);
        debug!("pid {}: READY => RUNNING on CPU{}", pid, cpu);
    }

    /// RUNNING to WAITING.
    pub(super) fn to_waiting(&mut self, pid: Pid, target: WaitTarget) {
        let process = self.process_mut(pid);
        if process.state != ProcessState::Running {
            panic!(
                "invalid state transition for pid {}: {} => WAITING",
                pid, process.state
            );
        }
        process.state = ProcessState::Waiting;
        process.waiting_for = Some(target);
        if let Some(cpu) = process.cpu.take() {
            self.cpus[cpu].pid = None;
        }
        debug!("pid {}: RUNNING => WAITING for {:?}", pid, target);
    }

    /// RUNNING to TERMINATED.
    ///
    /// Children are handed to init; already-terminated ones are offered to
    /// init's wait. The parent is offered this process.
    pub(super) fn to_terminated(&mut self, pid: Pid) {
        assert_ne!(pid, INIT_PID, "init must never terminate");

        let process = self.process_mut(pid);
        if process.state != ProcessState::Running {
            panic!(
                "invalid state transition for pid {}: {} => TERMINATED",
                pid, process.state
            );
        }
        process.state = ProcessState::Terminated;
        let ppid = process.ppid;
        if let Some(cpu) = process.cpu.take() {
            self.cpus[cpu].pid = None;
        }

        for child in self.reparent_children(pid) {
            if self.state_of(child) == Some(ProcessState::Terminated) {
                self.pending.push_back(StateChange::WakeAndReap {
                    parent: INIT_PID,
                    child,
                });
            }
        }
        self.pending
            .push_back(StateChange::WakeAndReap { parent: ppid, child: pid });
        info!("pid {} terminated", pid);
    }
}

impl Default for Computer {
    fn default() -> Self {
        Self::new(1, Some(crate::config::DEFAULT_QUANTUM))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::compile;

    fn spawn(computer: &mut Computer, source: &str) -> Pid {
        computer.spawn(compile(source).unwrap().shared(), INIT_PID)
    }

    fn reg(computer: &Computer, pid: Pid, register: Register) -> u32 {
        computer.process(pid).unwrap().registers().read(register)
    }

    fn state(computer: &Computer, pid: Pid) -> Option<ProcessState> {
        computer.process(pid).map(|p| p.state())
    }

    fn ticks(computer: &mut Computer, n: usize) {
        for _ in 0..n {
            computer.tick();
            assert_invariants(computer);
        }
    }

    fn assert_invariants(computer: &Computer) {
        for process in computer.processes() {
            let running = process.state() == ProcessState::Running;
            assert_eq!(process.cpu().is_some(), running, "pid {}", process.pid());
            if let Some(cpu) = process.cpu() {
                assert_eq!(computer.cpus()[cpu].pid, Some(process.pid()));
            }

            let queued = computer.ready_queue().filter(|&p| p == process.pid()).count();
            let ready = process.state() == ProcessState::Ready;
            assert_eq!(queued, usize::from(ready), "pid {}", process.pid());

            assert_eq!(
                process.waiting_for().is_some(),
                process.state() == ProcessState::Waiting
            );

            if process.pid() != INIT_PID {
                let parent = computer.process(process.ppid());
                assert!(
                    parent.is_some_and(|p| p.state() != ProcessState::Terminated),
                    "pid {} has dead parent {}",
                    process.pid(),
                    process.ppid()
                );
            }
        }

        for (index, cpu) in computer.cpus().iter().enumerate() {
            if let Some(pid) = cpu.pid {
                assert_eq!(computer.process(pid).and_then(|p| p.cpu()), Some(index));
            }
        }
    }

    #[test]
    fn test_init_program_matches_source() {
        assert_eq!(&init_program(), &compile(INIT_SOURCE).unwrap());
    }

    #[test]
    fn test_new_computer() {
        let computer = Computer::new(2, Some(5));
        assert_eq!(computer.cpus().len(), 2);
        assert_eq!(state(&computer, INIT_PID), Some(ProcessState::New));
        assert_eq!(computer.process(INIT_PID).unwrap().ppid(), 0);
        assert_eq!(computer.program_names().collect::<Vec<_>>(), vec!["init"]);
        assert!(computer.is_settled());
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            quantum: Some(0),
            cpus: Some(3),
            max_ticks: None,
        };
        let computer = Computer::from_config(&config);
        assert_eq!(computer.cpus().len(), 3);
        assert_eq!(computer.quantum(), Some(0));

        let computer = Computer::default();
        assert_eq!(computer.cpus().len(), 1);
        assert_eq!(computer.quantum(), Some(crate::config::DEFAULT_QUANTUM));
    }

    #[test]
    fn test_spawn_is_new_until_next_tick() {
        let mut computer = Computer::new(1, Some(5));
        let pid = spawn(&mut computer, "mov eax, 1");
        assert_eq!(pid, 2);
        assert_eq!(state(&computer, pid), Some(ProcessState::New));
        assert_eq!(reg(&computer, pid, Register::Eax), 0);
        assert_eq!(computer.ready_queue().count(), 0);

        ticks(&mut computer, 1);
        // init took the only CPU, the new process waits its turn
        assert_eq!(computer.cpus()[0].pid, Some(INIT_PID));
        assert_eq!(state(&computer, pid), Some(ProcessState::Ready));
        assert_eq!(computer.ready_queue().collect::<Vec<_>>(), vec![pid]);
    }

    #[test]
    fn test_spawn_with_dead_parent_goes_to_init() {
        let mut computer = Computer::new(1, None);
        let pid = computer.spawn(compile("mov eax, 1").unwrap().shared(), 42);
        assert_eq!(computer.process(pid).unwrap().ppid(), INIT_PID);
    }

    #[test]
    fn test_countdown_scenario() {
        let mut computer = Computer::new(2, Some(5));
        let pid = spawn(&mut computer, "mov ebx,3\nbegin: sub ebx,1\njne begin");

        // Tick 1 dispatches, tick 2 runs `mov`
        ticks(&mut computer, 2);
        assert_eq!(computer.process(pid).unwrap().cpu(), Some(1));
        assert_eq!(reg(&computer, pid, Register::Ebx), 3);

        // sub, jne, sub, jne
        ticks(&mut computer, 4);
        assert_eq!(reg(&computer, pid, Register::Ebx), 1);
        assert!(!computer.process(pid).unwrap().registers().flags().zf);

        // sub hits zero
        ticks(&mut computer, 1);
        assert_eq!(reg(&computer, pid, Register::Ebx), 0);
        assert!(computer.process(pid).unwrap().registers().flags().zf);

        // jne falls through past the end
        ticks(&mut computer, 1);
        assert_eq!(reg(&computer, pid, Register::Eip), 3);
        assert_eq!(state(&computer, pid), Some(ProcessState::Running));
        // 7 ticks on the CPU with an empty queue: no preemption
        assert_eq!(computer.cpus()[1].elapsed, 7);

        // Out of bounds: terminated and reaped by the waiting init
        ticks(&mut computer, 1);
        assert_eq!(state(&computer, pid), None);
        assert_eq!(reg(&computer, INIT_PID, Register::Eax), pid);
        assert_eq!(state(&computer, INIT_PID), Some(ProcessState::Running));
        assert!(computer.is_settled());
    }

    #[test]
    fn test_run_stops_when_settled() {
        let mut computer = Computer::new(2, Some(5));
        spawn(&mut computer, "mov ebx,3\nbegin: sub ebx,1\njne begin");
        assert_eq!(computer.run(100), 9);
        assert_eq!(computer.total_ticks(), 9);
        assert_eq!(computer.run(100), 0);
    }

    #[test]
    fn test_run_respects_limit() {
        let mut computer = Computer::new(1, Some(5));
        spawn(&mut computer, "top: jmp top");
        assert_eq!(computer.run(25), 25);
        assert!(!computer.is_settled());
    }

    #[test]
    fn test_quantum_preemption() {
        let mut computer = Computer::new(1, Some(5));
        let a = spawn(&mut computer, "top: jmp top");
        let b = spawn(&mut computer, "top: jmp top");

        let mut residents = Vec::new();
        for _ in 0..60 {
            computer.tick();
            assert_invariants(&computer);
            assert!(computer.cpus()[0].elapsed <= 5);
            residents.push(computer.cpus()[0].pid);
        }

        // Longest stretch on the CPU is exactly one quantum
        let mut longest = 0;
        let mut run = 0;
        for pair in residents.windows(2) {
            run = if pair[0] == pair[1] { run + 1 } else { 0 };
            longest = longest.max(run + 1);
        }
        assert_eq!(longest, 5);

        assert!(residents.contains(&Some(a)));
        assert!(residents.contains(&Some(b)));
        assert_eq!(state(&computer, INIT_PID), Some(ProcessState::Waiting));
    }

    #[test]
    fn test_no_preemption_with_empty_queue() {
        let mut computer = Computer::new(2, Some(2));
        let pid = spawn(&mut computer, "top: jmp top");
        ticks(&mut computer, 20);
        assert_eq!(computer.process(pid).unwrap().cpu(), Some(1));
        assert_eq!(computer.cpus()[1].elapsed, 19);
    }

    #[test]
    fn test_zero_quantum_disables_preemption() {
        let mut computer = Computer::new(1, Some(0));
        let a = spawn(&mut computer, "top: jmp top");
        spawn(&mut computer, "top: jmp top");
        ticks(&mut computer, 3);
        // init blocked on tick 3, `a` took over
        assert_eq!(computer.cpus()[0].pid, Some(a));
        ticks(&mut computer, 30);
        assert_eq!(computer.cpus()[0].pid, Some(a));

        computer.set_quantum(Some(3));
        ticks(&mut computer, 1);
        assert_ne!(computer.cpus()[0].pid, Some(a));
    }

    #[test]
    fn test_quantum_one_alternates() {
        let mut computer = Computer::new(1, Some(1));
        let short = spawn(&mut computer, "mov eax, 1\nmov eax, 2");
        let long = spawn(&mut computer, "mov eax, 1\nmov eax, 2\nmov eax, 3\nmov eax, 4");

        let mut residents = Vec::new();
        let mut finished = Vec::new();
        while computer.process(long).is_some() {
            computer.tick();
            assert_invariants(&computer);
            residents.push(computer.cpus()[0].pid);
            for pid in [short, long] {
                if computer.process(pid).is_none() && !finished.contains(&pid) {
                    finished.push(pid);
                }
            }
            assert!(computer.total_ticks() < 100);
        }

        assert_eq!(finished, vec![short, long]);
        assert_eq!(computer.total_ticks(), 13);
        for pair in residents.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_force_running_uses_free_cpu_then_cpu0() {
        let mut computer = Computer::new(1, None);
        let pid = spawn(&mut computer, "top: jmp top");
        ticks(&mut computer, 1);
        assert_eq!(computer.cpus()[0].pid, Some(INIT_PID));

        assert_eq!(computer.force_running(pid), Ok(0));
        assert_invariants(&computer);
        assert_eq!(computer.cpus()[0].pid, Some(pid));
        assert_eq!(state(&computer, INIT_PID), Some(ProcessState::Ready));

        computer.add_cpu();
        assert_eq!(computer.force_running(INIT_PID), Ok(1));
        assert_invariants(&computer);
    }

    #[test]
    fn test_force_running_errors() {
        let mut computer = Computer::new(1, None);
        assert_eq!(computer.force_running(99), Err(ScheduleError::NoSuchProcess(99)));
        assert_eq!(
            computer.force_running(INIT_PID),
            Err(ScheduleError::InvalidState {
                pid: INIT_PID,
                state: ProcessState::New,
                expected: "READY",
            })
        );

        let mut computer = Computer::new(0, None);
        ticks(&mut computer, 1);
        assert_eq!(computer.force_running(INIT_PID), Err(ScheduleError::NoCpus));
    }

    #[test]
    fn test_force_ready() {
        let mut computer = Computer::new(1, None);
        let pid = spawn(&mut computer, "top: jmp top");
        computer.force_ready(pid).unwrap();
        assert_eq!(state(&computer, pid), Some(ProcessState::Ready));
        assert!(matches!(
            computer.force_ready(pid),
            Err(ScheduleError::InvalidState { .. })
        ));
        assert_eq!(computer.force_ready(99), Err(ScheduleError::NoSuchProcess(99)));
    }

    #[test]
    fn test_force_ready_waiter_waits_again() {
        let mut computer = Computer::new(1, None);
        let pid = spawn(&mut computer, "top: jmp top");
        ticks(&mut computer, 3);
        assert_eq!(state(&computer, INIT_PID), Some(ProcessState::Waiting));
        assert_eq!(computer.cpus()[0].pid, Some(pid));

        computer.force_ready(INIT_PID).unwrap();
        assert_invariants(&computer);
        // Still parked on its `call waitpid`
        assert_eq!(reg(&computer, INIT_PID, Register::Eip), 1);

        computer.force_running(INIT_PID).unwrap();
        ticks(&mut computer, 1);
        assert_eq!(state(&computer, INIT_PID), Some(ProcessState::Waiting));
    }

    #[test]
    fn test_add_and_remove_cpu() {
        let mut computer = Computer::new(1, None);
        let pid = spawn(&mut computer, "top: jmp top");
        ticks(&mut computer, 1);
        assert_eq!(state(&computer, pid), Some(ProcessState::Ready));

        assert_eq!(computer.add_cpu(), 1);
        ticks(&mut computer, 1);
        assert_eq!(computer.cpus()[1].pid, Some(pid));

        computer.remove_cpu().unwrap();
        assert_invariants(&computer);
        assert_eq!(computer.cpus().len(), 1);
        assert_eq!(state(&computer, pid), Some(ProcessState::Ready));

        computer.remove_cpu().unwrap();
        assert_eq!(computer.remove_cpu(), Err(ScheduleError::NoCpus));
        assert_invariants(&computer);
    }

    #[test]
    fn test_reset() {
        let mut computer = Computer::new(2, Some(5));
        spawn(&mut computer, "top: jmp top");
        spawn(&mut computer, "top: jmp top");
        ticks(&mut computer, 4);

        computer.reset();
        assert_eq!(computer.processes().count(), 1);
        assert_eq!(state(&computer, INIT_PID), Some(ProcessState::New));
        assert!(computer.cpus().iter().all(Cpu::is_idle));
        assert_eq!(computer.ready_queue().count(), 0);
        assert_eq!(computer.total_ticks(), 0);
        assert_eq!(spawn(&mut computer, "mov eax, 1"), 2);
    }

    #[test]
    fn test_program_library() {
        let mut computer = Computer::new(1, None);
        let program = compile("mov eax, 1").unwrap().shared();
        assert!(computer.install_program("one", Arc::clone(&program)).is_none());
        assert_eq!(computer.program_names().collect::<Vec<_>>(), vec!["init", "one"]);

        let pid = computer.spawn_named("one", INIT_PID).unwrap();
        assert!(Arc::ptr_eq(computer.process(pid).unwrap().program(), &program));
        assert_eq!(
            computer.spawn_named("two", INIT_PID),
            Err(ScheduleError::UnknownProgram("two".to_string()))
        );

        assert!(computer.remove_program("one").is_some());
        assert!(computer.program("one").is_none());
        // The process keeps running its own copy
        assert_eq!(computer.process(pid).unwrap().program().len(), 1);
    }

    #[test]
    #[should_panic(expected = "=> RUNNING")]
    fn test_illegal_transition_panics() {
        let mut computer = Computer::new(1, None);
        computer.to_running(INIT_PID, 0);
    }

    #[test]
    #[should_panic(expected = "occupied")]
    fn test_double_occupied_cpu_panics() {
        let mut computer = Computer::new(1, None);
        let pid = spawn(&mut computer, "top: jmp top");
        ticks(&mut computer, 1);
        computer.to_running(pid, 0);
    }
}
