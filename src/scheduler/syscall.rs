//! System-call handlers.
//!
//! | Call          | `ebx`              | `eax` on return              |
//! |---------------|--------------------|------------------------------|
//! | `exit`        | ignored            | process terminates           |
//! | `fork`        | ignored            | child pid, 0 in the child    |
//! | `waitpid`     | -1 or a child pid  | reaped pid, or -1            |
//! | `kill`        | target pid         | 0, or -1 for init/unknown    |
//! | `sched_yield` | ignored            | 0                            |
//!
//! Handlers run while the calling process is still RUNNING on its CPU. Any
//! effect on process states goes through [`StateChange`] and is applied after
//! every CPU has executed for the tick. The exceptions are fork, which only
//! creates a NEW process, and reaping an already-terminated child.

use std::sync::Arc;

use log::{debug, info};

use crate::isa::{Register, Syscall};

use super::change::StateChange;
use super::computer::Computer;
use super::process::{Pid, Process, ProcessState, WaitTarget, INIT_PID};

impl Computer {
    /// Carry out `call` for the RUNNING process `pid`.
    pub(super) fn syscall(&mut self, pid: Pid, call: Syscall) {
        debug!("pid {} syscall {}", pid, call);
        match call {
            Syscall::Exit => self.pending.push_back(StateChange::Terminate(pid)),
            Syscall::Fork => self.fork(pid),
            Syscall::Waitpid => self.waitpid(pid),
            Syscall::Kill => self.kill(pid),
            Syscall::SchedYield => self.sched_yield(pid),
        }
    }

    /// Clone the caller into a NEW child.
    ///
    /// Both resume after the fork; the parent sees the child's pid in `eax`,
    /// the child sees 0.
    fn fork(&mut self, pid: Pid) {
        let child_pid = self.allocate_pid();

        let parent = self.process_mut(pid);
        parent.registers.write(Register::Eax, child_pid);
        parent.registers.advance_pc();

        let mut child = Process::new(child_pid, pid, Arc::clone(&parent.program));
        child.registers = parent.registers.clone();
        child.registers.write(Register::Eax, 0);

        self.processes.insert(child_pid, child);
        info!("pid {} forked pid {}", pid, child_pid);
    }

    fn waitpid(&mut self, pid: Pid) {
        let arg = self.process_mut(pid).registers.read_signed(Register::Ebx);
        let target = match arg {
            -1 => Some(WaitTarget::Any),
            child if child > 0 => Some(WaitTarget::Child(child as Pid)),
            _ => None,
        };

        let children: Vec<(Pid, ProcessState)> = match target {
            Some(target) => self
                .processes
                .values()
                .filter(|c| c.ppid == pid && target.matches(c.pid))
                .map(|c| (c.pid, c.state))
                .collect(),
            None => Vec::new(),
        };

        let Some(target) = target.filter(|_| !children.is_empty()) else {
            let process = self.process_mut(pid);
            process.registers.write_signed(Register::Eax, -1);
            process.registers.advance_pc();
            return;
        };

        let zombie = children
            .iter()
            .find(|(_, state)| *state == ProcessState::Terminated)
            .map(|(child, _)| *child);
        if let Some(child) = zombie {
            self.reap(child);
            let process = self.process_mut(pid);
            process.registers.write(Register::Eax, child);
            process.registers.advance_pc();
            return;
        }

        self.pending.push_back(StateChange::Block { pid, target });
    }

    fn kill(&mut self, pid: Pid) {
        let arg = self.process_mut(pid).registers.read_signed(Register::Ebx);
        let target = Some(arg)
            .filter(|&t| t > 0)
            .map(|t| t as Pid)
            .filter(|&t| t != INIT_PID && self.processes.contains_key(&t));

        let result = match target {
            Some(target) => {
                self.pending.push_back(StateChange::Kill { killer: pid, target });
                0
            }
            None => {
                debug!("pid {} kill of {} refused", pid, arg);
                -1
            }
        };

        let process = self.process_mut(pid);
        process.registers.write_signed(Register::Eax, result);
        process.registers.advance_pc();
    }

    fn sched_yield(&mut self, pid: Pid) {
        let process = self.process_mut(pid);
        process.registers.write(Register::Eax, 0);
        process.registers.advance_pc();
        if !self.ready_queue.is_empty() {
            self.pending.push_back(StateChange::Yield(pid));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::asm::compile;
    use crate::isa::{Register, ENOSYS};
    use crate::scheduler::{Computer, Pid, ProcessState, INIT_PID};

    fn spawn(computer: &mut Computer, source: &str) -> Pid {
        computer.spawn(compile(source).unwrap().shared(), INIT_PID)
    }

    fn reg(computer: &Computer, pid: Pid, register: Register) -> u32 {
        computer.process(pid).unwrap().registers().read(register)
    }

    fn signed(computer: &Computer, pid: Pid, register: Register) -> i32 {
        computer.process(pid).unwrap().registers().read_signed(register)
    }

    fn state(computer: &Computer, pid: Pid) -> Option<ProcessState> {
        computer.process(pid).map(|p| p.state())
    }

    fn ticks(computer: &mut Computer, n: usize) {
        for _ in 0..n {
            computer.tick();
        }
    }

    #[test]
    fn test_fork_registers() {
        let mut computer = Computer::new(2, None);
        let parent = spawn(&mut computer, "mov ebx, 5\nmov eax, 2\nint 0x80\nmov edx, 1");

        // dispatch, mov, mov
        ticks(&mut computer, 3);
        let before = computer.process(parent).unwrap().registers().clone();

        ticks(&mut computer, 1);
        let child = 3;
        let p = computer.process(parent).unwrap().registers().clone();
        let c = computer.process(child).unwrap().registers().clone();

        assert_eq!(state(&computer, child), Some(ProcessState::New));
        assert_eq!(computer.process(child).unwrap().ppid(), parent);
        assert_eq!(p.read(Register::Eax), child);
        assert_eq!(c.read(Register::Eax), 0);
        assert_eq!(p.read(Register::Eip), 3);
        assert_eq!(c.read(Register::Eip), 3);
        for register in [Register::Ebx, Register::Ecx, Register::Edx, Register::Flags] {
            assert_eq!(c.read(register), before.read(register));
            assert_eq!(p.read(register), before.read(register));
        }
        assert!(std::sync::Arc::ptr_eq(
            computer.process(parent).unwrap().program(),
            computer.process(child).unwrap().program()
        ));

        // Child is promoted and dispatched on the idle CPU next tick
        ticks(&mut computer, 1);
        assert_eq!(computer.process(child).unwrap().cpu(), Some(0));
        assert_eq!(reg(&computer, parent, Register::Edx), 1);
    }

    #[test]
    fn test_waitpid_without_children() {
        let mut computer = Computer::new(2, None);
        let pid = spawn(&mut computer, "mov ebx, -1\ncall waitpid\nmov edx, 1");
        ticks(&mut computer, 3);
        assert_eq!(signed(&computer, pid, Register::Eax), -1);
        assert_eq!(reg(&computer, pid, Register::Eip), 2);
        assert_eq!(state(&computer, pid), Some(ProcessState::Running));
    }

    #[test]
    fn test_waitpid_on_non_child() {
        let mut computer = Computer::new(2, None);
        let pid = spawn(&mut computer, "mov ebx, 1\nmov eax, 7\nint 0x80");
        ticks(&mut computer, 4);
        assert_eq!(signed(&computer, pid, Register::Eax), -1);
        assert_eq!(state(&computer, pid), Some(ProcessState::Running));

        let mut computer = Computer::new(2, None);
        let pid = spawn(&mut computer, "mov ebx, 0\ncall wait");
        ticks(&mut computer, 3);
        assert_eq!(signed(&computer, pid, Register::Eax), -1);
    }

    #[test]
    fn test_wait_and_exit_in_same_tick() {
        let mut computer = Computer::new(2, None);
        let parent = spawn(
            &mut computer,
            "call fork\n\
             cmp eax, 0\n\
             je child\n\
             mov ebx, eax\n\
             call waitpid\n\
             done: jmp done\n\
             child: call exit",
        );

        ticks(&mut computer, 5);
        let child = 3;
        assert_eq!(computer.process(child).unwrap().cpu(), Some(0));
        assert_eq!(reg(&computer, child, Register::Eip), 6);
        assert_eq!(reg(&computer, parent, Register::Eip), 4);

        // Child exits on CPU0 while the parent waits on CPU1
        ticks(&mut computer, 1);
        assert_eq!(state(&computer, child), None);
        assert_eq!(reg(&computer, parent, Register::Eax), child);
        assert_eq!(reg(&computer, parent, Register::Eip), 5);
        assert_eq!(state(&computer, parent), Some(ProcessState::Running));
    }

    #[test]
    fn test_waitpid_blocks_then_reaps() {
        let mut computer = Computer::new(2, Some(5));
        let parent = spawn(
            &mut computer,
            "call fork\n\
             cmp eax, 0\n\
             je child\n\
             mov ebx, eax\n\
             call waitpid\n\
             mov edx, eax\n\
             done: jmp done\n\
             child: mov ecx, 4\n\
             spin: loop spin\n\
             call exit",
        );

        let mut saw_waiting = false;
        for _ in 0..30 {
            computer.tick();
            saw_waiting |= state(&computer, parent) == Some(ProcessState::Waiting);
        }

        assert!(saw_waiting);
        assert_eq!(state(&computer, 3), None);
        assert_eq!(reg(&computer, parent, Register::Edx), 3);
    }

    #[test]
    fn test_waitpid_reaps_terminated_child_immediately() {
        let mut computer = Computer::new(2, None);
        let parent = spawn(
            &mut computer,
            "call fork\n\
             cmp eax, 0\n\
             je child\n\
             mov ecx, 5\n\
             spin: loop spin\n\
             mov ebx, -1\n\
             call waitpid\n\
             done: jmp done\n\
             child: call exit",
        );

        // Child exits long before the parent calls waitpid
        ticks(&mut computer, 7);
        assert_eq!(state(&computer, 3), Some(ProcessState::Terminated));

        let mut reaped_at = None;
        for tick in 0..20 {
            computer.tick();
            if state(&computer, 3).is_none() && reaped_at.is_none() {
                reaped_at = Some(tick);
                assert_eq!(state(&computer, parent), Some(ProcessState::Running));
            }
        }
        assert!(reaped_at.is_some());
        assert_eq!(reg(&computer, parent, Register::Eax), 3);
    }

    #[test]
    fn test_kill_refused() {
        for target in ["1", "99", "-1", "0"] {
            let mut computer = Computer::new(2, None);
            let source = format!("mov ebx, {}\ncall kill", target);
            let pid = spawn(&mut computer, &source);
            ticks(&mut computer, 3);

            assert_eq!(signed(&computer, pid, Register::Eax), -1, "target {}", target);
            assert_eq!(reg(&computer, pid, Register::Eip), 2);
            assert_eq!(state(&computer, pid), Some(ProcessState::Running));
            assert_eq!(state(&computer, INIT_PID), Some(ProcessState::Waiting));
            assert_eq!(computer.processes().count(), 2);
        }
    }

    #[test]
    fn test_kill_running_child() {
        let mut computer = Computer::new(2, None);
        let parent = spawn(
            &mut computer,
            "call fork\n\
             cmp eax, 0\n\
             je child\n\
             mov ebx, eax\n\
             call kill\n\
             mov ebx, -1\n\
             call waitpid\n\
             done: jmp done\n\
             child: jmp child",
        );

        ticks(&mut computer, 6);
        assert_eq!(reg(&computer, parent, Register::Eax), 0);
        assert_eq!(state(&computer, 3), Some(ProcessState::Terminated));
        assert!(computer.cpus()[0].is_idle());

        ticks(&mut computer, 2);
        assert_eq!(state(&computer, 3), None);
        assert_eq!(reg(&computer, parent, Register::Eax), 3);
    }

    #[test]
    fn test_kill_ready_target_borrows_cpu() {
        let mut computer = Computer::new(1, None);
        let parent = spawn(
            &mut computer,
            "call fork\n\
             mov ebx, eax\n\
             call kill\n\
             mov ebx, -1\n\
             call waitpid\n\
             done: jmp done",
        );

        ticks(&mut computer, 5);
        assert_eq!(state(&computer, 3), Some(ProcessState::Ready));
        assert_eq!(computer.cpus()[0].elapsed, 2);

        ticks(&mut computer, 1);
        assert_eq!(state(&computer, 3), Some(ProcessState::Terminated));
        assert_eq!(reg(&computer, parent, Register::Eax), 0);
        assert_eq!(computer.process(parent).unwrap().cpu(), Some(0));
        assert_eq!(computer.cpus()[0].elapsed, 3);
        assert_eq!(computer.ready_queue().count(), 0);

        ticks(&mut computer, 2);
        assert_eq!(state(&computer, 3), None);
        assert_eq!(reg(&computer, parent, Register::Eax), 3);
    }

    #[test]
    fn test_kill_waiting_target() {
        let mut computer = Computer::new(2, None);
        // pid 2 waits on its child pid 4; pid 3 kills pid 2
        let waiter = spawn(
            &mut computer,
            "call fork\n\
             cmp eax, 0\n\
             je child\n\
             mov ebx, -1\n\
             call waitpid\n\
             child: jmp child",
        );
        let killer = spawn(
            &mut computer,
            "mov ecx, 10\n\
             pause: loop pause\n\
             mov ebx, 2\n\
             call kill",
        );

        ticks(&mut computer, 15);
        assert_eq!(state(&computer, waiter), Some(ProcessState::Waiting));
        assert_eq!(computer.cpus()[0].pid, Some(killer));

        ticks(&mut computer, 1);
        assert_eq!(reg(&computer, killer, Register::Eax), 0);
        assert_eq!(computer.process(killer).unwrap().cpu(), Some(0));
        // Killed, then reaped by the waiting init
        assert_eq!(state(&computer, waiter), None);
        assert_eq!(reg(&computer, INIT_PID, Register::Eax), waiter);
        assert_eq!(state(&computer, INIT_PID), Some(ProcessState::Ready));
        // The orphan was handed to init
        assert_eq!(computer.process(4).unwrap().ppid(), INIT_PID);
        assert_eq!(state(&computer, 4), Some(ProcessState::Running));
    }

    #[test]
    fn test_orphans_go_to_init() {
        let mut computer = Computer::new(2, None);
        let parent = spawn(
            &mut computer,
            "call fork\n\
             cmp eax, 0\n\
             je child\n\
             call exit\n\
             child: jmp child",
        );

        ticks(&mut computer, 4);
        assert_eq!(computer.process(3).unwrap().ppid(), parent);

        ticks(&mut computer, 1);
        assert_eq!(state(&computer, parent), None);
        assert_eq!(computer.process(3).unwrap().ppid(), INIT_PID);
        assert_eq!(reg(&computer, INIT_PID, Register::Eax), parent);
    }

    #[test]
    fn test_terminated_orphan_wakes_waiting_init() {
        let mut computer = Computer::new(2, None);
        let parent = spawn(
            &mut computer,
            "call fork\n\
             cmp eax, 0\n\
             je child\n\
             mov ecx, 3\n\
             spin: loop spin\n\
             call exit\n\
             child: call exit",
        );

        ticks(&mut computer, 6);
        assert_eq!(state(&computer, 3), Some(ProcessState::Terminated));
        assert_eq!(computer.process(3).unwrap().ppid(), parent);
        assert_eq!(state(&computer, INIT_PID), Some(ProcessState::Waiting));

        // Parent exits: the zombie orphan wakes init at once
        ticks(&mut computer, 3);
        assert_eq!(state(&computer, 3), None);
        assert_eq!(reg(&computer, INIT_PID, Register::Eax), 3);
        assert_eq!(state(&computer, INIT_PID), Some(ProcessState::Running));
        assert_eq!(state(&computer, parent), Some(ProcessState::Terminated));
        assert_eq!(computer.process(parent).unwrap().ppid(), INIT_PID);

        // init's next waitpid reaps the parent without blocking
        ticks(&mut computer, 2);
        assert_eq!(state(&computer, parent), None);
        assert_eq!(reg(&computer, INIT_PID, Register::Eax), parent);
        assert!(computer.is_settled());
    }

    #[test]
    fn test_yield() {
        let mut computer = Computer::new(1, None);
        let a = spawn(&mut computer, "call yield\nmov edx, 1");
        let b = spawn(&mut computer, "mov edx, 2");

        // init blocks on tick 3 and `a` takes the CPU
        ticks(&mut computer, 3);
        assert_eq!(computer.cpus()[0].pid, Some(a));

        ticks(&mut computer, 1);
        assert_eq!(state(&computer, a), Some(ProcessState::Ready));
        assert_eq!(reg(&computer, a, Register::Eax), 0);
        assert_eq!(reg(&computer, a, Register::Eip), 1);
        assert_eq!(computer.cpus()[0].pid, Some(b));
    }

    #[test]
    fn test_yield_with_empty_queue() {
        let mut computer = Computer::new(2, None);
        let pid = spawn(&mut computer, "mov eax, 9\ncall sched_yield\nmov edx, 1");
        ticks(&mut computer, 3);
        assert_eq!(state(&computer, pid), Some(ProcessState::Running));
        assert_eq!(reg(&computer, pid, Register::Eax), 0);
        assert_eq!(reg(&computer, pid, Register::Eip), 2);
    }

    #[test]
    fn test_unknown_syscall() {
        let mut computer = Computer::new(2, None);
        let pid = spawn(&mut computer, "mov eax, 99\nint 0x80\nmov edx, 1");
        ticks(&mut computer, 3);
        assert_eq!(signed(&computer, pid, Register::Eax), ENOSYS);
        assert_eq!(reg(&computer, pid, Register::Eip), 2);
        assert_eq!(state(&computer, pid), Some(ProcessState::Running));
    }

    #[test]
    fn test_exit_syscall() {
        let mut computer = Computer::new(2, None);
        let pid = spawn(&mut computer, "mov eax, 1\nint 0x80\nmov edx, 1");
        ticks(&mut computer, 3);
        assert_eq!(state(&computer, pid), None);
        assert_eq!(reg(&computer, INIT_PID, Register::Eax), pid);
    }
}
