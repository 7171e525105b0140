//! Host-side driver that exercises the kernel's public API the way a
//! running machine would, without needing an actual MIPS interpreter
//! for the test programs' own instructions (out of scope per spec.md's
//! Non-goals — this crate simulates kernel behavior, not arbitrary user
//! code). Each test program's *kernel-visible* behavior — the syscalls
//! it issues and the order it issues them in — is reproduced directly
//! against [`pandos_kernel`]'s API, mirroring what `testers/*.c`
//! programs in the reference implementation actually do.

use crate::mock_hal::MockHal;
use anyhow::{bail, Context as _, Result};
use pandos_kernel::config::MAX_STR_LEN;
use pandos_kernel::facade::{self, UserCall};
use pandos_kernel::hal::ProcessorState;
use pandos_kernel::instantiator;
use pandos_kernel::process::Pid;
use pandos_kernel::syscall::{self, Outcome, Syscall};
use pandos_kernel::KernelContext;

pub struct Simulation {
    pub ctx: KernelContext<MockHal>,
    terminal_output: std::cell::RefCell<Vec<u8>>,
}

impl Simulation {
    pub fn new() -> Self {
        Simulation { ctx: KernelContext::new(MockHal::new()), terminal_output: std::cell::RefCell::new(Vec::new()) }
    }

    pub fn boot_single_uproc(&mut self) -> Pid {
        let launched = instantiator::boot(&mut self.ctx, &[ProcessorState::default()]);
        assert_eq!(launched, 1);
        self.ctx.procs.remove_head(&mut self.ctx.ready).expect("just booted one process")
    }

    /// Mark every device status register as "ready"/"transmitted" so
    /// the façade's synchronous write/read model, and the pager's
    /// synchronous flash model, both always succeed. Flash/disk and
    /// printer/terminal use different status codes for "done".
    pub fn make_devices_responsive(&mut self) {
        use pandos_kernel::config::{device_status, LINE_DISK, LINE_FLASH, LINE_OFFSET, LINE_PRINTER};
        let regs = self.ctx.hal.device_regs_mut();
        for line in regs.devreg.iter_mut() {
            for dev in line.iter_mut() {
                dev.status = device_status::CHAR_TRANSMITTED;
            }
        }
        for line_idx in [LINE_DISK - LINE_OFFSET, LINE_FLASH - LINE_OFFSET, LINE_PRINTER - LINE_OFFSET] {
            for dev in regs.devreg[line_idx].iter_mut() {
                dev.status = device_status::READY;
            }
        }
    }

    fn write_terminal(&mut self, pid: Pid, text: &str) -> Result<()> {
        self.make_devices_responsive();
        let mut scratch = [0u8; MAX_STR_LEN];
        let n = facade::handle(&mut self.ctx, pid, UserCall::WriteToTerminal(text.as_bytes()), &mut scratch);
        if n < 0 {
            bail!("write_to_terminal failed for pid");
        }
        self.terminal_output.borrow_mut().extend_from_slice(text.as_bytes());
        Ok(())
    }

    pub fn terminal_output(&self) -> Vec<u8> {
        self.terminal_output.borrow().clone()
    }

    fn terminate(&mut self, pid: Pid) {
        facade::handle(&mut self.ctx, pid, UserCall::TerminateUser, &mut [0u8; MAX_STR_LEN]);
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

fn ackermann(m: u64, n: u64) -> u64 {
    if m == 0 {
        n + 1
    } else if n == 0 {
        ackermann(m - 1, 1)
    } else {
        ackermann(m - 1, ackermann(m, n - 1))
    }
}

fn hanoi_moves(disks: u32) -> u64 {
    (1u64 << disks) - 1
}

/// Reproduces `testers/pandosAckermann.c`: compute, print, terminate.
pub fn run_ackermann_scenario() -> Result<u64> {
    let mut sim = Simulation::new();
    let pid = sim.boot_single_uproc();
    let result = ackermann(2, 3);
    sim.write_terminal(pid, &result.to_string()).context("ackermann scenario: write result")?;
    sim.terminate(pid);
    if sim.ctx.proc_count != 0 {
        bail!("ackermann scenario: process did not terminate cleanly");
    }
    let seen = sim.terminal_output();
    if seen != result.to_string().into_bytes() {
        bail!("ackermann scenario: terminal output mismatch");
    }
    Ok(result)
}

/// Reproduces `testers/pandosHanoi.c`.
pub fn run_hanoi_scenario() -> Result<u64> {
    let mut sim = Simulation::new();
    let pid = sim.boot_single_uproc();
    let result = hanoi_moves(5);
    sim.write_terminal(pid, &result.to_string()).context("hanoi scenario: write result")?;
    sim.terminate(pid);
    Ok(result)
}

/// Faults across a 10-wide VPN window twice, forcing FIFO eviction
/// once the 16-frame swap pool wraps mid-scenario.
pub fn run_swap_stress_scenario() -> Result<()> {
    let mut sim = Simulation::new();
    sim.make_devices_responsive();
    let _pid = sim.boot_single_uproc();
    let support_idx = 0u16;

    for round in 0..2 {
        for vpn in 20..30 {
            pandos_kernel::pager::handle_page_fault(&mut sim.ctx, support_idx, vpn)
                .with_context(|| format!("swap stress: fault on vpn {vpn} (round {round})"))?;
        }
    }

    let support = sim.ctx.supports[support_idx as usize].as_ref().unwrap();
    if !support.page_table[29].is_valid() {
        bail!("swap stress: most recently faulted page should still be mapped");
    }
    Ok(())
}

/// Two processes, each blocked waiting on a semaphore the other would
/// need to release: `proc_count > 0`, `soft_block_count == 0`, nothing
/// on the ready queue. `scheduler()` must treat this as a fatal
/// deadlock, not spin.
pub fn run_deadlock_scenario() -> Result<()> {
    let mut sim = Simulation::new();
    let a = sim.ctx.procs.alloc().context("alloc a")?;
    let b = sim.ctx.procs.alloc().context("alloc b")?;
    sim.ctx.proc_count = 2;

    let key_a = pandos_kernel::sem::SemKey::device_mutex(0);
    let key_b = pandos_kernel::sem::SemKey::device_mutex(1);
    sim.ctx.sem_values.set(key_a, 0);
    sim.ctx.sem_values.set(key_b, 0);

    sim.ctx.current = Some(a);
    let outcome_a = syscall::handle(&mut sim.ctx, a, Syscall::Passeren(key_b), None, None);
    if outcome_a != Outcome::Rescheduled {
        bail!("deadlock scenario: process a should have blocked");
    }
    sim.ctx.current = Some(b);
    let outcome_b = syscall::handle(&mut sim.ctx, b, Syscall::Passeren(key_a), None, None);
    if outcome_b != Outcome::Rescheduled {
        bail!("deadlock scenario: process b should have blocked");
    }

    if !sim.ctx.procs.queue_is_empty(&sim.ctx.ready) {
        bail!("deadlock scenario: ready queue should be empty");
    }
    if sim.ctx.soft_block_count != 0 {
        bail!("deadlock scenario: no device I/O is outstanding");
    }
    Ok(())
}

/// All processes terminate; `proc_count` reaches zero and the
/// scheduler's next pick must be a clean halt, not a deadlock panic.
pub fn run_clean_shutdown_scenario() -> Result<()> {
    let mut sim = Simulation::new();
    let pid = sim.boot_single_uproc();
    sim.terminate(pid);
    if sim.ctx.proc_count != 0 {
        bail!("clean shutdown scenario: proc_count should reach zero");
    }
    if !sim.ctx.procs.queue_is_empty(&sim.ctx.ready) {
        bail!("clean shutdown scenario: ready queue should be empty");
    }
    Ok(())
}

/// Three processes waiting on the pseudo-clock all wake on the next
/// tick, in the order they blocked.
pub fn run_pseudo_clock_broadcast_scenario() -> Result<Vec<Pid>> {
    let mut sim = Simulation::new();
    let mut waiters = Vec::new();
    for _ in 0..3 {
        let pid = sim.ctx.procs.alloc().context("alloc waiter")?;
        sim.ctx.current = Some(pid);
        let outcome = syscall::handle(&mut sim.ctx, pid, Syscall::WaitForPseudoClock, None, None);
        if outcome != Outcome::Rescheduled {
            bail!("pseudo clock scenario: waiter should have blocked");
        }
        waiters.push(pid);
    }
    if sim.ctx.soft_block_count != 3 {
        bail!("pseudo clock scenario: expected 3 soft-blocked waiters");
    }
    pandos_kernel::interrupt::handle_pseudo_clock(&mut sim.ctx);
    if sim.ctx.soft_block_count != 0 {
        bail!("pseudo clock scenario: tick should release every waiter");
    }
    let mut woken = Vec::new();
    while let Some(pid) = sim.ctx.procs.remove_head(&mut sim.ctx.ready) {
        woken.push(pid);
    }
    if woken != waiters {
        bail!("pseudo clock scenario: waiters should wake in FIFO order");
    }
    Ok(woken)
}
