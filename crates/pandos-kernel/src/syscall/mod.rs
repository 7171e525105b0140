//! Kernel-mode system calls, SYS1-8 (`phase2/exceptions.c`, spec.md §4.4).
//!
//! The reference implementation reads its arguments out of `a1`/`a2`/`a3`
//! because that is the only channel a trap handler has into a MIPS
//! register file. This crate has no user address space to dereference a
//! pointer argument against, so `Syscall` carries its arguments as plain
//! Rust values instead — the tagged-variant-over-numeric-code
//! replacement Design Notes §9 calls for, extended to the argument list
//! as well as the opcode.

use crate::config::device_sem_index;
use crate::context::KernelContext;
use crate::hal::Hal;
use crate::process::Pid;
use crate::sem::SemKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    CreateProcess,
    TerminateProcess(Option<Pid>),
    Passeren(SemKey),
    Verhogen(SemKey),
    WaitForIo { line: usize, device: usize, wait_for_term_read: bool },
    GetCpuTime,
    WaitForPseudoClock,
    GetSupportPtr,
}

/// What the exception dispatcher should do once the syscall has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The caller is still runnable; resume it directly.
    Resume(Pid),
    /// The caller blocked or terminated; fall through to the scheduler.
    Rescheduled,
}

/// Service one syscall on behalf of `pid` (`pid` is `current`, saved at
/// a PC already advanced past the `SYSCALL` instruction per spec.md
/// §4.4's pre-check).
pub fn handle<H: Hal>(
    ctx: &mut KernelContext<H>,
    pid: Pid,
    call: Syscall,
    new_proc_state: Option<crate::hal::ProcessorState>,
    new_proc_support: Option<u16>,
) -> Outcome {
    match call {
        Syscall::CreateProcess => {
            let result = create_process(ctx, pid, new_proc_state.unwrap_or_default(), new_proc_support);
            ctx.procs.get_mut(pid).state.set_v0(result);
            Outcome::Resume(pid)
        }
        Syscall::TerminateProcess(target) => {
            terminate_process(ctx, target.unwrap_or(pid));
            Outcome::Rescheduled
        }
        Syscall::Passeren(key) => passeren(ctx, pid, key),
        Syscall::Verhogen(key) => {
            verhogen(ctx, key);
            Outcome::Resume(pid)
        }
        Syscall::WaitForIo { line, device, wait_for_term_read } => {
            wait_for_io(ctx, pid, line, device, wait_for_term_read)
        }
        Syscall::GetCpuTime => {
            let t = ctx.procs.get(pid).cpu_time;
            ctx.procs.get_mut(pid).state.set_v0(t as u32);
            Outcome::Resume(pid)
        }
        Syscall::WaitForPseudoClock => {
            let outcome = passeren(ctx, pid, pseudo_clock_key());
            if outcome == Outcome::Rescheduled {
                ctx.soft_block_count += 1;
            }
            outcome
        }
        Syscall::GetSupportPtr => {
            let idx = ctx.procs.get(pid).support.unwrap_or(u16::MAX);
            ctx.procs.get_mut(pid).state.set_v0(idx as u32);
            Outcome::Resume(pid)
        }
    }
}

/// Public entry point for "die" halves of pass-up-or-die (spec.md §4.7),
/// which need SYS2's recursive teardown without going through the
/// syscall-dispatch enum.
pub fn terminate<H: Hal>(ctx: &mut KernelContext<H>, pid: Pid) {
    terminate_process(ctx, pid);
}

pub fn pseudo_clock_key() -> SemKey {
    SemKey::device(crate::config::PSEUDO_CLOCK_INDEX)
}

/// SYS1: allocate a child PCB, seed its state, enqueue it, and return
/// its pid (as a raw handle value) or -1 on pool exhaustion.
fn create_process<H: Hal>(
    ctx: &mut KernelContext<H>,
    parent: Pid,
    state: crate::hal::ProcessorState,
    support: Option<u16>,
) -> u32 {
    match ctx.procs.alloc() {
        Some(child) => {
            ctx.procs.get_mut(child).state = state;
            ctx.procs.get_mut(child).support = support;
            ctx.procs.insert_child(parent, child);
            ctx.procs.insert_tail(&mut ctx.ready, child);
            ctx.proc_count += 1;
            child_handle(child)
        }
        None => u32::MAX, // -1
    }
}

fn child_handle(pid: Pid) -> u32 {
    // Any bit pattern distinguishable from -1 and stable per-process
    // is sufficient; the index itself satisfies that.
    pid_index(pid) as u32
}

fn pid_index(pid: Pid) -> u16 {
    // `Pid` intentionally exposes no public accessor; syscalls only ever
    // need to hand this value back to user code as an opaque cookie, so
    // route through the Debug-only bit pattern is avoided in favor of a
    // dedicated crate-visible accessor.
    crate::process::pid_raw(pid)
}

/// SYS2: recursively terminate `pid` and its entire subtree
/// (`phase2/exceptions.c`'s `terminateProcess`, spec.md §4.4).
fn terminate_process<H: Hal>(ctx: &mut KernelContext<H>, pid: Pid) {
    while ctx.procs.has_children(pid) {
        let child = ctx.procs.remove_first_child(pid).unwrap();
        terminate_process(ctx, child);
    }

    if ctx.procs.parent_of(pid).is_some() {
        ctx.procs.detach_child(pid);
    }

    let was_current = ctx.current == Some(pid);
    if !was_current {
        ctx.procs.remove(&mut ctx.ready, pid);
    }

    if let Some(key) = ctx.procs.get(pid).sem_addr {
        ctx.asl.out_blocked(&mut ctx.procs, pid);
        if is_device_key(key) {
            ctx.soft_block_count = ctx.soft_block_count.saturating_sub(1);
        } else {
            // The process was never going to perform the I/O it was
            // waiting to serialize; releasing the resource on its
            // behalf keeps the semaphore balanced (SYS2's
            // increment-only-non-device-semaphores rule).
            ctx.sem_values.increment(key);
        }
    }

    ctx.procs.free(pid);
    ctx.proc_count = ctx.proc_count.saturating_sub(1);
    if was_current {
        ctx.current = None;
    }
}

fn is_device_key(key: SemKey) -> bool {
    matches!(key.kind(), crate::sem::SemKeyKind::Device(_))
}

/// SYS3: P. Blocks the caller if the semaphore goes negative.
fn passeren<H: Hal>(ctx: &mut KernelContext<H>, pid: Pid, key: SemKey) -> Outcome {
    let v = ctx.sem_values.decrement(key);
    if v < 0 {
        ctx.asl.insert_blocked(&mut ctx.procs, key, pid);
        ctx.current = None;
        Outcome::Rescheduled
    } else {
        Outcome::Resume(pid)
    }
}

/// SYS4: V. Wakes the head waiter, if any.
fn verhogen<H: Hal>(ctx: &mut KernelContext<H>, key: SemKey) {
    let v = ctx.sem_values.increment(key);
    if v <= 0 {
        if let Some(woken) = ctx.asl.remove_blocked(&mut ctx.procs, key) {
            ctx.procs.insert_tail(&mut ctx.ready, woken);
        }
    }
}

/// SYS5: wait for a device interrupt, delegating to the matching P.
fn wait_for_io<H: Hal>(
    ctx: &mut KernelContext<H>,
    pid: Pid,
    line: usize,
    device: usize,
    wait_for_term_read: bool,
) -> Outcome {
    let idx = match device_sem_index(line, device, !wait_for_term_read) {
        Some(i) => i,
        None => {
            ctx.procs.get_mut(pid).state.set_v0(u32::MAX);
            return Outcome::Resume(pid);
        }
    };
    let key = SemKey::device(idx);
    let outcome = passeren(ctx, pid, key);
    if outcome == Outcome::Rescheduled {
        ctx.soft_block_count += 1;
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{Context, DeviceRegArea, ProcessorState};

    struct NullHal {
        regs: DeviceRegArea,
    }
    impl Hal for NullHal {
        fn device_regs(&self) -> &DeviceRegArea {
            &self.regs
        }
        fn device_regs_mut(&mut self) -> &mut DeviceRegArea {
            &mut self.regs
        }
        fn tod_now(&self) -> u64 {
            0
        }
        fn set_plt(&mut self, _: u32) {}
        fn set_interval_timer(&mut self, _: u32) {}
        fn set_interrupts(&mut self, _: bool) {}
        fn tlb_clear(&mut self) {}
        fn tlb_write_random(&mut self, _: u32, _: u32) {}
        fn load_state(&mut self, _: &ProcessorState) -> ! {
            unreachable!()
        }
        fn load_context(&mut self, _: &Context) -> ! {
            unreachable!()
        }
        fn halt(&mut self) -> ! {
            unreachable!()
        }
        fn panic(&mut self, _: &str) -> ! {
            unreachable!()
        }
        fn wait(&mut self) {}
    }

    fn new_ctx() -> KernelContext<NullHal> {
        KernelContext::new(NullHal { regs: DeviceRegArea::default() })
    }

    #[test]
    fn create_process_enqueues_child_with_seeded_state() {
        let mut ctx = new_ctx();
        let parent = ctx.procs.alloc().unwrap();
        ctx.current = Some(parent);
        let mut seed = ProcessorState::default();
        seed.pc = 0x1234;
        let out = handle(&mut ctx, parent, Syscall::CreateProcess, Some(seed), None);
        assert_eq!(out, Outcome::Resume(parent));
        assert_ne!(ctx.procs.get(parent).state.v0(), u32::MAX);
        let child = ctx.procs.head(&ctx.ready).unwrap();
        assert_eq!(ctx.procs.get(child).state.pc, 0x1234);
        assert_eq!(ctx.proc_count, 1);
    }

    #[test]
    fn passeren_blocks_when_semaphore_negative() {
        let mut ctx = new_ctx();
        let pid = ctx.procs.alloc().unwrap();
        ctx.current = Some(pid);
        ctx.sem_values.set(SemKey::MASTER, 0);
        let out = handle(&mut ctx, pid, Syscall::Passeren(SemKey::MASTER), None, None);
        assert_eq!(out, Outcome::Rescheduled);
        assert!(ctx.current.is_none());
        assert!(ctx.asl.is_active(SemKey::MASTER));
    }

    #[test]
    fn verhogen_wakes_blocked_waiter() {
        let mut ctx = new_ctx();
        let waiter = ctx.procs.alloc().unwrap();
        ctx.sem_values.set(SemKey::MASTER, 0);
        ctx.current = Some(waiter);
        handle(&mut ctx, waiter, Syscall::Passeren(SemKey::MASTER), None, None);
        let other = ctx.procs.alloc().unwrap();
        handle(&mut ctx, other, Syscall::Verhogen(SemKey::MASTER), None, None);
        assert_eq!(ctx.procs.head(&ctx.ready), Some(waiter));
    }

    #[test]
    fn terminate_process_recursively_kills_subtree() {
        let mut ctx = new_ctx();
        let parent = ctx.procs.alloc().unwrap();
        ctx.proc_count = 1;
        let child = ctx.procs.alloc().unwrap();
        ctx.proc_count += 1;
        ctx.procs.insert_child(parent, child);
        handle(&mut ctx, parent, Syscall::TerminateProcess(None), None, None);
        assert_eq!(ctx.proc_count, 0);
    }

    #[test]
    fn wait_for_io_increments_soft_block_count() {
        let mut ctx = new_ctx();
        let pid = ctx.procs.alloc().unwrap();
        ctx.current = Some(pid);
        let out = handle(
            &mut ctx,
            pid,
            Syscall::WaitForIo { line: crate::config::LINE_TERMINAL, device: 0, wait_for_term_read: true },
            None,
            None,
        );
        assert_eq!(out, Outcome::Rescheduled);
        assert_eq!(ctx.soft_block_count, 1);
    }
}
