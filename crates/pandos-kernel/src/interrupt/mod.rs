//! Interrupt handling: PLT quantum expiry, the pseudo-clock/interval
//! timer, and device completion interrupts (`phase2/interrupts.c`,
//! spec.md §4.5).

use crate::config::{device_command, device_sem_index, PSEUDO_CLOCK_PERIOD_MICROS};
use crate::context::KernelContext;
use crate::hal::Hal;
use crate::syscall::pseudo_clock_key;

/// Quantum expired: charge the elapsed time to whoever was running and
/// put them back at the tail of the ready queue. The scheduler picks
/// the next process; this function does not call it directly so
/// callers can batch several simultaneous interrupts first.
pub fn handle_plt<H: Hal>(ctx: &mut KernelContext<H>, elapsed_micros: u32) {
    if let Some(pid) = ctx.current.take() {
        ctx.procs.get_mut(pid).cpu_time += elapsed_micros as u64;
        ctx.procs.insert_tail(&mut ctx.ready, pid);
    }
}

/// The 100ms interval timer fired: broadcast-wake every process blocked
/// on the pseudo-clock semaphore and reset it (spec.md §4.6 — unlike
/// every other semaphore, this one never goes negative across ticks).
pub fn handle_pseudo_clock<H: Hal>(ctx: &mut KernelContext<H>) {
    ctx.hal.set_interval_timer(PSEUDO_CLOCK_PERIOD_MICROS);
    let key = pseudo_clock_key();
    ctx.sem_values.set(key, 0);
    while let Some(pid) = ctx.asl.remove_blocked(&mut ctx.procs, key) {
        ctx.procs.insert_tail(&mut ctx.ready, pid);
        ctx.soft_block_count = ctx.soft_block_count.saturating_sub(1);
    }
}

/// A device on `line`/`device` finished its command. Acks the device,
/// V's its semaphore, and — if that unblocks a waiter — hands the
/// saved status word back as the SYS5 return value
/// (`phase2/interrupts.c`'s device-interrupt handler).
pub fn handle_device<H: Hal>(ctx: &mut KernelContext<H>, line: usize, device: usize, term_write: bool, status: u32) {
    let Some(idx) = device_sem_index(line, device, term_write) else { return };
    let key = crate::sem::SemKey::device(idx);

    ctx.hal.device_regs_mut().devreg[line - crate::config::LINE_OFFSET][device].command = device_command::ACK;

    let v = ctx.sem_values.increment(key);
    if v <= 0 {
        if let Some(pid) = ctx.asl.remove_blocked(&mut ctx.procs, key) {
            ctx.procs.get_mut(pid).state.set_v0(status);
            ctx.procs.insert_tail(&mut ctx.ready, pid);
            ctx.soft_block_count = ctx.soft_block_count.saturating_sub(1);
        }
    }
}

/// Scan a line's pending-interrupt bitmap and return the
/// lowest-numbered (highest-priority) device with a bit set
/// (`findDeviceNum`/the reference BIOS's fixed priority order).
pub fn highest_priority_device(pending_bits: u32) -> Option<usize> {
    if pending_bits == 0 {
        None
    } else {
        Some(pending_bits.trailing_zeros() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{Context, DeviceRegArea, ProcessorState};
    use crate::syscall::{handle as syscall_handle, Syscall};

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
    fn plt_requeues_current_and_charges_time() {
        let mut ctx = new_ctx();
        let pid = ctx.procs.alloc().unwrap();
        ctx.current = Some(pid);
        handle_plt(&mut ctx, 5000);
        assert!(ctx.current.is_none());
        assert_eq!(ctx.procs.get(pid).cpu_time, 5000);
        assert_eq!(ctx.procs.head(&ctx.ready), Some(pid));
    }

    #[test]
    fn device_interrupt_wakes_waiter_with_status() {
        let mut ctx = new_ctx();
        let pid = ctx.procs.alloc().unwrap();
        ctx.current = Some(pid);
        syscall_handle(
            &mut ctx,
            pid,
            Syscall::WaitForIo { line: crate::config::LINE_DISK, device: 2, wait_for_term_read: true },
            None,
            None,
        );
        handle_device(&mut ctx, crate::config::LINE_DISK, 2, false, 0xbeef);
        assert_eq!(ctx.procs.head(&ctx.ready), Some(pid));
        assert_eq!(ctx.procs.get(pid).state.v0(), 0xbeef);
        assert_eq!(ctx.soft_block_count, 0);
    }

    #[test]
    fn pseudo_clock_broadcasts_to_all_waiters() {
        let mut ctx = new_ctx();
        let a = ctx.procs.alloc().unwrap();
        let b = ctx.procs.alloc().unwrap();
        let c = ctx.procs.alloc().unwrap();
        for p in [a, b, c] {
            ctx.current = Some(p);
            syscall_handle(&mut ctx, p, Syscall::WaitForPseudoClock, None, None);
        }
        assert_eq!(ctx.soft_block_count, 3);
        handle_pseudo_clock(&mut ctx);
        assert_eq!(ctx.soft_block_count, 0);
        assert_eq!(ctx.procs.remove_head(&mut ctx.ready), Some(a));
        assert_eq!(ctx.procs.remove_head(&mut ctx.ready), Some(b));
        assert_eq!(ctx.procs.remove_head(&mut ctx.ready), Some(c));
    }

    #[test]
    fn highest_priority_picks_lowest_set_bit() {
        assert_eq!(highest_priority_device(0b0000), None);
        assert_eq!(highest_priority_device(0b0110), Some(1));
        assert_eq!(highest_priority_device(0b1001), Some(0));
    }
}
