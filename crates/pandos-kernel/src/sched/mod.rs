//! Round-robin scheduler (`phase2/scheduler.c`, spec.md §4.2).

use crate::config::QUANTUM_MICROS;
use crate::context::KernelContext;
use crate::hal::Hal;

/// Dispatch the next ready process, or decide the machine is done,
/// idle, or deadlocked. Never returns: every branch ends in a `Hal`
/// call that transfers control away for good (`load_state`, `halt`,
/// `wait`, `panic`).
pub fn scheduler<H: Hal>(ctx: &mut KernelContext<H>) -> ! {
    if let Some(pid) = ctx.procs.remove_head(&mut ctx.ready) {
        ctx.current = Some(pid);
        ctx.hal.set_plt(QUANTUM_MICROS);
        let state = ctx.procs.get(pid).state;
        ctx.hal.load_state(&state)
    }

    ctx.current = None;

    if ctx.proc_count == 0 {
        ctx.hal.halt()
    }

    if ctx.soft_block_count > 0 {
        ctx.hal.set_interrupts(true);
        ctx.hal.set_plt(u32::MAX);
        ctx.hal.wait();
        // `wait` returns once an interrupt handler has made progress
        // (e.g. unblocked a waiter and requeued it); re-enter to pick
        // up whatever became ready.
        scheduler(ctx)
    }

    ctx.hal.panic("deadlock: no ready process, no outstanding I/O")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{Context, DeviceRegArea, ProcessorState};

    struct RecordingHal {
        regs: DeviceRegArea,
        halted: bool,
        panicked: bool,
        waited: bool,
        loaded_pc: Option<u32>,
    }

    impl RecordingHal {
        fn new() -> Self {
            RecordingHal { regs: DeviceRegArea::default(), halted: false, panicked: false, waited: false, loaded_pc: None }
        }
    }

    impl Hal for RecordingHal {
        fn device_regs(&self) -> &DeviceRegArea {
            &self.regs
        }
        fn device_regs_mut(&mut self) -> &mut DeviceRegArea {
            &mut self.regs
        }
        fn tod_now(&self) -> u64 {
            0
        }
        fn set_plt(&mut self, _micros: u32) {}
        fn set_interval_timer(&mut self, _micros: u32) {}
        fn set_interrupts(&mut self, _on: bool) {}
        fn tlb_clear(&mut self) {}
        fn tlb_write_random(&mut self, _entry_hi: u32, _entry_lo: u32) {}
        fn load_state(&mut self, state: &ProcessorState) -> ! {
            self.loaded_pc = Some(state.pc);
            panic!("test-trap: dispatched pc={:#x}", state.pc);
        }
        fn load_context(&mut self, _ctx: &Context) -> ! {
            panic!("test-trap: load_context");
        }
        fn halt(&mut self) -> ! {
            self.halted = true;
            panic!("test-trap: halt");
        }
        fn panic(&mut self, reason: &str) -> ! {
            self.panicked = true;
            panic!("test-trap: panic: {reason}");
        }
        fn wait(&mut self) {
            self.waited = true;
        }
    }

    #[test]
    #[should_panic(expected = "test-trap: halt")]
    fn empty_ready_queue_with_zero_procs_halts() {
        let mut ctx = KernelContext::new(RecordingHal::new());
        scheduler(&mut ctx);
    }

    #[test]
    #[should_panic(expected = "test-trap: panic")]
    fn empty_ready_queue_with_outstanding_procs_and_no_soft_block_deadlocks() {
        let mut ctx = KernelContext::new(RecordingHal::new());
        ctx.proc_count = 1;
        scheduler(&mut ctx);
    }

    #[test]
    #[should_panic(expected = "dispatched pc=0xcafe")]
    fn ready_process_is_dispatched() {
        let mut ctx = KernelContext::new(RecordingHal::new());
        let pid = ctx.procs.alloc().unwrap();
        ctx.procs.get_mut(pid).state.pc = 0xcafe;
        ctx.procs.insert_tail(&mut ctx.ready, pid);
        ctx.proc_count = 1;
        scheduler(&mut ctx);
    }
}
