//! In-memory `Hal` used by the simulation harness and integration
//! tests. Every device register lives in a plain struct field instead
//! of behind an MMIO address, so assertions can just read them back.

use pandos_kernel::hal::{Context, DeviceRegArea, Hal, ProcessorState};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct MockHal {
    regs: DeviceRegArea,
    tod: AtomicU64,
    pub last_plt_reload: Option<u32>,
    pub last_interval_reload: Option<u32>,
    pub interrupts_enabled: bool,
    pub tlb_cleared_count: u32,
}

impl MockHal {
    pub fn new() -> Self {
        MockHal {
            regs: DeviceRegArea::default(),
            tod: AtomicU64::new(0),
            last_plt_reload: None,
            last_interval_reload: None,
            interrupts_enabled: true,
            tlb_cleared_count: 0,
        }
    }

    /// Advance the simulated time-of-day clock, the way the harness's
    /// driver loop does once per scheduled tick.
    pub fn advance_tod(&self, micros: u64) {
        self.tod.fetch_add(micros, Ordering::Relaxed);
    }

    pub fn set_device_status(&mut self, line: usize, device: usize, status: u32) {
        self.regs.devreg[line][device].status = status;
    }
}

impl Default for MockHal {
    fn default() -> Self {
        Self::new()
    }
}

impl Hal for MockHal {
    fn device_regs(&self) -> &DeviceRegArea {
        &self.regs
    }

    fn device_regs_mut(&mut self) -> &mut DeviceRegArea {
        &mut self.regs
    }

    fn tod_now(&self) -> u64 {
        self.tod.load(Ordering::Relaxed)
    }

    fn set_plt(&mut self, micros: u32) {
        self.last_plt_reload = Some(micros);
    }

    fn set_interval_timer(&mut self, micros: u32) {
        self.last_interval_reload = Some(micros);
    }

    fn set_interrupts(&mut self, on: bool) {
        self.interrupts_enabled = on;
    }

    fn tlb_clear(&mut self) {
        self.tlb_cleared_count += 1;
    }

    fn tlb_write_random(&mut self, _entry_hi: u32, _entry_lo: u32) {}

    fn load_state(&mut self, _state: &ProcessorState) -> ! {
        panic!("MockHal::load_state: the simulation harness drives scenarios by calling kernel handlers directly, not through scheduler()'s dispatch loop");
    }

    fn load_context(&mut self, _ctx: &Context) -> ! {
        panic!("MockHal::load_context: unused by the direct-call simulation harness");
    }

    fn halt(&mut self) -> ! {
        panic!("MockHal::halt: unused by the direct-call simulation harness");
    }

    fn panic(&mut self, reason: &str) -> ! {
        panic!("kernel panic: {reason}");
    }

    fn wait(&mut self) {}
}
