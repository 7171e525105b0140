//! Hardware façade.
//!
//! The bus/device register area, the BIOS pass-up vector, the TLB
//! instructions, and the LDST/LDCXT context-switch primitives are all
//! owned by the UMPS3 emulator, not by this kernel (spec.md §1 names the
//! emulator and its BIOS out of scope). Design Notes §9 asks for this
//! boundary to be a thin trait, with one implementation bound to the
//! real MMIO addresses and another for deterministic unit tests. This
//! module is that trait plus the plain-data types that cross it.

pub mod mmio;

use crate::config::{DEV_INT_NUM, DEV_PER_INT};

/// A MIPS-style saved processor state (`state_t` in the reference
/// header): EntryHi, Cause, Status, PC, and 31 general-purpose
/// registers. Named-register accessors mirror the `s_a0`..`s_ra`
/// aliases `h/types.h` defines over `s_reg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorState {
    pub entry_hi: u32,
    pub cause: u32,
    pub status: u32,
    pub pc: u32,
    pub reg: [u32; 31],
}

impl Default for ProcessorState {
    fn default() -> Self {
        ProcessorState { entry_hi: 0, cause: 0, status: 0, pc: 0, reg: [0; 31] }
    }
}

// Register indices within `reg`, matching `h/types.h`'s `s_reg` aliases.
pub const REG_V0: usize = 1;
pub const REG_A0: usize = 3;
pub const REG_A1: usize = 4;
pub const REG_A2: usize = 5;
pub const REG_A3: usize = 6;
pub const REG_SP: usize = 26;

impl ProcessorState {
    pub fn v0(&self) -> u32 {
        self.reg[REG_V0]
    }
    pub fn set_v0(&mut self, v: u32) {
        self.reg[REG_V0] = v;
    }
    pub fn a0(&self) -> u32 {
        self.reg[REG_A0]
    }
    pub fn a1(&self) -> u32 {
        self.reg[REG_A1]
    }
    pub fn a2(&self) -> u32 {
        self.reg[REG_A2]
    }
    pub fn a3(&self) -> u32 {
        self.reg[REG_A3]
    }
}

/// A process's saved kernel-entry context for pass-up resumption
/// (`context_t`): stack pointer, status, PC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Context {
    pub stack_ptr: u32,
    pub status: u32,
    pub pc: u32,
}

/// One (status, command, data0, data1) device register block. For
/// terminals, data0/data1 alias to receiver/transmitter status/command
/// (`h/types.h`'s `t_recv_*`/`t_transm_*`).
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceRegister {
    pub status: u32,
    pub command: u32,
    pub data0: u32,
    pub data1: u32,
}

/// The bus register area this kernel consumes: RAM geometry, the
/// interval timer/TOD, per-line pending-interrupt bitmaps, and the
/// 40 device register blocks (`devregarea_t`).
#[derive(Debug, Clone)]
pub struct DeviceRegArea {
    pub ram_base: u32,
    pub ram_size: u32,
    pub interrupt_pending: [u32; DEV_INT_NUM],
    pub devreg: [[DeviceRegister; DEV_PER_INT]; DEV_INT_NUM],
}

impl Default for DeviceRegArea {
    fn default() -> Self {
        DeviceRegArea {
            ram_base: 0,
            ram_size: 0,
            interrupt_pending: [0; DEV_INT_NUM],
            devreg: [[DeviceRegister::default(); DEV_PER_INT]; DEV_INT_NUM],
        }
    }
}

/// Hardware façade. One call transfers control and never returns
/// (`load_state`/`halt`/`panic`) — modeled as `-> !` so callers cannot
/// accidentally fall through past a context switch, matching the
/// reference `LDST`/`HALT`/`PANIC` BIOS primitives.
pub trait Hal {
    fn device_regs(&self) -> &DeviceRegArea;
    fn device_regs_mut(&mut self) -> &mut DeviceRegArea;

    /// Current time-of-day clock, in microseconds since an arbitrary
    /// epoch fixed at boot.
    fn tod_now(&self) -> u64;

    /// Reload the Processor Local Timer with the given number of
    /// microseconds until the next quantum-expiry interrupt.
    fn set_plt(&mut self, micros: u32);

    /// Reload the system-wide interval timer (pseudo-clock source).
    fn set_interval_timer(&mut self, micros: u32);

    /// Toggle interrupts for the current processor state. Used to
    /// bracket the command-write/SYS5-wait pairs that must appear
    /// atomic to the interrupt subsystem (spec.md §4.5's atomicity
    /// rule, §4.7 steps 5/8).
    fn set_interrupts(&mut self, on: bool);

    /// Invalidate the entire TLB. Called immediately after any
    /// page-table mutation that could leave a stale cached entry
    /// (spec.md §5 ordering guarantee).
    fn tlb_clear(&mut self);

    /// Write a (EntryHi, EntryLo) pair into a TLB slot chosen by the
    /// hardware's random-replacement policy (used by the TLB-refill
    /// stub, spec.md §4.7).
    fn tlb_write_random(&mut self, entry_hi: u32, entry_lo: u32);

    /// Resume execution with the given processor state loaded
    /// (`LDST`). Never returns.
    fn load_state(&mut self, state: &ProcessorState) -> !;

    /// Resume a support-level handler via its saved context
    /// (`LDCXT`). Never returns.
    fn load_context(&mut self, ctx: &Context) -> !;

    /// Clean machine shutdown: process_count reached zero.
    fn halt(&mut self) -> !;

    /// Fatal kernel-invariant violation (deadlock, PLT interrupt with
    /// no current process).
    fn panic(&mut self, reason: &str) -> !;

    /// Idle the processor with interrupts enabled and the PLT disabled,
    /// waiting for the next interrupt (spec.md §4.2's "wait state").
    fn wait(&mut self);
}
