//! The single place all kernel state lives.
//!
//! Design Notes §9 rules out global mutable statics: every other module
//! operates purely on borrows of a `KernelContext` passed in by the
//! caller, the same way the reference implementation's `.c` files all
//! operate on a handful of externs declared once in `initial.c`. Here
//! those externs become fields, and "declared once" becomes "owned by
//! one value instantiated once at boot."
use crate::config::{MAX_DEVICE_COUNT, MAX_FRAME_COUNT, UPROC_MAX};
use crate::hal::Hal;
use crate::pager::SwapPoolEntry;
use crate::process::{Pid, ProcQueue, ProcessStore};
use crate::sem::{Asl, SemKey, SemKeyKind};
use crate::support::SupportStruct;

/// The plain-integer value behind every semaphore this kernel uses.
/// Split into fixed arrays by [`SemKeyKind`] so no heap map is needed —
/// the reference implementation's equivalent is just a handful of
/// `int`/`int[]` externs (`deviceSemaphores`, `masterSemaphore`, ...).
#[derive(Debug, Clone)]
pub struct SemValues {
    device: [i32; MAX_DEVICE_COUNT],
    device_mutex: [i32; MAX_DEVICE_COUNT],
    swap_mutex: i32,
    master: i32,
}

impl SemValues {
    pub fn new() -> Self {
        SemValues {
            device: [0; MAX_DEVICE_COUNT],
            device_mutex: [1; MAX_DEVICE_COUNT],
            swap_mutex: 1,
            master: 0,
        }
    }

    pub fn get(&self, key: SemKey) -> i32 {
        match key.kind() {
            SemKeyKind::Device(i) => self.device[i],
            SemKeyKind::DeviceMutex(i) => self.device_mutex[i],
            SemKeyKind::SwapMutex => self.swap_mutex,
            SemKeyKind::Master => self.master,
            SemKeyKind::Sentinel => 0,
        }
    }

    pub fn set(&mut self, key: SemKey, value: i32) {
        match key.kind() {
            SemKeyKind::Device(i) => self.device[i] = value,
            SemKeyKind::DeviceMutex(i) => self.device_mutex[i] = value,
            SemKeyKind::SwapMutex => self.swap_mutex = value,
            SemKeyKind::Master => self.master = value,
            SemKeyKind::Sentinel => {}
        }
    }

    pub fn increment(&mut self, key: SemKey) -> i32 {
        let v = self.get(key) + 1;
        self.set(key, v);
        v
    }

    pub fn decrement(&mut self, key: SemKey) -> i32 {
        let v = self.get(key) - 1;
        self.set(key, v);
        v
    }
}

impl Default for SemValues {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the nucleus and support level need, threaded through by
/// reference instead of touched via statics. `H` is the hardware façade
/// in use — `hal::mmio::MmioHal` on the real target, a mock
/// implementation under test.
pub struct KernelContext<H: Hal> {
    pub procs: ProcessStore,
    pub asl: Asl,
    pub sem_values: SemValues,
    /// Ready-to-run queue (spec.md §4.2's round-robin scheduler).
    pub ready: ProcQueue,
    /// Number of started-but-not-yet-terminated processes.
    pub proc_count: u32,
    /// Number of processes blocked on an I/O or pseudo-clock semaphore
    /// (as opposed to blocked on a SYS3 started by another process).
    pub soft_block_count: u32,
    /// The currently-executing process, if any.
    pub current: Option<Pid>,
    /// Swap-pool frame selector: advances monotonically and wraps, per
    /// spec.md §5's FIFO replacement policy.
    pub next_frame: usize,
    /// Fixed pool of support-level structures, one per potential user
    /// process; `Pcb::support` indexes into this.
    pub supports: [Option<SupportStruct>; UPROC_MAX],
    /// Bookkeeping for the shared swap pool's physical frames
    /// (spec.md §5), indexed the same way as `next_frame` advances.
    pub frames: [SwapPoolEntry; MAX_FRAME_COUNT],
    pub hal: H,
}

impl<H: Hal> KernelContext<H> {
    pub fn new(hal: H) -> Self {
        KernelContext {
            procs: ProcessStore::new(),
            asl: Asl::new(),
            sem_values: SemValues::new(),
            ready: ProcQueue::empty(),
            proc_count: 0,
            soft_block_count: 0,
            current: None,
            next_frame: 0,
            supports: core::array::from_fn(|_| None),
            frames: [SwapPoolEntry::empty(); MAX_FRAME_COUNT],
            hal,
        }
    }
}
