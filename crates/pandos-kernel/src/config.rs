//! Compile-time constants mirroring the UMPS3 BIOS/bus layout and the
//! Pandos sizing limits (`h/const.h` in the reference implementation).

/// Page size in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Maximum number of concurrently allocatable processes.
pub const MAX_PROC: usize = 20;

/// Maximum number of user (support-level) processes this instantiator
/// ever launches.
pub const UPROC_MAX: usize = 8;

/// Swap pool size: two frames per user process, per spec.md §3.
pub const MAX_FRAME_COUNT: usize = 2 * UPROC_MAX;

/// Page-table entries per process (§3 Support structure).
pub const ENTRIES_PER_PAGE_TABLE: usize = 32;

/// Number of interrupt lines carrying external devices (lines 3..7).
pub const DEV_INT_NUM: usize = 5;

/// Number of devices per interrupt line.
pub const DEV_PER_INT: usize = 8;

/// Total device semaphores: one per (line, device) pair, plus a second
/// bank of `DEV_PER_INT` semaphores for the terminal line's write side
/// (every other line only ever blocks one way; terminals block
/// separately on read and write, spec.md §4.5), plus one trailing
/// pseudo-clock semaphore.
pub const MAX_DEVICE_COUNT: usize = DEV_INT_NUM * DEV_PER_INT + DEV_PER_INT + 1;

/// Index of the pseudo-clock semaphore within the device-semaphore array.
pub const PSEUDO_CLOCK_INDEX: usize = MAX_DEVICE_COUNT - 1;

/// Base offset subtracted from a device's interrupt line number before
/// it is used to index into the device-semaphore array (lines start at 3).
pub const LINE_OFFSET: usize = 3;

/// Interrupt line carrying disk devices.
pub const LINE_DISK: usize = 3;
/// Interrupt line carrying flash (backing-store) devices.
pub const LINE_FLASH: usize = 4;
/// Interrupt line carrying network devices.
pub const LINE_NETWORK: usize = 5;
/// Interrupt line carrying printer devices.
pub const LINE_PRINTER: usize = 6;
/// Interrupt line carrying terminal devices.
pub const LINE_TERMINAL: usize = 7;

/// Maximum string length accepted by the terminal/printer/read façade
/// calls.
pub const MAX_STR_LEN: usize = 128;

/// Fixed 5ms quantum enforced by the Processor Local Timer, expressed in
/// the same units as the Hal's time-of-day clock (microseconds).
pub const QUANTUM_MICROS: u32 = 5_000;

/// Pseudo-clock / system interval-timer period: 100ms.
pub const PSEUDO_CLOCK_PERIOD_MICROS: u32 = 100_000;

/// Sentinel value used to mark a swap-pool frame as unoccupied.
pub const EMPTY_FRAME_ASID: i32 = -1;

/// Device status/command codes (subset actually consulted by this
/// kernel; mirrors `h/const.h`).
pub mod device_status {
    pub const READY: u32 = 1;
    pub const BUSY: u32 = 3;
    pub const CHAR_TRANSMITTED: u32 = 5;
    pub const CHAR_RECEIVED: u32 = 5;
    pub const STATUS_ON_MASK: u32 = 0x0F;
}

pub mod device_command {
    pub const ACK: u32 = 1;
    pub const READ_BLOCK: u32 = 2;
    pub const WRITE_BLOCK: u32 = 3;
    pub const TRANSMIT_CHAR: u32 = 2;
    pub const RECEIVE_CHAR: u32 = 2;
    pub const PRINT_CHAR: u32 = 2;
    pub const BLOCK_NUM_SHIFT: u32 = 8;
    pub const CHAR_SHIFT: u32 = 8;
}

/// Cause-register exception-code buckets (spec.md §4.3).
pub mod exception_code {
    pub const INTERRUPT: u32 = 0;
    pub const TLB_MOD: u32 = 1;
    pub const TLB_MIN: u32 = 1;
    pub const TLB_MAX: u32 = 3;
    pub const SYSCALL: u32 = 8;
}

/// Map a (interrupt line, device number) pair — and, for terminals,
/// which half of the duplex device — to its slot in the device
/// semaphore array (spec.md §4.5).
pub fn device_sem_index(line: usize, device: usize, term_write: bool) -> Option<usize> {
    if !(LINE_DISK..=LINE_TERMINAL).contains(&line) || device >= DEV_PER_INT {
        return None;
    }
    let base = (line - LINE_OFFSET) * DEV_PER_INT + device;
    Some(if line == LINE_TERMINAL && term_write { base + DEV_PER_INT } else { base })
}

/// Index into `SupportStruct::exc_state`/`exc_context` for the two
/// pass-up slots.
pub mod pass_up_slot {
    pub const PAGE_FAULT: usize = 0;
    pub const GENERAL: usize = 1;
}
