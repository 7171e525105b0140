//! Kernel-internal error type.
//!
//! Pandos syscalls never surface a POSIX errno to callers — each numbered
//! service has its own return-code convention (spec.md §7). `KernelError`
//! exists purely as an internal bookkeeping aid so handlers can propagate
//! a reason with `?` before translating it into the syscall's own
//! negative-status convention at the boundary.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// SYS1 found the PCB free list empty.
    PcbPoolExhausted,
    /// The SEMD free list was exhausted while blocking a process. The
    /// kernel is sized so this cannot happen under well-formed
    /// workloads (spec.md §4.1); callers treat it as fatal.
    SemdPoolExhausted,
    /// A device index computed from (line, device) fell outside the
    /// device-semaphore array.
    BadDeviceIndex,
    /// A flash/terminal/printer device returned a non-ready status.
    DeviceFault(u32),
    /// A user-facade argument violated the address/length contract.
    ProtectionFault,
    /// TLB-modification exception reached the pager (fatal, §4.7 step 1).
    TlbModification,
}

pub type Result<T> = core::result::Result<T, KernelError>;

impl KernelError {
    pub fn as_str(self) -> &'static str {
        match self {
            KernelError::PcbPoolExhausted => "pcb pool exhausted",
            KernelError::SemdPoolExhausted => "semd pool exhausted",
            KernelError::BadDeviceIndex => "bad device index",
            KernelError::DeviceFault(_) => "device fault",
            KernelError::ProtectionFault => "protection fault",
            KernelError::TlbModification => "tlb modification exception",
        }
    }
}
