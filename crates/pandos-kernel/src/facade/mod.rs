//! SYS9-13: the user-level system call façade (`phase3/sysSupport.c`,
//! spec.md §6).
//!
//! The reference implementation only finishes SYS9, SYS10, and SYS12 —
//! `sysSupport.c` has no SYS11 (`writeToPrinter`) or SYS13
//! (`readFromTerminal`) at all. Both are originated here, mirroring
//! SYS12's atomic-command-then-status-check structure against the
//! printer/terminal-receiver device instead of the transmitter.
//!
//! Simplification versus the reference implementation: a real SYS11/12
//! blocks on SYS5 between every character, so another process can run
//! while the device is busy. Without a way to suspend and resume a Rust
//! function mid-loop (see `pager`'s module doc for the same caveat),
//! this façade instead treats every device write/read as completing
//! synchronously against whatever status the `Hal` reports right after
//! the command is issued — adequate for a mock `Hal` that models
//! instant completion, not for real hardware timing.

use crate::config::{device_command, device_status, MAX_STR_LEN};
use crate::context::KernelContext;
use crate::error::{KernelError, Result};
use crate::hal::Hal;
use crate::process::Pid;

#[derive(Debug, Clone, Copy)]
pub enum UserCall<'a> {
    TerminateUser,
    GetTod,
    WriteToPrinter(&'a [u8]),
    WriteToTerminal(&'a [u8]),
    ReadFromTerminal,
}

/// Run one façade call on behalf of `pid`. A length violation or
/// device fault self-terminates the caller, matching the reference
/// implementation's "kill the offending process" convention for
/// malformed façade arguments.
pub fn handle<H: Hal>(ctx: &mut KernelContext<H>, pid: Pid, call: UserCall, read_buf: &mut [u8; MAX_STR_LEN]) -> i32 {
    match call {
        UserCall::TerminateUser => {
            crate::syscall::terminate(ctx, pid);
            0
        }
        UserCall::GetTod => {
            let tod = ctx.hal.tod_now();
            ctx.procs.get_mut(pid).state.set_v0(tod as u32);
            0
        }
        UserCall::WriteToPrinter(buf) => match write_device(
            &mut ctx.hal,
            crate::config::LINE_PRINTER,
            asid_of(ctx, pid),
            buf,
            device_command::PRINT_CHAR,
            device_status::READY,
        ) {
            Ok(n) => n as i32,
            Err(_) => {
                crate::syscall::terminate(ctx, pid);
                -1
            }
        },
        UserCall::WriteToTerminal(buf) => match write_device(
            &mut ctx.hal,
            crate::config::LINE_TERMINAL,
            asid_of(ctx, pid),
            buf,
            device_command::TRANSMIT_CHAR,
            device_status::CHAR_TRANSMITTED,
        ) {
            Ok(n) => n as i32,
            Err(_) => {
                crate::syscall::terminate(ctx, pid);
                -1
            }
        },
        UserCall::ReadFromTerminal => match read_terminal(&mut ctx.hal, asid_of(ctx, pid), read_buf) {
            Ok(n) => n as i32,
            Err(_) => {
                crate::syscall::terminate(ctx, pid);
                -1
            }
        },
    }
}

fn asid_of<H: Hal>(ctx: &KernelContext<H>, pid: Pid) -> u8 {
    ctx.procs
        .get(pid)
        .support
        .and_then(|i| ctx.supports[i as usize].as_ref())
        .map(|s| s.asid)
        .unwrap_or(0)
}

fn write_device<H: Hal>(
    hal: &mut H,
    line: usize,
    asid: u8,
    buf: &[u8],
    command: u32,
    expect_status: u32,
) -> Result<usize> {
    if buf.len() > MAX_STR_LEN {
        return Err(KernelError::ProtectionFault);
    }
    let dev = asid as usize;
    if dev >= crate::config::DEV_PER_INT {
        return Err(KernelError::BadDeviceIndex);
    }
    let line_idx = line - crate::config::LINE_OFFSET;
    let mut sent = 0usize;
    for &byte in buf {
        let regs = hal.device_regs_mut();
        regs.devreg[line_idx][dev].command = command | ((byte as u32) << device_command::CHAR_SHIFT);
        let status = regs.devreg[line_idx][dev].status;
        if status & device_status::STATUS_ON_MASK != expect_status {
            return Err(KernelError::DeviceFault(status));
        }
        sent += 1;
    }
    Ok(sent)
}

fn read_terminal<H: Hal>(hal: &mut H, asid: u8, out: &mut [u8; MAX_STR_LEN]) -> Result<usize> {
    let dev = asid as usize;
    if dev >= crate::config::DEV_PER_INT {
        return Err(KernelError::BadDeviceIndex);
    }
    let line_idx = crate::config::LINE_TERMINAL - crate::config::LINE_OFFSET;
    let mut n = 0usize;
    loop {
        let regs = hal.device_regs_mut();
        regs.devreg[line_idx][dev].command = device_command::RECEIVE_CHAR;
        let status = regs.devreg[line_idx][dev].status;
        if status & device_status::STATUS_ON_MASK != device_status::CHAR_RECEIVED {
            return Err(KernelError::DeviceFault(status));
        }
        let ch = (regs.devreg[line_idx][dev].data0 & 0xFF) as u8;
        if n >= MAX_STR_LEN {
            return Err(KernelError::ProtectionFault);
        }
        out[n] = ch;
        n += 1;
        if ch == b'\n' {
            return Ok(n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{Context, DeviceRegArea, ProcessorState};

    struct StubHal {
        regs: DeviceRegArea,
    }
    impl Hal for StubHal {
        fn device_regs(&self) -> &DeviceRegArea {
            &self.regs
        }
        fn device_regs_mut(&mut self) -> &mut DeviceRegArea {
            &mut self.regs
        }
        fn tod_now(&self) -> u64 {
            42
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

    fn transmitting_hal() -> StubHal {
        let mut regs = DeviceRegArea::default();
        for line in regs.devreg.iter_mut() {
            for dev in line.iter_mut() {
                dev.status = device_status::CHAR_TRANSMITTED;
            }
        }
        StubHal { regs }
    }

    #[test]
    fn get_tod_sets_v0() {
        let mut ctx = KernelContext::new(transmitting_hal());
        let pid = ctx.procs.alloc().unwrap();
        let mut scratch = [0u8; MAX_STR_LEN];
        handle(&mut ctx, pid, UserCall::GetTod, &mut scratch);
        assert_eq!(ctx.procs.get(pid).state.v0(), 42);
    }

    #[test]
    fn write_to_terminal_reports_bytes_sent() {
        let mut ctx = KernelContext::new(transmitting_hal());
        let pid = ctx.procs.alloc().unwrap();
        let mut scratch = [0u8; MAX_STR_LEN];
        let n = handle(&mut ctx, pid, UserCall::WriteToTerminal(b"hi"), &mut scratch);
        assert_eq!(n, 2);
    }

    #[test]
    fn write_device_rejects_oversized_payload() {
        let mut ctx = KernelContext::new(transmitting_hal());
        let pid = ctx.procs.alloc().unwrap();
        ctx.proc_count = 1;
        let mut scratch = [0u8; MAX_STR_LEN];
        let big = [b'x'; MAX_STR_LEN + 1];
        let n = handle(&mut ctx, pid, UserCall::WriteToTerminal(&big), &mut scratch);
        assert_eq!(n, -1);
        assert_eq!(ctx.proc_count, 0); // self-terminated
    }
}
