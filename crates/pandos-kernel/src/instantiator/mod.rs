//! Boot sequence: device-semaphore initialization, swap pool setup, and
//! launching the initial batch of user processes (`phase3/initProc.c`,
//! spec.md §7).
//!
//! The reference `instantiatorProcess` is itself a scheduled process
//! (ASID 0) that loops doing `SYS1` once per test program and then
//! blocks on the master semaphore until they have all called `SYS9`.
//! This crate's scheduler already halts once `proc_count` reaches zero
//! (`sched::scheduler`), which is the same terminal condition the
//! master-semaphore wait loop exists to detect, so `boot` just performs
//! the one-time setup and enqueues the user processes directly rather
//! than modeling a separate always-running instantiator process.
//! `sem::SemKey::MASTER` is kept available for callers (or a future
//! process hierarchy) that want the original rendezvous explicitly.

use crate::config::UPROC_MAX;
use crate::context::KernelContext;
use crate::hal::{Hal, ProcessorState};
use crate::support::SupportStruct;

/// Boot the machine: register up to `UPROC_MAX` user processes, one per
/// `states` entry (truncated to whichever is smaller), each with a
/// freshly-initialized support structure and private page table.
/// Returns the number of processes actually launched.
pub fn boot<H: Hal>(ctx: &mut KernelContext<H>, states: &[ProcessorState]) -> usize {
    let n = states.len().min(UPROC_MAX);
    for (i, state) in states.iter().take(n).enumerate() {
        let asid = (i + 1) as u8;
        ctx.supports[i] = Some(SupportStruct::new(asid));
        match ctx.procs.alloc() {
            Some(pid) => {
                ctx.procs.get_mut(pid).state = *state;
                ctx.procs.get_mut(pid).support = Some(i as u16);
                ctx.procs.insert_tail(&mut ctx.ready, pid);
                ctx.proc_count += 1;
            }
            None => break,
        }
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{Context, DeviceRegArea};

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

    #[test]
    fn boot_launches_one_process_per_state_with_distinct_asids() {
        let mut ctx = KernelContext::new(NullHal { regs: DeviceRegArea::default() });
        let states = [ProcessorState::default(), ProcessorState::default(), ProcessorState::default()];
        let launched = boot(&mut ctx, &states);
        assert_eq!(launched, 3);
        assert_eq!(ctx.proc_count, 3);
        assert_eq!(ctx.supports[0].as_ref().unwrap().asid, 1);
        assert_eq!(ctx.supports[2].as_ref().unwrap().asid, 3);
    }

    #[test]
    fn boot_caps_at_uproc_max() {
        let mut ctx = KernelContext::new(NullHal { regs: DeviceRegArea::default() });
        let states = [ProcessorState::default(); UPROC_MAX + 4];
        let launched = boot(&mut ctx, &states);
        assert_eq!(launched, UPROC_MAX);
    }
}
