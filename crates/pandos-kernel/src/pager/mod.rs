//! The support level's page-fault handler and backing-store I/O
//! (`phase3/vmSupport.c`, spec.md §5).
//!
//! The shared swap pool is a FIFO cache over a set of flash-backed
//! virtual pages: `next_frame` advances by one (mod `MAX_FRAME_COUNT`)
//! every time a fault needs a fresh frame, exactly like the reference
//! `pageReplacementAlgorithm`'s static counter — kept here as a
//! `KernelContext` field instead, since Design Notes §9 rules out
//! function-local statics as disguised global state.
//!
//! Simplification versus the reference implementation: there the swap
//! mutex's P can genuinely suspend the faulting process mid-handler and
//! let the scheduler run something else until V wakes it back up. This
//! crate has no stackful-coroutine mechanism to suspend a Rust function
//! and resume it later with the same locals intact, so the swap mutex
//! here only provides the bookkeeping a caller needs to serialize
//! fault handling itself (e.g. one fault at a time in the test
//! harness); true preemption mid-fault is out of scope.

use crate::config::{EMPTY_FRAME_ASID, MAX_FRAME_COUNT};
use crate::context::KernelContext;
use crate::error::{KernelError, Result};
use crate::hal::Hal;
use crate::support::SupportStruct;

/// One physical frame's current occupant, or empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapPoolEntry {
    pub asid: i32,
    pub vpn: u32,
}

impl SwapPoolEntry {
    pub const fn empty() -> Self {
        SwapPoolEntry { asid: EMPTY_FRAME_ASID, vpn: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.asid == EMPTY_FRAME_ASID
    }
}

/// Pick the next frame to use, per the FIFO replacement policy
/// (spec.md §5). Always succeeds — once every frame has been used once,
/// it just starts evicting in the same round-robin order.
pub fn select_victim_frame<H: Hal>(ctx: &mut KernelContext<H>) -> usize {
    let frame = ctx.next_frame;
    ctx.next_frame = (ctx.next_frame + 1) % MAX_FRAME_COUNT;
    frame
}

/// Service a TLB-invalid exception: bring `vpn` in for `support`,
/// evicting whatever currently occupies the chosen frame first if
/// necessary (`vmTlbHandler`, spec.md §5 steps 1-9).
pub fn handle_page_fault<H: Hal>(ctx: &mut KernelContext<H>, support_idx: u16, vpn: usize) -> Result<()> {
    let frame = select_victim_frame(ctx);
    let victim = ctx.frames[frame];

    if !victim.is_empty() {
        evict(ctx, frame, victim)?;
    }

    let support = ctx.supports[support_idx as usize]
        .as_mut()
        .expect("page fault against an unregistered support structure");
    flash_read(&mut ctx.hal, support.asid, vpn as u32, frame)?;

    support.page_table[vpn].map(frame as u32);
    ctx.hal.tlb_clear();
    ctx.frames[frame] = SwapPoolEntry { asid: support.asid as i32, vpn: vpn as u32 };
    Ok(())
}

/// Write a dirty victim frame back to its owner's backing store and
/// invalidate the page table entry that mapped it, atomically with
/// respect to the TLB (spec.md §5 step 3's ordering guarantee).
fn evict<H: Hal>(ctx: &mut KernelContext<H>, frame: usize, victim: SwapPoolEntry) -> Result<()> {
    if let Some(owner) = owning_support_mut(ctx, victim.asid) {
        owner.page_table[victim.vpn as usize].unmap();
    }
    ctx.hal.tlb_clear();
    flash_write(&mut ctx.hal, victim.asid as u8, victim.vpn, frame)
}

fn owning_support_mut<H: Hal>(ctx: &mut KernelContext<H>, asid: i32) -> Option<&mut SupportStruct> {
    ctx.supports.iter_mut().flatten().find(|s| s.asid as i32 == asid)
}

/// Flash device read protocol: write the frame's RAM address into
/// DATA0, issue a `READBLK` command for the page's block number, then
/// SYS5-style wait for the ack (`flashOperation`, spec.md §5 step 2).
fn flash_read<H: Hal>(hal: &mut H, asid: u8, vpn: u32, frame: usize) -> Result<()> {
    flash_operation(hal, asid, vpn, frame, crate::config::device_command::READ_BLOCK)
}

fn flash_write<H: Hal>(hal: &mut H, asid: u8, vpn: u32, frame: usize) -> Result<()> {
    flash_operation(hal, asid, vpn, frame, crate::config::device_command::WRITE_BLOCK)
}

fn flash_operation<H: Hal>(hal: &mut H, asid: u8, vpn: u32, frame: usize, command: u32) -> Result<()> {
    use crate::config::{device_command::BLOCK_NUM_SHIFT, device_status, LINE_FLASH};
    let dev = asid as usize;
    if dev >= crate::config::DEV_PER_INT {
        return Err(KernelError::BadDeviceIndex);
    }
    let regs = hal.device_regs_mut();
    let line_idx = LINE_FLASH - crate::config::LINE_OFFSET;
    regs.devreg[line_idx][dev].data0 = frame as u32;
    regs.devreg[line_idx][dev].command = command | (vpn << BLOCK_NUM_SHIFT);
    let status = regs.devreg[line_idx][dev].status;
    if status & device_status::STATUS_ON_MASK != device_status::READY {
        return Err(KernelError::DeviceFault(status));
    }
    Ok(())
}

/// TLB-refill stub for the other 90% of TLB misses — the page is
/// already in a frame, just not in the TLB; reload it directly
/// (`uTLB_RefillHandler`, spec.md §5 — "the common path").
pub fn tlb_refill<H: Hal>(hal: &mut H, entry_hi: u32, support: &SupportStruct, vpn: usize) -> Result<()> {
    let pte = support.page_table[vpn];
    if !pte.is_valid() {
        return Err(KernelError::TlbModification);
    }
    hal.tlb_write_random(entry_hi, pte.entry_lo);
    Ok(())
}
