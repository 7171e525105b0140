//! Support-level per-process state (`support_t`, spec.md §3's "Support
//! structure"): the pass-up landing pad for SYS9-13 and for the two
//! delegable exception classes (TLB faults, everything else), plus the
//! process's private page table.

use crate::config::pass_up_slot::{GENERAL, PAGE_FAULT};
use crate::config::ENTRIES_PER_PAGE_TABLE;
use crate::hal::{Context, ProcessorState};

/// EntryHi/EntryLo bit layout helpers. Bit positions mirror `h/const.h`:
/// EntryLo bit 10 is Global, bit 9 is Dirty (writable), bit 8 is Valid.
const ENTRYLO_GLOBAL: u32 = 1 << 10;
const ENTRYLO_DIRTY: u32 = 1 << 9;
const ENTRYLO_VALID: u32 = 1 << 8;
const ENTRYLO_PFN_SHIFT: u32 = 12;
const ENTRYHI_VPN_SHIFT: u32 = 12;
const ENTRYHI_ASID_SHIFT: u32 = 6;

/// One private page-table entry. `entry_hi` carries VPN (and ASID for
/// the TLB's sake); `entry_lo` carries PFN plus the V/D/G bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageTableEntry {
    pub entry_hi: u32,
    pub entry_lo: u32,
}

impl PageTableEntry {
    pub fn new(vpn: u32, asid: u8) -> Self {
        PageTableEntry {
            entry_hi: (vpn << ENTRYHI_VPN_SHIFT) | ((asid as u32) << ENTRYHI_ASID_SHIFT),
            entry_lo: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.entry_lo & ENTRYLO_VALID != 0
    }

    pub fn frame(&self) -> u32 {
        self.entry_lo >> ENTRYLO_PFN_SHIFT
    }

    /// Point this entry at `frame` and mark it valid/dirty (every user
    /// page in Pandos is writable once mapped, spec.md §5).
    pub fn map(&mut self, frame: u32) {
        self.entry_lo = (frame << ENTRYLO_PFN_SHIFT) | ENTRYLO_DIRTY | ENTRYLO_VALID | ENTRYLO_GLOBAL;
    }

    pub fn unmap(&mut self) {
        self.entry_lo = 0;
    }
}

/// Support-level structure (`support_t`). One per user process, handed
/// to SYS1 as the `support` argument and retrieved via SYS8.
pub struct SupportStruct {
    pub asid: u8,
    /// Saved state at the moment of the delegated exception, indexed by
    /// [`PAGE_FAULT`] / [`GENERAL`].
    pub exc_state: [ProcessorState; 2],
    /// Resumption context for the corresponding handler.
    pub exc_context: [Context; 2],
    pub page_table: [PageTableEntry; ENTRIES_PER_PAGE_TABLE],
}

impl SupportStruct {
    pub fn new(asid: u8) -> Self {
        let page_table = core::array::from_fn(|i| PageTableEntry::new(i as u32, asid));
        SupportStruct {
            asid,
            exc_state: [ProcessorState::default(); 2],
            exc_context: [Context::default(); 2],
            page_table,
        }
    }

    pub fn page_fault_context(&self) -> &Context {
        &self.exc_context[PAGE_FAULT]
    }

    pub fn general_context(&self) -> &Context {
        &self.exc_context[GENERAL]
    }
}
