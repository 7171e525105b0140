//! Semaphore store: the fixed pool of semaphore descriptors (SEMDs) and
//! the Active Semaphore List (ASL) built over it (spec.md §3, §4.1).
//!
//! The reference `phase1/asl.c` draft this is grounded on is itself
//! unfinished and buggy — `removeBlocked`/`outBlocked`/`insertSemaphore`
//! are empty stubs and `findSemaphore`/`insertBlocked` compare against
//! the address of a local parameter instead of the semaphore key, a bug
//! that would make every lookup fail. The *intent* described in that
//! file's comments, together with spec.md §3's invariant ("an SEMD is on
//! the ASL iff its process queue is non-empty") and §8's round-trip law,
//! is what this module actually implements; the stack-based free-list
//! technique is carried over from the sibling (and correct)
//! `phase1/pcb.c`.

use crate::config::MAX_PROC;
use crate::process::{Pid, ProcQueue, ProcessStore};

/// A semaphore's identity. In the reference implementation this is the
/// address of some kernel-owned `int` cell (a device semaphore, the
/// swap-pool mutex, the master semaphore, ...); here it is a small
/// opaque, totally-ordered token playing the same role — the ASL only
/// ever needs to compare keys, never dereference them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemKey(u32);

impl SemKey {
    const MIN: SemKey = SemKey(0);
    const MAX: SemKey = SemKey(u32::MAX);

    /// Nucleus device-semaphore array entry (spec.md §3, indexed by
    /// `(line - 3) * 8 + device`, plus the trailing pseudo-clock slot).
    pub fn device(index: usize) -> SemKey {
        SemKey(0x1000_0000 + index as u32)
    }

    /// Support-level per-device mutual-exclusion semaphore, used by the
    /// pager/façade via SYS3/SYS4 (`phase3/vmSupport.c`'s `mutex`).
    pub fn device_mutex(index: usize) -> SemKey {
        SemKey(0x2000_0000 + index as u32)
    }

    /// The single swap-pool mutex (`phase3/vmSupport.c`'s `swapSem`).
    pub const SWAP_MUTEX: SemKey = SemKey(0x3000_0000);

    /// The instantiator's master semaphore (`phase3/initProc.c`'s
    /// `masterSemaphore`).
    pub const MASTER: SemKey = SemKey(0x3000_0001);

    /// Decode which fixed-size value table (if any) backs this key, so
    /// `SemValues` can hold plain arrays instead of needing a heap map.
    pub fn kind(self) -> SemKeyKind {
        match self.0 {
            n if (0x1000_0000..0x2000_0000).contains(&n) => SemKeyKind::Device((n - 0x1000_0000) as usize),
            n if (0x2000_0000..0x3000_0000).contains(&n) => SemKeyKind::DeviceMutex((n - 0x2000_0000) as usize),
            0x3000_0000 => SemKeyKind::SwapMutex,
            0x3000_0001 => SemKeyKind::Master,
            _ => SemKeyKind::Sentinel,
        }
    }
}

/// Which fixed-size value table a [`SemKey`] indexes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemKeyKind {
    Device(usize),
    DeviceMutex(usize),
    SwapMutex,
    Master,
    /// One of the ASL's own min/max bracket keys; never backed by a
    /// caller-visible integer cell.
    Sentinel,
}

struct Semd {
    key: SemKey,
    queue: ProcQueue,
    next: Option<u16>,
}

/// Sorted singly-linked Active Semaphore List, bracketed by min/max
/// sentinels (spec.md §3, §4.1).
pub struct Asl {
    semds: [Semd; MAX_PROC + 2],
    free_head: Option<u16>,
    head: u16,
}

const HEAD_SENTINEL: u16 = MAX_PROC as u16;
const TAIL_SENTINEL: u16 = MAX_PROC as u16 + 1;

impl Asl {
    pub fn new() -> Self {
        let mut semds: [Semd; MAX_PROC + 2] = core::array::from_fn(|i| Semd {
            key: SemKey::MIN,
            queue: ProcQueue::empty(),
            next: if i + 1 < MAX_PROC { Some(i as u16 + 1) } else { None },
        });
        semds[HEAD_SENTINEL as usize] = Semd { key: SemKey::MIN, queue: ProcQueue::empty(), next: Some(TAIL_SENTINEL) };
        semds[TAIL_SENTINEL as usize] = Semd { key: SemKey::MAX, queue: ProcQueue::empty(), next: None };
        Asl { semds, free_head: Some(0), head: HEAD_SENTINEL }
    }

    fn alloc_semd(&mut self) -> Option<u16> {
        let idx = self.free_head?;
        self.free_head = self.semds[idx as usize].next;
        Some(idx)
    }

    fn free_semd(&mut self, idx: u16) {
        self.semds[idx as usize].next = self.free_head;
        self.free_head = Some(idx);
    }

    /// Find the SEMD for `key`, returning its slot index and the
    /// previous slot (for splicing), or `None` if not present.
    fn find(&self, key: SemKey) -> Option<(u16, u16)> {
        let mut prev = self.head;
        let mut cur = self.semds[prev as usize].next.unwrap();
        loop {
            if self.semds[cur as usize].key == key {
                return Some((cur, prev));
            }
            if self.semds[cur as usize].key > key {
                return None;
            }
            prev = cur;
            cur = self.semds[cur as usize].next.unwrap();
        }
    }

    /// `insertBlocked`: enqueue `pid` on the (possibly newly-allocated)
    /// SEMD for `key`. Returns `false` on SEMD-pool exhaustion when a
    /// new descriptor was required and none was available.
    pub fn insert_blocked(&mut self, procs: &mut ProcessStore, key: SemKey, pid: Pid) -> bool {
        if self.find(key).is_none() {
            let new_idx = match self.alloc_semd() {
                Some(i) => i,
                None => return false,
            };
            // Locate insertion point keeping the list sorted ascending.
            let mut prev = self.head;
            let mut cur = self.semds[prev as usize].next.unwrap();
            while self.semds[cur as usize].key < key {
                prev = cur;
                cur = self.semds[cur as usize].next.unwrap();
            }
            self.semds[new_idx as usize] = Semd { key, queue: ProcQueue::empty(), next: Some(cur) };
            self.semds[prev as usize].next = Some(new_idx);
        }
        let (idx, _) = self.find(key).expect("just inserted");
        procs.insert_tail(&mut self.semds[idx as usize].queue, pid);
        procs.get_mut(pid).sem_addr = Some(key);
        true
    }

    /// `removeBlocked`: pop the head waiter off `key`'s SEMD. If its
    /// queue becomes empty, the SEMD returns to the free list.
    pub fn remove_blocked(&mut self, procs: &mut ProcessStore, key: SemKey) -> Option<Pid> {
        let (idx, prev) = self.find(key)?;
        let pid = procs.remove_head(&mut self.semds[idx as usize].queue)?;
        procs.get_mut(pid).sem_addr = None;
        if procs.queue_is_empty(&self.semds[idx as usize].queue) {
            let next = self.semds[idx as usize].next;
            self.semds[prev as usize].next = next;
            self.free_semd(idx);
        }
        Some(pid)
    }

    /// `outBlocked`: remove `pid` from whatever semaphore queue it is
    /// on, given only `pid` (its `sem_addr` names the key). Returns
    /// `None` if `pid` is not actually blocked.
    pub fn out_blocked(&mut self, procs: &mut ProcessStore, pid: Pid) -> Option<Pid> {
        let key = procs.get(pid).sem_addr?;
        let (idx, prev) = self.find(key)?;
        let removed = procs.remove(&mut self.semds[idx as usize].queue, pid)?;
        procs.get_mut(removed).sem_addr = None;
        if procs.queue_is_empty(&self.semds[idx as usize].queue) {
            let next = self.semds[idx as usize].next;
            self.semds[prev as usize].next = next;
            self.free_semd(idx);
        }
        Some(removed)
    }

    /// `headBlocked`: peek the head waiter without removing it.
    pub fn head_blocked(&self, procs: &ProcessStore, key: SemKey) -> Option<Pid> {
        let (idx, _) = self.find(key)?;
        procs.head(&self.semds[idx as usize].queue)
    }

    pub fn is_active(&self, key: SemKey) -> bool {
        self.find(key).is_some()
    }
}

impl Default for Asl {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_remove_round_trips() {
        let mut procs = ProcessStore::new();
        let mut asl = Asl::new();
        let p = procs.alloc().unwrap();
        let key = SemKey::device(4);
        assert!(asl.insert_blocked(&mut procs, key, p));
        assert!(asl.is_active(key));
        let popped = asl.remove_blocked(&mut procs, key).unwrap();
        assert_eq!(popped, p);
        // queue emptied -> SEMD returned to free list
        assert!(!asl.is_active(key));
    }

    #[test]
    fn semd_active_iff_queue_nonempty() {
        let mut procs = ProcessStore::new();
        let mut asl = Asl::new();
        let a = procs.alloc().unwrap();
        let b = procs.alloc().unwrap();
        let key = SemKey::device(1);
        asl.insert_blocked(&mut procs, key, a);
        asl.insert_blocked(&mut procs, key, b);
        assert!(asl.is_active(key));
        asl.remove_blocked(&mut procs, key);
        assert!(asl.is_active(key)); // b still waiting
        asl.remove_blocked(&mut procs, key);
        assert!(!asl.is_active(key));
    }

    #[test]
    fn out_blocked_removes_arbitrary_waiter() {
        let mut procs = ProcessStore::new();
        let mut asl = Asl::new();
        let a = procs.alloc().unwrap();
        let b = procs.alloc().unwrap();
        let c = procs.alloc().unwrap();
        let key = SemKey::device(2);
        asl.insert_blocked(&mut procs, key, a);
        asl.insert_blocked(&mut procs, key, b);
        asl.insert_blocked(&mut procs, key, c);
        let removed = asl.out_blocked(&mut procs, b);
        assert_eq!(removed, Some(b));
        assert_eq!(asl.remove_blocked(&mut procs, key), Some(a));
        assert_eq!(asl.remove_blocked(&mut procs, key), Some(c));
    }

    #[test]
    fn multiple_semaphores_stay_sorted_and_independent() {
        let mut procs = ProcessStore::new();
        let mut asl = Asl::new();
        let a = procs.alloc().unwrap();
        let b = procs.alloc().unwrap();
        asl.insert_blocked(&mut procs, SemKey::device(5), a);
        asl.insert_blocked(&mut procs, SemKey::device(2), b);
        assert_eq!(asl.remove_blocked(&mut procs, SemKey::device(2)), Some(b));
        assert_eq!(asl.remove_blocked(&mut procs, SemKey::device(5)), Some(a));
    }
}
