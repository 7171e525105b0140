//! Process store: the fixed pool of process control blocks, the process
//! queues built over it, and the process tree (spec.md §3, §4.1).
//!
//! Per Design Notes §9 ("arena + index over pointer soup"), every PCB
//! lives in one fixed-size array owned by `ProcessStore`; all of the
//! pointer fields `pcb_t` carries in the reference header become
//! `Option<Pid>` indices into that array. This dissolves the cyclic
//! ownership the native pointer-based queues/trees would otherwise
//! require.

use crate::config::MAX_PROC;
use crate::hal::ProcessorState;
use crate::sem::SemKey;

/// Index into the fixed PCB pool. `Pid(0)` is a valid process — there is
/// no reserved sentinel value; absence is always `Option<Pid>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(u16);

impl Pid {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Expose the raw slot number for callers (SYS1's return value, test
/// harnesses) that need a stable, printable process handle without
/// reaching into `ProcessStore`.
pub fn pid_raw(pid: Pid) -> u16 {
    pid.0
}

/// Process control block. Field grouping mirrors `pcb_t` in the
/// reference header: queue links, tree links, then process status.
#[derive(Debug, Clone)]
pub struct Pcb {
    // Process-queue membership (doubly-linked, circular; spec.md §3).
    next: Option<Pid>,
    prev: Option<Pid>,

    // Process-tree membership (parent has first child; siblings form a
    // doubly-linked, non-circular list).
    parent: Option<Pid>,
    child: Option<Pid>,
    next_sib: Option<Pid>,
    prev_sib: Option<Pid>,

    /// Saved processor state, scrubbed to all-zero on every allocation.
    pub state: ProcessorState,
    /// Accumulated CPU time charged to this process, in microseconds.
    pub cpu_time: u64,
    /// Semaphore this process is blocked on, if any.
    pub sem_addr: Option<SemKey>,
    /// Support-level structure index, if this process has one.
    pub support: Option<u16>,

    allocated: bool,
}

impl Default for Pcb {
    fn default() -> Self {
        Pcb {
            next: None,
            prev: None,
            parent: None,
            child: None,
            next_sib: None,
            prev_sib: None,
            state: ProcessorState::default(),
            cpu_time: 0,
            sem_addr: None,
            support: None,
            allocated: false,
        }
    }
}

/// Tail-pointer handle to a doubly-linked circular process queue. Empty
/// when `None`; the head is the tail's successor (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcQueue(Option<Pid>);

impl ProcQueue {
    pub const fn empty() -> Self {
        ProcQueue(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

/// Fixed pool of `MAX_PROC` PCBs plus their free list, and the
/// queue/tree operations defined over indices into it.
///
/// Grounded on `phase1/pcb.c`'s `allocPcb`/`freePcb` (stack-based free
/// list, full field scrub on alloc) and its process-queue/tree
/// operations, translated from pointer splicing to index splicing.
pub struct ProcessStore {
    pcbs: [Pcb; MAX_PROC],
    free_head: Option<Pid>,
}

impl ProcessStore {
    pub fn new() -> Self {
        let mut pcbs: [Pcb; MAX_PROC] = core::array::from_fn(|_| Pcb::default());
        // Stack the free list through `next`, index 0 on top, matching
        // `initPcbs`'s single static array walk.
        for i in 0..MAX_PROC {
            pcbs[i].next = if i + 1 < MAX_PROC { Some(Pid(i as u16 + 1)) } else { None };
        }
        ProcessStore { pcbs, free_head: Some(Pid(0)) }
    }

    pub fn get(&self, pid: Pid) -> &Pcb {
        &self.pcbs[pid.index()]
    }

    pub fn get_mut(&mut self, pid: Pid) -> &mut Pcb {
        &mut self.pcbs[pid.index()]
    }

    /// `allocPcb`: pop the free list, scrub every field, return the new
    /// PCB's index. `None` when the pool is exhausted (SYS1 failure).
    pub fn alloc(&mut self) -> Option<Pid> {
        let pid = self.free_head?;
        let next_free = self.pcbs[pid.index()].next;
        self.free_head = next_free;
        self.pcbs[pid.index()] = Pcb { allocated: true, ..Pcb::default() };
        Some(pid)
    }

    /// `freePcb`: push back onto the free list. Caller must have already
    /// removed `pid` from any queue/tree it belonged to.
    pub fn free(&mut self, pid: Pid) {
        debug_assert!(self.pcbs[pid.index()].allocated);
        self.pcbs[pid.index()].allocated = false;
        self.pcbs[pid.index()].next = self.free_head;
        self.free_head = Some(pid);
    }

    // ---- process queue operations (phase1/pcb.c: insertProcQ et al.) ----

    pub fn queue_is_empty(&self, q: &ProcQueue) -> bool {
        q.is_empty()
    }

    pub fn insert_tail(&mut self, q: &mut ProcQueue, pid: Pid) {
        match q.0 {
            None => {
                self.pcbs[pid.index()].next = Some(pid);
                self.pcbs[pid.index()].prev = Some(pid);
            }
            Some(tail) => {
                let head = self.pcbs[tail.index()].next.unwrap();
                self.pcbs[pid.index()].next = Some(head);
                self.pcbs[pid.index()].prev = Some(tail);
                self.pcbs[tail.index()].next = Some(pid);
                self.pcbs[head.index()].prev = Some(pid);
            }
        }
        q.0 = Some(pid);
    }

    pub fn head(&self, q: &ProcQueue) -> Option<Pid> {
        q.0.map(|tail| self.pcbs[tail.index()].next.unwrap())
    }

    /// Remove and return the head of the queue (FIFO order).
    pub fn remove_head(&mut self, q: &mut ProcQueue) -> Option<Pid> {
        let tail = q.0?;
        let head = self.pcbs[tail.index()].next.unwrap();
        if head == tail {
            q.0 = None;
        } else {
            let new_head = self.pcbs[head.index()].next.unwrap();
            self.pcbs[tail.index()].next = Some(new_head);
            self.pcbs[new_head.index()].prev = Some(tail);
        }
        self.pcbs[head.index()].next = None;
        self.pcbs[head.index()].prev = None;
        Some(head)
    }

    /// Remove an arbitrary member of the queue (O(n), spec.md §4.1).
    pub fn remove(&mut self, q: &mut ProcQueue, pid: Pid) -> Option<Pid> {
        let tail = q.0?;
        // Walk from head looking for pid, matching outProcQ's linear scan.
        let mut cur = self.pcbs[tail.index()].next.unwrap();
        loop {
            if cur == pid {
                if cur == tail && self.pcbs[cur.index()].next == Some(cur) {
                    // sole member
                    q.0 = None;
                } else {
                    let prev = self.pcbs[cur.index()].prev.unwrap();
                    let next = self.pcbs[cur.index()].next.unwrap();
                    self.pcbs[prev.index()].next = Some(next);
                    self.pcbs[next.index()].prev = Some(prev);
                    if tail == cur {
                        q.0 = Some(prev);
                    }
                }
                self.pcbs[cur.index()].next = None;
                self.pcbs[cur.index()].prev = None;
                return Some(cur);
            }
            if cur == tail {
                return None;
            }
            cur = self.pcbs[cur.index()].next.unwrap();
        }
    }

    // ---- process tree operations (phase1/pcb.c: insertChild et al.) ----

    pub fn has_children(&self, pid: Pid) -> bool {
        self.pcbs[pid.index()].child.is_some()
    }

    pub fn insert_child(&mut self, parent: Pid, child: Pid) {
        let first = self.pcbs[parent.index()].child;
        self.pcbs[child.index()].parent = Some(parent);
        self.pcbs[child.index()].next_sib = first;
        self.pcbs[child.index()].prev_sib = None;
        if let Some(first) = first {
            self.pcbs[first.index()].prev_sib = Some(child);
        }
        self.pcbs[parent.index()].child = Some(child);
    }

    /// Remove and return the first child, or `None` if childless
    /// (`removeChild`).
    pub fn remove_first_child(&mut self, parent: Pid) -> Option<Pid> {
        let child = self.pcbs[parent.index()].child?;
        self.detach_child(child);
        Some(child)
    }

    /// Remove an arbitrary child in O(1) given its own index, without
    /// walking the sibling list (`outChild`, spec.md §4.1).
    pub fn detach_child(&mut self, pid: Pid) -> Option<Pid> {
        let parent = self.pcbs[pid.index()].parent?;
        let prev = self.pcbs[pid.index()].prev_sib;
        let next = self.pcbs[pid.index()].next_sib;
        match prev {
            Some(prev) => self.pcbs[prev.index()].next_sib = next,
            None => self.pcbs[parent.index()].child = next,
        }
        if let Some(next) = next {
            self.pcbs[next.index()].prev_sib = prev;
        }
        self.pcbs[pid.index()].parent = None;
        self.pcbs[pid.index()].next_sib = None;
        self.pcbs[pid.index()].prev_sib = None;
        Some(parent)
    }

    pub fn parent_of(&self, pid: Pid) -> Option<Pid> {
        self.pcbs[pid.index()].parent
    }
}

impl Default for ProcessStore {
    fn default() -> Self {
        Self::new()
    }
}
