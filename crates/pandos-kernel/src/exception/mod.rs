//! Exception classification and the pass-up-or-die delegation shared by
//! every trap the nucleus does not fully handle itself
//! (`phase2/exceptions.c`, spec.md §4.3, §4.7).

use crate::config::exception_code;
use crate::context::KernelContext;
use crate::hal::{Hal, ProcessorState};
use crate::process::Pid;

/// Which of the four dispatch buckets a saved Cause register falls
/// into — a tagged enum standing in for the reference switch on a raw
/// exception code (Design Notes §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    Interrupt,
    TlbFault,
    Syscall,
    ProgramTrap,
}

/// Extract the exception code (Cause bits 2-6) and classify it.
/// `match`-based, so there is no numeric fall-through to miss
/// (spec.md §4.3's resolved "switch fall-through" open question).
pub fn classify(cause: u32) -> ExceptionKind {
    let code = (cause >> 2) & 0x1F;
    match code {
        exception_code::INTERRUPT => ExceptionKind::Interrupt,
        exception_code::TLB_MIN..=exception_code::TLB_MAX => ExceptionKind::TlbFault,
        exception_code::SYSCALL => ExceptionKind::Syscall,
        _ => ExceptionKind::ProgramTrap,
    }
}

/// Advance past the `SYSCALL`/faulting instruction before it is
/// possible to resume, so a retried or passed-up process does not
/// re-trap on the same instruction (spec.md §4.4's pre-check).
pub fn advance_pc(state: &mut ProcessorState) {
    state.pc = state.pc.wrapping_add(4);
}

/// Deliver a delegated exception to `pid`'s support-level handler, or
/// kill the process (and its subtree) if it never registered one
/// (`phase2/exceptions.c`'s `passUpOrDie`, spec.md §4.7).
///
/// Returns `true` if delegation happened (the saved state now lives in
/// the support structure for the support level to resume from);
/// `false` if the process was killed outright and the scheduler must
/// be re-entered.
pub fn pass_up_or_die<H: Hal>(ctx: &mut KernelContext<H>, pid: Pid, slot: usize, state: ProcessorState) -> bool {
    let support_idx = ctx.procs.get(pid).support;
    match support_idx.and_then(|i| ctx.supports[i as usize].as_mut()) {
        Some(support) => {
            support.exc_state[slot] = state;
            true
        }
        None => {
            crate::syscall::terminate(ctx, pid);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_buckets_match_cause_codes() {
        assert_eq!(classify(0 << 2), ExceptionKind::Interrupt);
        assert_eq!(classify(1 << 2), ExceptionKind::TlbFault);
        assert_eq!(classify(3 << 2), ExceptionKind::TlbFault);
        assert_eq!(classify(8 << 2), ExceptionKind::Syscall);
        assert_eq!(classify(4 << 2), ExceptionKind::ProgramTrap);
        assert_eq!(classify(10 << 2), ExceptionKind::ProgramTrap);
    }

    #[test]
    fn advance_pc_steps_past_the_trapping_instruction() {
        let mut state = ProcessorState::default();
        state.pc = 0x8000_0100;
        advance_pc(&mut state);
        assert_eq!(state.pc, 0x8000_0104);
    }
}
