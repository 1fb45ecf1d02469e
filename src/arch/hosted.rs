//! # Hosted Port Stub
//!
//! Substitute port for non-ARM builds, used to unit-test the kernel's
//! state machines on the host. Context switches cannot actually happen
//! here; a pend is recorded and otherwise ignored, so a "blocking" call
//! simply returns with the blocked/asleep state visible to assertions.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::config::STACK_WORDS;
use crate::thread::ThreadControlBlock;

static PENDED_SWITCHES: AtomicUsize = AtomicUsize::new(0);

pub fn init() {}

/// Record a context-switch request.
pub fn pend_context_switch() {
    PENDED_SWITCHES.fetch_add(1, Ordering::Relaxed);
}

/// Total switch requests recorded so far (diagnostics only — the
/// counter is process-global and tests run concurrently).
pub fn pended_switches() -> usize {
    PENDED_SWITCHES.load(Ordering::Relaxed)
}

/// Lay down the same 16-word frame shape as the target port, so tests
/// see a plausible saved-context cursor. The frame is never executed.
pub fn init_thread_stack(tcb: &mut ThreadControlBlock, entry: extern "C" fn() -> !) {
    let frame = STACK_WORDS - 16;
    for word in tcb.stack.0[frame..].iter_mut() {
        *word = 0;
    }
    // PC slot; fn pointers are wider than a word on 64-bit hosts.
    tcb.stack.0[STACK_WORDS - 2] = entry as usize as u32;
    tcb.stack.0[STACK_WORDS - 1] = 0x0100_0000;
    tcb.stack_pointer = tcb.stack.0[frame..].as_mut_ptr();
}

/// Aperiodic registration has no hardware to program on the host.
pub fn install_irq_handler(_irq: u8, _handler: extern "C" fn(), _priority: u8) {}
