//! # Event Registration
//!
//! Two event kinds live here:
//!
//! - **Periodic events** — zero-argument callbacks invoked directly from
//!   the tick handler at a fixed period. They are not threads: a handler
//!   runs to completion inside the tick and must never call a blocking
//!   primitive. The pool is append-only; no removal operation exists.
//! - **Aperiodic events** — hardware-interrupt handlers bound to an NVIC
//!   line at a chosen priority. The kernel only validates the request
//!   and delegates vector-table and NVIC programming to the port layer.

use crate::arch;
use crate::config::{MAX_IRQ_PRIORITY, MAX_PERIODIC_EVENTS, NVIC_IRQ_LINES};
use crate::errors::{KernelError, KernelResult};
use crate::scheduler::Scheduler;

/// Descriptor for one registered periodic callback.
///
/// Slots form their own circular index ring with slot 0 as the head;
/// since events are never removed the ring simply grows at the back.
pub struct PeriodicEvent {
    /// The callback, `None` for unoccupied slots.
    pub handler: Option<fn()>,

    /// Invocation period in ticks.
    pub period: u32,

    /// Absolute tick of the next invocation; fires on equality with the
    /// pre-advance system time and is rearmed by adding `period`.
    pub next_execute_time: u32,

    /// Ring predecessor (pool slot index).
    pub prev: usize,

    /// Ring successor (pool slot index).
    pub next: usize,
}

impl PeriodicEvent {
    pub const EMPTY: PeriodicEvent = PeriodicEvent {
        handler: None,
        period: 0,
        next_execute_time: 0,
        prev: 0,
        next: 0,
    };
}

impl Scheduler {
    /// Register a periodic event.
    ///
    /// The first invocation lands on the next tick after registration
    /// (for registration before launch: the very first tick, at system
    /// time 0), and every `period` ticks thereafter.
    ///
    /// # Returns
    /// - `Ok(())` on success
    /// - `Err(PeriodicPoolFull)` — all `MAX_PERIODIC_EVENTS` slots are
    ///   taken
    pub fn add_periodic_event(&mut self, handler: fn(), period: u32) -> KernelResult<()> {
        if self.periodic_count == MAX_PERIODIC_EVENTS {
            return Err(KernelError::PeriodicPoolFull);
        }
        let slot = self.periodic_count;
        if slot == 0 {
            self.periodic[slot].next = slot;
            self.periodic[slot].prev = slot;
        } else {
            // Append at the back of the ring, just before the head.
            let last = slot - 1;
            self.periodic[0].prev = slot;
            self.periodic[last].next = slot;
            self.periodic[slot].prev = last;
            self.periodic[slot].next = 0;
        }
        self.periodic[slot].handler = Some(handler);
        self.periodic[slot].period = period;
        self.periodic[slot].next_execute_time = self.system_time;
        self.periodic_count += 1;
        Ok(())
    }

    /// Bind an interrupt handler to a hardware interrupt line.
    ///
    /// Validates the line and priority, then hands the binding to the
    /// platform interrupt controller: the handler is written into the
    /// RAM-relocated vector table and the line is prioritized and
    /// enabled. Out-of-range values are reported, never clamped.
    ///
    /// # Returns
    /// - `Ok(())` on success
    /// - `Err(InvalidIrq)` — `irq` is not a device interrupt line
    /// - `Err(InvalidIrqPriority)` — `priority` is reserved for the
    ///   kernel's own exceptions
    pub fn add_aperiodic_event(
        &mut self,
        handler: extern "C" fn(),
        priority: u8,
        irq: u8,
    ) -> KernelResult<()> {
        if irq as usize >= NVIC_IRQ_LINES {
            return Err(KernelError::InvalidIrq(irq));
        }
        if priority > MAX_IRQ_PRIORITY {
            return Err(KernelError::InvalidIrqPriority(priority));
        }
        arch::install_irq_handler(irq, handler, priority);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
