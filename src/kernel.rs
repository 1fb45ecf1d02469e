//! # Kernel
//!
//! Top-level kernel initialization and the public API. This module owns
//! the single global [`Scheduler`] instance and is the only surface the
//! application layer (drivers, threads) consumes: thread lifecycle,
//! semaphores, sleep, event registration, and the FIFO channels. Every
//! public function runs inside the critical-section guard.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()                ← Reset state, relocate vectors
//!         ├─► kernel::add_thread()          ← Register threads (×N, incl. idle)
//!         ├─► kernel::add_periodic_event()  ← Optional periodic callbacks
//!         └─► kernel::launch()              ← Start preemption (no return)
//!               ├─► Configure SysTick (1 kHz)
//!               ├─► Set SysTick/PendSV priorities
//!               └─► Switch into the best-priority thread
//! ```

use crate::errors::{KernelError, KernelResult};
use crate::scheduler::Scheduler;
use crate::semaphore::Semaphore;
use crate::sync;
use crate::thread::ThreadId;

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

/// Global scheduler instance.
///
/// # Safety
/// Accessed via `SCHEDULER_PTR`, which is set during `init()`. All
/// access is through critical sections or from handler context (where
/// exception priorities already serialize it).
static mut SCHEDULER: Scheduler = Scheduler::new();

/// Raw pointer to the global scheduler. Used by the arch layer (PendSV,
/// SysTick handlers), which cannot easily use references.
///
/// # Safety
/// Set once during `init()`, read from handler context.
#[no_mangle]
pub static mut SCHEDULER_PTR: *mut Scheduler = core::ptr::null_mut();

/// Run a closure against the global scheduler inside a critical section.
fn with_scheduler<R>(f: impl FnOnce(&mut Scheduler) -> R) -> KernelResult<R> {
    sync::critical_section(|_cs| unsafe {
        if SCHEDULER_PTR.is_null() {
            return Err(KernelError::NotInitialized);
        }
        Ok(f(&mut *SCHEDULER_PTR))
    })
}

// ---------------------------------------------------------------------------
// Kernel lifecycle
// ---------------------------------------------------------------------------

/// Initialize the kernel.
///
/// Resets the global scheduler (time zero, empty pools) and, on target,
/// relocates the vector table to RAM so aperiodic events can be bound
/// after startup. Must be called before any other kernel function.
pub fn init() {
    unsafe {
        SCHEDULER = Scheduler::new();
        SCHEDULER_PTR = core::ptr::addr_of_mut!(SCHEDULER);
    }
    crate::arch::init();
}

/// Start the scheduler. On success this call does not return: the CPU
/// switches into the best-priority registered thread and preemption
/// takes over.
///
/// # Returns
/// Only on failure:
/// - `Err(NotInitialized)` — `init()` was never called
/// - `Err(NoThreadsScheduled)` — no threads are registered
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub fn launch(mut peripherals: cortex_m::Peripherals) -> KernelResult<()> {
    let first_sp = sync::critical_section(|_cs| unsafe {
        if SCHEDULER_PTR.is_null() {
            return Err(KernelError::NotInitialized);
        }
        let sched = &mut *SCHEDULER_PTR;
        let slot = sched.prepare_launch()?;
        Ok(sched.threads[slot].stack_pointer as *const u32)
    })?;

    crate::arch::configure_systick(&mut peripherals.SYST);
    crate::arch::set_kernel_interrupt_priorities();
    unsafe { crate::arch::start_first_thread(first_sp) }
}

// ---------------------------------------------------------------------------
// Threads
// ---------------------------------------------------------------------------

/// Register a new preemptable thread.
///
/// # Parameters
/// - `entry`: thread body; never returns.
/// - `priority`: lower numeric value = more urgent. Reserve 255 for the
///   idle thread.
/// - `name`: diagnostic label, truncated to 16 bytes.
///
/// # Returns
/// The new thread's id, or a capacity error if the arena is full.
pub fn add_thread(
    entry: extern "C" fn() -> !,
    priority: u8,
    name: &str,
) -> KernelResult<ThreadId> {
    with_scheduler(|sched| sched.add_thread(entry, priority, name))?
}

/// Kill the thread with the given id. Rejected for the last thread and
/// for ids that match no live thread.
pub fn kill_thread(id: ThreadId) -> KernelResult<()> {
    with_scheduler(|sched| sched.kill_thread(id))?
}

/// Kill the calling thread. Control never returns here on success; the
/// pended switch takes effect as soon as interrupts re-enable.
pub fn kill_self() -> KernelResult<()> {
    with_scheduler(|sched| sched.kill_self())?
}

/// Kill every thread except the calling one.
pub fn kill_all_others() -> KernelResult<()> {
    with_scheduler(|sched| sched.kill_all_others())?
}

/// Put the calling thread to sleep for `duration` ticks.
pub fn sleep(duration: u32) -> KernelResult<()> {
    with_scheduler(|sched| sched.sleep(duration))
}

/// Id of the calling thread.
pub fn current_thread_id() -> KernelResult<ThreadId> {
    with_scheduler(|sched| sched.current_thread_id())
}

/// Current system time in ticks.
pub fn system_time() -> KernelResult<u32> {
    with_scheduler(|sched| sched.system_time)
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Register a periodic event: `handler` runs in tick context every
/// `period` ticks. It must not call blocking primitives.
pub fn add_periodic_event(handler: fn(), period: u32) -> KernelResult<()> {
    with_scheduler(|sched| sched.add_periodic_event(handler, period))?
}

/// Bind `handler` to hardware interrupt line `irq` at `priority`.
pub fn add_aperiodic_event(
    handler: extern "C" fn(),
    priority: u8,
    irq: u8,
) -> KernelResult<()> {
    with_scheduler(|sched| sched.add_aperiodic_event(handler, priority, irq))?
}

// ---------------------------------------------------------------------------
// Semaphores
// ---------------------------------------------------------------------------

/// Allocate a semaphore with the given initial value.
pub fn create_semaphore(value: i32) -> KernelResult<Semaphore> {
    with_scheduler(|sched| sched.create_semaphore(value))?
}

/// Reset a semaphore to a given value (setup only).
pub fn init_semaphore(sem: Semaphore, value: i32) -> KernelResult<()> {
    with_scheduler(|sched| sched.init_semaphore(sem, value))
}

/// Take one unit from the semaphore, blocking the calling thread until
/// a unit is available.
pub fn wait(sem: Semaphore) -> KernelResult<()> {
    with_scheduler(|sched| sched.wait(sem))
}

/// Return one unit to the semaphore, waking one blocked waiter if any.
pub fn signal(sem: Semaphore) -> KernelResult<()> {
    with_scheduler(|sched| sched.signal(sem))?
}

// ---------------------------------------------------------------------------
// FIFO channels
// ---------------------------------------------------------------------------

/// Reset a FIFO channel to empty.
pub fn init_fifo(channel: usize) -> KernelResult<()> {
    with_scheduler(|sched| sched.init_fifo(channel))?
}

/// Write one word into a FIFO channel; never blocks. A full channel
/// drops the value and reports `FifoFull`.
pub fn write_fifo(channel: usize, value: i32) -> KernelResult<()> {
    with_scheduler(|sched| sched.write_fifo(channel, value))?
}

/// Read the oldest word from a FIFO channel, blocking the calling
/// thread while the channel is empty.
pub fn read_fifo(channel: usize) -> KernelResult<i32> {
    with_scheduler(|sched| sched.read_fifo(channel))?
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn spin() -> ! {
        loop {}
    }

    // The global instance is process-wide, so everything touching it
    // lives in this single test; the rest of the suite exercises
    // `Scheduler` values directly.
    #[test]
    fn test_global_api_end_to_end() {
        assert_eq!(system_time(), Err(KernelError::NotInitialized));

        init();
        assert_eq!(system_time(), Ok(0));

        add_thread(spin, 255, "idle").unwrap();
        add_thread(spin, 20, "aux").unwrap();
        let worker = add_thread(spin, 10, "worker").unwrap();

        init_fifo(0).unwrap();
        write_fifo(0, 1234).unwrap();
        assert_eq!(read_fifo(0).unwrap(), 1234);

        let lock = create_semaphore(1).unwrap();
        wait(lock).unwrap();
        signal(lock).unwrap();

        kill_thread(worker).unwrap();
        assert_eq!(kill_thread(worker), Err(KernelError::ThreadDoesNotExist));
    }
}
