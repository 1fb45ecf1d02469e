//! # Semaphores
//!
//! The kernel's fundamental synchronization unit: a signed counter in a
//! fixed pool, addressed by a copyable [`Semaphore`] handle. A negative
//! value's magnitude equals the number of threads currently blocked on
//! it. There is no per-semaphore wait queue — a signal that must wake
//! someone scans the thread ring from the current thread's successor and
//! unblocks the first match, so wake order is scan order, not FIFO.
//!
//! Initialized to 1, a semaphore behaves as a binary lock with a block
//! queue bounded only by the thread arena. Initialized to 0, it counts
//! produced-but-unconsumed resources, which is how the FIFO channels
//! use it.

use crate::config::{MAX_SEMAPHORES, MAX_THREADS};
use crate::errors::{KernelError, KernelResult};
use crate::scheduler::Scheduler;

/// Handle to a semaphore in the kernel pool.
///
/// Handles are minted only by the kernel (`create_semaphore`, or the
/// FIFO channels' fixed assignments), so a handle in user hands always
/// names a valid pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Semaphore(pub(crate) usize);

impl Semaphore {
    /// Pool index, for diagnostics.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn test_handle(index: usize) -> Self {
        Semaphore(index)
    }
}

impl Scheduler {
    /// Allocate a semaphore from the pool and set its initial value.
    ///
    /// # Returns
    /// - `Ok(handle)` — a handle naming the new semaphore
    /// - `Err(SemaphorePoolExhausted)` — the pool is full
    pub fn create_semaphore(&mut self, value: i32) -> KernelResult<Semaphore> {
        if self.semaphore_count == MAX_SEMAPHORES {
            return Err(KernelError::SemaphorePoolExhausted);
        }
        let sem = Semaphore(self.semaphore_count);
        self.semaphore_count += 1;
        self.semaphores[sem.0] = value;
        Ok(sem)
    }

    /// Reset a semaphore to a given value.
    ///
    /// Intended for setup and re-initialization only — resetting a
    /// semaphore with live waiters strands them.
    pub fn init_semaphore(&mut self, sem: Semaphore, value: i32) {
        self.semaphores[sem.0] = value;
    }

    /// Decrement the semaphore; if no unit was available, block the
    /// current thread on it.
    ///
    /// Blocking marks the current TCB and pends a context switch; the
    /// switch itself happens once interrupts are re-enabled at the end
    /// of the enclosing critical section, and the thread resumes here —
    /// unblocked by a matching signal — as if the call had simply taken
    /// longer.
    pub fn wait(&mut self, sem: Semaphore) {
        self.semaphores[sem.0] -= 1;
        if self.semaphores[sem.0] < 0 {
            self.threads[self.current].blocked = Some(sem);
            crate::arch::pend_context_switch();
        }
    }

    /// Increment the semaphore; if waiters remain accounted in its
    /// value, wake one.
    ///
    /// The wake scan walks the ring from the current thread's successor
    /// and clears the first thread found blocked on this semaphore,
    /// making it selectable on the next scheduler pass. The scan is
    /// bounded by the arena size: if the value says a waiter exists but
    /// none is found, the semaphore and thread states disagree and the
    /// inconsistency is reported rather than scanned for forever.
    pub fn signal(&mut self, sem: Semaphore) -> KernelResult<()> {
        self.semaphores[sem.0] += 1;
        if self.semaphores[sem.0] <= 0 {
            let mut slot = self.threads[self.current].next;
            for _ in 0..MAX_THREADS {
                if self.threads[slot].blocked == Some(sem) {
                    self.threads[slot].blocked = None;
                    return Ok(());
                }
                slot = self.threads[slot].next;
            }
            return Err(KernelError::SemaphoreInconsistent);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FIFO_CHANNELS;
    use crate::scheduler::tests::{entry_stub, sched_with_threads};

    #[test]
    fn test_create_starts_past_fifo_reservations() {
        let mut sched = Scheduler::boxed_new();
        let sem = sched.create_semaphore(2).unwrap();
        assert_eq!(sem.index(), FIFO_CHANNELS * 2);
        assert_eq!(sched.semaphores[sem.index()], 2);
    }

    #[test]
    fn test_pool_exhaustion() {
        let mut sched = Scheduler::boxed_new();
        let free = MAX_SEMAPHORES - FIFO_CHANNELS * 2;
        for _ in 0..free {
            sched.create_semaphore(0).unwrap();
        }
        assert_eq!(
            sched.create_semaphore(0),
            Err(KernelError::SemaphorePoolExhausted)
        );
    }

    #[test]
    fn test_wait_takes_available_unit_without_blocking() {
        let mut sched = sched_with_threads(&[("a", 1), ("b", 1)]);
        let sem = sched.create_semaphore(1).unwrap();

        sched.wait(sem);
        assert_eq!(sched.semaphores[sem.index()], 0);
        assert_eq!(sched.threads[sched.current].blocked, None);
    }

    #[test]
    fn test_mutual_exclusion_state_machine() {
        // Two threads contending on a binary lock: the second wait
        // blocks, the owner's signal hands the lock over.
        let mut sched = sched_with_threads(&[("a", 1), ("b", 1)]);
        let lock = sched.create_semaphore(1).unwrap();
        let (a, b) = (0, 1);

        sched.current = a;
        sched.wait(lock); // A takes the lock

        sched.current = b;
        sched.wait(lock); // B must block
        assert_eq!(sched.semaphores[lock.index()], -1);
        assert_eq!(sched.threads[b].blocked, Some(lock));
        assert!(!sched.threads[b].is_runnable());

        sched.current = a;
        sched.signal(lock).unwrap(); // A releases; B is woken
        assert_eq!(sched.semaphores[lock.index()], 0);
        assert_eq!(sched.threads[b].blocked, None);
        assert!(sched.threads[b].is_runnable());
    }

    #[test]
    fn test_signal_wakes_first_successor_in_scan_order() {
        let mut sched = sched_with_threads(&[("a", 1), ("b", 1), ("c", 1)]);
        let sem = sched.create_semaphore(0).unwrap();
        let (a, b, c) = (0, 1, 2);

        sched.current = b;
        sched.wait(sem);
        sched.current = c;
        sched.wait(sem);
        assert_eq!(sched.semaphores[sem.index()], -2);

        // Signaling from A wakes the first blocked thread after A in
        // ring order — B, not C.
        sched.current = a;
        sched.signal(sem).unwrap();
        assert_eq!(sched.threads[b].blocked, None);
        assert_eq!(sched.threads[c].blocked, Some(sem));

        sched.signal(sem).unwrap();
        assert_eq!(sched.threads[c].blocked, None);
        assert_eq!(sched.semaphores[sem.index()], 0);
    }

    #[test]
    fn test_inconsistent_signal_is_reported() {
        let mut sched = sched_with_threads(&[("a", 1), ("b", 1)]);
        let sem = sched.create_semaphore(0).unwrap();

        // Force the count negative with no thread actually blocked.
        sched.init_semaphore(sem, -2);
        assert_eq!(sched.signal(sem), Err(KernelError::SemaphoreInconsistent));
    }

    #[test]
    fn test_killed_waiter_surfaces_as_inconsistency() {
        // A blocked thread that is killed leaves the semaphore counting
        // a waiter that no longer exists; the next signal reports it.
        let mut sched = sched_with_threads(&[("a", 1), ("b", 1)]);
        let sem = sched.create_semaphore(0).unwrap();
        let (a, b) = (0, 1);

        sched.current = b;
        sched.wait(sem);
        let victim = sched.threads[b].id;

        sched.current = a;
        sched.kill_thread(victim).unwrap();
        // The dead slot keeps its blocked mark but is out of the ring;
        // an add would reuse it, so the scan must not resurrect it.
        let _ = sched
            .add_thread(entry_stub, 5, "replacement")
            .unwrap();

        assert_eq!(sched.signal(sem), Err(KernelError::SemaphoreInconsistent));
    }
}
