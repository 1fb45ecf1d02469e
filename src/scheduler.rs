//! # Scheduler
//!
//! Core scheduling state and logic. One [`Scheduler`] value owns every
//! kernel pool — the thread arena, the periodic-event pool, the
//! semaphore pool, and the FIFO channels — and is stored as the single
//! global instance in `kernel.rs`, reached from handler context through
//! a raw pointer set at init.
//!
//! ## Selection Algorithm
//!
//! A selection pass runs in the context-switch exception, decoupled from
//! the tick so the time-critical tick handler stays short:
//!
//! 1. If the current thread is asleep, blocked, or dead, reset the
//!    tracked best-seen priority to a sentinel worse than any valid
//!    priority.
//! 2. Walk the ring exactly `thread_count − 1` steps from the current
//!    thread's successor. Each runnable candidate with a priority
//!    strictly below the best seen becomes the new current thread.
//! 3. Ties go to the first candidate found, which — combined with the
//!    rotating scan start — approximates round robin among equal
//!    priorities across successive passes.
//!
//! If nothing is runnable the previous current thread stays selected;
//! the application's idle thread at the worst priority is what keeps
//! that case from mattering.
//!
//! ## Time Base
//!
//! The tick handler fires due periodic events against the pre-advance
//! time, advances system time, wakes expired sleepers, and pends a
//! selection pass. Periodic work therefore has a latency edge over
//! thread wakeups within the same tick.

use crate::arch;
use crate::config::{
    FIFO_CHANNELS, MAX_PERIODIC_EVENTS, MAX_SEMAPHORES, MAX_THREADS, PRIORITY_SENTINEL,
};
use crate::errors::{KernelError, KernelResult};
use crate::events::PeriodicEvent;
use crate::ipc::FifoChannel;
use crate::thread::{ThreadControlBlock, ThreadId, ThreadName};

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// The central kernel state. Holds all pools and the scheduling cursor.
/// Stored as a global `static mut` in `kernel.rs`; every access from the
/// public API runs inside the critical-section guard, and handler-context
/// access is serialized by exception priority.
pub struct Scheduler {
    /// Fixed thread arena. Alive threads are linked into a circular
    /// ring through their `prev`/`next` slot indices.
    pub threads: [ThreadControlBlock; MAX_THREADS],

    /// Number of alive threads.
    pub thread_count: usize,

    /// Arena slot of the currently running thread.
    pub current: usize,

    /// Arena slot where ring insertion scans start.
    pub list_head: usize,

    /// Monotonic tick counter; the kernel's clock.
    pub system_time: u32,

    /// Best priority seen by the selection scan. Persists across passes
    /// and is reset to `PRIORITY_SENTINEL` only when the current thread
    /// stops being runnable, so an equal-priority thread takes over only
    /// once the incumbent yields the CPU.
    pub best_priority: u16,

    /// Generation counter for thread ids; advances on every
    /// registration and wraps (documented id-aliasing limitation).
    pub id_counter: u16,

    /// Fixed periodic-event pool, ring-linked with slot 0 as head.
    pub periodic: [PeriodicEvent; MAX_PERIODIC_EVENTS],

    /// Number of registered periodic events.
    pub periodic_count: usize,

    /// Semaphore value pool. Slots `0..2 × FIFO_CHANNELS` belong to the
    /// FIFO channels.
    pub semaphores: [i32; MAX_SEMAPHORES],

    /// Number of allocated semaphores (including the FIFO assignments).
    pub semaphore_count: usize,

    /// FIFO IPC channels.
    pub fifos: [FifoChannel; FIFO_CHANNELS],
}

impl Scheduler {
    /// A fully reset kernel: empty pools, time zero.
    pub const fn new() -> Self {
        let mut fifos = [FifoChannel::EMPTY; FIFO_CHANNELS];
        let mut channel = 0;
        while channel < FIFO_CHANNELS {
            fifos[channel] = FifoChannel::new(channel);
            channel += 1;
        }
        Scheduler {
            threads: [ThreadControlBlock::EMPTY; MAX_THREADS],
            thread_count: 0,
            current: 0,
            list_head: 0,
            system_time: 0,
            best_priority: PRIORITY_SENTINEL,
            id_counter: 0,
            periodic: [PeriodicEvent::EMPTY; MAX_PERIODIC_EVENTS],
            periodic_count: 0,
            semaphores: [0; MAX_SEMAPHORES],
            semaphore_count: FIFO_CHANNELS * 2,
            fifos,
        }
    }

    // -----------------------------------------------------------------------
    // Thread lifecycle
    // -----------------------------------------------------------------------

    /// Register a new thread.
    ///
    /// Takes a free arena slot, lays down the initial fake context frame
    /// (so the first switch into the thread resumes directly at `entry`),
    /// and links the slot into the scheduling ring: a single forward
    /// scan from the list head, inserting before the first thread with a
    /// numerically lower-or-equal priority, else appending before the
    /// head. The ring position only matters for round-robin tie-breaks —
    /// selection always scans the whole ring.
    ///
    /// # Returns
    /// - `Ok(id)` — unique id for later `kill_thread` calls
    /// - `Err(ThreadPoolFull)` — no free slot; state is unchanged
    pub fn add_thread(
        &mut self,
        entry: extern "C" fn() -> !,
        priority: u8,
        name: &str,
    ) -> KernelResult<ThreadId> {
        if self.thread_count == MAX_THREADS {
            return Err(KernelError::ThreadPoolFull);
        }
        let slot = self.free_slot().ok_or(KernelError::ThreadPoolFull)?;

        let id = ThreadId::new(self.id_counter, slot);
        self.id_counter = self.id_counter.wrapping_add(1);

        let tcb = &mut self.threads[slot];
        tcb.alive = true;
        tcb.asleep = false;
        tcb.blocked = None;
        tcb.wake_time = 0;
        tcb.priority = priority;
        tcb.id = id;
        tcb.name = ThreadName::new(name);
        arch::init_thread_stack(&mut self.threads[slot], entry);

        self.link_thread(slot, priority);
        self.thread_count += 1;
        Ok(id)
    }

    /// Kill the thread with the given id.
    ///
    /// Scans the ring from the current thread for a live id match, marks
    /// it dead, and closes the ring gap in O(1). If the victim is the
    /// current thread a context switch is pended; otherwise the thread
    /// simply never gets selected again.
    ///
    /// # Returns
    /// - `Ok(())` on success
    /// - `Err(CannotKillLastThread)` — the ring holds only one thread
    /// - `Err(ThreadDoesNotExist)` — no live thread carries this id
    pub fn kill_thread(&mut self, id: ThreadId) -> KernelResult<()> {
        if self.thread_count == 1 {
            return Err(KernelError::CannotKillLastThread);
        }

        let mut slot = self.current;
        let mut found = false;
        for _ in 0..self.thread_count {
            if self.threads[slot].alive && self.threads[slot].id == id {
                found = true;
                break;
            }
            slot = self.threads[slot].next;
        }
        if !found {
            return Err(KernelError::ThreadDoesNotExist);
        }

        self.unlink(slot);
        self.thread_count -= 1;

        if slot == self.current {
            arch::pend_context_switch();
        }
        Ok(())
    }

    /// Kill the current thread and pend an immediate switch — running on
    /// a dead thread's stack is unsafe, so the switch is never deferred.
    ///
    /// # Returns
    /// - `Ok(())` on success (control leaves this thread at the switch)
    /// - `Err(CannotKillLastThread)` — the ring holds only one thread
    pub fn kill_self(&mut self) -> KernelResult<()> {
        if self.thread_count == 1 {
            return Err(KernelError::CannotKillLastThread);
        }
        self.unlink(self.current);
        self.thread_count -= 1;
        arch::pend_context_switch();
        Ok(())
    }

    /// Kill every thread except the current one and collapse the ring to
    /// a singleton.
    ///
    /// # Returns
    /// - `Ok(())` on success
    /// - `Err(CannotKillLastThread)` — the current thread is already the
    ///   only one
    pub fn kill_all_others(&mut self) -> KernelResult<()> {
        if self.thread_count == 1 {
            return Err(KernelError::CannotKillLastThread);
        }

        let mut slot = self.threads[self.current].next;
        while slot != self.current {
            self.threads[slot].alive = false;
            slot = self.threads[slot].next;
        }
        self.threads[self.current].next = self.current;
        self.threads[self.current].prev = self.current;
        self.list_head = self.current;
        self.thread_count = 1;
        Ok(())
    }

    /// Put the current thread to sleep for `duration` ticks and pend an
    /// immediate switch. The tick handler clears the sleep flag once
    /// `system_time` reaches the deadline.
    pub fn sleep(&mut self, duration: u32) {
        let tcb = &mut self.threads[self.current];
        tcb.wake_time = self.system_time.wrapping_add(duration);
        tcb.asleep = true;
        arch::pend_context_switch();
    }

    /// Id of the currently running thread.
    pub fn current_thread_id(&self) -> ThreadId {
        self.threads[self.current].id
    }

    // -----------------------------------------------------------------------
    // Time base and selection
    // -----------------------------------------------------------------------

    /// Advance the kernel by one tick. Runs in the tick handler.
    ///
    /// Order matters and is part of the kernel's contract: periodic
    /// events due at this tick fire first (against the pre-advance
    /// time), then time advances, then expired sleepers wake, then a
    /// selection pass is pended.
    pub fn tick(&mut self) {
        let now = self.system_time;
        let mut slot = 0;
        for _ in 0..self.periodic_count {
            let event = &mut self.periodic[slot];
            if event.next_execute_time == now {
                event.next_execute_time = now.wrapping_add(event.period);
                if let Some(handler) = event.handler {
                    handler();
                }
            }
            slot = self.periodic[slot].next;
        }

        self.system_time = self.system_time.wrapping_add(1);

        let mut slot = self.current;
        for _ in 0..self.thread_count {
            let tcb = &mut self.threads[slot];
            if tcb.asleep && tcb.wake_time <= self.system_time {
                tcb.asleep = false;
            }
            slot = self.threads[slot].next;
        }

        arch::pend_context_switch();
    }

    /// Select the thread to run next. Runs in the context-switch
    /// exception, between the outgoing save and the incoming restore.
    ///
    /// # Returns
    /// Arena slot of the selected thread (possibly unchanged).
    pub fn select_next(&mut self) -> usize {
        let current = &self.threads[self.current];
        if current.asleep || current.blocked.is_some() || !current.alive {
            self.best_priority = PRIORITY_SENTINEL;
        }

        let mut candidate = self.threads[self.current].next;
        for _ in 0..self.thread_count.saturating_sub(1) {
            let tcb = &self.threads[candidate];
            if tcb.is_runnable() && (tcb.priority as u16) < self.best_priority {
                self.current = candidate;
                self.best_priority = tcb.priority as u16;
            }
            candidate = self.threads[candidate].next;
        }
        self.current
    }

    /// Choose the first thread to run: one ring scan from the head for
    /// the numerically lowest priority. Called once, by `launch`.
    ///
    /// # Returns
    /// - `Ok(slot)` — arena slot of the chosen thread
    /// - `Err(NoThreadsScheduled)` — the pool is empty
    pub fn prepare_launch(&mut self) -> KernelResult<usize> {
        if self.thread_count == 0 {
            return Err(KernelError::NoThreadsScheduled);
        }
        self.current = self.list_head;
        let mut candidate = self.threads[self.current].next;
        for _ in 0..self.thread_count - 1 {
            if self.threads[candidate].priority < self.threads[self.current].priority {
                self.current = candidate;
            }
            candidate = self.threads[candidate].next;
        }
        Ok(self.current)
    }

    // -----------------------------------------------------------------------
    // Ring maintenance
    // -----------------------------------------------------------------------

    /// First reusable arena slot. A dead thread that is still the
    /// current thread keeps its slot reserved — its stack and links are
    /// in use until the pended switch actually leaves it.
    fn free_slot(&self) -> Option<usize> {
        (0..MAX_THREADS).find(|&slot| {
            !self.threads[slot].alive && (self.thread_count == 0 || slot != self.current)
        })
    }

    /// Link `slot` into the ring by the insertion rule.
    fn link_thread(&mut self, slot: usize, priority: u8) {
        if self.thread_count == 0 {
            self.threads[slot].next = slot;
            self.threads[slot].prev = slot;
            self.list_head = slot;
            return;
        }

        let mut cursor = self.list_head;
        for _ in 0..self.thread_count {
            if self.threads[cursor].priority <= priority {
                self.insert_before(slot, cursor);
                return;
            }
            cursor = self.threads[cursor].next;
        }
        let head = self.list_head;
        self.insert_before(slot, head);
    }

    /// Splice `slot` into the ring immediately before `at`.
    fn insert_before(&mut self, slot: usize, at: usize) {
        let prev = self.threads[at].prev;
        self.threads[slot].next = at;
        self.threads[slot].prev = prev;
        self.threads[prev].next = slot;
        self.threads[at].prev = slot;
    }

    /// Mark `slot` dead and close the ring gap around it. The dead
    /// slot's own links are left intact: a selection pass may still be
    /// standing on it.
    fn unlink(&mut self, slot: usize) {
        let prev = self.threads[slot].prev;
        let next = self.threads[slot].next;
        self.threads[prev].next = next;
        self.threads[next].prev = prev;
        self.threads[slot].alive = false;
        if self.list_head == slot {
            self.list_head = next;
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) extern "C" fn entry_stub() -> ! {
        loop {}
    }

    impl Scheduler {
        pub(crate) fn boxed_new() -> std::boxed::Box<Scheduler> {
            std::boxed::Box::new(Scheduler::new())
        }
    }

    /// Build a scheduler with the given (name, priority) threads added
    /// and the launch-time selection already made.
    pub(crate) fn sched_with_threads(threads: &[(&str, u8)]) -> std::boxed::Box<Scheduler> {
        let mut sched = Scheduler::boxed_new();
        for &(name, priority) in threads {
            sched.add_thread(entry_stub, priority, name).unwrap();
        }
        sched.prepare_launch().unwrap();
        sched
    }

    #[test]
    fn test_add_counts_up_to_capacity_then_rejects() {
        let mut sched = Scheduler::boxed_new();
        for n in 0..MAX_THREADS {
            sched.add_thread(entry_stub, 10, "worker").unwrap();
            assert_eq!(sched.thread_count, n + 1);
        }
        assert_eq!(
            sched.add_thread(entry_stub, 10, "one-too-many"),
            Err(KernelError::ThreadPoolFull)
        );
        assert_eq!(sched.thread_count, MAX_THREADS);
    }

    #[test]
    fn test_added_thread_has_stack_and_name() {
        let mut sched = Scheduler::boxed_new();
        let id = sched.add_thread(entry_stub, 4, "sensor").unwrap();
        let slot = id.slot();
        assert_eq!(sched.threads[slot].name.as_str(), "sensor");
        assert_eq!(sched.threads[slot].priority, 4);
        assert!(sched.threads[slot].alive);
        assert!(!sched.threads[slot].stack_pointer.is_null());
    }

    #[test]
    fn test_single_thread_ring_is_self_linked() {
        let mut sched = Scheduler::boxed_new();
        let id = sched.add_thread(entry_stub, 1, "only").unwrap();
        let slot = id.slot();
        assert_eq!(sched.threads[slot].next, slot);
        assert_eq!(sched.threads[slot].prev, slot);
        assert_eq!(sched.list_head, slot);
    }

    #[test]
    fn test_launch_selects_lowest_priority_number() {
        // A(5), B(10), C(1): C must win regardless of insertion order.
        let mut sched = Scheduler::boxed_new();
        sched.add_thread(entry_stub, 5, "a").unwrap();
        sched.add_thread(entry_stub, 10, "b").unwrap();
        let c = sched.add_thread(entry_stub, 1, "c").unwrap();
        let slot = sched.prepare_launch().unwrap();
        assert_eq!(slot, c.slot());
    }

    #[test]
    fn test_launch_with_empty_pool_is_rejected() {
        let mut sched = Scheduler::boxed_new();
        assert_eq!(sched.prepare_launch(), Err(KernelError::NoThreadsScheduled));
    }

    #[test]
    fn test_selection_prefers_strictly_better_priority() {
        let mut sched = sched_with_threads(&[("idle", 255), ("worker", 10)]);
        assert_eq!(sched.current_thread_id().slot(), 1);

        // A later-added more-urgent thread takes over on the next pass.
        let urgent = sched.add_thread(entry_stub, 2, "urgent").unwrap();
        sched.select_next();
        assert_eq!(sched.current, urgent.slot());
    }

    #[test]
    fn test_selection_skips_sleeping_and_blocked() {
        let mut sched = sched_with_threads(&[("idle", 255), ("a", 5), ("b", 5)]);
        let a = 1;
        let b = 2;
        sched.current = a;
        sched.best_priority = 5;

        sched.threads[a].asleep = true;
        sched.select_next();
        assert_eq!(sched.current, b);

        // Both workers out: selection falls back to the idle thread.
        sched.threads[b].blocked = Some(crate::semaphore::Semaphore::test_handle(8));
        sched.select_next();
        assert_eq!(sched.current, 0);
    }

    #[test]
    fn test_no_runnable_thread_keeps_previous_current() {
        let mut sched = sched_with_threads(&[("only", 7)]);
        sched.threads[0].asleep = true;
        sched.select_next();
        assert_eq!(sched.current, 0);
    }

    #[test]
    fn test_sleep_deadline_gates_selection() {
        let mut sched = sched_with_threads(&[("idle", 255), ("worker", 10)]);
        let worker = 1;
        sched.current = worker;
        sched.best_priority = 10;
        sched.system_time = 100;

        sched.sleep(50);
        assert!(sched.threads[worker].asleep);
        assert_eq!(sched.threads[worker].wake_time, 150);

        // Through tick 149 the worker must not be selected.
        for _ in 0..49 {
            sched.tick();
            sched.select_next();
            assert_eq!(sched.current, 0, "selected early at t={}", sched.system_time);
        }

        // The tick that advances time to 150 wakes it.
        sched.tick();
        assert!(!sched.threads[worker].asleep);
        sched.select_next();
        assert_eq!(sched.current, worker);
    }

    #[test]
    fn test_kill_last_thread_is_rejected() {
        let mut sched = sched_with_threads(&[("only", 1)]);
        let id = sched.current_thread_id();
        assert_eq!(sched.kill_thread(id), Err(KernelError::CannotKillLastThread));
        assert_eq!(sched.kill_self(), Err(KernelError::CannotKillLastThread));
        assert_eq!(sched.thread_count, 1);
        assert!(sched.threads[0].alive);
    }

    #[test]
    fn test_kill_unknown_id_is_rejected() {
        let mut sched = sched_with_threads(&[("a", 1), ("b", 1)]);
        assert_eq!(
            sched.kill_thread(ThreadId::new(9, 9)),
            Err(KernelError::ThreadDoesNotExist)
        );
        assert_eq!(sched.thread_count, 2);
    }

    #[test]
    fn test_kill_closes_ring_gap() {
        let mut sched = sched_with_threads(&[("a", 1), ("b", 1), ("c", 1)]);
        let b = sched.threads[1].id;
        sched.kill_thread(b).unwrap();

        assert_eq!(sched.thread_count, 2);
        assert!(!sched.threads[1].alive);
        assert_eq!(sched.threads[0].next, 2);
        assert_eq!(sched.threads[2].prev, 0);
    }

    #[test]
    fn test_stale_id_misses_reused_slot() {
        let mut sched = sched_with_threads(&[("a", 1), ("b", 1)]);
        let b_old = sched.threads[1].id;
        sched.kill_thread(b_old).unwrap();

        // Slot 1 is reused by the next registration with a fresh
        // generation; the stale id no longer matches anything.
        let b_new = sched.add_thread(entry_stub, 1, "b2").unwrap();
        assert_eq!(b_new.slot(), 1);
        assert_ne!(b_new, b_old);
        assert_eq!(
            sched.kill_thread(b_old),
            Err(KernelError::ThreadDoesNotExist)
        );
        assert_eq!(sched.kill_thread(b_new), Ok(()));
    }

    #[test]
    fn test_killed_current_slot_is_not_reused_before_switch() {
        let mut sched = sched_with_threads(&[("a", 1), ("b", 1)]);
        sched.current = 0;
        sched.kill_self().unwrap();

        // The dead current slot is skipped; the new thread lands in
        // another slot even though slot 0 is free.
        let id = sched.add_thread(entry_stub, 1, "c").unwrap();
        assert_ne!(id.slot(), 0);
    }

    #[test]
    fn test_kill_all_others_collapses_ring() {
        let mut sched = sched_with_threads(&[("a", 3), ("b", 2), ("c", 1)]);
        let survivor = sched.current;
        sched.kill_all_others().unwrap();

        assert_eq!(sched.thread_count, 1);
        assert_eq!(sched.threads[survivor].next, survivor);
        assert_eq!(sched.threads[survivor].prev, survivor);
        assert_eq!(sched.list_head, survivor);
        assert_eq!(sched.kill_all_others(), Err(KernelError::CannotKillLastThread));
    }

    #[test]
    fn test_equal_priority_takeover_needs_incumbent_to_yield() {
        // With the incumbent runnable, an equal-priority peer never
        // takes over; once the incumbent sleeps, the peer is selected.
        let mut sched = sched_with_threads(&[("a", 5), ("b", 5)]);
        sched.current = 0;
        sched.best_priority = 5;

        sched.select_next();
        assert_eq!(sched.current, 0);

        sched.threads[0].asleep = true;
        sched.select_next();
        assert_eq!(sched.current, 1);
    }
}
