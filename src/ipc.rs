//! # FIFO IPC Channels
//!
//! Bounded circular-buffer channels for moving words between producer
//! and consumer threads, or from interrupt handlers into threads. Each
//! channel is built from two semaphores: a size semaphore counting
//! buffered words (readers block on it when the channel is empty) and a
//! mutex guarding the read path.
//!
//! Writes never block and never displace accepted data: a write into a
//! full channel drops the value, bumps the channel's lost-data counter,
//! and reports [`KernelError::FifoFull`]. This matches the intended
//! usage pattern — an interrupt-context producer must not be stalled by
//! a slow consumer.

use crate::config::{FIFO_CAPACITY, FIFO_CHANNELS};
use crate::errors::{KernelError, KernelResult};
use crate::scheduler::Scheduler;
use crate::semaphore::Semaphore;

/// One bounded FIFO channel.
///
/// The size/mutex semaphores are fixed pool assignments made at
/// construction: channel `i` owns pool slots `2i` (size) and `2i + 1`
/// (mutex).
pub struct FifoChannel {
    /// Circular storage.
    pub buffer: [i32; FIFO_CAPACITY],

    /// Read cursor (next word out).
    pub head: usize,

    /// Write cursor (next free slot).
    pub tail: usize,

    /// Count of values dropped by writes into a full channel.
    /// Saturates; it never wraps back to zero.
    pub lost_data: u32,

    /// Counts buffered words; readers block on it.
    pub size_sem: Semaphore,

    /// Guards the read path.
    pub mutex: Semaphore,
}

impl FifoChannel {
    /// Placeholder for const array construction; real channels are built
    /// with `new` before the scheduler value is ever used.
    pub(crate) const EMPTY: FifoChannel = FifoChannel::new(0);

    pub(crate) const fn new(channel: usize) -> Self {
        FifoChannel {
            buffer: [0; FIFO_CAPACITY],
            head: 0,
            tail: 0,
            lost_data: 0,
            size_sem: Semaphore(channel * 2),
            mutex: Semaphore(channel * 2 + 1),
        }
    }
}

impl Scheduler {
    /// Reset a channel to empty: cleared buffer, cursors at the start,
    /// size semaphore 0, mutex semaphore 1.
    ///
    /// # Returns
    /// - `Ok(())` on success
    /// - `Err(InvalidFifoChannel)` if `channel >= FIFO_CHANNELS`
    pub fn init_fifo(&mut self, channel: usize) -> KernelResult<()> {
        if channel >= FIFO_CHANNELS {
            return Err(KernelError::InvalidFifoChannel(channel));
        }
        let fifo = &mut self.fifos[channel];
        fifo.buffer = [0; FIFO_CAPACITY];
        fifo.head = 0;
        fifo.tail = 0;
        fifo.lost_data = 0;
        let (size_sem, mutex) = (fifo.size_sem, fifo.mutex);
        self.init_semaphore(size_sem, 0);
        self.init_semaphore(mutex, 1);
        Ok(())
    }

    /// Write one word into a channel without blocking.
    ///
    /// # Returns
    /// - `Ok(())` — the value was stored and the size semaphore signaled
    /// - `Err(FifoFull)` — the channel was at capacity; the value was
    ///   dropped and `lost_data` incremented. Already-buffered words are
    ///   untouched and still read out in insertion order.
    /// - `Err(InvalidFifoChannel)` if `channel >= FIFO_CHANNELS`
    pub fn write_fifo(&mut self, channel: usize, value: i32) -> KernelResult<()> {
        if channel >= FIFO_CHANNELS {
            return Err(KernelError::InvalidFifoChannel(channel));
        }
        let size_sem = self.fifos[channel].size_sem;
        if self.semaphores[size_sem.index()] > FIFO_CAPACITY as i32 - 1 {
            self.fifos[channel].lost_data = self.fifos[channel].lost_data.saturating_add(1);
            return Err(KernelError::FifoFull);
        }
        let fifo = &mut self.fifos[channel];
        fifo.buffer[fifo.tail] = value;
        fifo.tail = (fifo.tail + 1) % FIFO_CAPACITY;
        self.signal(size_sem)
    }

    /// Read one word from a channel; the only blocking FIFO path.
    ///
    /// Acquires the channel mutex, waits on the size semaphore (blocking
    /// the calling thread if the channel is empty), takes the word at
    /// the head cursor, and releases the mutex.
    ///
    /// # Returns
    /// - `Ok(value)` — the oldest buffered word
    /// - `Err(InvalidFifoChannel)` if `channel >= FIFO_CHANNELS`
    pub fn read_fifo(&mut self, channel: usize) -> KernelResult<i32> {
        if channel >= FIFO_CHANNELS {
            return Err(KernelError::InvalidFifoChannel(channel));
        }
        let (mutex, size_sem) = {
            let fifo = &self.fifos[channel];
            (fifo.mutex, fifo.size_sem)
        };
        self.wait(mutex);
        self.wait(size_sem);
        let fifo = &mut self.fifos[channel];
        let value = fifo.buffer[fifo.head];
        fifo.head = (fifo.head + 1) % FIFO_CAPACITY;
        self.signal(mutex)?;
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::tests::sched_with_threads;

    fn sched_with_fifo() -> std::boxed::Box<Scheduler> {
        let mut sched = sched_with_threads(&[("reader", 1), ("writer", 1)]);
        for channel in 0..FIFO_CHANNELS {
            sched.init_fifo(channel).unwrap();
        }
        sched
    }

    #[test]
    fn test_init_rejects_out_of_range_channel() {
        let mut sched = Scheduler::boxed_new();
        assert_eq!(
            sched.init_fifo(FIFO_CHANNELS),
            Err(KernelError::InvalidFifoChannel(FIFO_CHANNELS))
        );
        assert_eq!(
            sched.write_fifo(99, 7),
            Err(KernelError::InvalidFifoChannel(99))
        );
        assert_eq!(
            sched.read_fifo(99),
            Err(KernelError::InvalidFifoChannel(99))
        );
    }

    #[test]
    fn test_round_trip_on_every_channel() {
        let mut sched = sched_with_fifo();
        for channel in 0..FIFO_CHANNELS {
            sched.write_fifo(channel, -42 - channel as i32).unwrap();
            assert_eq!(sched.read_fifo(channel).unwrap(), -42 - channel as i32);
        }
    }

    #[test]
    fn test_read_returns_insertion_order() {
        let mut sched = sched_with_fifo();
        for v in 0..5 {
            sched.write_fifo(1, v).unwrap();
        }
        for v in 0..5 {
            assert_eq!(sched.read_fifo(1).unwrap(), v);
        }
    }

    #[test]
    fn test_seventeenth_write_is_dropped_and_counted() {
        let mut sched = sched_with_fifo();
        for v in 0..FIFO_CAPACITY as i32 {
            sched.write_fifo(0, v).unwrap();
        }
        assert_eq!(sched.write_fifo(0, 16), Err(KernelError::FifoFull));
        assert_eq!(sched.fifos[0].lost_data, 1);

        // The rejected write corrupted nothing: all accepted words come
        // back in insertion order.
        for v in 0..FIFO_CAPACITY as i32 {
            assert_eq!(sched.read_fifo(0).unwrap(), v);
        }
    }

    #[test]
    fn test_wraparound_reuses_freed_slots() {
        let mut sched = sched_with_fifo();
        for v in 0..FIFO_CAPACITY as i32 {
            sched.write_fifo(2, v).unwrap();
        }
        assert_eq!(sched.read_fifo(2).unwrap(), 0);
        assert_eq!(sched.read_fifo(2).unwrap(), 1);

        // Two slots freed; two more writes wrap the tail.
        sched.write_fifo(2, 100).unwrap();
        sched.write_fifo(2, 101).unwrap();
        assert_eq!(sched.fifos[2].tail, 2);

        for v in 2..FIFO_CAPACITY as i32 {
            assert_eq!(sched.read_fifo(2).unwrap(), v);
        }
        assert_eq!(sched.read_fifo(2).unwrap(), 100);
        assert_eq!(sched.read_fifo(2).unwrap(), 101);
    }

    #[test]
    fn test_empty_read_blocks_caller_on_size_semaphore() {
        let mut sched = sched_with_fifo();
        let reader = sched.current;
        let size_sem = sched.fifos[3].size_sem;

        // Reading an empty channel marks the caller blocked; on target
        // the thread is switched out here and resumes once a writer
        // signals the size semaphore.
        let _ = sched.read_fifo(3);
        assert_eq!(sched.threads[reader].blocked, Some(size_sem));
        assert!(!sched.threads[reader].is_runnable());
    }

    #[test]
    fn test_init_resets_a_used_channel() {
        let mut sched = sched_with_fifo();
        sched.write_fifo(0, 5).unwrap();
        sched.write_fifo(0, 6).unwrap();

        sched.init_fifo(0).unwrap();
        assert_eq!(sched.fifos[0].head, 0);
        assert_eq!(sched.fifos[0].tail, 0);
        assert_eq!(sched.semaphores[sched.fifos[0].size_sem.index()], 0);
        assert_eq!(sched.semaphores[sched.fifos[0].mutex.index()], 1);
    }
}
