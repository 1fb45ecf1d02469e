//! # Error Types
//!
//! Every fallible kernel operation reports failure as an explicit
//! [`KernelError`] value; the kernel never retries and never recovers on
//! the caller's behalf. The one historically fatal condition — a signal
//! that finds no matching blocked thread — is reported as
//! [`KernelError::SemaphoreInconsistent`] instead of scanning forever.

use core::fmt;

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Error codes returned by the kernel API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// A kernel function was called before `kernel::init`.
    NotInitialized,
    /// The thread arena is full; no new thread can be registered.
    ThreadPoolFull,
    /// The periodic-event pool is full.
    PeriodicPoolFull,
    /// The semaphore pool is full.
    SemaphorePoolExhausted,
    /// No thread with the requested id exists in the scheduler ring.
    ThreadDoesNotExist,
    /// A kill was rejected because it targets the only remaining thread.
    CannotKillLastThread,
    /// Launch was requested with an empty thread pool.
    NoThreadsScheduled,
    /// Aperiodic registration named an interrupt line outside the
    /// accepted range.
    InvalidIrq(u8),
    /// Aperiodic registration requested a priority reserved for the
    /// kernel's own exceptions.
    InvalidIrqPriority(u8),
    /// A FIFO operation named a channel index outside the channel array.
    InvalidFifoChannel(usize),
    /// A FIFO write found the channel at capacity; the value was dropped
    /// and the channel's lost-data counter incremented.
    FifoFull,
    /// A signal observed blocked waiters in the semaphore's value but
    /// found no thread blocked on it. The semaphore and thread states
    /// disagree; under correct usage this is unreachable.
    SemaphoreInconsistent,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::NotInitialized => write!(f, "kernel not initialized"),
            KernelError::ThreadPoolFull => write!(f, "thread pool full"),
            KernelError::PeriodicPoolFull => write!(f, "periodic event pool full"),
            KernelError::SemaphorePoolExhausted => write!(f, "semaphore pool exhausted"),
            KernelError::ThreadDoesNotExist => write!(f, "thread does not exist"),
            KernelError::CannotKillLastThread => write!(f, "cannot kill the last thread"),
            KernelError::NoThreadsScheduled => write!(f, "no threads scheduled"),
            KernelError::InvalidIrq(irq) => write!(f, "interrupt line {} out of range", irq),
            KernelError::InvalidIrqPriority(prio) => {
                write!(f, "interrupt priority {} is reserved", prio)
            }
            KernelError::InvalidFifoChannel(ch) => write!(f, "invalid FIFO channel {}", ch),
            KernelError::FifoFull => write!(f, "FIFO channel full, value dropped"),
            KernelError::SemaphoreInconsistent => {
                write!(f, "semaphore counts waiters but none is blocked on it")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_parameters() {
        use std::string::ToString;

        assert_eq!(
            KernelError::InvalidIrq(77).to_string(),
            "interrupt line 77 out of range"
        );
        assert_eq!(
            KernelError::InvalidFifoChannel(9).to_string(),
            "invalid FIFO channel 9"
        );
    }
}
