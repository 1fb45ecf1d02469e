//! # Kernel Configuration
//!
//! Compile-time constants governing pool capacities and timing.
//! All limits are fixed at compile time — no dynamic allocation.

/// Maximum number of threads the kernel can manage simultaneously.
/// This bounds the static TCB arena. Increase with care — each slot
/// carries a `STACK_WORDS × 4`-byte stack whether or not it is in use.
pub const MAX_THREADS: usize = 32;

/// Maximum number of registered periodic events. Periodic handlers run
/// to completion inside the tick handler, so the pool is kept small.
pub const MAX_PERIODIC_EVENTS: usize = 6;

/// Size of the kernel semaphore pool. The first `2 × FIFO_CHANNELS`
/// slots are reserved for the FIFO channels' size/mutex pairs; the rest
/// are available to `create_semaphore`.
pub const MAX_SEMAPHORES: usize = 16;

/// Per-thread stack size in 32-bit words (1 KiB). Must leave room for
/// the deepest call chain plus the 16-word initial context frame
/// (8 hardware-stacked registers + R4–R11).
pub const STACK_WORDS: usize = 256;

/// Fixed length of a thread's diagnostic name. Longer names are
/// truncated on registration.
pub const MAX_NAME_LEN: usize = 16;

/// Number of independent FIFO IPC channels.
pub const FIFO_CHANNELS: usize = 4;

/// Capacity of each FIFO channel in 32-bit words.
pub const FIFO_CAPACITY: usize = 16;

/// SysTick frequency in Hz. One tick is the kernel's unit of time:
/// sleep durations and periodic-event periods are counted in ticks.
pub const TICK_HZ: u32 = 1000;

/// Core clock frequency in Hz (48 MHz-class Cortex-M4).
pub const SYSTEM_CLOCK_HZ: u32 = 48_000_000;

/// Number of device interrupt lines the vector table carries beyond the
/// 16 architectural exceptions. Aperiodic registration rejects anything
/// at or above this.
pub const NVIC_IRQ_LINES: usize = 40;

/// Highest interrupt priority an aperiodic event may request. Priority 7
/// is reserved for the kernel's own exceptions.
pub const MAX_IRQ_PRIORITY: u8 = 6;

/// Priority of the PendSV context-switch exception — the lowest level,
/// so a selection pass never preempts another handler.
pub const PENDSV_PRIORITY: u8 = 7;

/// Priority of the SysTick tick handler. One level above PendSV: the
/// time base is never delayed by a selection pass.
pub const SYSTICK_PRIORITY: u8 = 6;

/// Sentinel for the scheduler's best-seen-priority tracker; worse than
/// any valid `u8` priority.
pub const PRIORITY_SENTINEL: u16 = 256;
