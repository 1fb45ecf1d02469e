//! # minnow — a fixed-capacity preemptive RTOS kernel
//!
//! A small preemptive, priority-based real-time kernel for single-core
//! ARM Cortex-M4 microcontrollers: a thread scheduler, blocking
//! semaphores, periodic software timers, aperiodic (interrupt-driven)
//! event registration, and bounded circular-buffer IPC channels built
//! on the semaphores.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │              Application Threads & Drivers              │
//! ├────────────────────────────────────────────────────────┤
//! │                Kernel API (kernel.rs)                   │
//! │   init() · add_thread() · sleep() · launch()            │
//! │   wait()/signal() · read_fifo()/write_fifo()            │
//! ├──────────────┬──────────────────┬─────────────────────┤
//! │  Scheduler   │  Semaphores      │  FIFO IPC           │
//! │ scheduler.rs │  semaphore.rs    │  ipc.rs             │
//! │  ─ tick()    │  ─ wait()        │  ─ write_fifo()     │
//! │  ─ select()  │  ─ signal()      │  ─ read_fifo()      │
//! ├──────────────┴──────────────────┴─────────────────────┤
//! │     Thread Arena (thread.rs) · Events (events.rs)      │
//! │   TCB ring · ThreadId · periodic/aperiodic descriptors │
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/cortex_m4.rs)                │
//! │   PendSV · SysTick · NVIC · Initial Stack Frames        │
//! ├────────────────────────────────────────────────────────┤
//! │          ARM Cortex-M4 Hardware (Thumb-2)               │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scheduling Model
//!
//! Single core, preemptive, priority-driven with tick-granularity
//! round-robin among equal priorities. Lower numeric priority = more
//! urgent. The SysTick handler advances time, fires periodic events,
//! and wakes sleepers; the actual thread selection and register swap
//! run in PendSV at the lowest exception priority, so the time base is
//! never delayed by a switch. Threads suspend only by sleeping,
//! blocking on a semaphore, or being killed — each marks state, pends a
//! switch, and resumes exactly where it yielded.
//!
//! ## Memory Model
//!
//! - **No heap**: all state is statically allocated
//! - **No `alloc`**: pure `core` only
//! - **Fixed arenas**: 32 thread slots (1 KiB stack each, inline in the
//!   TCB), 6 periodic events, 16 semaphores, 4×16-word FIFO channels
//! - **Critical sections**: every API call runs with interrupts masked
//!
//! ## Host Testing
//!
//! The kernel core is plain state-machine code and builds for the host,
//! where the unit tests drive it with the `arch::hosted` stub in place
//! of the Cortex-M4 port.

#![no_std]

pub mod arch;
pub mod config;
pub mod errors;
pub mod events;
pub mod ipc;
pub mod kernel;
pub mod scheduler;
pub mod semaphore;
pub mod sync;
pub mod thread;

#[cfg(test)]
extern crate std;

// ============================================================================
// Public API
// ============================================================================

pub use errors::{KernelError, KernelResult};
pub use ipc::FifoChannel;
pub use scheduler::Scheduler;
pub use semaphore::Semaphore;
pub use thread::{ThreadControlBlock, ThreadId};
