//! # Synchronization Primitives
//!
//! Interrupt-safe critical section abstraction for the Cortex-M4.
//! All shared scheduler state must be accessed within a critical section
//! to prevent data races between thread code and the kernel's handlers.
//!
//! The guard is scoped: interrupts are masked on entry and restored on
//! every exit path, including early returns. There is no token to forget
//! — the closure shape makes an unbalanced enter/exit unrepresentable.

use critical_section::CriticalSection;

/// Execute a closure within a critical section (interrupts masked).
///
/// This is the primary mechanism for safely accessing shared mutable
/// state in the kernel. On target the implementation comes from
/// `cortex-m`'s single-core critical section (PRIMASK save/disable and
/// restore); under host tests it comes from the `critical-section`
/// crate's `std` implementation.
///
/// # Usage
/// ```ignore
/// sync::critical_section(|_cs| {
///     // Access shared state safely
/// });
/// ```
///
/// # Performance
/// Keep critical sections as short as possible — while one is open the
/// tick handler is stalled along with everything else.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    critical_section::with(f)
}
