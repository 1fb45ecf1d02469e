//! # Architecture Port Layer
//!
//! Hardware boundary of the kernel. The core scheduler is plain state-
//! machine code over the pools; everything that touches registers lives
//! behind this module:
//!
//! - `cortex_m4` — the real port: SysTick time base, PendSV context
//!   switch, NVIC programming, initial stack frames. Compiled only for
//!   bare-metal ARM targets.
//! - `hosted` — a recording stub substituted on every other target so
//!   the kernel's state transitions can be unit-tested on the host.
//!
//! The contract the kernel core consumes: `init`, `pend_context_switch`,
//! `init_thread_stack`, and `install_irq_handler`; the target port
//! additionally provides `configure_systick`,
//! `set_kernel_interrupt_priorities`, and `start_first_thread` for
//! `kernel::launch`.

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m4;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use cortex_m4::{
    configure_systick, init, init_thread_stack, install_irq_handler, pend_context_switch,
    set_kernel_interrupt_priorities, start_first_thread,
};

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub mod hosted;

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub use hosted::{init, init_thread_stack, install_irq_handler, pend_context_switch};
