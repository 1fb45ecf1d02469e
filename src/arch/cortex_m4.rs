//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2) processor:
//! SysTick configuration, the PendSV context switch, NVIC programming
//! for aperiodic events, and initial thread stack frames.
//!
//! ## Context Switch Mechanism
//!
//! The Cortex-M4 uses a split-stack model: MSP for handlers, PSP for
//! threads. On exception entry the hardware stacks R0–R3, R12, LR, PC,
//! and xPSR onto the process stack; the PendSV handler saves and
//! restores R4–R11 manually, which completes the context. Between the
//! save and the restore it calls back into the scheduler to pick the
//! incoming thread.
//!
//! ## Exception Priorities
//!
//! - SysTick: priority 6 — the time base is short and never blocks.
//! - PendSV: priority 7 (lowest) — the selection scan and register swap
//!   run only when no other handler is active.
//!
//! The tick handler therefore never waits on a selection pass, and a
//! pended switch is taken as soon as the last handler unwinds.

use core::arch::{asm, naked_asm};
use core::ptr::{addr_of, addr_of_mut, read_volatile, write_volatile};

use crate::config::{
    NVIC_IRQ_LINES, PENDSV_PRIORITY, STACK_WORDS, SYSTEM_CLOCK_HZ, SYSTICK_PRIORITY, TICK_HZ,
};
use crate::thread::ThreadControlBlock;

/// Interrupt Control and State Register; bit 28 pends PendSV.
const ICSR: *mut u32 = 0xE000_ED04 as *mut u32;

/// Vector Table Offset Register.
const VTOR: *mut u32 = 0xE000_ED08 as *mut u32;

/// System Handler Priority Register 3: PendSV in bits [23:16], SysTick
/// in bits [31:24].
const SHPR3: *mut u32 = 0xE000_ED20 as *mut u32;

/// NVIC set-enable registers (write-1-to-set, 32 lines per word).
const NVIC_ISER: *mut u32 = 0xE000_E100 as *mut u32;

/// NVIC priority registers, one byte per line.
const NVIC_IPR: *mut u8 = 0xE000_E400 as *mut u8;

/// Implemented priority bits; priorities live in the byte's top bits.
const NVIC_PRIO_SHIFT: u8 = 5;

// ---------------------------------------------------------------------------
// Vector table relocation
// ---------------------------------------------------------------------------

/// 16 architectural exceptions plus the device interrupt lines.
const VECTOR_COUNT: usize = 16 + NVIC_IRQ_LINES;

/// RAM copy of the vector table. 56 vectors round up to 64 slots, so
/// 256-byte alignment satisfies the VTOR constraint.
#[repr(align(256))]
struct VectorTable([u32; VECTOR_COUNT]);

static mut RAM_VECTORS: VectorTable = VectorTable([0; VECTOR_COUNT]);

/// Relocate the vector table into RAM.
///
/// Called once from `kernel::init`. Aperiodic event registration later
/// rewrites individual entries, which is only possible with the table
/// in RAM.
pub fn init() {
    unsafe {
        let flash_table = read_volatile(VTOR) as *const u32;
        let ram_table = addr_of_mut!(RAM_VECTORS);
        let mut i = 0;
        while i < VECTOR_COUNT {
            (*ram_table).0[i] = read_volatile(flash_table.add(i));
            i += 1;
        }
        write_volatile(VTOR, addr_of!(RAM_VECTORS) as u32);
    }
}

/// Write an aperiodic handler into the RAM vector table and program the
/// NVIC: priority first, then enable. Range validation already happened
/// in the scheduler.
pub fn install_irq_handler(irq: u8, handler: extern "C" fn(), priority: u8) {
    unsafe {
        let ram_table = addr_of_mut!(RAM_VECTORS);
        (*ram_table).0[16 + irq as usize] = handler as u32;
        write_volatile(NVIC_IPR.add(irq as usize), priority << NVIC_PRIO_SHIFT);
        write_volatile(NVIC_ISER.add(irq as usize / 32), 1 << (irq as usize % 32));
    }
}

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Configure the SysTick timer as the kernel time base.
///
/// Fires at `TICK_HZ` from the core clock; each interrupt runs the
/// scheduler's `tick`.
pub fn configure_systick(syst: &mut cortex_m::peripheral::SYST) {
    use cortex_m::peripheral::syst::SystClkSource;

    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

/// Set the kernel's exception priorities: SysTick one level above
/// PendSV, PendSV at the floor.
pub fn set_kernel_interrupt_priorities() {
    unsafe {
        let val = read_volatile(SHPR3) & 0x0000_FFFF;
        let val = val
            | ((PENDSV_PRIORITY as u32) << NVIC_PRIO_SHIFT) << 16
            | ((SYSTICK_PRIORITY as u32) << NVIC_PRIO_SHIFT) << 24;
        write_volatile(SHPR3, val);
    }
}

// ---------------------------------------------------------------------------
// Context switching
// ---------------------------------------------------------------------------

/// Pend the PendSV exception; the switch runs once no other handler is
/// active and interrupts are enabled.
#[inline]
pub fn pend_context_switch() {
    unsafe {
        write_volatile(ICSR, 1 << 28);
    }
}

/// Lay down the initial fake context frame for a new thread.
///
/// The frame mimics what exception entry would have stacked, so the
/// first switch into this thread "returns" straight into `entry` with a
/// fresh stack and only the Thumb bit set in its status register.
///
/// ## Stack Layout (top = high address, growing down)
///
/// ```text
/// [Hardware-stacked frame]
///   xPSR  (Thumb bit set)
///   PC    (thread entry point)
///   LR    (thread_exit fallback)
///   R12, R3, R2, R1, R0        (0)
/// [Software-saved context]
///   R11 … R4                   (0)   <- stack_pointer after init
/// ```
pub fn init_thread_stack(tcb: &mut ThreadControlBlock, entry: extern "C" fn() -> !) {
    let stack_top = tcb.stack.0.as_ptr() as usize + STACK_WORDS * 4;
    // AAPCS requires an 8-byte aligned stack.
    let aligned_top = stack_top & !0x07;
    let frame = (aligned_top - 16 * 4) as *mut u32;

    unsafe {
        // R4–R11, then R0–R3 and R12
        for i in 0..13 {
            *frame.add(i) = 0;
        }
        *frame.add(13) = thread_exit as u32; // LR
        *frame.add(14) = entry as u32; // PC
        *frame.add(15) = 0x0100_0000; // xPSR, Thumb bit
    }

    tcb.stack_pointer = frame;
}

/// Fallback for a thread that somehow returns (entries are `fn() -> !`).
extern "C" fn thread_exit() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

/// Switch to PSP and branch into the first thread. Never returns.
///
/// # Safety
/// Must be called exactly once, with `psp` pointing at a frame laid
/// down by `init_thread_stack`.
pub unsafe fn start_first_thread(psp: *const u32) -> ! {
    unsafe {
        asm!(
            // Skip the 8 software-saved registers; PSP lands on the
            // hardware frame.
            "adds r0, #32",
            "msr psp, r0",
            // Thread mode uses PSP from here on (CONTROL.SPSEL = 1).
            "movs r0, #2",
            "msr control, r0",
            "isb",
            // Unstack the frame manually; this is not a real exception
            // return.
            "pop {{r0-r3, r12}}",
            "pop {{r4}}", // LR slot, discarded (entries never return)
            "pop {{r5}}", // PC: thread entry point
            "pop {{r6}}", // xPSR, discarded
            "cpsie i",
            "bx r5",
            in("r0") psp,
            options(noreturn)
        );
    }
}

// ---------------------------------------------------------------------------
// Exception handlers
// ---------------------------------------------------------------------------

/// PendSV exception handler — the context switch itself.
///
/// ## Sequence
/// 1. Push R4–R11 onto the outgoing thread's process stack
/// 2. Store the resulting PSP into the outgoing TCB
/// 3. Run the scheduler's selection pass
/// 4. Load the incoming thread's PSP and pop its R4–R11
/// 5. Exception return; hardware restores the rest
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",
        "bl {save_context}", // save_outgoing_context(psp)
        "bl {select}",       // returns the incoming PSP in r0
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",
        // Return to Thread mode on PSP.
        "ldr r0, =0xFFFFFFFD",
        "bx r0",
        save_context = sym save_outgoing_context,
        select = sym switch_to_next,
    )
}

/// Store the outgoing thread's stack pointer. Called from PendSV.
///
/// # Safety
/// Called from handler context with the scheduler pointer set.
#[no_mangle]
unsafe extern "C" fn save_outgoing_context(psp: *mut u32) {
    let sched = unsafe { &mut *crate::kernel::SCHEDULER_PTR };
    sched.threads[sched.current].stack_pointer = psp;
}

/// Run the selection pass and hand back the incoming thread's stack
/// pointer. Called from PendSV.
///
/// # Safety
/// Called from handler context with the scheduler pointer set.
#[no_mangle]
unsafe extern "C" fn switch_to_next() -> *mut u32 {
    let sched = unsafe { &mut *crate::kernel::SCHEDULER_PTR };
    let next = sched.select_next();
    sched.threads[next].stack_pointer
}

/// SysTick exception handler — the kernel time base.
///
/// Fires periodic events, advances system time, wakes expired sleepers,
/// and pends PendSV for the selection pass.
#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    let sched = unsafe { &mut *crate::kernel::SCHEDULER_PTR };
    sched.tick();
}
