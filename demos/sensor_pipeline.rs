//! # Sensor Pipeline Demo
//!
//! Demonstrates the kernel's primitives end to end with a classic
//! interrupt-producer / thread-consumer pipeline:
//!
//! | Component | Kind | Priority | Behavior |
//! |-----------|------|----------|----------|
//! | `sample_sensor` | Periodic event | — | Every 50 ticks, pushes a synthetic reading into FIFO 0 |
//! | `button_pressed` | Aperiodic event | IRQ 4, prio 3 | Pushes a marker into FIFO 0 from interrupt context |
//! | `filter_thread` | Thread | 5 | Blocks on FIFO 0, smooths readings, publishes under a lock |
//! | `blink_thread` | Thread | 10 | Sleeps 250 ticks between heartbeat toggles |
//! | `idle_thread` | Thread | 255 | Always-runnable fallback |
//!
//! The filter thread spends most of its life blocked on the FIFO's size
//! semaphore; the periodic sampler never blocks (a full channel drops
//! the sample and counts it as lost data).
//!
//! Build for the target with
//! `cargo build --example sensor_pipeline --target thumbv7em-none-eabihf`;
//! on the host this file compiles to an empty stub.

#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_std)]
#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_main)]

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod firmware {
    use core::sync::atomic::{AtomicI32, AtomicU32, Ordering};

    use cortex_m_rt::entry;
    use panic_halt as _;

    use minnow::kernel;
    use minnow::Semaphore;

    /// Channel carrying raw readings from the sampler to the filter.
    const SENSOR_FIFO: usize = 0;

    /// Marker value injected by the button interrupt.
    const BUTTON_MARK: i32 = i32::MIN;

    /// Latest smoothed reading, guarded by `STATS_LOCK`.
    static SMOOTHED: AtomicI32 = AtomicI32::new(0);
    static BUTTON_COUNT: AtomicU32 = AtomicU32::new(0);
    static HEARTBEAT: AtomicU32 = AtomicU32::new(0);

    /// Binary lock handed out in `main`; guards the published stats as
    /// one consistent pair.
    static mut STATS_LOCK: Option<Semaphore> = None;

    /// Synthetic sensor: a triangle wave derived from system time.
    /// Runs in tick context — never blocks, and a full channel just
    /// costs us one lost sample.
    fn sample_sensor() {
        let t = kernel::system_time().unwrap_or(0) as i32;
        let reading = (t % 200 - 100).abs();
        let _ = kernel::write_fifo(SENSOR_FIFO, reading);
    }

    /// Button ISR — interrupt-context producer feeding the same FIFO
    /// the periodic sampler uses.
    extern "C" fn button_pressed() {
        let _ = kernel::write_fifo(SENSOR_FIFO, BUTTON_MARK);
    }

    /// Consumer: blocks on the FIFO, maintains an exponential moving
    /// average, and publishes it under the stats lock.
    extern "C" fn filter_thread() -> ! {
        loop {
            let Ok(value) = kernel::read_fifo(SENSOR_FIFO) else {
                continue;
            };
            if value == BUTTON_MARK {
                BUTTON_COUNT.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            let lock = unsafe { STATS_LOCK }.unwrap();
            let _ = kernel::wait(lock);
            let smoothed = SMOOTHED.load(Ordering::Relaxed);
            SMOOTHED.store((smoothed * 7 + value) / 8, Ordering::Relaxed);
            let _ = kernel::signal(lock);
        }
    }

    /// Heartbeat: wakes four times a second at the 1 kHz tick.
    extern "C" fn blink_thread() -> ! {
        loop {
            HEARTBEAT.fetch_add(1, Ordering::Relaxed);
            let _ = kernel::sleep(250);
        }
    }

    /// Lowest-priority fallback so the scheduler always has a runnable
    /// thread.
    extern "C" fn idle_thread() -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }

    #[entry]
    fn main() -> ! {
        let peripherals = cortex_m::Peripherals::take().unwrap();

        kernel::init();
        kernel::init_fifo(SENSOR_FIFO).unwrap();

        let lock = kernel::create_semaphore(1).unwrap();
        unsafe { STATS_LOCK = Some(lock) };

        kernel::add_thread(filter_thread, 5, "filter").unwrap();
        kernel::add_thread(blink_thread, 10, "blink").unwrap();
        kernel::add_thread(idle_thread, 255, "idle").unwrap();

        kernel::add_periodic_event(sample_sensor, 50).unwrap();
        kernel::add_aperiodic_event(button_pressed, 3, 4).unwrap();

        // Only returns on failure; spin so the panic strategy stays out
        // of the picture.
        let _ = kernel::launch(peripherals);
        loop {}
    }
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
fn main() {}
