//! High-resolution timing primitive
//!
//! Wraps the OS monotonic counter (QueryPerformanceCounter on Windows)
//! behind a small trait so frame pacing can be driven by a fake clock in
//! tests.

use std::time::Duration;

/// Monotonic tick source
pub trait Clock {
    /// Counter ticks per second, 0 if the counter is unavailable
    fn frequency(&self) -> u64;

    /// Current counter value
    fn now(&self) -> u64;

    /// Suspend the calling thread for roughly `ms` milliseconds
    ///
    /// `0` yields the rest of the time slice without a guaranteed delay.
    fn sleep_ms(&self, ms: u32);
}

/// The OS performance counter
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    frequency: u64,
}

impl SystemClock {
    /// Query the counter frequency once
    pub fn new() -> Self {
        Self {
            frequency: query_frequency(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn frequency(&self) -> u64 {
        self.frequency
    }

    fn now(&self) -> u64 {
        query_counter()
    }

    fn sleep_ms(&self, ms: u32) {
        sleep(ms);
    }
}

#[cfg(windows)]
fn query_frequency() -> u64 {
    use windows_sys::Win32::System::Performance::QueryPerformanceFrequency;

    let mut frequency = 0i64;
    // SAFETY: out pointer is a valid i64
    if unsafe { QueryPerformanceFrequency(&mut frequency) } == 0 {
        return 0;
    }
    frequency.max(0) as u64
}

#[cfg(windows)]
fn query_counter() -> u64 {
    use windows_sys::Win32::System::Performance::QueryPerformanceCounter;

    let mut counter = 0i64;
    // SAFETY: out pointer is a valid i64
    unsafe { QueryPerformanceCounter(&mut counter) };
    counter.max(0) as u64
}

#[cfg(windows)]
fn sleep(ms: u32) {
    // SAFETY: plain Win32 call
    unsafe { windows_sys::Win32::System::Threading::Sleep(ms) };
}

#[cfg(not(windows))]
fn query_frequency() -> u64 {
    1_000_000_000
}

#[cfg(not(windows))]
fn query_counter() -> u64 {
    use std::sync::LazyLock;
    use std::time::Instant;

    static EPOCH: LazyLock<Instant> = LazyLock::new(Instant::now);
    EPOCH.elapsed().as_nanos() as u64
}

#[cfg(not(windows))]
fn sleep(ms: u32) {
    if ms == 0 {
        std::thread::yield_now();
    } else {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }
}

/// Convert a tick delta to a duration
pub fn ticks_to_duration(ticks: u64, frequency: u64) -> Duration {
    if frequency == 0 {
        return Duration::ZERO;
    }
    let secs = ticks / frequency;
    let rem = ticks % frequency;
    Duration::new(secs, ((rem as u128 * 1_000_000_000) / frequency as u128) as u32)
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::Clock;

    /// Clock that only moves when told to, or when asked to sleep
    #[derive(Clone)]
    pub struct FakeClock {
        pub frequency: u64,
        pub ticks: Rc<Cell<u64>>,
        /// Ticks added by every `now()` call, to emulate a spinning CPU
        pub step: u64,
        pub sleeps: Rc<Cell<u32>>,
        pub yields: Rc<Cell<u32>>,
    }

    impl FakeClock {
        pub fn new(frequency: u64, step: u64) -> Self {
            Self {
                frequency,
                ticks: Rc::new(Cell::new(0)),
                step,
                sleeps: Rc::new(Cell::new(0)),
                yields: Rc::new(Cell::new(0)),
            }
        }

        pub fn advance(&self, ticks: u64) {
            self.ticks.set(self.ticks.get() + ticks);
        }
    }

    impl Clock for FakeClock {
        fn frequency(&self) -> u64 {
            self.frequency
        }

        fn now(&self) -> u64 {
            let now = self.ticks.get();
            self.ticks.set(now + self.step);
            now
        }

        fn sleep_ms(&self, ms: u32) {
            if ms == 0 {
                self.yields.set(self.yields.get() + 1);
            } else {
                self.sleeps.set(self.sleeps.get() + 1);
                self.advance(self.frequency / 1000 * ms as u64);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        assert!(clock.frequency() > 0);
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_ticks_to_duration() {
        assert_eq!(ticks_to_duration(1500, 1000), Duration::from_millis(1500));
        assert_eq!(ticks_to_duration(5, 0), Duration::ZERO);
    }
}
