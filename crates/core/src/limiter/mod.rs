//! Frame limiter
//!
//! Two pacing laws are available:
//! - [`LimitMode::Realtime`] counts whole frame slots of `1/fps` seconds and
//!   busy-waits between them. The CPU spins for the whole gap, which keeps
//!   jitter minimal.
//! - [`LimitMode::Accurate`] counts milliseconds, sleeps ~1ms while more than
//!   2ms remain and only yields for the last stretch.
//!
//! The limiter also owns the optional FPS overlay, since both share the
//! render thread and the same counter.

#[cfg(windows)]
pub mod d3dx;
pub mod overlay;

use crate::timing::{Clock, SystemClock};

#[cfg(windows)]
pub use d3dx::D3dxFontFactory;
pub use overlay::{FontFactory, FpsOverlay, OverlayFont};

/// Remaining gap above which the accurate law sleeps instead of yielding
const SLEEP_THRESHOLD_MS: f64 = 2.0;

/// Pacing law applied before each present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitMode {
    /// Present calls pass straight through
    #[default]
    None,
    /// Busy-wait tick counting
    Realtime,
    /// Sleep-assisted pacing
    Accurate,
}

impl LimitMode {
    /// Map the `fps_limit_mode` config value (2 = accurate, anything else realtime)
    pub fn from_config(fps_limit: i64, mode: i64) -> Self {
        if fps_limit <= 0 {
            LimitMode::None
        } else if mode == 2 {
            LimitMode::Accurate
        } else {
            LimitMode::Realtime
        }
    }
}

/// Frame pacing state plus the overlay
pub struct FrameLimiter<C: Clock = SystemClock> {
    clock: C,
    mode: LimitMode,
    /// Counter ticks per frame slot (realtime) or per millisecond (accurate)
    scale: f64,
    /// Reference time in scaled units
    reference: f64,
    /// Target frame duration in milliseconds (accurate only)
    frame_time_ms: f64,
    overlay: Option<FpsOverlay>,
}

impl<C: Clock> FrameLimiter<C> {
    /// Initialize the limiter
    ///
    /// Falls back to [`LimitMode::None`] when the counter is unavailable or
    /// the target is not positive.
    pub fn new(clock: C, mode: LimitMode, target_fps: f64) -> Self {
        let frequency = clock.frequency();
        let mode = if mode != LimitMode::None && (frequency == 0 || target_fps <= 0.0) {
            tracing::warn!(
                "Frame limiter disabled (frequency={}, target={})",
                frequency,
                target_fps
            );
            LimitMode::None
        } else {
            mode
        };

        let (scale, frame_time_ms) = match mode {
            LimitMode::None => (1.0, 0.0),
            LimitMode::Realtime => (frequency as f64 / target_fps, 0.0),
            LimitMode::Accurate => (frequency as f64 / 1000.0, 1000.0 / target_fps),
        };

        let mut limiter = Self {
            clock,
            mode,
            scale,
            reference: 0.0,
            frame_time_ms,
            overlay: None,
        };
        limiter.reference = limiter.scaled_now();

        if mode != LimitMode::None {
            tracing::info!("Frame limiter: {:?} at {} fps", mode, target_fps);
        }
        limiter
    }

    /// Attach the FPS overlay
    pub fn with_overlay(mut self, overlay: FpsOverlay) -> Self {
        self.overlay = Some(overlay);
        self
    }

    /// Active pacing law
    pub fn mode(&self) -> LimitMode {
        self.mode
    }

    /// Target frame duration in milliseconds (accurate mode)
    pub fn frame_time_ms(&self) -> f64 {
        self.frame_time_ms
    }

    fn scaled_now(&self) -> f64 {
        self.clock.now() as f64 / self.scale
    }

    /// Whole frame slots elapsed since the previous call
    ///
    /// Non-zero means the caller may present; zero means spin and retry.
    pub fn sync_realtime(&mut self) -> u32 {
        let last = self.reference as u64;
        self.reference = self.scaled_now();
        let current = self.reference as u64;

        current.saturating_sub(last).min(u32::MAX as u64) as u32
    }

    /// Returns true once the target frame duration has elapsed
    ///
    /// While waiting, sleeps ~1ms if more than 2ms remain, else yields.
    pub fn sync_accurate(&mut self) -> bool {
        let now = self.scaled_now();
        let elapsed = now - self.reference;

        if self.frame_time_ms <= elapsed {
            self.reference = now;
            return true;
        }

        if self.frame_time_ms - elapsed > SLEEP_THRESHOLD_MS {
            self.clock.sleep_ms(1);
        } else {
            self.clock.sleep_ms(0);
        }
        false
    }

    /// Block until the active pacing law lets the next frame through
    pub fn wait(&mut self) {
        match self.mode {
            LimitMode::None => {}
            LimitMode::Realtime => while self.sync_realtime() == 0 {},
            LimitMode::Accurate => while !self.sync_accurate() {},
        }
    }

    /// Record a frame and draw the counter, if the overlay is enabled
    ///
    /// # Arguments
    /// * `device` - Real device pointer the fonts are created on
    /// * `client_height` - Height of the render window's client area
    pub fn show_overlay(&mut self, device: usize, client_height: i32) {
        let now = self.clock.now();
        let frequency = self.clock.frequency();
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.show(device, client_height, now, frequency);
        }
    }

    /// Whether the overlay is enabled
    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    /// Release overlay fonts ahead of a device replacement
    pub fn on_device_replaced(&mut self) {
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.release_fonts();
        }
    }

    /// Notify overlay fonts that the device is about to be reset
    pub fn on_lost_device(&mut self) {
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.on_lost_device();
        }
    }

    /// Notify overlay fonts that the device was reset successfully
    pub fn on_reset_device(&mut self) {
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.on_reset_device();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::fake::FakeClock;

    #[test]
    fn test_mode_from_config() {
        assert_eq!(LimitMode::from_config(0, 2), LimitMode::None);
        assert_eq!(LimitMode::from_config(-5, 1), LimitMode::None);
        assert_eq!(LimitMode::from_config(60, 1), LimitMode::Realtime);
        assert_eq!(LimitMode::from_config(60, 0), LimitMode::Realtime);
        assert_eq!(LimitMode::from_config(60, 2), LimitMode::Accurate);
    }

    #[test]
    fn test_disabled_without_counter() {
        let clock = FakeClock::new(0, 1);
        let limiter = FrameLimiter::new(clock, LimitMode::Realtime, 60.0);
        assert_eq!(limiter.mode(), LimitMode::None);
    }

    #[test]
    fn test_realtime_once_per_slot() {
        // 1000 ticks/s, 10 fps => one slot every 100 ticks, clock moves 1 tick per read
        let clock = FakeClock::new(1000, 1);
        let mut limiter = FrameLimiter::new(clock.clone(), LimitMode::Realtime, 10.0);

        let mut go_ticks = Vec::new();
        while clock.ticks.get() < 1000 {
            if limiter.sync_realtime() != 0 {
                go_ticks.push(clock.ticks.get());
            }
        }

        assert_eq!(go_ticks.len(), 9);
        for pair in go_ticks.windows(2) {
            assert!(pair[1] - pair[0] >= 99, "slots too close: {:?}", pair);
        }
    }

    #[test]
    fn test_realtime_reports_skipped_slots() {
        let clock = FakeClock::new(1000, 0);
        let mut limiter = FrameLimiter::new(clock.clone(), LimitMode::Realtime, 10.0);

        clock.advance(350);
        assert_eq!(limiter.sync_realtime(), 3);
        assert_eq!(limiter.sync_realtime(), 0);
    }

    #[test]
    fn test_accurate_respects_frame_time() {
        // 1 MHz counter, 10us per read, 100 fps => 10ms frames
        let clock = FakeClock::new(1_000_000, 10);
        let mut limiter = FrameLimiter::new(clock.clone(), LimitMode::Accurate, 100.0);
        assert_eq!(limiter.frame_time_ms(), 10.0);

        let mut last = clock.ticks.get();
        for _ in 0..5 {
            limiter.wait();
            let now = clock.ticks.get();
            assert!(now - last >= 10_000, "go after {} ticks", now - last);
            last = now;
        }

        assert!(clock.sleeps.get() > 0);
        assert!(clock.yields.get() > 0);
    }

    #[test]
    fn test_accurate_sleeps_only_when_far() {
        let clock = FakeClock::new(1_000_000, 0);
        let mut limiter = FrameLimiter::new(clock.clone(), LimitMode::Accurate, 100.0);

        // 9ms in: 1ms remaining, yield only
        clock.advance(9_000);
        assert!(!limiter.sync_accurate());
        assert_eq!(clock.sleeps.get(), 0);
        assert_eq!(clock.yields.get(), 1);

        clock.advance(1_000);
        assert!(limiter.sync_accurate());
    }

    #[test]
    fn test_none_mode_never_blocks() {
        let clock = FakeClock::new(1000, 0);
        let mut limiter = FrameLimiter::new(clock.clone(), LimitMode::None, 0.0);
        limiter.wait();
        assert_eq!(clock.ticks.get(), 0);
    }
}
