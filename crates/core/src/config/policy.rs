//! Immutable policy snapshot
//!
//! Built once from [`ProxyConfig`] at attach and shared read-only.

use std::time::Duration;

use super::ProxyConfig;
use crate::limiter::LimitMode;
use crate::window::WindowMode;

/// Every flag the proxy, window policy and hooks consult
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub force_windowed: bool,
    pub use_primary_monitor: bool,
    pub center_window: bool,
    pub window_mode: WindowMode,
    pub always_on_top: bool,
    pub ignore_focus_loss: bool,
    pub capture_mouse: bool,
    pub fps_limit: i64,
    pub fps_limit_mode: LimitMode,
    pub show_fps: bool,
    /// Full-screen refresh rate override, 0 when disabled
    pub fullscreen_refresh_rate: i64,
    pub hook_modules: bool,
    pub delay_load_wait: Duration,
}

impl Default for Policy {
    fn default() -> Self {
        Self::from_config(&ProxyConfig::default())
    }
}

impl Policy {
    /// Resolve defaults for absent or malformed keys
    pub fn from_config(config: &ProxyConfig) -> Self {
        let main = &config.main;
        let windowed = &config.forcewindowed;

        let fps_limit = main.fps_limit.unwrap_or(0);
        let borderless = windowed.borderless_fullscreen.unwrap_or(false);
        let window_mode = match WindowMode::from_config(windowed.window_mode.unwrap_or(0)) {
            WindowMode::Keep if borderless => WindowMode::BorderlessFullscreen,
            mode => mode,
        };

        Self {
            force_windowed: main.force_windowed.unwrap_or(false),
            use_primary_monitor: windowed.use_primary_monitor.unwrap_or(false),
            center_window: windowed.center_window.unwrap_or(true),
            window_mode,
            always_on_top: windowed.always_on_top.unwrap_or(false),
            ignore_focus_loss: windowed.ignore_focus_loss.unwrap_or(false),
            capture_mouse: windowed.capture_mouse.unwrap_or(false),
            fps_limit: fps_limit.max(0),
            fps_limit_mode: LimitMode::from_config(fps_limit, main.fps_limit_mode.unwrap_or(1)),
            show_fps: main.show_fps.unwrap_or(false),
            fullscreen_refresh_rate: main.fullscreen_refresh_rate.unwrap_or(0),
            hook_modules: main.hook_modules.unwrap_or(false),
            delay_load_wait: Duration::from_millis(
                config.hooks.delay_load_wait_ms.unwrap_or(1000).max(0) as u64,
            ),
        }
    }

    /// Whether window procedures need intercepting
    pub fn intercepts_messages(&self) -> bool {
        self.ignore_focus_loss || self.capture_mouse || self.always_on_top
    }

    /// Whether the fixed-refresh-rate policy is active
    pub fn fixes_refresh_rate(&self) -> bool {
        self.fullscreen_refresh_rate != 0
    }

    /// Whether the window should fill its monitor rather than match the back buffer
    pub fn fills_monitor(&self) -> bool {
        self.window_mode == WindowMode::BorderlessFullscreen
    }
}
