//! Process attach/detach lifecycle
//!
//! Everything the proxy consults at call time lives in one [`Runtime`]
//! created at attach: the policy snapshot, the frame limiter with its
//! overlay, and the focus window captured at device creation.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::config::Policy;
use crate::limiter::{FontFactory, FpsOverlay, FrameLimiter, LimitMode};
use crate::timing::{Clock, SystemClock};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Shared proxy state
pub struct Runtime {
    policy: Arc<Policy>,
    limiter: Mutex<FrameLimiter<SystemClock>>,
    focus_window: AtomicUsize,
    /// A 1 ms timer period was requested and must be released
    timer_period: AtomicBool,
}

impl Runtime {
    pub fn new(policy: Arc<Policy>, limiter: FrameLimiter<SystemClock>) -> Self {
        Self {
            policy,
            limiter: Mutex::new(limiter),
            focus_window: AtomicUsize::new(0),
            timer_period: AtomicBool::new(false),
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn shared_policy(&self) -> Arc<Policy> {
        Arc::clone(&self.policy)
    }

    /// Focus window captured at the last device creation, 0 if none
    pub fn focus_window(&self) -> usize {
        self.focus_window.load(Ordering::Acquire)
    }

    /// Record the focus window; null windows are ignored
    pub fn set_focus_window(&self, hwnd: usize) {
        if hwnd != 0 {
            self.focus_window.store(hwnd, Ordering::Release);
        }
    }

    /// Run `f` with exclusive access to the limiter
    pub fn with_limiter<R>(&self, f: impl FnOnce(&mut FrameLimiter<SystemClock>) -> R) -> R {
        f(&mut self.limiter.lock())
    }
}

/// The runtime, once attached
pub fn get() -> Option<&'static Runtime> {
    RUNTIME.get()
}

/// Frame limiter configured by `policy`
///
/// The overlay is attached only when `show_fps` is set.
pub fn build_limiter<C: Clock>(
    policy: &Policy,
    clock: C,
    fonts: impl FnOnce() -> Box<dyn FontFactory>,
) -> FrameLimiter<C> {
    let limiter = FrameLimiter::new(clock, policy.fps_limit_mode, policy.fps_limit as f64);
    if policy.show_fps {
        limiter.with_overlay(FpsOverlay::new(fonts()))
    } else {
        limiter
    }
}

/// Bring the proxy up inside the host process
///
/// Loads the system d3d9.dll, sets up pacing and, when enabled, module
/// hooking. Failures are logged; entry points whose real counterpart is
/// missing answer with their failure sentinel.
///
/// # Arguments
/// * `own_module` - Base address of the proxy module
/// * `config` - Config read at attach
#[cfg(windows)]
#[tracing::instrument(skip_all)]
pub fn attach(own_module: usize, config: &crate::config::ProxyConfig) {
    use crate::limiter::D3dxFontFactory;
    use d3d9_proxy_engine::{init_real, load_system_library, RealLibrary};

    let policy = Arc::new(Policy::from_config(config));
    tracing::debug!("Policy: {:?}", policy);

    match load_system_library() {
        Ok((module, entry_points)) => {
            if let Err(e) = init_real(RealLibrary::new(module, entry_points)) {
                tracing::warn!("{}", e);
            }
        }
        Err(e) => tracing::error!("Failed to load system d3d9.dll: {}", e),
    }

    let limiter = build_limiter(&policy, SystemClock::new(), || {
        Box::new(D3dxFontFactory::new())
    });
    let accurate = limiter.mode() == LimitMode::Accurate;

    let runtime = RUNTIME.get_or_init(|| Runtime::new(Arc::clone(&policy), limiter));
    if accurate && begin_timer_period() {
        runtime.timer_period.store(true, Ordering::Release);
    }

    if policy.hook_modules {
        crate::hooks::controller::enable(own_module, policy.delay_load_wait);
    }

    tracing::info!("d3d9 proxy attached");
}

/// Tear down at process detach
#[cfg(windows)]
pub fn detach() {
    if let Some(runtime) = RUNTIME.get() {
        if runtime.timer_period.swap(false, Ordering::AcqRel) {
            end_timer_period();
        }
    }
    d3d9_proxy_engine::release_real();
    tracing::info!("d3d9 proxy detached");
}

#[cfg(windows)]
fn begin_timer_period() -> bool {
    use windows_sys::Win32::Media::timeBeginPeriod;

    // SAFETY: no preconditions; paired with timeEndPeriod at detach
    let result = unsafe { timeBeginPeriod(1) };
    if result != 0 {
        tracing::debug!("timeBeginPeriod(1) failed: {}", result);
    }
    result == 0
}

#[cfg(windows)]
fn end_timer_period() {
    use windows_sys::Win32::Media::timeEndPeriod;

    // SAFETY: a matching timeBeginPeriod(1) succeeded
    unsafe { timeEndPeriod(1) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use crate::limiter::OverlayFont;
    use crate::timing::fake::FakeClock;

    struct NoFonts;

    impl FontFactory for NoFonts {
        fn create_font(&mut self, _device: usize, _height: i32) -> Option<Box<dyn OverlayFont>> {
            None
        }
    }

    fn policy(toml: &str) -> Policy {
        Policy::from_config(&ProxyConfig::from_toml_str(toml).unwrap())
    }

    #[test]
    fn test_limiter_follows_policy() {
        let limiter = build_limiter(
            &policy("[main]\nfps_limit = 60\nfps_limit_mode = 2\n"),
            FakeClock::new(1_000_000, 0),
            || Box::new(NoFonts),
        );
        assert_eq!(limiter.mode(), LimitMode::Accurate);
        assert!(!limiter.has_overlay());

        let limiter = build_limiter(&policy("[main]\nshow_fps = 1\n"), FakeClock::new(1_000_000, 0), || {
            Box::new(NoFonts)
        });
        assert_eq!(limiter.mode(), LimitMode::None);
        assert!(limiter.has_overlay());
    }

    #[test]
    fn test_focus_window_ignores_null() {
        let policy = Arc::new(Policy::default());
        let limiter = build_limiter(&policy, SystemClock::new(), || Box::new(NoFonts));
        let runtime = Runtime::new(Arc::clone(&policy), limiter);

        assert_eq!(runtime.focus_window(), 0);
        runtime.set_focus_window(0x10);
        runtime.set_focus_window(0);
        assert_eq!(runtime.focus_window(), 0x10);
        assert!(Arc::ptr_eq(&runtime.shared_policy(), &policy));
        assert_eq!(runtime.with_limiter(|limiter| limiter.mode()), LimitMode::None);
    }
}
