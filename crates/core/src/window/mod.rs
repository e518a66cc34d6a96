//! Window and display policy
//!
//! Rewrites presentation parameters on the device creation and reset paths
//! and moves the device window to match. Parameter rewrites are pure and
//! run everywhere; window and monitor calls only exist on Windows and are
//! best effort: a failing OS call is logged and its step skipped.

pub mod geometry;
pub mod refresh;
pub mod style;

use d3d9_proxy_sdk::{DisplayModeEx, PresentParameters, D3DPRESENT_DONOTFLIP, D3DPRESENT_RATE_DEFAULT};

use crate::config::Policy;

pub use geometry::{compute_placement, Placement, Rect};
pub use refresh::{clamp_refresh_rate, enumerate_refresh_rates};
pub use style::{ExStyle, WindowMode, WindowStyle};

/// Rewrite a presentation request for windowed presentation
///
/// Windowed swap chains require the default refresh rate, on the display
/// mode too when one is supplied, and reject flags that only make sense
/// for a flipping full-screen chain.
pub fn force_windowed_params(params: &mut PresentParameters, mode: Option<&mut DisplayModeEx>) {
    params.windowed = 1;
    params.full_screen_refresh_rate_in_hz = D3DPRESENT_RATE_DEFAULT;
    params.presentation_interval &= !D3DPRESENT_DONOTFLIP;
    if let Some(mode) = mode {
        mode.refresh_rate = D3DPRESENT_RATE_DEFAULT;
    }
}

/// Window the device targets: its device window, else the focus window
pub fn target_window(params: &PresentParameters, focus: usize) -> usize {
    if params.device_window.is_null() {
        focus
    } else {
        params.device_window as usize
    }
}

/// Force windowed presentation and move the device window into place
///
/// # Arguments
/// * `params` - Presentation parameters the host passed, rewritten in place
/// * `mode` - Full-screen display mode for the `Ex` entry points
/// * `focus` - Focus window captured at device creation
pub fn apply_forced_windowed(
    policy: &Policy,
    params: &mut PresentParameters,
    mode: Option<&mut DisplayModeEx>,
    focus: usize,
) {
    let hwnd = target_window(params, focus);
    force_windowed_params(params, mode);

    if hwnd == 0 {
        tracing::debug!("Forced windowed without a window to place");
        return;
    }

    #[cfg(windows)]
    {
        let (width, height) = (
            params.back_buffer_width as i32,
            params.back_buffer_height as i32,
        );
        place_window(policy, hwnd, width, height);

        if policy.intercepts_messages() {
            crate::hooks::interceptor::intercept_window(hwnd);
        }
    }

    #[cfg(not(windows))]
    let _ = policy;
}

/// Set a fixed refresh rate on a full-screen request
///
/// Windowed requests are left alone.
pub fn apply_fixed_refresh_rate(
    policy: &Policy,
    params: &mut PresentParameters,
    mode: Option<&mut DisplayModeEx>,
) {
    if params.windowed != 0 || !policy.fixes_refresh_rate() {
        return;
    }

    let rates = enumerate_refresh_rates();
    let Some(rate) = clamp_refresh_rate(&rates, policy.fullscreen_refresh_rate) else {
        return;
    };

    tracing::debug!(
        "Full-screen refresh rate {} (configured {})",
        rate,
        policy.fullscreen_refresh_rate
    );
    params.full_screen_refresh_rate_in_hz = rate;
    if let Some(mode) = mode {
        mode.refresh_rate = rate;
    }
}

/// Client area height of `hwnd`
#[cfg(windows)]
pub fn client_height(hwnd: usize) -> Option<i32> {
    use windows_sys::Win32::Foundation::RECT;
    use windows_sys::Win32::UI::WindowsAndMessaging::GetClientRect;

    if hwnd == 0 {
        return None;
    }
    let mut rect = RECT {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };
    // SAFETY: rect is a valid out pointer
    if unsafe { GetClientRect(hwnd as _, &mut rect) } == 0 {
        return None;
    }
    Some(rect.bottom - rect.top)
}

#[cfg(not(windows))]
pub fn client_height(_hwnd: usize) -> Option<i32> {
    None
}

#[cfg(windows)]
fn place_window(policy: &Policy, hwnd: usize, width: i32, height: i32) {
    use d3d9_proxy_sdk::win32::{SWP_FRAMECHANGED, SWP_NOMOVE, SWP_SHOWWINDOW};
    use windows_sys::Win32::Foundation::RECT;
    use windows_sys::Win32::Graphics::Gdi::{
        GetMonitorInfoW, MonitorFromWindow, MONITORINFO, MONITOR_DEFAULTTONEAREST,
        MONITOR_DEFAULTTOPRIMARY,
    };
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        AdjustWindowRectEx, GetClientRect, GetDesktopWindow, GetMenu, GetWindowLongW,
        SetWindowLongW, SetWindowPos, GWL_EXSTYLE, GWL_STYLE, HWND_NOTOPMOST, HWND_TOPMOST,
    };

    let window = hwnd as windows_sys::Win32::Foundation::HWND;

    // SAFETY: every call below tolerates a stale window handle
    unsafe {
        let monitor = if policy.use_primary_monitor {
            MonitorFromWindow(GetDesktopWindow(), MONITOR_DEFAULTTOPRIMARY)
        } else {
            MonitorFromWindow(window, MONITOR_DEFAULTTONEAREST)
        };
        let mut info: MONITORINFO = std::mem::zeroed();
        info.cbSize = std::mem::size_of::<MONITORINFO>() as u32;
        if GetMonitorInfoW(monitor, &mut info) == 0 {
            tracing::debug!("GetMonitorInfoW failed for window {:#x}", hwnd);
            return;
        }
        let monitor_rect = Rect::new(
            info.rcMonitor.left,
            info.rcMonitor.top,
            info.rcMonitor.right,
            info.rcMonitor.bottom,
        );

        let (mut width, mut height) = (width, height);
        if width <= 0 || height <= 0 {
            let mut client: RECT = std::mem::zeroed();
            GetClientRect(window, &mut client);
            width = client.right - client.left;
            height = client.bottom - client.top;
        }

        let old_style = WindowStyle::from_bits_retain(GetWindowLongW(window, GWL_STYLE) as u32);
        let old_ex = ExStyle::from_bits_retain(GetWindowLongW(window, GWL_EXSTYLE) as u32);
        let (style, ex_style) = policy.window_mode.apply(old_style, old_ex);

        let mut flags = SWP_SHOWWINDOW;
        if (style, ex_style) != (old_style, old_ex) {
            SetWindowLongW(window, GWL_STYLE, style.bits() as i32);
            SetWindowLongW(window, GWL_EXSTYLE, ex_style.bits() as i32);
            flags |= SWP_FRAMECHANGED;
        }

        if policy.window_mode.is_bordered() {
            let mut frame = RECT {
                left: 0,
                top: 0,
                right: width,
                bottom: height,
            };
            let has_menu = !GetMenu(window).is_null() as i32;
            if AdjustWindowRectEx(&mut frame, style.bits(), has_menu, ex_style.bits()) != 0 {
                width = frame.right - frame.left;
                height = frame.bottom - frame.top;
            }
        }

        let placement =
            compute_placement(monitor_rect, width, height, policy.fills_monitor(), policy.center_window);
        if !placement.reposition {
            flags |= SWP_NOMOVE;
        }

        let insert_after = if policy.always_on_top {
            HWND_TOPMOST
        } else {
            HWND_NOTOPMOST
        };
        if SetWindowPos(
            window,
            insert_after,
            placement.x,
            placement.y,
            placement.width,
            placement.height,
            flags,
        ) == 0
        {
            tracing::debug!("SetWindowPos failed for window {:#x}", hwnd);
            return;
        }

        tracing::debug!(
            "Placed window {:#x} at ({}, {}) {}x{} ({:?})",
            hwnd,
            placement.x,
            placement.y,
            placement.width,
            placement.height,
            policy.window_mode
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fullscreen_params() -> PresentParameters {
        PresentParameters {
            back_buffer_width: 1280,
            back_buffer_height: 720,
            windowed: 0,
            full_screen_refresh_rate_in_hz: 144,
            presentation_interval: D3DPRESENT_DONOTFLIP | 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_force_windowed_params() {
        let mut params = fullscreen_params();
        let mut mode = DisplayModeEx {
            refresh_rate: 144,
            ..Default::default()
        };
        force_windowed_params(&mut params, Some(&mut mode));

        assert_eq!(params.windowed, 1);
        assert_eq!(params.full_screen_refresh_rate_in_hz, D3DPRESENT_RATE_DEFAULT);
        assert_eq!(params.presentation_interval, 1);
        assert_eq!(mode.refresh_rate, D3DPRESENT_RATE_DEFAULT);
        assert_eq!(params.back_buffer_width, 1280);
    }

    #[test]
    fn test_target_window_prefers_device_window() {
        let mut params = fullscreen_params();
        assert_eq!(target_window(&params, 0x40), 0x40);
        params.device_window = 0x80 as *mut _;
        assert_eq!(target_window(&params, 0x40), 0x80);
    }

    #[test]
    fn test_refresh_rate_skips_windowed() {
        let policy = Policy {
            fullscreen_refresh_rate: 100,
            ..Policy::default()
        };
        let mut params = PresentParameters {
            windowed: 1,
            ..Default::default()
        };
        apply_fixed_refresh_rate(&policy, &mut params, None);
        assert_eq!(params.full_screen_refresh_rate_in_hz, 0);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_refresh_rate_applies_to_fullscreen() {
        let policy = Policy {
            fullscreen_refresh_rate: 100,
            ..Policy::default()
        };
        let mut params = fullscreen_params();
        let mut mode = DisplayModeEx::default();
        apply_fixed_refresh_rate(&policy, &mut params, Some(&mut mode));
        assert_eq!(params.full_screen_refresh_rate_in_hz, 100);
        assert_eq!(mode.refresh_rate, 100);
    }

    #[test]
    fn test_forced_windowed_without_window() {
        let policy = Policy {
            force_windowed: true,
            ..Policy::default()
        };
        let mut params = fullscreen_params();
        apply_forced_windowed(&policy, &mut params, None, 0);
        assert_eq!(params.windowed, 1);
    }
}
