//! Entry points re-exported from the system d3d9.dll
//!
//! Each export calls the real function when it resolved and otherwise
//! answers with a failure value for its return type. The two factory
//! entry points hand out proxies instead of the real objects.

#![allow(non_snake_case)]

use std::ffi::c_void;

use d3d9_proxy_core::{wrap_direct3d, wrap_direct3d_ex};
use d3d9_proxy_engine::entry_points;
use d3d9_proxy_sdk::{succeeded, HResult, IDirect3D9, E_FAIL};

macro_rules! forward {
    ($(
        $(#[$meta:meta])*
        fn $name:ident($($arg:ident: $ty:ty),*) $(-> $ret:ty)? = $field:ident else $sentinel:expr;
    )*) => {
        $(
            $(#[$meta])*
            ///
            /// # Safety
            /// Arguments are passed to the real function unchecked.
            #[no_mangle]
            pub unsafe extern "system" fn $name($($arg: $ty),*) $(-> $ret)? {
                match entry_points().$field {
                    Some(real) => real($($arg),*),
                    None => $sentinel,
                }
            }
        )*
    };
}

forward! {
    /// Returns null when the real library lacks it
    fn Direct3DShaderValidatorCreate9() -> *mut c_void = shader_validator_create9 else std::ptr::null_mut();
    fn PSGPError(context: *mut c_void, error: u32, value: u32) -> HResult = psgp_error else E_FAIL;
    fn PSGPSampleTexture(
        context: *mut c_void,
        stage: u32,
        coords: *mut [f32; 4],
        count: u32,
        result: *mut [f32; 4]
    ) -> HResult = psgp_sample_texture else E_FAIL;
    fn D3DPERF_BeginEvent(color: u32, name: *const u16) -> i32 = perf_begin_event else 0;
    fn D3DPERF_EndEvent() -> i32 = perf_end_event else 0;
    fn D3DPERF_GetStatus() -> u32 = perf_get_status else 0;
    fn D3DPERF_QueryRepeatFrame() -> i32 = perf_query_repeat_frame else 0;
    fn D3DPERF_SetMarker(color: u32, name: *const u16) = perf_set_marker else ();
    fn D3DPERF_SetOptions(options: u32) = perf_set_options else ();
    fn D3DPERF_SetRegion(color: u32, name: *const u16) = perf_set_region else ();
    fn DebugSetLevel(level: u32) -> HResult = debug_set_level else E_FAIL;
    fn DebugSetMute() = debug_set_mute else ();
    fn Direct3D9EnableMaximizedWindowedModeShim(enable: i32) -> i32 =
        enable_maximized_windowed_mode_shim else 0;
}

/// Create a factory and hand out its proxy
///
/// # Safety
/// Called by the host with the d3d9 contract.
#[no_mangle]
pub unsafe extern "system" fn Direct3DCreate9(sdk_version: u32) -> *mut IDirect3D9 {
    let Some(create) = entry_points().direct3d_create9 else {
        return std::ptr::null_mut();
    };
    let real = create(sdk_version);
    if real.is_null() {
        tracing::warn!("Direct3DCreate9({}) returned null", sdk_version);
        return real;
    }
    wrap_direct3d(real)
}

/// Create an `Ex` factory and hand out its proxy
///
/// # Safety
/// Called by the host with the d3d9 contract.
#[no_mangle]
pub unsafe extern "system" fn Direct3DCreate9Ex(
    sdk_version: u32,
    out: *mut *mut IDirect3D9,
) -> HResult {
    let Some(create) = entry_points().direct3d_create9_ex else {
        return E_FAIL;
    };
    let hr = create(sdk_version, out);
    if succeeded(hr) && !out.is_null() {
        *out = wrap_direct3d_ex(*out);
    }
    hr
}
