//! Policy call sites on the d3d9 interfaces
//!
//! Only the methods below differ from the wrapped object. Each one applies
//! its policy, then calls the wrapped method and returns its result
//! unchanged.

use std::ffi::c_void;

use d3d9_proxy_sdk::slots::{self, device9, direct3d9, swap_chain9};
use d3d9_proxy_sdk::{
    succeeded, DisplayModeEx, Guid, HResult, IDirect3D9, PresentParameters, IID_IDIRECT3D9EX,
    IID_IDIRECT3DDEVICE9, IID_IDIRECT3DDEVICE9EX,
};

use super::{
    method, release as release_proxy, wrap, wrap_as, wrap_proxy_as, ComProxy, InterfaceKind,
    Override,
};
use crate::config::Policy;
use crate::runtime;
use crate::window::{apply_fixed_refresh_rate, apply_forced_windowed, target_window};

type Hwnd = *mut c_void;

type QueryInterfaceFn = unsafe extern "system" fn(*mut c_void, *const Guid, *mut *mut c_void) -> HResult;
type CreateDeviceFn = unsafe extern "system" fn(
    *mut c_void,
    u32,
    u32,
    Hwnd,
    u32,
    *mut PresentParameters,
    *mut *mut c_void,
) -> HResult;
type CreateDeviceExFn = unsafe extern "system" fn(
    *mut c_void,
    u32,
    u32,
    Hwnd,
    u32,
    *mut PresentParameters,
    *mut DisplayModeEx,
    *mut *mut c_void,
) -> HResult;
type GetObjectFn = unsafe extern "system" fn(*mut c_void, *mut *mut c_void) -> HResult;
type CreateSwapChainFn =
    unsafe extern "system" fn(*mut c_void, *mut PresentParameters, *mut *mut c_void) -> HResult;
type GetSwapChainFn = unsafe extern "system" fn(*mut c_void, u32, *mut *mut c_void) -> HResult;
type ResetFn = unsafe extern "system" fn(*mut c_void, *mut PresentParameters) -> HResult;
type ResetExFn =
    unsafe extern "system" fn(*mut c_void, *mut PresentParameters, *mut DisplayModeEx) -> HResult;
type PresentFn =
    unsafe extern "system" fn(*mut c_void, *const c_void, *const c_void, Hwnd, *const c_void) -> HResult;
type PresentExFn = unsafe extern "system" fn(
    *mut c_void,
    *const c_void,
    *const c_void,
    Hwnd,
    *const c_void,
    u32,
) -> HResult;
type EndSceneFn = unsafe extern "system" fn(*mut c_void) -> HResult;

/// Override table for `kind`; resource methods come from [`super::resources`]
pub fn overrides(kind: InterfaceKind) -> Vec<Override> {
    let mut table: Vec<Override> = vec![
        (slots::QUERY_INTERFACE, query_interface as usize),
        (slots::RELEASE, release as usize),
    ];
    match kind {
        InterfaceKind::Direct3D => table.extend([
            (direct3d9::CREATE_DEVICE, create_device as usize),
            (direct3d9::CREATE_DEVICE_EX, create_device_ex as usize),
        ]),
        InterfaceKind::Device => table.extend([
            (device9::GET_DIRECT3D, get_direct3d as usize),
            (
                device9::CREATE_ADDITIONAL_SWAP_CHAIN,
                create_additional_swap_chain as usize,
            ),
            (device9::GET_SWAP_CHAIN, get_swap_chain as usize),
            (device9::RESET, reset as usize),
            (device9::PRESENT, present as usize),
            (device9::END_SCENE, end_scene as usize),
            (device9::PRESENT_EX, present_ex as usize),
            (device9::RESET_EX, reset_ex as usize),
        ]),
        InterfaceKind::SwapChain => table.extend([
            (swap_chain9::PRESENT, swap_chain_present as usize),
            (swap_chain9::GET_DEVICE, swap_chain_get_device as usize),
        ]),
        _ => {}
    }
    table
}

/// Proxy for a factory returned by `Direct3DCreate9`
///
/// # Safety
/// `real` must be null or a live IDirect3D9.
pub unsafe fn wrap_direct3d(real: *mut IDirect3D9) -> *mut IDirect3D9 {
    wrap(real.cast(), InterfaceKind::Direct3D, std::ptr::null_mut()).cast()
}

/// Proxy for a factory returned by `Direct3DCreate9Ex`
///
/// # Safety
/// `real` must be null or a live IDirect3D9Ex.
pub unsafe fn wrap_direct3d_ex(real: *mut IDirect3D9) -> *mut IDirect3D9 {
    wrap_as(real.cast(), InterfaceKind::Direct3D, IID_IDIRECT3D9EX, std::ptr::null_mut()).cast()
}

/// Rewrite a device creation or reset request under `policy`
///
/// Forced windowed presentation comes first, so the fixed refresh rate
/// only ever applies to requests still full-screen afterwards.
pub fn prepare_device_request(
    policy: &Policy,
    params: &mut PresentParameters,
    mut mode: Option<&mut DisplayModeEx>,
    focus: usize,
) {
    if policy.force_windowed {
        apply_forced_windowed(policy, params, mode.as_deref_mut(), focus);
    }
    apply_fixed_refresh_rate(policy, params, mode);
}

/// Focus window of a creation request: the argument, else the device window
fn effective_focus(focus: Hwnd, params: *const PresentParameters) -> usize {
    if !focus.is_null() {
        return focus as usize;
    }
    // SAFETY: the host passes null or valid parameters
    unsafe { params.as_ref() }.map_or(0, |params| params.device_window as usize)
}

/// Policy applied before a new device is created
unsafe fn before_create(
    params: *mut PresentParameters,
    mode: *mut DisplayModeEx,
    focus: usize,
) {
    let Some(runtime) = runtime::get() else {
        return;
    };
    runtime.set_focus_window(focus);
    if let Some(params) = params.as_mut() {
        prepare_device_request(runtime.policy(), params, mode.as_mut(), focus);
    }
    // Fonts belong to the device being replaced
    runtime.with_limiter(|limiter| limiter.on_device_replaced());
}

unsafe fn wrap_device(
    out: *mut *mut c_void,
    iid: Guid,
    factory: *mut ComProxy,
    params: *const PresentParameters,
    focus: usize,
) {
    if out.is_null() {
        return;
    }
    if let Some(device) = wrap_proxy_as(*out, InterfaceKind::Device, iid, factory) {
        let window = params
            .as_ref()
            .map_or(focus, |params| target_window(params, focus));
        (*device).set_window(window);
        *out = device.cast();
    }
}

/// Policy applied before a reset; fonts are told the device is lost
unsafe fn before_reset(this: *mut ComProxy, params: *mut PresentParameters, mode: *mut DisplayModeEx) {
    let Some(runtime) = runtime::get() else {
        return;
    };
    let focus = runtime.focus_window();
    if let Some(params) = params.as_mut() {
        prepare_device_request(runtime.policy(), params, mode.as_mut(), focus);
        (*this).set_window(target_window(params, focus));
    }
    runtime.with_limiter(|limiter| limiter.on_lost_device());
}

fn after_reset(hr: HResult) {
    if !succeeded(hr) {
        return;
    }
    if let Some(runtime) = runtime::get() {
        runtime.with_limiter(|limiter| limiter.on_reset_device());
    }
}

fn pace() {
    if let Some(runtime) = runtime::get() {
        runtime.with_limiter(|limiter| limiter.wait());
    }
}

unsafe extern "system" fn query_interface(
    this: *mut ComProxy,
    riid: *const Guid,
    out: *mut *mut c_void,
) -> HResult {
    let proxy = &*this;
    let hr = method::<QueryInterfaceFn>(proxy.real, slots::QUERY_INTERFACE)(proxy.real, riid, out);
    if !succeeded(hr) || out.is_null() {
        return hr;
    }
    if let Some(iid) = riid.as_ref().filter(|iid| proxy.kind.represents(iid)) {
        *out = wrap_as(*out, proxy.kind, *iid, proxy.parent);
    }
    hr
}

unsafe extern "system" fn release(this: *mut ComProxy) -> u32 {
    release_proxy(this)
}

unsafe extern "system" fn create_device(
    this: *mut ComProxy,
    adapter: u32,
    device_type: u32,
    focus: Hwnd,
    behavior: u32,
    params: *mut PresentParameters,
    out: *mut *mut c_void,
) -> HResult {
    let real = (*this).real;
    let focus_window = effective_focus(focus, params);
    before_create(params, std::ptr::null_mut(), focus_window);

    let hr = method::<CreateDeviceFn>(real, direct3d9::CREATE_DEVICE)(
        real,
        adapter,
        device_type,
        focus,
        behavior,
        params,
        out,
    );
    if succeeded(hr) {
        wrap_device(out, IID_IDIRECT3DDEVICE9, this, params, focus_window);
    } else {
        tracing::warn!("CreateDevice failed: {:#010x}", hr);
    }
    hr
}

unsafe extern "system" fn create_device_ex(
    this: *mut ComProxy,
    adapter: u32,
    device_type: u32,
    focus: Hwnd,
    behavior: u32,
    params: *mut PresentParameters,
    mode: *mut DisplayModeEx,
    out: *mut *mut c_void,
) -> HResult {
    let real = (*this).real;
    let focus_window = effective_focus(focus, params);
    before_create(params, mode, focus_window);

    let hr = method::<CreateDeviceExFn>(real, direct3d9::CREATE_DEVICE_EX)(
        real,
        adapter,
        device_type,
        focus,
        behavior,
        params,
        mode,
        out,
    );
    if succeeded(hr) {
        wrap_device(out, IID_IDIRECT3DDEVICE9EX, this, params, focus_window);
    } else {
        tracing::warn!("CreateDeviceEx failed: {:#010x}", hr);
    }
    hr
}

unsafe extern "system" fn get_direct3d(this: *mut ComProxy, out: *mut *mut c_void) -> HResult {
    let real = (*this).real;
    let hr = method::<GetObjectFn>(real, device9::GET_DIRECT3D)(real, out);
    if succeeded(hr) && !out.is_null() {
        // The cache hands back the factory proxy that created this device
        *out = wrap(*out, InterfaceKind::Direct3D, std::ptr::null_mut());
    }
    hr
}

unsafe extern "system" fn create_additional_swap_chain(
    this: *mut ComProxy,
    params: *mut PresentParameters,
    out: *mut *mut c_void,
) -> HResult {
    let real = (*this).real;
    let hr = method::<CreateSwapChainFn>(real, device9::CREATE_ADDITIONAL_SWAP_CHAIN)(real, params, out);
    if succeeded(hr) && !out.is_null() {
        *out = wrap(*out, InterfaceKind::SwapChain, this);
    }
    hr
}

unsafe extern "system" fn get_swap_chain(
    this: *mut ComProxy,
    index: u32,
    out: *mut *mut c_void,
) -> HResult {
    let real = (*this).real;
    let hr = method::<GetSwapChainFn>(real, device9::GET_SWAP_CHAIN)(real, index, out);
    if succeeded(hr) && !out.is_null() {
        *out = wrap(*out, InterfaceKind::SwapChain, this);
    }
    hr
}

unsafe extern "system" fn reset(this: *mut ComProxy, params: *mut PresentParameters) -> HResult {
    let real = (*this).real;
    before_reset(this, params, std::ptr::null_mut());
    let hr = method::<ResetFn>(real, device9::RESET)(real, params);
    after_reset(hr);
    hr
}

unsafe extern "system" fn reset_ex(
    this: *mut ComProxy,
    params: *mut PresentParameters,
    mode: *mut DisplayModeEx,
) -> HResult {
    let real = (*this).real;
    before_reset(this, params, mode);
    let hr = method::<ResetExFn>(real, device9::RESET_EX)(real, params, mode);
    after_reset(hr);
    hr
}

unsafe extern "system" fn present(
    this: *mut ComProxy,
    source: *const c_void,
    dest: *const c_void,
    window: Hwnd,
    dirty: *const c_void,
) -> HResult {
    pace();
    let real = (*this).real;
    method::<PresentFn>(real, device9::PRESENT)(real, source, dest, window, dirty)
}

unsafe extern "system" fn present_ex(
    this: *mut ComProxy,
    source: *const c_void,
    dest: *const c_void,
    window: Hwnd,
    dirty: *const c_void,
    flags: u32,
) -> HResult {
    pace();
    let real = (*this).real;
    method::<PresentExFn>(real, device9::PRESENT_EX)(real, source, dest, window, dirty, flags)
}

unsafe extern "system" fn end_scene(this: *mut ComProxy) -> HResult {
    let real = (*this).real;
    if let Some(runtime) = runtime::get() {
        if runtime.policy().show_fps {
            let height = crate::window::client_height((*this).window()).unwrap_or(0);
            runtime.with_limiter(|limiter| limiter.show_overlay(real as usize, height));
        }
    }
    method::<EndSceneFn>(real, device9::END_SCENE)(real)
}

unsafe extern "system" fn swap_chain_present(
    this: *mut ComProxy,
    source: *const c_void,
    dest: *const c_void,
    window: Hwnd,
    dirty: *const c_void,
    flags: u32,
) -> HResult {
    pace();
    let real = (*this).real;
    method::<PresentExFn>(real, swap_chain9::PRESENT)(real, source, dest, window, dirty, flags)
}

unsafe extern "system" fn swap_chain_get_device(this: *mut ComProxy, out: *mut *mut c_void) -> HResult {
    let real = (*this).real;
    let hr = method::<GetObjectFn>(real, swap_chain9::GET_DEVICE)(real, out);
    if succeeded(hr) && !out.is_null() {
        *out = wrap(*out, InterfaceKind::Device, std::ptr::null_mut());
    }
    hr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use crate::proxy::fake::{get_peer, FakeObject};
    use crate::proxy::is_proxy;
    use d3d9_proxy_sdk::{D3DERR_INVALIDCALL, D3DPRESENT_DONOTFLIP, S_OK};
    use std::sync::atomic::Ordering;

    fn policy(toml: &str) -> Policy {
        Policy::from_config(&ProxyConfig::from_toml_str(toml).unwrap())
    }

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
    fn test_overrides_per_kind() {
        let slots_of = |kind| overrides(kind).into_iter().map(|(slot, _)| slot).collect::<Vec<_>>();
        assert_eq!(
            slots_of(InterfaceKind::Direct3D),
            vec![0, 2, direct3d9::CREATE_DEVICE, direct3d9::CREATE_DEVICE_EX]
        );
        assert_eq!(slots_of(InterfaceKind::Device).len(), 10);
        assert!(slots_of(InterfaceKind::SwapChain).contains(&swap_chain9::PRESENT));
        // AddRef always forwards
        for kind in [InterfaceKind::Direct3D, InterfaceKind::Device, InterfaceKind::SwapChain] {
            assert!(!slots_of(kind).contains(&slots::ADD_REF));
        }
    }

    #[test]
    fn test_request_untouched_without_policy() {
        let mut params = fullscreen_params();
        let mut mode = DisplayModeEx {
            refresh_rate: 144,
            ..Default::default()
        };
        prepare_device_request(&policy(""), &mut params, Some(&mut mode), 0);
        assert_eq!(params.windowed, 0);
        assert_eq!(params.full_screen_refresh_rate_in_hz, 144);
        assert_eq!(mode.refresh_rate, 144);
    }

    #[test]
    fn test_forced_windowed_request() {
        let mut params = fullscreen_params();
        let mut mode = DisplayModeEx {
            refresh_rate: 144,
            ..Default::default()
        };
        let policy = policy("[main]\nforce_windowed = 1\nfullscreen_refresh_rate = 60\n");
        prepare_device_request(&policy, &mut params, Some(&mut mode), 0);
        assert_eq!(params.windowed, 1);
        assert_eq!(params.full_screen_refresh_rate_in_hz, 0);
        assert_eq!(params.presentation_interval, 1);
        assert_eq!(mode.refresh_rate, 0);
    }

    #[test]
    fn test_effective_focus_falls_back_to_device_window() {
        let params = PresentParameters {
            device_window: 0x1234 as *mut c_void,
            ..Default::default()
        };
        assert_eq!(effective_focus(0x99 as Hwnd, &params), 0x99);
        assert_eq!(effective_focus(std::ptr::null_mut(), &params), 0x1234);
        assert_eq!(effective_focus(std::ptr::null_mut(), std::ptr::null()), 0);
    }

    unsafe extern "system" fn fake_create_device(
        this: *mut c_void,
        _adapter: u32,
        _device_type: u32,
        _focus: Hwnd,
        _behavior: u32,
        params: *mut PresentParameters,
        out: *mut *mut c_void,
    ) -> HResult {
        FakeObject::get(this).calls.fetch_add(1, Ordering::SeqCst);
        if (*params).back_buffer_width == 0 {
            return D3DERR_INVALIDCALL;
        }
        get_peer(this, out)
    }

    unsafe extern "system" fn fake_present(
        this: *mut c_void,
        _source: *const c_void,
        _dest: *const c_void,
        _window: Hwnd,
        _dirty: *const c_void,
    ) -> HResult {
        FakeObject::get(this).calls.fetch_add(1, Ordering::SeqCst);
        S_OK
    }

    #[test]
    fn test_device_identity_round_trip() {
        let factory = FakeObject::leak(
            direct3d9::COUNT_EX,
            &[(direct3d9::CREATE_DEVICE, fake_create_device as usize)],
            0,
        );
        let device = FakeObject::leak(
            device9::COUNT_EX,
            &[
                (device9::GET_DIRECT3D, get_peer as usize),
                (device9::PRESENT, fake_present as usize),
            ],
            0,
        );
        unsafe {
            FakeObject::set_peer(factory, device);
            FakeObject::set_peer(device, factory);

            let factory_proxy: *mut c_void = wrap_direct3d(factory.cast()).cast();
            assert!(is_proxy(factory_proxy));

            let mut params = PresentParameters {
                device_window: 0x4242 as *mut c_void,
                ..fullscreen_params()
            };
            let mut out = std::ptr::null_mut();
            let hr = method::<CreateDeviceFn>(factory_proxy, direct3d9::CREATE_DEVICE)(
                factory_proxy,
                0,
                1,
                std::ptr::null_mut(),
                0,
                &mut params,
                &mut out,
            );
            assert_eq!(hr, S_OK);
            assert!(is_proxy(out));
            let device_proxy = &*(out as *mut ComProxy);
            assert_eq!(device_proxy.real(), device);
            assert_eq!(device_proxy.parent(), factory_proxy.cast());
            assert_eq!(device_proxy.window(), 0x4242);
            assert_eq!(device_proxy.requested_iid(), IID_IDIRECT3DDEVICE9);

            let mut direct3d = std::ptr::null_mut();
            let hr = method::<GetObjectFn>(out, device9::GET_DIRECT3D)(out, &mut direct3d);
            assert_eq!(hr, S_OK);
            assert_eq!(direct3d, factory_proxy);

            let hr = method::<PresentFn>(out, device9::PRESENT)(
                out,
                std::ptr::null(),
                std::ptr::null(),
                std::ptr::null_mut(),
                std::ptr::null(),
            );
            assert_eq!(hr, S_OK);
            assert_eq!(FakeObject::get(device).calls.load(Ordering::SeqCst), 1);
        }
    }

    unsafe extern "system" fn fake_create_device_ex(
        this: *mut c_void,
        _adapter: u32,
        _device_type: u32,
        _focus: Hwnd,
        _behavior: u32,
        _params: *mut PresentParameters,
        _mode: *mut DisplayModeEx,
        out: *mut *mut c_void,
    ) -> HResult {
        get_peer(this, out)
    }

    #[test]
    fn test_ex_objects_keep_requested_iid() {
        let factory = FakeObject::leak(
            direct3d9::COUNT_EX,
            &[(direct3d9::CREATE_DEVICE_EX, fake_create_device_ex as usize)],
            0,
        );
        let device = FakeObject::leak(device9::COUNT_EX, &[], 0);
        unsafe {
            FakeObject::set_peer(factory, device);
            let factory_proxy: *mut c_void = wrap_direct3d_ex(factory.cast()).cast();
            assert_eq!((*(factory_proxy as *mut ComProxy)).requested_iid(), IID_IDIRECT3D9EX);

            let mut params = fullscreen_params();
            let mut out = std::ptr::null_mut();
            let hr = method::<CreateDeviceExFn>(factory_proxy, direct3d9::CREATE_DEVICE_EX)(
                factory_proxy,
                0,
                1,
                std::ptr::null_mut(),
                0,
                &mut params,
                std::ptr::null_mut(),
                &mut out,
            );
            assert_eq!(hr, S_OK);
            let device_proxy = &*(out as *mut ComProxy);
            assert_eq!(device_proxy.requested_iid(), IID_IDIRECT3DDEVICE9EX);

            // Asking for the base interface returns the same proxy as it was
            let mut base = std::ptr::null_mut();
            let hr = method::<QueryInterfaceFn>(out, slots::QUERY_INTERFACE)(
                out,
                &IID_IDIRECT3DDEVICE9,
                &mut base,
            );
            assert_eq!(hr, S_OK);
            assert_eq!(base, out);
            assert_eq!(device_proxy.requested_iid(), IID_IDIRECT3DDEVICE9EX);
        }
    }

    #[test]
    fn test_failed_create_returns_real_code() {
        let factory = FakeObject::leak(
            direct3d9::COUNT_EX,
            &[(direct3d9::CREATE_DEVICE, fake_create_device as usize)],
            0,
        );
        unsafe {
            let factory_proxy: *mut c_void = wrap_direct3d(factory.cast()).cast();
            let mut params = PresentParameters::default();
            let mut out = std::ptr::null_mut();
            let hr = method::<CreateDeviceFn>(factory_proxy, direct3d9::CREATE_DEVICE)(
                factory_proxy,
                0,
                1,
                std::ptr::null_mut(),
                0,
                &mut params,
                &mut out,
            );
            assert_eq!(hr, D3DERR_INVALIDCALL);
            assert!(out.is_null());
            assert_eq!(FakeObject::get(factory).calls.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_swap_chain_device_is_device_proxy() {
        let device = FakeObject::leak(device9::COUNT_EX, &[], 0);
        let chain = FakeObject::leak(
            swap_chain9::COUNT_EX,
            &[(swap_chain9::GET_DEVICE, get_peer as usize)],
            0,
        );
        unsafe {
            FakeObject::set_peer(chain, device);
            let device_proxy = wrap(device, InterfaceKind::Device, std::ptr::null_mut());
            let chain_proxy = wrap(chain, InterfaceKind::SwapChain, device_proxy.cast());
            let mut out = std::ptr::null_mut();
            let hr = method::<GetObjectFn>(chain_proxy, swap_chain9::GET_DEVICE)(chain_proxy, &mut out);
            assert_eq!(hr, S_OK);
            assert_eq!(out, device_proxy);
            assert_eq!(FakeObject::get(device).refs.load(Ordering::SeqCst), 2);
        }
    }
}
