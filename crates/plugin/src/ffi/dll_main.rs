//! Process attach and detach

use std::ffi::c_void;

use windows_sys::Win32::Foundation::HINSTANCE;
use windows_sys::Win32::System::LibraryLoader::DisableThreadLibraryCalls;
use windows_sys::Win32::System::SystemServices::{DLL_PROCESS_ATTACH, DLL_PROCESS_DETACH};

use d3d9_proxy_core::config::ProxyConfig;

/// Module entry point
///
/// # Safety
/// Called by the OS loader only.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "system" fn DllMain(module: HINSTANCE, reason: u32, _reserved: *mut c_void) -> i32 {
    match reason {
        DLL_PROCESS_ATTACH => {
            DisableThreadLibraryCalls(module);

            let config = ProxyConfig::load_or_default();
            crate::logging::init(&config);
            tracing::info!("d3d9 proxy {} loading", env!("CARGO_PKG_VERSION"));

            if std::panic::catch_unwind(|| d3d9_proxy_core::attach(module as usize, &config)).is_err() {
                tracing::error!("Panic during attach, continuing as a plain forwarder");
            }
        }
        DLL_PROCESS_DETACH => {
            if std::panic::catch_unwind(d3d9_proxy_core::detach).is_err() {
                tracing::error!("Panic during detach");
            }
        }
        _ => {}
    }
    1
}
