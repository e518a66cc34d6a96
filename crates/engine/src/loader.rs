//! System d3d9.dll loading and entry point resolution

use std::ffi::{c_void, CStr};
use std::ptr::NonNull;

use d3d9_proxy_sdk::{exports, HResult, IDirect3D9};

use crate::error::LoadError;

pub type Direct3DShaderValidatorCreate9Fn = unsafe extern "system" fn() -> *mut c_void;
pub type PsgpErrorFn = unsafe extern "system" fn(*mut c_void, u32, u32) -> HResult;
pub type PsgpSampleTextureFn =
    unsafe extern "system" fn(*mut c_void, u32, *mut [f32; 4], u32, *mut [f32; 4]) -> HResult;
pub type D3dPerfBeginEventFn = unsafe extern "system" fn(u32, *const u16) -> i32;
pub type D3dPerfEndEventFn = unsafe extern "system" fn() -> i32;
pub type D3dPerfGetStatusFn = unsafe extern "system" fn() -> u32;
pub type D3dPerfQueryRepeatFrameFn = unsafe extern "system" fn() -> i32;
pub type D3dPerfSetMarkerFn = unsafe extern "system" fn(u32, *const u16);
pub type D3dPerfSetOptionsFn = unsafe extern "system" fn(u32);
pub type D3dPerfSetRegionFn = unsafe extern "system" fn(u32, *const u16);
pub type DebugSetLevelFn = unsafe extern "system" fn(u32) -> HResult;
pub type DebugSetMuteFn = unsafe extern "system" fn();
pub type EnableMaximizedWindowedModeShimFn = unsafe extern "system" fn(i32) -> i32;
pub type Direct3DCreate9Fn = unsafe extern "system" fn(u32) -> *mut IDirect3D9;
pub type Direct3DCreate9ExFn = unsafe extern "system" fn(u32, *mut *mut IDirect3D9) -> HResult;

/// Entry points of the real library
///
/// A `None` field means the symbol did not resolve; the matching export
/// answers with its failure sentinel instead of calling through.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntryPoints {
    pub shader_validator_create9: Option<Direct3DShaderValidatorCreate9Fn>,
    pub psgp_error: Option<PsgpErrorFn>,
    pub psgp_sample_texture: Option<PsgpSampleTextureFn>,
    pub perf_begin_event: Option<D3dPerfBeginEventFn>,
    pub perf_end_event: Option<D3dPerfEndEventFn>,
    pub perf_get_status: Option<D3dPerfGetStatusFn>,
    pub perf_query_repeat_frame: Option<D3dPerfQueryRepeatFrameFn>,
    pub perf_set_marker: Option<D3dPerfSetMarkerFn>,
    pub perf_set_options: Option<D3dPerfSetOptionsFn>,
    pub perf_set_region: Option<D3dPerfSetRegionFn>,
    pub debug_set_level: Option<DebugSetLevelFn>,
    pub debug_set_mute: Option<DebugSetMuteFn>,
    pub enable_maximized_windowed_mode_shim: Option<EnableMaximizedWindowedModeShimFn>,
    pub direct3d_create9: Option<Direct3DCreate9Fn>,
    pub direct3d_create9_ex: Option<Direct3DCreate9ExFn>,
}

impl EntryPoints {
    /// Number of entry points that resolved
    pub fn resolved_count(&self) -> usize {
        [
            self.shader_validator_create9.is_some(),
            self.psgp_error.is_some(),
            self.psgp_sample_texture.is_some(),
            self.perf_begin_event.is_some(),
            self.perf_end_event.is_some(),
            self.perf_get_status.is_some(),
            self.perf_query_repeat_frame.is_some(),
            self.perf_set_marker.is_some(),
            self.perf_set_options.is_some(),
            self.perf_set_region.is_some(),
            self.debug_set_level.is_some(),
            self.debug_set_mute.is_some(),
            self.enable_maximized_windowed_mode_shim.is_some(),
            self.direct3d_create9.is_some(),
            self.direct3d_create9_ex.is_some(),
        ]
        .iter()
        .filter(|resolved| **resolved)
        .count()
    }
}

/// Wrapper around a symbol lookup function for one loaded library
pub struct ExportTable<'a> {
    lookup: &'a dyn Fn(&CStr) -> Option<NonNull<c_void>>,
    name: &'static str,
}

impl<'a> ExportTable<'a> {
    /// Create a new export table wrapper
    ///
    /// # Arguments
    /// * `lookup` - Resolves a symbol name to its address (GetProcAddress in production)
    /// * `name` - Human-readable library name for error messages
    pub fn new(lookup: &'a dyn Fn(&CStr) -> Option<NonNull<c_void>>, name: &'static str) -> Self {
        Self { lookup, name }
    }

    /// Get the address of an exported symbol
    ///
    /// # Arguments
    /// * `symbol` - Null-terminated symbol name (e.g., b"Direct3DCreate9\0")
    pub fn get(&self, symbol: &[u8]) -> Result<NonNull<c_void>, LoadError> {
        let symbol_str = CStr::from_bytes_with_nul(symbol).map_err(|_| {
            LoadError::InvalidSymbolName(String::from_utf8_lossy(symbol).into_owned())
        })?;

        (self.lookup)(symbol_str).ok_or_else(|| {
            LoadError::SymbolNotFound(format!(
                "{} in {}",
                symbol_str.to_string_lossy(),
                self.name
            ))
        })
    }

    /// Try to get a symbol, logging and returning None on failure
    pub fn try_get(&self, symbol: &[u8]) -> Option<NonNull<c_void>> {
        match self.get(symbol) {
            Ok(address) => Some(address),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    }
}

macro_rules! resolve {
    ($table:expr, $symbol:expr, $fn_ty:ty) => {
        $table
            .try_get($symbol)
            // SAFETY: the symbol is exported by d3d9.dll with this signature
            .map(|address| unsafe { std::mem::transmute::<NonNull<c_void>, $fn_ty>(address) })
    };
}

/// Resolve every re-exported entry point from the real library
#[tracing::instrument(skip_all)]
pub fn resolve_entry_points(table: &ExportTable<'_>) -> EntryPoints {
    let entry_points = EntryPoints {
        shader_validator_create9: resolve!(
            table,
            exports::DIRECT3D_SHADER_VALIDATOR_CREATE9,
            Direct3DShaderValidatorCreate9Fn
        ),
        psgp_error: resolve!(table, exports::PSGP_ERROR, PsgpErrorFn),
        psgp_sample_texture: resolve!(table, exports::PSGP_SAMPLE_TEXTURE, PsgpSampleTextureFn),
        perf_begin_event: resolve!(table, exports::D3DPERF_BEGIN_EVENT, D3dPerfBeginEventFn),
        perf_end_event: resolve!(table, exports::D3DPERF_END_EVENT, D3dPerfEndEventFn),
        perf_get_status: resolve!(table, exports::D3DPERF_GET_STATUS, D3dPerfGetStatusFn),
        perf_query_repeat_frame: resolve!(
            table,
            exports::D3DPERF_QUERY_REPEAT_FRAME,
            D3dPerfQueryRepeatFrameFn
        ),
        perf_set_marker: resolve!(table, exports::D3DPERF_SET_MARKER, D3dPerfSetMarkerFn),
        perf_set_options: resolve!(table, exports::D3DPERF_SET_OPTIONS, D3dPerfSetOptionsFn),
        perf_set_region: resolve!(table, exports::D3DPERF_SET_REGION, D3dPerfSetRegionFn),
        debug_set_level: resolve!(table, exports::DEBUG_SET_LEVEL, DebugSetLevelFn),
        debug_set_mute: resolve!(table, exports::DEBUG_SET_MUTE, DebugSetMuteFn),
        enable_maximized_windowed_mode_shim: resolve!(
            table,
            exports::DIRECT3D9_ENABLE_MAXIMIZED_WINDOWED_MODE_SHIM,
            EnableMaximizedWindowedModeShimFn
        ),
        direct3d_create9: resolve!(table, exports::DIRECT3D_CREATE9, Direct3DCreate9Fn),
        direct3d_create9_ex: resolve!(table, exports::DIRECT3D_CREATE9_EX, Direct3DCreate9ExFn),
    };

    tracing::info!(
        "Resolved {}/{} d3d9 entry points",
        entry_points.resolved_count(),
        exports::ENTRY_POINTS.len()
    );

    entry_points
}

/// Load d3d9.dll from the OS system directory and resolve its entry points
///
/// Returns the module handle (as an address) together with the entry points.
#[cfg(windows)]
#[tracing::instrument(skip_all)]
pub fn load_system_library() -> Result<(usize, EntryPoints), LoadError> {
    use std::os::windows::ffi::{OsStrExt, OsStringExt};
    use windows_sys::Win32::Foundation::GetLastError;
    use windows_sys::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
    use windows_sys::Win32::System::SystemInformation::GetSystemDirectoryW;

    let mut buffer = [0u16; 260];
    // SAFETY: buffer length is passed alongside the pointer
    let len = unsafe { GetSystemDirectoryW(buffer.as_mut_ptr(), buffer.len() as u32) } as usize;
    if len == 0 || len >= buffer.len() {
        return Err(LoadError::SystemDirectory(unsafe { GetLastError() }));
    }

    let path = std::path::PathBuf::from(std::ffi::OsString::from_wide(&buffer[..len]))
        .join(exports::SYSTEM_LIBRARY);
    let wide: Vec<u16> = path.as_os_str().encode_wide().chain(Some(0)).collect();

    // SAFETY: wide is a null-terminated UTF-16 path
    let module = unsafe { LoadLibraryW(wide.as_ptr()) };
    if module.is_null() {
        return Err(LoadError::LibraryNotFound(path.display().to_string()));
    }
    tracing::info!("Loaded {} at {:p}", path.display(), module);

    let lookup = |symbol: &CStr| {
        // SAFETY: module stays loaded for the duration of resolution
        unsafe { GetProcAddress(module, symbol.as_ptr() as *const u8) }
            .and_then(|f| NonNull::new(f as *mut c_void))
    };
    let table = ExportTable::new(&lookup, "d3d9.dll");

    Ok((module as usize, resolve_entry_points(&table)))
}
