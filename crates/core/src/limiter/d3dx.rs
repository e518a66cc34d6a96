//! Overlay fonts backed by ID3DXFont
//!
//! `d3dx9_43.dll` is loaded on first use. If it is missing the factory
//! stops trying and the overlay draws nothing.

use std::ffi::c_void;

use windows_sys::Win32::Foundation::RECT;
use windows_sys::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

use d3d9_proxy_sdk::slots::{self, d3dx_font};
use d3d9_proxy_sdk::{succeeded, HResult};

use super::overlay::{FontFactory, OverlayFont};
use crate::proxy::method;

const FW_BOLD: u32 = 700;
const DEFAULT_CHARSET: u32 = 1;
const OUT_DEFAULT_PRECIS: u32 = 0;
const ANTIALIASED_QUALITY: u32 = 4;
const DEFAULT_PITCH: u32 = 0;
const DT_NOCLIP: u32 = 0x0100;

type CreateFontFn = unsafe extern "system" fn(
    *mut c_void,
    i32,
    u32,
    u32,
    u32,
    i32,
    u32,
    u32,
    u32,
    u32,
    *const u16,
    *mut *mut c_void,
) -> HResult;
type DrawTextFn =
    unsafe extern "system" fn(*mut c_void, *mut c_void, *const u16, i32, *mut RECT, u32, u32) -> i32;
type FontCallFn = unsafe extern "system" fn(*mut c_void) -> HResult;
type ReleaseFn = unsafe extern "system" fn(*mut c_void) -> u32;

enum Library {
    NotLoaded,
    Loaded(CreateFontFn),
    Missing,
}

/// Creates `ID3DXFont`s through `D3DXCreateFontW`
pub struct D3dxFontFactory {
    library: Library,
}

impl D3dxFontFactory {
    pub fn new() -> Self {
        Self {
            library: Library::NotLoaded,
        }
    }

    fn create_fn(&mut self) -> Option<CreateFontFn> {
        if let Library::NotLoaded = self.library {
            self.library = load_create_font();
        }
        match self.library {
            Library::Loaded(create) => Some(create),
            _ => None,
        }
    }
}

impl Default for D3dxFontFactory {
    fn default() -> Self {
        Self::new()
    }
}

fn load_create_font() -> Library {
    let name: Vec<u16> = "d3dx9_43.dll".encode_utf16().chain(Some(0)).collect();
    // SAFETY: name is NUL-terminated
    let module = unsafe { LoadLibraryW(name.as_ptr()) };
    if module.is_null() {
        tracing::warn!("d3dx9_43.dll not found, FPS overlay disabled");
        return Library::Missing;
    }
    // SAFETY: the symbol is exported with the CreateFontFn signature
    match unsafe { GetProcAddress(module, c"D3DXCreateFontW".as_ptr().cast()) } {
        Some(create) => Library::Loaded(unsafe { std::mem::transmute::<_, CreateFontFn>(create) }),
        None => {
            tracing::warn!("D3DXCreateFontW missing from d3dx9_43.dll, FPS overlay disabled");
            Library::Missing
        }
    }
}

impl FontFactory for D3dxFontFactory {
    fn create_font(&mut self, device: usize, height: i32) -> Option<Box<dyn OverlayFont>> {
        let create = self.create_fn()?;
        let face: Vec<u16> = "Arial".encode_utf16().chain(Some(0)).collect();
        let mut font = std::ptr::null_mut();
        // SAFETY: device is a live real device; out pointer is valid
        let hr = unsafe {
            create(
                device as *mut c_void,
                height,
                0,
                FW_BOLD,
                1,
                0,
                DEFAULT_CHARSET,
                OUT_DEFAULT_PRECIS,
                ANTIALIASED_QUALITY,
                DEFAULT_PITCH,
                face.as_ptr(),
                &mut font,
            )
        };
        if !succeeded(hr) || font.is_null() {
            tracing::debug!("D3DXCreateFontW failed: {:#010x}", hr);
            return None;
        }
        Some(Box::new(D3dxFont { font }))
    }
}

struct D3dxFont {
    font: *mut c_void,
}

// SAFETY: fonts are only used from the render thread, behind the limiter lock
unsafe impl Send for D3dxFont {}

impl OverlayFont for D3dxFont {
    fn draw(&mut self, text: &str, x: i32, y: i32, color: u32) {
        let wide: Vec<u16> = text.encode_utf16().chain(Some(0)).collect();
        let mut rect = RECT {
            left: x,
            top: y,
            right: x,
            bottom: y,
        };
        // SAFETY: font is live; the string is NUL-terminated
        unsafe {
            method::<DrawTextFn>(self.font, d3dx_font::DRAW_TEXT_W)(
                self.font,
                std::ptr::null_mut(),
                wide.as_ptr(),
                -1,
                &mut rect,
                DT_NOCLIP,
                color,
            );
        }
    }

    fn on_lost_device(&mut self) {
        // SAFETY: font is live
        unsafe { method::<FontCallFn>(self.font, d3dx_font::ON_LOST_DEVICE)(self.font) };
    }

    fn on_reset_device(&mut self) {
        // SAFETY: font is live
        unsafe { method::<FontCallFn>(self.font, d3dx_font::ON_RESET_DEVICE)(self.font) };
    }
}

impl Drop for D3dxFont {
    fn drop(&mut self) {
        // SAFETY: we own one reference
        unsafe { method::<ReleaseFn>(self.font, slots::RELEASE)(self.font) };
    }
}
