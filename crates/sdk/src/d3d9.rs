//! Direct3D 9 type definitions
//!
//! Only the structures the proxy reads or rewrites are laid out here.
//! Everything else crosses the proxy as an opaque pointer.

use std::ffi::c_void;

/// Windows HRESULT
pub type HResult = i32;

/// Opaque IDirect3D9 / IDirect3D9Ex
#[repr(C)]
pub struct IDirect3D9 {
    _opaque: [u8; 0],
}

/// Opaque IDirect3DDevice9 / IDirect3DDevice9Ex
#[repr(C)]
pub struct IDirect3DDevice9 {
    _opaque: [u8; 0],
}

/// Opaque IDirect3DSwapChain9 / IDirect3DSwapChain9Ex
#[repr(C)]
pub struct IDirect3DSwapChain9 {
    _opaque: [u8; 0],
}

/// Opaque ID3DXFont
#[repr(C)]
pub struct ID3DXFont {
    _opaque: [u8; 0],
}

pub const S_OK: HResult = 0;
pub const E_FAIL: HResult = 0x8000_4005_u32 as i32;
pub const E_NOINTERFACE: HResult = 0x8000_4002_u32 as i32;
pub const E_POINTER: HResult = 0x8000_4003_u32 as i32;
pub const D3DERR_INVALIDCALL: HResult = 0x8876_086C_u32 as i32;

/// SDK version passed to Direct3DCreate9
pub const D3D_SDK_VERSION: u32 = 32;

/// Refresh-rate sentinel required in windowed mode
pub const D3DPRESENT_RATE_DEFAULT: u32 = 0;

/// Present flag only legal for exclusive full-screen swap chains
pub const D3DPRESENT_DONOTFLIP: u32 = 0x0000_0004;

/// `SUCCEEDED()` macro
#[inline]
pub const fn succeeded(hr: HResult) -> bool {
    hr >= 0
}

/// `D3DCOLOR_ARGB` packing
#[inline]
pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

/// D3DPRESENT_PARAMETERS
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PresentParameters {
    pub back_buffer_width: u32,
    pub back_buffer_height: u32,
    pub back_buffer_format: u32,
    pub back_buffer_count: u32,
    pub multi_sample_type: u32,
    pub multi_sample_quality: u32,
    pub swap_effect: u32,
    pub device_window: *mut c_void,
    pub windowed: i32,
    pub enable_auto_depth_stencil: i32,
    pub auto_depth_stencil_format: u32,
    pub flags: u32,
    pub full_screen_refresh_rate_in_hz: u32,
    pub presentation_interval: u32,
}

impl Default for PresentParameters {
    fn default() -> Self {
        Self {
            back_buffer_width: 0,
            back_buffer_height: 0,
            back_buffer_format: 0,
            back_buffer_count: 0,
            multi_sample_type: 0,
            multi_sample_quality: 0,
            swap_effect: 0,
            device_window: std::ptr::null_mut(),
            windowed: 0,
            enable_auto_depth_stencil: 0,
            auto_depth_stencil_format: 0,
            flags: 0,
            full_screen_refresh_rate_in_hz: 0,
            presentation_interval: 0,
        }
    }
}

/// D3DDISPLAYMODEEX
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayModeEx {
    pub size: u32,
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
    pub format: u32,
    pub scan_line_ordering: u32,
}

/// COM interface identifier
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }
}

pub const IID_IUNKNOWN: Guid = Guid::new(
    0x0000_0000,
    0x0000,
    0x0000,
    [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
);

pub const IID_IDIRECT3D9: Guid = Guid::new(
    0x81BD_CBCA,
    0x64D4,
    0x426D,
    [0xAE, 0x8D, 0xAD, 0x01, 0x47, 0xF4, 0x27, 0x5C],
);

pub const IID_IDIRECT3D9EX: Guid = Guid::new(
    0x0217_7241,
    0x69FC,
    0x400C,
    [0x8F, 0xF1, 0x93, 0xA4, 0x4D, 0xF6, 0x86, 0x1D],
);

pub const IID_IDIRECT3DDEVICE9: Guid = Guid::new(
    0xD022_3B96,
    0xBF7A,
    0x43FD,
    [0x92, 0xBD, 0xA4, 0x3B, 0x0D, 0x82, 0xB9, 0xEB],
);

pub const IID_IDIRECT3DDEVICE9EX: Guid = Guid::new(
    0xB18B_10CE,
    0x2649,
    0x405A,
    [0x87, 0x0F, 0x95, 0xF7, 0x77, 0xD4, 0x31, 0x3A],
);

pub const IID_IDIRECT3DSWAPCHAIN9: Guid = Guid::new(
    0x7949_50F2,
    0xADFC,
    0x458A,
    [0x90, 0x5E, 0x10, 0xA1, 0x0B, 0x0B, 0x50, 0x3B],
);

pub const IID_IDIRECT3DSWAPCHAIN9EX: Guid = Guid::new(
    0x9188_6CAF,
    0x1C3D,
    0x4D2E,
    [0xA0, 0xAB, 0x3E, 0x4C, 0x7D, 0x8D, 0x33, 0x03],
);

pub const IID_IDIRECT3DRESOURCE9: Guid = Guid::new(
    0x05EE_C05D,
    0x8F7D,
    0x4362,
    [0xB9, 0x99, 0xD1, 0xBA, 0xF3, 0x57, 0xC7, 0x04],
);

pub const IID_IDIRECT3DBASETEXTURE9: Guid = Guid::new(
    0x580C_A87E,
    0x1D3C,
    0x4D54,
    [0x99, 0x1D, 0xB7, 0xD3, 0xE3, 0xC2, 0x98, 0xCE],
);

pub const IID_IDIRECT3DTEXTURE9: Guid = Guid::new(
    0x85C3_1227,
    0x3DE5,
    0x4F00,
    [0x9B, 0x3A, 0xF1, 0x1A, 0xC3, 0x8C, 0x18, 0xB5],
);

pub const IID_IDIRECT3DCUBETEXTURE9: Guid = Guid::new(
    0xFFF3_2F81,
    0xD953,
    0x473A,
    [0x92, 0x23, 0x93, 0xD6, 0x52, 0xAB, 0xA9, 0x3F],
);

pub const IID_IDIRECT3DVOLUMETEXTURE9: Guid = Guid::new(
    0x2518_526C,
    0xE789,
    0x4111,
    [0xA7, 0xB9, 0x47, 0xEF, 0x32, 0x8D, 0x13, 0xE6],
);

pub const IID_IDIRECT3DVERTEXBUFFER9: Guid = Guid::new(
    0xB64B_B1B5,
    0xFD70,
    0x4DF6,
    [0xBF, 0x91, 0x19, 0xD0, 0xA1, 0x24, 0x55, 0xE3],
);

pub const IID_IDIRECT3DINDEXBUFFER9: Guid = Guid::new(
    0x7C9D_D65E,
    0xD3F7,
    0x4529,
    [0xAC, 0xEE, 0x78, 0x58, 0x30, 0xAC, 0xDE, 0x35],
);

pub const IID_IDIRECT3DSURFACE9: Guid = Guid::new(
    0x0CFB_AF3A,
    0x9FF6,
    0x429A,
    [0x99, 0xB3, 0xA2, 0x79, 0x6A, 0xF8, 0xB8, 0x9B],
);

pub const IID_IDIRECT3DVOLUME9: Guid = Guid::new(
    0x24F4_16E6,
    0x1F67,
    0x4AA7,
    [0xB8, 0x8E, 0xD3, 0x3F, 0x6F, 0x31, 0x28, 0xA1],
);

pub const IID_IDIRECT3DVERTEXDECLARATION9: Guid = Guid::new(
    0xDD13_C59C,
    0x36FA,
    0x4098,
    [0xA8, 0xFB, 0xC7, 0xED, 0x39, 0xDC, 0x85, 0x46],
);

pub const IID_IDIRECT3DVERTEXSHADER9: Guid = Guid::new(
    0xEFC5_557E,
    0x6265,
    0x4613,
    [0x8A, 0x94, 0x43, 0x85, 0x78, 0x89, 0xEB, 0x36],
);

pub const IID_IDIRECT3DPIXELSHADER9: Guid = Guid::new(
    0x6D3B_DBDC,
    0x5B02,
    0x4415,
    [0xB8, 0x52, 0xCE, 0x5E, 0x8B, 0xCC, 0xB2, 0x89],
);

pub const IID_IDIRECT3DSTATEBLOCK9: Guid = Guid::new(
    0xB07C_4FE5,
    0x310D,
    0x4BA8,
    [0xA2, 0x3C, 0x4F, 0x0F, 0x20, 0x6F, 0x21, 0x8B],
);

pub const IID_IDIRECT3DQUERY9: Guid = Guid::new(
    0xD977_1460,
    0xA695,
    0x4F26,
    [0xBB, 0xD3, 0x27, 0xB8, 0x40, 0xB5, 0x41, 0xCC],
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_parameters_layout() {
        let ptr = std::mem::size_of::<usize>();
        // 7 u32 fields, padded pointer, 6 more 32-bit fields
        let expected = if ptr == 8 { 7 * 4 + 4 + 8 + 6 * 4 } else { 14 * 4 };
        assert_eq!(std::mem::size_of::<PresentParameters>(), expected);
    }

    #[test]
    fn test_display_mode_ex_layout() {
        assert_eq!(std::mem::size_of::<DisplayModeEx>(), 24);
    }

    #[test]
    fn test_resource_iids_are_distinct() {
        let iids = [
            IID_IDIRECT3DRESOURCE9,
            IID_IDIRECT3DBASETEXTURE9,
            IID_IDIRECT3DTEXTURE9,
            IID_IDIRECT3DCUBETEXTURE9,
            IID_IDIRECT3DVOLUMETEXTURE9,
            IID_IDIRECT3DVERTEXBUFFER9,
            IID_IDIRECT3DINDEXBUFFER9,
            IID_IDIRECT3DSURFACE9,
            IID_IDIRECT3DVOLUME9,
            IID_IDIRECT3DVERTEXDECLARATION9,
            IID_IDIRECT3DVERTEXSHADER9,
            IID_IDIRECT3DPIXELSHADER9,
            IID_IDIRECT3DSTATEBLOCK9,
            IID_IDIRECT3DQUERY9,
        ];
        let unique: std::collections::HashSet<_> = iids.iter().collect();
        assert_eq!(unique.len(), iids.len());
        assert_eq!(IID_IDIRECT3DTEXTURE9.data1, 0x85C3_1227);
        assert_eq!(IID_IDIRECT3DQUERY9.data4, [0xBB, 0xD3, 0x27, 0xB8, 0x40, 0xB5, 0x41, 0xCC]);
    }

    #[test]
    fn test_hresult_helpers() {
        assert!(succeeded(S_OK));
        assert!(!succeeded(E_FAIL));
        assert!(!succeeded(D3DERR_INVALIDCALL));
        assert_eq!(argb(0xFF, 0xFF, 0xFF, 0x00), 0xFFFF_FF00);
    }
}
