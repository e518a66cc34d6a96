//! Entry point names exported by the system d3d9.dll
//!
//! These strings must match exactly what d3d9.dll exports.
//! The proxy resolves each one with GetProcAddress and re-exports it.

pub const DIRECT3D_SHADER_VALIDATOR_CREATE9: &[u8] = b"Direct3DShaderValidatorCreate9\0";
pub const PSGP_ERROR: &[u8] = b"PSGPError\0";
pub const PSGP_SAMPLE_TEXTURE: &[u8] = b"PSGPSampleTexture\0";
pub const D3DPERF_BEGIN_EVENT: &[u8] = b"D3DPERF_BeginEvent\0";
pub const D3DPERF_END_EVENT: &[u8] = b"D3DPERF_EndEvent\0";
pub const D3DPERF_GET_STATUS: &[u8] = b"D3DPERF_GetStatus\0";
pub const D3DPERF_QUERY_REPEAT_FRAME: &[u8] = b"D3DPERF_QueryRepeatFrame\0";
pub const D3DPERF_SET_MARKER: &[u8] = b"D3DPERF_SetMarker\0";
pub const D3DPERF_SET_OPTIONS: &[u8] = b"D3DPERF_SetOptions\0";
pub const D3DPERF_SET_REGION: &[u8] = b"D3DPERF_SetRegion\0";
pub const DEBUG_SET_LEVEL: &[u8] = b"DebugSetLevel\0";
pub const DEBUG_SET_MUTE: &[u8] = b"DebugSetMute\0";
pub const DIRECT3D9_ENABLE_MAXIMIZED_WINDOWED_MODE_SHIM: &[u8] =
    b"Direct3D9EnableMaximizedWindowedModeShim\0";
pub const DIRECT3D_CREATE9: &[u8] = b"Direct3DCreate9\0";
pub const DIRECT3D_CREATE9_EX: &[u8] = b"Direct3DCreate9Ex\0";

/// Every re-exported entry point, for iteration and logging
pub const ENTRY_POINTS: &[(&str, &[u8])] = &[
    ("Direct3DShaderValidatorCreate9", DIRECT3D_SHADER_VALIDATOR_CREATE9),
    ("PSGPError", PSGP_ERROR),
    ("PSGPSampleTexture", PSGP_SAMPLE_TEXTURE),
    ("D3DPERF_BeginEvent", D3DPERF_BEGIN_EVENT),
    ("D3DPERF_EndEvent", D3DPERF_END_EVENT),
    ("D3DPERF_GetStatus", D3DPERF_GET_STATUS),
    ("D3DPERF_QueryRepeatFrame", D3DPERF_QUERY_REPEAT_FRAME),
    ("D3DPERF_SetMarker", D3DPERF_SET_MARKER),
    ("D3DPERF_SetOptions", D3DPERF_SET_OPTIONS),
    ("D3DPERF_SetRegion", D3DPERF_SET_REGION),
    ("DebugSetLevel", DEBUG_SET_LEVEL),
    ("DebugSetMute", DEBUG_SET_MUTE),
    (
        "Direct3D9EnableMaximizedWindowedModeShim",
        DIRECT3D9_ENABLE_MAXIMIZED_WINDOWED_MODE_SHIM,
    ),
    ("Direct3DCreate9", DIRECT3D_CREATE9),
    ("Direct3DCreate9Ex", DIRECT3D_CREATE9_EX),
];

/// Name of the library being proxied, relative to the system directory
pub const SYSTEM_LIBRARY: &str = "d3d9.dll";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_points_are_nul_terminated() {
        for (name, raw) in ENTRY_POINTS {
            assert_eq!(raw.last(), Some(&0), "{name} lacks a terminator");
            assert_eq!(&raw[..raw.len() - 1], name.as_bytes());
        }
    }

    #[test]
    fn test_entry_point_count() {
        assert_eq!(ENTRY_POINTS.len(), 15);
    }
}
