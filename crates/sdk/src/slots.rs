//! Virtual table slot indices
//!
//! Indices count from the start of the vtable, so the three IUnknown
//! methods occupy 0..=2. Derived from the d3d9.h / d3dx9core.h headers.

pub const QUERY_INTERFACE: usize = 0;
pub const ADD_REF: usize = 1;
pub const RELEASE: usize = 2;

/// IDirect3D9 / IDirect3D9Ex
pub mod direct3d9 {
    pub const CREATE_DEVICE: usize = 16;
    /// Methods on IDirect3D9
    pub const COUNT: usize = 17;

    pub const CREATE_DEVICE_EX: usize = 20;
    /// Methods on IDirect3D9Ex
    pub const COUNT_EX: usize = 22;
}

/// IDirect3DDevice9 / IDirect3DDevice9Ex
pub mod device9 {
    pub const GET_DIRECT3D: usize = 6;
    pub const SET_CURSOR_PROPERTIES: usize = 10;
    pub const CREATE_ADDITIONAL_SWAP_CHAIN: usize = 13;
    pub const GET_SWAP_CHAIN: usize = 14;
    pub const RESET: usize = 16;
    pub const PRESENT: usize = 17;
    pub const GET_BACK_BUFFER: usize = 18;
    pub const CREATE_TEXTURE: usize = 23;
    pub const CREATE_VOLUME_TEXTURE: usize = 24;
    pub const CREATE_CUBE_TEXTURE: usize = 25;
    pub const CREATE_VERTEX_BUFFER: usize = 26;
    pub const CREATE_INDEX_BUFFER: usize = 27;
    pub const CREATE_RENDER_TARGET: usize = 28;
    pub const CREATE_DEPTH_STENCIL_SURFACE: usize = 29;
    pub const UPDATE_SURFACE: usize = 30;
    pub const UPDATE_TEXTURE: usize = 31;
    pub const GET_RENDER_TARGET_DATA: usize = 32;
    pub const GET_FRONT_BUFFER_DATA: usize = 33;
    pub const STRETCH_RECT: usize = 34;
    pub const COLOR_FILL: usize = 35;
    pub const CREATE_OFFSCREEN_PLAIN_SURFACE: usize = 36;
    pub const SET_RENDER_TARGET: usize = 37;
    pub const GET_RENDER_TARGET: usize = 38;
    pub const SET_DEPTH_STENCIL_SURFACE: usize = 39;
    pub const GET_DEPTH_STENCIL_SURFACE: usize = 40;
    pub const END_SCENE: usize = 42;
    pub const CREATE_STATE_BLOCK: usize = 59;
    pub const END_STATE_BLOCK: usize = 61;
    pub const GET_TEXTURE: usize = 64;
    pub const SET_TEXTURE: usize = 65;
    pub const PROCESS_VERTICES: usize = 85;
    pub const CREATE_VERTEX_DECLARATION: usize = 86;
    pub const SET_VERTEX_DECLARATION: usize = 87;
    pub const GET_VERTEX_DECLARATION: usize = 88;
    pub const CREATE_VERTEX_SHADER: usize = 91;
    pub const SET_VERTEX_SHADER: usize = 92;
    pub const GET_VERTEX_SHADER: usize = 93;
    pub const SET_STREAM_SOURCE: usize = 100;
    pub const GET_STREAM_SOURCE: usize = 101;
    pub const SET_INDICES: usize = 104;
    pub const GET_INDICES: usize = 105;
    pub const CREATE_PIXEL_SHADER: usize = 106;
    pub const SET_PIXEL_SHADER: usize = 107;
    pub const GET_PIXEL_SHADER: usize = 108;
    pub const CREATE_QUERY: usize = 118;
    /// Methods on IDirect3DDevice9
    pub const COUNT: usize = 119;

    pub const COMPOSE_RECTS: usize = 120;
    pub const PRESENT_EX: usize = 121;
    pub const CHECK_RESOURCE_RESIDENCY: usize = 125;
    pub const CREATE_RENDER_TARGET_EX: usize = 129;
    pub const CREATE_OFFSCREEN_PLAIN_SURFACE_EX: usize = 130;
    pub const CREATE_DEPTH_STENCIL_SURFACE_EX: usize = 131;
    pub const RESET_EX: usize = 132;
    /// Methods on IDirect3DDevice9Ex
    pub const COUNT_EX: usize = 134;
}

/// IDirect3DSwapChain9 / IDirect3DSwapChain9Ex
pub mod swap_chain9 {
    pub const PRESENT: usize = 3;
    pub const GET_FRONT_BUFFER_DATA: usize = 4;
    pub const GET_BACK_BUFFER: usize = 5;
    pub const GET_DEVICE: usize = 8;
    /// Methods on IDirect3DSwapChain9
    pub const COUNT: usize = 10;
    /// Methods on IDirect3DSwapChain9Ex
    pub const COUNT_EX: usize = 13;
}

/// Every resource-like interface has `GetDevice` right after IUnknown
pub const GET_DEVICE: usize = 3;

/// IDirect3DSurface9
pub mod surface9 {
    pub const GET_CONTAINER: usize = 11;
    pub const COUNT: usize = 17;
}

/// IDirect3DVolume9, which is not an IDirect3DResource9
pub mod volume9 {
    pub const GET_CONTAINER: usize = 7;
    pub const COUNT: usize = 11;
}

/// IDirect3DTexture9
pub mod texture9 {
    pub const GET_SURFACE_LEVEL: usize = 18;
    pub const COUNT: usize = 22;
}

/// IDirect3DCubeTexture9
pub mod cube_texture9 {
    pub const GET_CUBE_MAP_SURFACE: usize = 18;
    pub const COUNT: usize = 22;
}

/// IDirect3DVolumeTexture9
pub mod volume_texture9 {
    pub const GET_VOLUME_LEVEL: usize = 18;
    pub const COUNT: usize = 22;
}

/// IDirect3DVertexBuffer9 / IDirect3DIndexBuffer9
pub mod buffer9 {
    pub const COUNT: usize = 14;
}

pub mod query9 {
    pub const COUNT: usize = 8;
}

pub mod state_block9 {
    pub const COUNT: usize = 6;
}

/// IDirect3DVertexDeclaration9 and both shader interfaces
pub mod shader9 {
    pub const COUNT: usize = 5;
}

/// ID3DXFont
pub mod d3dx_font {
    pub const DRAW_TEXT_W: usize = 15;
    pub const ON_LOST_DEVICE: usize = 16;
    pub const ON_RESET_DEVICE: usize = 17;
}
