//! Resources handed out by a device
//!
//! Surfaces, textures, buffers, shaders, queries and state blocks come back
//! as proxies too, so their `GetDevice` and `GetContainer` answer with the
//! proxies the host already holds. Methods that take one of these
//! interfaces as an argument unwrap it before calling into d3d9, which only
//! accepts its own objects.

use std::ffi::c_void;

use d3d9_proxy_sdk::slots::{
    self, cube_texture9, device9, surface9, swap_chain9, texture9, volume9, volume_texture9,
};
use d3d9_proxy_sdk::{succeeded, Guid, HResult};

use super::{cached, device_of, method, unwrap, wrap, ComProxy, InterfaceKind, Override};

type Out = *mut *mut c_void;
type Handle = *mut c_void;

type QueryInterfaceFn = unsafe extern "system" fn(*mut c_void, *const Guid, Out) -> HResult;
type ReleaseFn = unsafe extern "system" fn(*mut c_void) -> u32;
type GetObjectFn = unsafe extern "system" fn(*mut c_void, Out) -> HResult;
type GetIndexedFn = unsafe extern "system" fn(*mut c_void, u32, Out) -> HResult;
type GetContainerFn = unsafe extern "system" fn(*mut c_void, *const Guid, Out) -> HResult;
type CheckResidencyFn = unsafe extern "system" fn(*mut c_void, *mut *mut c_void, u32) -> HResult;

/// Kinds a surface or volume container can be
static CONTAINERS: [InterfaceKind; 5] = [
    InterfaceKind::Texture,
    InterfaceKind::CubeTexture,
    InterfaceKind::VolumeTexture,
    InterfaceKind::SwapChain,
    InterfaceKind::Device,
];

/// An interface the host passes into a method
#[repr(transparent)]
#[derive(Debug, Clone, Copy)]
pub struct Interface(pub *mut c_void);

/// An argument as the wrapped object must receive it
trait Passed: Copy {
    /// # Safety
    /// Interfaces must be null or live COM objects.
    unsafe fn passed(self) -> Self {
        self
    }
}

impl Passed for Interface {
    unsafe fn passed(self) -> Self {
        Interface(unwrap(self.0))
    }
}

macro_rules! passed_as_is {
    ($($ty:ty),*) => {
        $(impl Passed for $ty {})*
    };
}

passed_as_is!(u32, i32, *const c_void, *const u32, *mut u32, Out);

/// Overrides that call the wrapped method with unwrapped arguments
///
/// `-> Kind in out` wraps what the method stored through `out` as a proxy
/// of that kind, owned by the device of `this`.
macro_rules! methods {
    ($(
        $(#[$meta:meta])*
        fn $name:ident($($arg:ident: $ty:ty),* $(,)?) $(-> $kind:ident in $out:ident)? = $slot:expr;
    )*) => {
        $(
            $(#[$meta])*
            unsafe extern "system" fn $name(this: *mut ComProxy, $($arg: $ty),*) -> HResult {
                let real = (*this).real();
                let hr = method::<unsafe extern "system" fn(*mut c_void $(, $ty)*) -> HResult>(real, $slot)(
                    real
                    $(, Passed::passed($arg))*
                );
                $(
                    if succeeded(hr) {
                        wrap_out($out, InterfaceKind::$kind, device_of(this));
                    }
                )?
                hr
            }
        )*
    };
}

methods! {
    fn set_cursor_properties(x: u32, y: u32, surface: Interface) = device9::SET_CURSOR_PROPERTIES;
    fn get_back_buffer(swap_chain: u32, index: u32, buffer_type: u32, out: Out)
        -> Surface in out = device9::GET_BACK_BUFFER;
    fn create_texture(
        width: u32,
        height: u32,
        levels: u32,
        usage: u32,
        format: u32,
        pool: u32,
        out: Out,
        shared: *mut Handle,
    ) -> Texture in out = device9::CREATE_TEXTURE;
    fn create_volume_texture(
        width: u32,
        height: u32,
        depth: u32,
        levels: u32,
        usage: u32,
        format: u32,
        pool: u32,
        out: Out,
        shared: *mut Handle,
    ) -> VolumeTexture in out = device9::CREATE_VOLUME_TEXTURE;
    fn create_cube_texture(
        edge: u32,
        levels: u32,
        usage: u32,
        format: u32,
        pool: u32,
        out: Out,
        shared: *mut Handle,
    ) -> CubeTexture in out = device9::CREATE_CUBE_TEXTURE;
    fn create_vertex_buffer(length: u32, usage: u32, fvf: u32, pool: u32, out: Out, shared: *mut Handle)
        -> VertexBuffer in out = device9::CREATE_VERTEX_BUFFER;
    fn create_index_buffer(length: u32, usage: u32, format: u32, pool: u32, out: Out, shared: *mut Handle)
        -> IndexBuffer in out = device9::CREATE_INDEX_BUFFER;
    fn create_render_target(
        width: u32,
        height: u32,
        format: u32,
        multisample: u32,
        quality: u32,
        lockable: i32,
        out: Out,
        shared: *mut Handle,
    ) -> Surface in out = device9::CREATE_RENDER_TARGET;
    fn create_depth_stencil_surface(
        width: u32,
        height: u32,
        format: u32,
        multisample: u32,
        quality: u32,
        discard: i32,
        out: Out,
        shared: *mut Handle,
    ) -> Surface in out = device9::CREATE_DEPTH_STENCIL_SURFACE;
    fn update_surface(source: Interface, source_rect: *const c_void, dest: Interface, dest_point: *const c_void)
        = device9::UPDATE_SURFACE;
    fn update_texture(source: Interface, dest: Interface) = device9::UPDATE_TEXTURE;
    fn get_render_target_data(target: Interface, dest: Interface) = device9::GET_RENDER_TARGET_DATA;
    fn get_front_buffer_data(swap_chain: u32, dest: Interface) = device9::GET_FRONT_BUFFER_DATA;
    fn stretch_rect(
        source: Interface,
        source_rect: *const c_void,
        dest: Interface,
        dest_rect: *const c_void,
        filter: u32,
    ) = device9::STRETCH_RECT;
    fn color_fill(surface: Interface, rect: *const c_void, color: u32) = device9::COLOR_FILL;
    fn create_offscreen_plain_surface(
        width: u32,
        height: u32,
        format: u32,
        pool: u32,
        out: Out,
        shared: *mut Handle,
    ) -> Surface in out = device9::CREATE_OFFSCREEN_PLAIN_SURFACE;
    fn set_render_target(index: u32, surface: Interface) = device9::SET_RENDER_TARGET;
    fn get_render_target(index: u32, out: Out) -> Surface in out = device9::GET_RENDER_TARGET;
    fn set_depth_stencil_surface(surface: Interface) = device9::SET_DEPTH_STENCIL_SURFACE;
    fn get_depth_stencil_surface(out: Out) -> Surface in out = device9::GET_DEPTH_STENCIL_SURFACE;
    fn create_state_block(block_type: u32, out: Out) -> StateBlock in out = device9::CREATE_STATE_BLOCK;
    fn end_state_block(out: Out) -> StateBlock in out = device9::END_STATE_BLOCK;
    fn set_texture(stage: u32, texture: Interface) = device9::SET_TEXTURE;
    fn process_vertices(
        source_start: u32,
        dest_index: u32,
        count: u32,
        dest: Interface,
        declaration: Interface,
        flags: u32,
    ) = device9::PROCESS_VERTICES;
    fn create_vertex_declaration(elements: *const c_void, out: Out)
        -> VertexDeclaration in out = device9::CREATE_VERTEX_DECLARATION;
    fn set_vertex_declaration(declaration: Interface) = device9::SET_VERTEX_DECLARATION;
    fn get_vertex_declaration(out: Out) -> VertexDeclaration in out = device9::GET_VERTEX_DECLARATION;
    fn create_vertex_shader(function: *const u32, out: Out)
        -> VertexShader in out = device9::CREATE_VERTEX_SHADER;
    fn set_vertex_shader(shader: Interface) = device9::SET_VERTEX_SHADER;
    fn get_vertex_shader(out: Out) -> VertexShader in out = device9::GET_VERTEX_SHADER;
    fn set_stream_source(stream: u32, buffer: Interface, offset: u32, stride: u32) = device9::SET_STREAM_SOURCE;
    fn get_stream_source(stream: u32, out: Out, offset: *mut u32, stride: *mut u32)
        -> VertexBuffer in out = device9::GET_STREAM_SOURCE;
    fn set_indices(buffer: Interface) = device9::SET_INDICES;
    fn get_indices(out: Out) -> IndexBuffer in out = device9::GET_INDICES;
    fn create_pixel_shader(function: *const u32, out: Out) -> PixelShader in out = device9::CREATE_PIXEL_SHADER;
    fn set_pixel_shader(shader: Interface) = device9::SET_PIXEL_SHADER;
    fn get_pixel_shader(out: Out) -> PixelShader in out = device9::GET_PIXEL_SHADER;
    /// `out` may be null when the host only asks whether the query type exists
    fn create_query(query_type: u32, out: Out) -> Query in out = device9::CREATE_QUERY;
    fn compose_rects(
        source: Interface,
        dest: Interface,
        source_rects: Interface,
        count: u32,
        dest_rects: Interface,
        operation: u32,
        x: i32,
        y: i32,
    ) = device9::COMPOSE_RECTS;
    fn create_render_target_ex(
        width: u32,
        height: u32,
        format: u32,
        multisample: u32,
        quality: u32,
        lockable: i32,
        out: Out,
        shared: *mut Handle,
        usage: u32,
    ) -> Surface in out = device9::CREATE_RENDER_TARGET_EX;
    fn create_offscreen_plain_surface_ex(
        width: u32,
        height: u32,
        format: u32,
        pool: u32,
        out: Out,
        shared: *mut Handle,
        usage: u32,
    ) -> Surface in out = device9::CREATE_OFFSCREEN_PLAIN_SURFACE_EX;
    fn create_depth_stencil_surface_ex(
        width: u32,
        height: u32,
        format: u32,
        multisample: u32,
        quality: u32,
        discard: i32,
        out: Out,
        shared: *mut Handle,
        usage: u32,
    ) -> Surface in out = device9::CREATE_DEPTH_STENCIL_SURFACE_EX;

    fn swap_chain_get_front_buffer_data(dest: Interface) = swap_chain9::GET_FRONT_BUFFER_DATA;
    fn swap_chain_get_back_buffer(index: u32, buffer_type: u32, out: Out)
        -> Surface in out = swap_chain9::GET_BACK_BUFFER;

    fn get_surface_level(level: u32, out: Out) -> Surface in out = texture9::GET_SURFACE_LEVEL;
    fn get_cube_map_surface(face: u32, level: u32, out: Out)
        -> Surface in out = cube_texture9::GET_CUBE_MAP_SURFACE;
    fn get_volume_level(level: u32, out: Out) -> Volume in out = volume_texture9::GET_VOLUME_LEVEL;
}

/// Resource-related overrides for `kind`
pub fn overrides(kind: InterfaceKind) -> Vec<Override> {
    let get_device = (slots::GET_DEVICE, get_device as usize);
    match kind {
        InterfaceKind::Direct3D => Vec::new(),
        InterfaceKind::Device => vec![
            (device9::SET_CURSOR_PROPERTIES, set_cursor_properties as usize),
            (device9::GET_BACK_BUFFER, get_back_buffer as usize),
            (device9::CREATE_TEXTURE, create_texture as usize),
            (device9::CREATE_VOLUME_TEXTURE, create_volume_texture as usize),
            (device9::CREATE_CUBE_TEXTURE, create_cube_texture as usize),
            (device9::CREATE_VERTEX_BUFFER, create_vertex_buffer as usize),
            (device9::CREATE_INDEX_BUFFER, create_index_buffer as usize),
            (device9::CREATE_RENDER_TARGET, create_render_target as usize),
            (device9::CREATE_DEPTH_STENCIL_SURFACE, create_depth_stencil_surface as usize),
            (device9::UPDATE_SURFACE, update_surface as usize),
            (device9::UPDATE_TEXTURE, update_texture as usize),
            (device9::GET_RENDER_TARGET_DATA, get_render_target_data as usize),
            (device9::GET_FRONT_BUFFER_DATA, get_front_buffer_data as usize),
            (device9::STRETCH_RECT, stretch_rect as usize),
            (device9::COLOR_FILL, color_fill as usize),
            (device9::CREATE_OFFSCREEN_PLAIN_SURFACE, create_offscreen_plain_surface as usize),
            (device9::SET_RENDER_TARGET, set_render_target as usize),
            (device9::GET_RENDER_TARGET, get_render_target as usize),
            (device9::SET_DEPTH_STENCIL_SURFACE, set_depth_stencil_surface as usize),
            (device9::GET_DEPTH_STENCIL_SURFACE, get_depth_stencil_surface as usize),
            (device9::CREATE_STATE_BLOCK, create_state_block as usize),
            (device9::END_STATE_BLOCK, end_state_block as usize),
            (device9::GET_TEXTURE, get_texture as usize),
            (device9::SET_TEXTURE, set_texture as usize),
            (device9::PROCESS_VERTICES, process_vertices as usize),
            (device9::CREATE_VERTEX_DECLARATION, create_vertex_declaration as usize),
            (device9::SET_VERTEX_DECLARATION, set_vertex_declaration as usize),
            (device9::GET_VERTEX_DECLARATION, get_vertex_declaration as usize),
            (device9::CREATE_VERTEX_SHADER, create_vertex_shader as usize),
            (device9::SET_VERTEX_SHADER, set_vertex_shader as usize),
            (device9::GET_VERTEX_SHADER, get_vertex_shader as usize),
            (device9::SET_STREAM_SOURCE, set_stream_source as usize),
            (device9::GET_STREAM_SOURCE, get_stream_source as usize),
            (device9::SET_INDICES, set_indices as usize),
            (device9::GET_INDICES, get_indices as usize),
            (device9::CREATE_PIXEL_SHADER, create_pixel_shader as usize),
            (device9::SET_PIXEL_SHADER, set_pixel_shader as usize),
            (device9::GET_PIXEL_SHADER, get_pixel_shader as usize),
            (device9::CREATE_QUERY, create_query as usize),
            (device9::COMPOSE_RECTS, compose_rects as usize),
            (device9::CHECK_RESOURCE_RESIDENCY, check_resource_residency as usize),
            (device9::CREATE_RENDER_TARGET_EX, create_render_target_ex as usize),
            (
                device9::CREATE_OFFSCREEN_PLAIN_SURFACE_EX,
                create_offscreen_plain_surface_ex as usize,
            ),
            (device9::CREATE_DEPTH_STENCIL_SURFACE_EX, create_depth_stencil_surface_ex as usize),
        ],
        InterfaceKind::SwapChain => vec![
            (swap_chain9::GET_FRONT_BUFFER_DATA, swap_chain_get_front_buffer_data as usize),
            (swap_chain9::GET_BACK_BUFFER, swap_chain_get_back_buffer as usize),
        ],
        InterfaceKind::Surface => vec![get_device, (surface9::GET_CONTAINER, surface_get_container as usize)],
        InterfaceKind::Volume => vec![get_device, (volume9::GET_CONTAINER, volume_get_container as usize)],
        InterfaceKind::Texture => vec![get_device, (texture9::GET_SURFACE_LEVEL, get_surface_level as usize)],
        InterfaceKind::CubeTexture => vec![
            get_device,
            (cube_texture9::GET_CUBE_MAP_SURFACE, get_cube_map_surface as usize),
        ],
        InterfaceKind::VolumeTexture => vec![
            get_device,
            (volume_texture9::GET_VOLUME_LEVEL, get_volume_level as usize),
        ],
        InterfaceKind::VertexBuffer
        | InterfaceKind::IndexBuffer
        | InterfaceKind::Query
        | InterfaceKind::StateBlock
        | InterfaceKind::VertexDeclaration
        | InterfaceKind::VertexShader
        | InterfaceKind::PixelShader => vec![get_device],
    }
}

unsafe fn wrap_out(out: Out, kind: InterfaceKind, device: *mut ComProxy) {
    if !out.is_null() {
        *out = wrap(*out, kind, device);
    }
}

/// First of `candidates` whose interface `object` answers for
unsafe fn classify(object: *mut c_void, candidates: &[InterfaceKind]) -> Option<InterfaceKind> {
    candidates.iter().copied().find(|kind| {
        let mut answer = std::ptr::null_mut();
        let hr = method::<QueryInterfaceFn>(object, slots::QUERY_INTERFACE)(
            object,
            &kind.primary_iid(),
            &mut answer,
        );
        if !succeeded(hr) || answer.is_null() {
            return false;
        }
        method::<ReleaseFn>(answer, slots::RELEASE)(answer);
        true
    })
}

/// Proxy for an object known only to be one of `candidates`
///
/// A proxy already standing in for it wins; otherwise the object is asked
/// which interface it implements.
unsafe fn adopt(object: *mut c_void, candidates: &[InterfaceKind], device: *mut ComProxy) -> *mut c_void {
    if object.is_null() {
        return object;
    }
    if let Some(proxy) = cached(object).filter(|proxy| candidates.contains(&(**proxy).kind())) {
        return proxy.cast();
    }
    match classify(object, candidates) {
        // A device's parent is its factory, which is not known here
        Some(InterfaceKind::Device) => wrap(object, InterfaceKind::Device, std::ptr::null_mut()),
        Some(kind) => wrap(object, kind, device),
        None => {
            tracing::debug!("Passing through unrecognised interface {:p}", object);
            object
        }
    }
}

unsafe extern "system" fn get_device(this: *mut ComProxy, out: Out) -> HResult {
    let real = (*this).real();
    let hr = method::<GetObjectFn>(real, slots::GET_DEVICE)(real, out);
    if succeeded(hr) && !out.is_null() {
        // The cache hands back the device proxy the host already holds
        *out = wrap(*out, InterfaceKind::Device, std::ptr::null_mut());
    }
    hr
}

unsafe fn get_container(this: *mut ComProxy, slot: usize, riid: *const Guid, out: Out) -> HResult {
    let real = (*this).real();
    let hr = method::<GetContainerFn>(real, slot)(real, riid, out);
    if !succeeded(hr) || out.is_null() {
        return hr;
    }
    let named = riid.as_ref().and_then(InterfaceKind::from_iid).map(|kind| [kind]);
    let candidates: &[InterfaceKind] = match &named {
        Some(kind) => &kind[..],
        None => &CONTAINERS[..],
    };
    *out = adopt(*out, candidates, device_of(this));
    hr
}

unsafe extern "system" fn surface_get_container(this: *mut ComProxy, riid: *const Guid, out: Out) -> HResult {
    get_container(this, surface9::GET_CONTAINER, riid, out)
}

unsafe extern "system" fn volume_get_container(this: *mut ComProxy, riid: *const Guid, out: Out) -> HResult {
    get_container(this, volume9::GET_CONTAINER, riid, out)
}

/// `GetTexture` reports a base texture, so the concrete kind is looked up
unsafe extern "system" fn get_texture(this: *mut ComProxy, stage: u32, out: Out) -> HResult {
    let real = (*this).real();
    let hr = method::<GetIndexedFn>(real, device9::GET_TEXTURE)(real, stage, out);
    if succeeded(hr) && !out.is_null() {
        *out = adopt(*out, &InterfaceKind::TEXTURES, this);
    }
    hr
}

unsafe extern "system" fn check_resource_residency(
    this: *mut ComProxy,
    resources: *mut *mut c_void,
    count: u32,
) -> HResult {
    let real = (*this).real();
    let check = method::<CheckResidencyFn>(real, device9::CHECK_RESOURCE_RESIDENCY);
    if resources.is_null() || count == 0 {
        return check(real, resources, count);
    }
    let mut unwrapped: Vec<*mut c_void> = std::slice::from_raw_parts(resources, count as usize)
        .iter()
        .map(|&resource| unwrap(resource))
        .collect();
    check(real, unwrapped.as_mut_ptr(), count)
}
