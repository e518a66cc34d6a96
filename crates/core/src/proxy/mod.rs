//! Interface proxies
//!
//! A proxy stands in for a d3d9 interface the host holds. Its vtable sends
//! every slot to a forwarding stub that swaps `this` for the wrapped object
//! and jumps into the wrapped object's own method, except for the few
//! slots listed in an override table.
//!
//! Proxies are cached by wrapped pointer, so an interface handed out twice
//! is the same proxy both times. The reference count is the wrapped
//! object's: the proxy is freed when a forwarded `Release` returns 0.

pub mod d3d9;
pub mod resources;

use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{LazyLock, OnceLock};

use d3d9_proxy_sdk::slots::{
    self, buffer9, cube_texture9, query9, shader9, state_block9, surface9, texture9, volume9,
    volume_texture9,
};
use d3d9_proxy_sdk::{
    Guid, IID_IDIRECT3D9, IID_IDIRECT3D9EX, IID_IDIRECT3DBASETEXTURE9, IID_IDIRECT3DCUBETEXTURE9,
    IID_IDIRECT3DDEVICE9, IID_IDIRECT3DDEVICE9EX, IID_IDIRECT3DINDEXBUFFER9,
    IID_IDIRECT3DPIXELSHADER9, IID_IDIRECT3DQUERY9, IID_IDIRECT3DRESOURCE9,
    IID_IDIRECT3DSTATEBLOCK9, IID_IDIRECT3DSURFACE9, IID_IDIRECT3DSWAPCHAIN9,
    IID_IDIRECT3DSWAPCHAIN9EX, IID_IDIRECT3DTEXTURE9, IID_IDIRECT3DVERTEXBUFFER9,
    IID_IDIRECT3DVERTEXDECLARATION9, IID_IDIRECT3DVERTEXSHADER9, IID_IDIRECT3DVOLUME9,
    IID_IDIRECT3DVOLUMETEXTURE9, IID_IUNKNOWN,
};

use crate::hooks::stubs::{self, REAL_OFFSET};
use crate::hooks::HookError;

pub use self::d3d9::prepare_device_request;

/// Which d3d9 interface a proxy stands in for
///
/// Each kind covers the base interface and its `Ex` extension, which share
/// one object in d3d9. Discriminants index [`InterfaceKind::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceKind {
    Direct3D,
    Device,
    SwapChain,
    Surface,
    Volume,
    Texture,
    VolumeTexture,
    CubeTexture,
    VertexBuffer,
    IndexBuffer,
    Query,
    StateBlock,
    VertexDeclaration,
    VertexShader,
    PixelShader,
}

impl InterfaceKind {
    pub const ALL: [InterfaceKind; 15] = [
        InterfaceKind::Direct3D,
        InterfaceKind::Device,
        InterfaceKind::SwapChain,
        InterfaceKind::Surface,
        InterfaceKind::Volume,
        InterfaceKind::Texture,
        InterfaceKind::VolumeTexture,
        InterfaceKind::CubeTexture,
        InterfaceKind::VertexBuffer,
        InterfaceKind::IndexBuffer,
        InterfaceKind::Query,
        InterfaceKind::StateBlock,
        InterfaceKind::VertexDeclaration,
        InterfaceKind::VertexShader,
        InterfaceKind::PixelShader,
    ];

    /// Texture kinds, in the order an unknown texture is tried
    pub const TEXTURES: [InterfaceKind; 3] = [
        InterfaceKind::Texture,
        InterfaceKind::CubeTexture,
        InterfaceKind::VolumeTexture,
    ];

    /// Interface IDs a proxy of this kind answers `QueryInterface` for
    ///
    /// The second entry is the interface the kind is named after.
    pub fn iids(self) -> &'static [Guid] {
        match self {
            InterfaceKind::Direct3D => &[IID_IUNKNOWN, IID_IDIRECT3D9, IID_IDIRECT3D9EX],
            InterfaceKind::Device => &[IID_IUNKNOWN, IID_IDIRECT3DDEVICE9, IID_IDIRECT3DDEVICE9EX],
            InterfaceKind::SwapChain => &[
                IID_IUNKNOWN,
                IID_IDIRECT3DSWAPCHAIN9,
                IID_IDIRECT3DSWAPCHAIN9EX,
            ],
            InterfaceKind::Surface => &[IID_IUNKNOWN, IID_IDIRECT3DSURFACE9, IID_IDIRECT3DRESOURCE9],
            InterfaceKind::Volume => &[IID_IUNKNOWN, IID_IDIRECT3DVOLUME9],
            InterfaceKind::Texture => &[
                IID_IUNKNOWN,
                IID_IDIRECT3DTEXTURE9,
                IID_IDIRECT3DBASETEXTURE9,
                IID_IDIRECT3DRESOURCE9,
            ],
            InterfaceKind::VolumeTexture => &[
                IID_IUNKNOWN,
                IID_IDIRECT3DVOLUMETEXTURE9,
                IID_IDIRECT3DBASETEXTURE9,
                IID_IDIRECT3DRESOURCE9,
            ],
            InterfaceKind::CubeTexture => &[
                IID_IUNKNOWN,
                IID_IDIRECT3DCUBETEXTURE9,
                IID_IDIRECT3DBASETEXTURE9,
                IID_IDIRECT3DRESOURCE9,
            ],
            InterfaceKind::VertexBuffer => &[
                IID_IUNKNOWN,
                IID_IDIRECT3DVERTEXBUFFER9,
                IID_IDIRECT3DRESOURCE9,
            ],
            InterfaceKind::IndexBuffer => &[
                IID_IUNKNOWN,
                IID_IDIRECT3DINDEXBUFFER9,
                IID_IDIRECT3DRESOURCE9,
            ],
            InterfaceKind::Query => &[IID_IUNKNOWN, IID_IDIRECT3DQUERY9],
            InterfaceKind::StateBlock => &[IID_IUNKNOWN, IID_IDIRECT3DSTATEBLOCK9],
            InterfaceKind::VertexDeclaration => &[IID_IUNKNOWN, IID_IDIRECT3DVERTEXDECLARATION9],
            InterfaceKind::VertexShader => &[IID_IUNKNOWN, IID_IDIRECT3DVERTEXSHADER9],
            InterfaceKind::PixelShader => &[IID_IUNKNOWN, IID_IDIRECT3DPIXELSHADER9],
        }
    }

    /// The interface this kind is named after
    pub fn primary_iid(self) -> Guid {
        self.iids()[1]
    }

    pub fn represents(self, iid: &Guid) -> bool {
        self.iids().contains(iid)
    }

    /// The `Ex` extension sharing this kind's object, if d3d9 has one
    pub fn ex_iid(self) -> Option<Guid> {
        match self {
            InterfaceKind::Direct3D => Some(IID_IDIRECT3D9EX),
            InterfaceKind::Device => Some(IID_IDIRECT3DDEVICE9EX),
            InterfaceKind::SwapChain => Some(IID_IDIRECT3DSWAPCHAIN9EX),
            _ => None,
        }
    }

    /// Kind whose own interface is `iid`
    ///
    /// Shared bases such as IUnknown or IDirect3DResource9 name no single
    /// kind and give `None`.
    pub fn from_iid(iid: &Guid) -> Option<InterfaceKind> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.primary_iid() == *iid || kind.ex_iid().as_ref() == Some(iid))
    }

    /// Vtable length, always the `Ex` interface's where there is one
    pub fn slot_count(self) -> usize {
        match self {
            InterfaceKind::Direct3D => slots::direct3d9::COUNT_EX,
            InterfaceKind::Device => slots::device9::COUNT_EX,
            InterfaceKind::SwapChain => slots::swap_chain9::COUNT_EX,
            InterfaceKind::Surface => surface9::COUNT,
            InterfaceKind::Volume => volume9::COUNT,
            InterfaceKind::Texture => texture9::COUNT,
            InterfaceKind::VolumeTexture => volume_texture9::COUNT,
            InterfaceKind::CubeTexture => cube_texture9::COUNT,
            InterfaceKind::VertexBuffer | InterfaceKind::IndexBuffer => buffer9::COUNT,
            InterfaceKind::Query => query9::COUNT,
            InterfaceKind::StateBlock => state_block9::COUNT,
            InterfaceKind::VertexDeclaration
            | InterfaceKind::VertexShader
            | InterfaceKind::PixelShader => shader9::COUNT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InterfaceKind::Direct3D => "IDirect3D9",
            InterfaceKind::Device => "IDirect3DDevice9",
            InterfaceKind::SwapChain => "IDirect3DSwapChain9",
            InterfaceKind::Surface => "IDirect3DSurface9",
            InterfaceKind::Volume => "IDirect3DVolume9",
            InterfaceKind::Texture => "IDirect3DTexture9",
            InterfaceKind::VolumeTexture => "IDirect3DVolumeTexture9",
            InterfaceKind::CubeTexture => "IDirect3DCubeTexture9",
            InterfaceKind::VertexBuffer => "IDirect3DVertexBuffer9",
            InterfaceKind::IndexBuffer => "IDirect3DIndexBuffer9",
            InterfaceKind::Query => "IDirect3DQuery9",
            InterfaceKind::StateBlock => "IDirect3DStateBlock9",
            InterfaceKind::VertexDeclaration => "IDirect3DVertexDeclaration9",
            InterfaceKind::VertexShader => "IDirect3DVertexShader9",
            InterfaceKind::PixelShader => "IDirect3DPixelShader9",
        }
    }

    /// Name of the interface `iid` selects within this kind
    pub fn interface_name(self, iid: &Guid) -> &'static str {
        if self.ex_iid().as_ref() != Some(iid) {
            return self.name();
        }
        match self {
            InterfaceKind::Direct3D => "IDirect3D9Ex",
            InterfaceKind::Device => "IDirect3DDevice9Ex",
            _ => "IDirect3DSwapChain9Ex",
        }
    }
}

/// Replacement for one vtable slot: (slot, handler address)
pub type Override = (usize, usize);

/// A proxy object as the host sees it
#[repr(C)]
pub struct ComProxy {
    vtbl: *const usize,
    real: *mut c_void,
    kind: InterfaceKind,
    /// Proxy this one was obtained from: the factory of a device, the
    /// device of everything else
    parent: *mut ComProxy,
    /// Device window, for the overlay's font sizing
    window: AtomicUsize,
    /// Interface the object was first handed out as
    iid: Guid,
}

const _: () = assert!(std::mem::offset_of!(ComProxy, real) == REAL_OFFSET);

impl ComProxy {
    pub fn real(&self) -> *mut c_void {
        self.real
    }

    pub fn kind(&self) -> InterfaceKind {
        self.kind
    }

    pub fn parent(&self) -> *mut ComProxy {
        self.parent
    }

    /// IID the host asked for when this proxy was created
    ///
    /// A later `QueryInterface` for the object's other interface, say the
    /// `Ex` one, returns this same proxy and leaves the IID as it was.
    pub fn requested_iid(&self) -> Guid {
        self.iid
    }

    pub fn window(&self) -> usize {
        self.window.load(Ordering::Relaxed)
    }

    pub fn set_window(&self, hwnd: usize) {
        if hwnd != 0 {
            self.window.store(hwnd, Ordering::Relaxed);
        }
    }
}

/// Build a vtable of `count` forwarding stubs with `overrides` applied
pub fn build_vtable(count: usize, overrides: &[Override]) -> Result<Box<[usize]>, HookError> {
    let mut table = (0..count)
        .map(stubs::forwarder)
        .collect::<Result<Vec<_>, _>>()?;
    for &(slot, handler) in overrides {
        match table.get_mut(slot) {
            Some(entry) => *entry = handler,
            None => tracing::warn!("Override for slot {} beyond vtable of {}", slot, count),
        }
    }
    Ok(table.into_boxed_slice())
}

/// One table per kind, in [`InterfaceKind::ALL`] order
struct Vtables(Vec<Box<[usize]>>);

impl Vtables {
    fn build() -> Result<Self, HookError> {
        InterfaceKind::ALL
            .into_iter()
            .map(|kind| build_vtable(kind.slot_count(), &overrides(kind)))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    fn get(&self, kind: InterfaceKind) -> *const usize {
        self.0[kind as usize].as_ptr()
    }

    fn owns(&self, vtbl: *const usize) -> bool {
        self.0.iter().any(|table| table.as_ptr() == vtbl)
    }
}

/// Override table for `kind`
fn overrides(kind: InterfaceKind) -> Vec<Override> {
    let mut table = d3d9::overrides(kind);
    table.extend(resources::overrides(kind));
    table
}

static VTABLES: OnceLock<Option<Vtables>> = OnceLock::new();

/// Live proxies by wrapped pointer
static PROXIES: LazyLock<Mutex<HashMap<usize, usize>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn vtables() -> Option<&'static Vtables> {
    VTABLES
        .get_or_init(|| match Vtables::build() {
            Ok(vtables) => Some(vtables),
            Err(e) => {
                tracing::error!("Failed to build proxy vtables, interfaces pass through: {}", e);
                None
            }
        })
        .as_ref()
}

/// Proxy for `real` handed out as `iid`, reusing the cached one when it exists
///
/// # Returns
/// None if `real` is null or the vtables are unavailable
///
/// # Safety
/// `real` must be a live interface of `kind`; `parent` null or a live proxy.
pub(crate) unsafe fn wrap_proxy_as(
    real: *mut c_void,
    kind: InterfaceKind,
    iid: Guid,
    parent: *mut ComProxy,
) -> Option<*mut ComProxy> {
    if real.is_null() {
        return None;
    }
    let vtbl = vtables()?.get(kind);

    let mut proxies = PROXIES.lock();
    if let Some(&cached) = proxies.get(&(real as usize)) {
        let cached = cached as *mut ComProxy;
        if (*cached).kind == kind {
            return Some(cached);
        }
        // Address reused by an object of another kind
        tracing::debug!("Replacing stale {} proxy for {:p}", (*cached).kind.name(), real);
        drop(Box::from_raw(cached));
    }

    let proxy = Box::into_raw(Box::new(ComProxy {
        vtbl,
        real,
        kind,
        parent,
        window: AtomicUsize::new(0),
        iid,
    }));
    proxies.insert(real as usize, proxy as usize);
    tracing::debug!("Wrapped {} {:p} as {:p}", kind.interface_name(&iid), real, proxy);
    Some(proxy)
}

/// [`wrap_proxy_as`] for the interface `kind` is named after
///
/// # Safety
/// As [`wrap_proxy_as`].
pub(crate) unsafe fn wrap_proxy(
    real: *mut c_void,
    kind: InterfaceKind,
    parent: *mut ComProxy,
) -> Option<*mut ComProxy> {
    wrap_proxy_as(real, kind, kind.primary_iid(), parent)
}

/// Hand out a proxy in place of `real`, or `real` itself if wrapping fails
///
/// # Safety
/// As [`wrap_proxy`].
pub unsafe fn wrap(real: *mut c_void, kind: InterfaceKind, parent: *mut ComProxy) -> *mut c_void {
    wrap_proxy(real, kind, parent).map_or(real, |proxy| proxy.cast())
}

/// [`wrap`], recording `iid` as the interface asked for
///
/// # Safety
/// As [`wrap_proxy_as`].
pub unsafe fn wrap_as(
    real: *mut c_void,
    kind: InterfaceKind,
    iid: Guid,
    parent: *mut ComProxy,
) -> *mut c_void {
    wrap_proxy_as(real, kind, iid, parent).map_or(real, |proxy| proxy.cast())
}

/// Live proxy already standing in for `real`
pub(crate) fn cached(real: *mut c_void) -> Option<*mut ComProxy> {
    PROXIES
        .lock()
        .get(&(real as usize))
        .map(|&proxy| proxy as *mut ComProxy)
}

/// The wrapped object behind `object` if it is one of our proxies,
/// otherwise `object` unchanged
///
/// Interfaces the host passes back into d3d9 go through here, since the
/// runtime only accepts its own objects.
///
/// # Safety
/// `object` must be null or a live COM object.
pub unsafe fn unwrap(object: *mut c_void) -> *mut c_void {
    if object.is_null() {
        return object;
    }
    let vtbl = *(object as *const *const usize);
    match vtables() {
        Some(vtables) if vtables.owns(vtbl) => (*(object as *mut ComProxy)).real,
        _ => object,
    }
}

/// Device proxy `this` belongs to, null when it is not known
///
/// # Safety
/// `this` must be a live proxy.
pub(crate) unsafe fn device_of(this: *mut ComProxy) -> *mut ComProxy {
    match (*this).kind {
        InterfaceKind::Device => this,
        InterfaceKind::Direct3D => std::ptr::null_mut(),
        _ => (*this).parent,
    }
}

/// Whether `object` is one of our live proxies
pub fn is_proxy(object: *mut c_void) -> bool {
    PROXIES.lock().values().any(|&proxy| proxy == object as usize)
}

/// Number of live proxies
pub fn live_count() -> usize {
    PROXIES.lock().len()
}

/// Release through the wrapped object, freeing the proxy when it dies
///
/// Proxies obtained from the dying one are dropped with it.
///
/// # Safety
/// `this` must be a live proxy.
pub(crate) unsafe fn release(this: *mut ComProxy) -> u32 {
    type ReleaseFn = unsafe extern "system" fn(*mut c_void) -> u32;

    let real = (*this).real;
    let mut proxies = PROXIES.lock();
    let count = method::<ReleaseFn>(real, slots::RELEASE)(real);
    if count == 0 {
        free(&mut proxies, this);
    }
    count
}

unsafe fn free(proxies: &mut HashMap<usize, usize>, proxy: *mut ComProxy) {
    let real = (*proxy).real as usize;
    if proxies.get(&real) == Some(&(proxy as usize)) {
        proxies.remove(&real);
    }

    let children: Vec<usize> = proxies
        .values()
        .copied()
        .filter(|&child| (*(child as *mut ComProxy)).parent == proxy)
        .collect();
    for child in children {
        free(proxies, child as *mut ComProxy);
    }

    tracing::debug!("Freed {} proxy {:p}", (*proxy).kind.name(), proxy);
    drop(Box::from_raw(proxy));
}

/// Read vtable `slot` of a COM object as a function pointer
///
/// # Safety
/// `object` must be a live COM object whose vtable has `slot`, and `F`
/// must be a function pointer type matching that method.
#[inline]
pub unsafe fn method<F: Copy>(object: *mut c_void, slot: usize) -> F {
    let vtbl = *(object as *const *const usize);
    std::mem::transmute_copy::<usize, F>(&*vtbl.add(slot))
}
