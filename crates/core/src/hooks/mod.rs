//! Hook system
//!
//! Provides:
//! - Import address table hooks (slot replacement, no trampolines)
//! - The module hooking controller that follows every module load
//! - The window message interceptor installed through class registration
//! - Forwarding stubs used by the interface proxies

pub mod controller;
pub mod iat;
pub mod interceptor;
pub mod pe;
pub mod stubs;

pub use controller::Shim;
pub use iat::{
    find_slot, install_hook, ExportResolver, IatPatcher, ImportQuery, PatchKey, PatchRecord,
    PatchRegistry, SymbolPatcher,
};
pub use interceptor::{classify, Action, ClassName, ClassRegistry, ProcessQuery};
pub use pe::{ImageView, PeImage};

/// Error type for hook operations
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Invalid image: {0}")]
    InvalidImage(&'static str),

    #[error("Image uses {0}-byte pointers, which this build cannot patch")]
    PointerSizeMismatch(usize),

    #[error("Misaligned import slot: {0:#x}")]
    MisalignedSlot(usize),

    #[error("Memory protection failed: {0}")]
    MemoryProtection(String),

    #[error("Failed to allocate executable memory")]
    AllocationFailed,

    #[error("Failed to assemble stub: {0}")]
    Assembly(String),
}
