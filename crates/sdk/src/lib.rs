//! d3d9 proxy SDK - Direct3D 9 Type Definitions
//!
//! This crate contains the d3d9 structures, interface IDs, vtable slot
//! indices and user32 constants shared by the proxy crates.
//! It has no dependencies and compiles quickly, allowing parallel compilation
//! of dependent crates.
//!
//! # Modules
//!
//! - [`d3d9`] - Structures, IIDs and HRESULT codes
//! - [`exports`] - Entry point names exported by the system d3d9.dll
//! - [`slots`] - Vtable slot indices for the wrapped interfaces
//! - [`win32`] - Window message and style constants

pub mod d3d9;
pub mod exports;
pub mod slots;
pub mod win32;

pub use d3d9::*;
pub use exports::ENTRY_POINTS;
