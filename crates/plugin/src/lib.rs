//! d3d9 proxy - Module Entry
//!
//! This crate compiles to `d3d9.dll`. Placed beside a game executable it is
//! loaded instead of the system library, brings the proxy up from
//! `DllMain` and re-exports every d3d9 entry point.

pub mod ffi;
mod logging;

#[cfg(windows)]
pub use ffi::dll_main::DllMain;
