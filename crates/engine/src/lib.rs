//! d3d9 proxy Engine - Real Library Loading and Global Storage
//!
//! This crate handles:
//! - Loading the system d3d9.dll from the OS system directory
//! - Resolving every re-exported entry point by exact symbol name
//! - Storing the result in a thread-safe global static
//!
//! # Architecture
//!
//! The library is loaded once during process attach via
//! [`loader::load_system_library`] and stored in [`globals::RealLibrary`].
//! Exports read it through [`entry_points()`].

pub mod error;
pub mod globals;
pub mod loader;

pub use error::LoadError;
#[cfg(windows)]
pub use globals::release_real;
pub use globals::{entry_points, init_real, is_real_loaded, try_real, RealLibrary};
#[cfg(windows)]
pub use loader::load_system_library;
pub use loader::{resolve_entry_points, EntryPoints, ExportTable};
