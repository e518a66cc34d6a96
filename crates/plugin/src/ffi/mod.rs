//! Symbols the loader and the host call into

#[cfg(windows)]
pub mod dll_main;
pub mod exports;
