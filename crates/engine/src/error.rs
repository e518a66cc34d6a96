//! Error types for loading the system d3d9 library

/// Error type for library loading operations
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The system library could not be mapped
    #[error("Library not found: {0}")]
    LibraryNotFound(String),

    /// An entry point was not exported by the library
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Invalid symbol name (not null-terminated)
    #[error("Invalid symbol name: {0}")]
    InvalidSymbolName(String),

    /// The OS system directory could not be resolved
    #[error("System directory unavailable (error {0})")]
    SystemDirectory(u32),

    /// Library already loaded
    #[error("System library already initialized")]
    AlreadyInitialized,
}
