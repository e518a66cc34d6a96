//! Global storage for the real d3d9 library
//!
//! The library is loaded once during process attach and stored here.
//! Access is thread-safe via OnceLock; the module handle is taken back
//! out under a lock at detach so it is freed exactly once.

use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::error::LoadError;
use crate::loader::EntryPoints;

/// Real library state
pub struct RealLibrary {
    /// Resolved entry points
    pub entry_points: EntryPoints,

    /// Module handle of the system d3d9.dll, cleared on release
    module: Mutex<Option<usize>>,
}

/// Global real-library storage
static REAL: OnceLock<RealLibrary> = OnceLock::new();

/// Initialize the global real library
///
/// Called once during process attach. Returns error if already initialized.
pub fn init_real(library: RealLibrary) -> Result<(), LoadError> {
    REAL.set(library).map_err(|_| LoadError::AlreadyInitialized)
}

/// Try to get the real library
pub fn try_real() -> Option<&'static RealLibrary> {
    REAL.get()
}

/// Entry points of the real library, empty if it never loaded
pub fn entry_points() -> EntryPoints {
    REAL.get().map(|r| r.entry_points).unwrap_or_default()
}

/// Check if the real library is loaded
pub fn is_real_loaded() -> bool {
    REAL.get().is_some()
}

impl RealLibrary {
    /// Create new RealLibrary
    ///
    /// # Arguments
    /// * `module` - Module handle of the loaded library, 0 if none
    /// * `entry_points` - Resolved entry points
    pub fn new(module: usize, entry_points: EntryPoints) -> Self {
        Self {
            entry_points,
            module: Mutex::new((module != 0).then_some(module)),
        }
    }

    /// Module handle, if still held
    pub fn module(&self) -> Option<usize> {
        *self.module.lock()
    }

    /// Take the module handle for release
    ///
    /// Subsequent calls return None.
    pub fn take_module(&self) -> Option<usize> {
        self.module.lock().take()
    }
}

/// Free the real library
///
/// Called at process detach. Entry points stay cached but must not be
/// called afterwards.
#[cfg(windows)]
pub fn release_real() {
    use windows_sys::Win32::System::LibraryLoader::FreeLibrary;

    if let Some(module) = REAL.get().and_then(RealLibrary::take_module) {
        // SAFETY: handle came from LoadLibraryW and is released once
        unsafe { FreeLibrary(module as _) };
        tracing::debug!("Released system d3d9.dll");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_module_once() {
        let library = RealLibrary::new(0x1000, EntryPoints::default());
        assert_eq!(library.module(), Some(0x1000));
        assert_eq!(library.take_module(), Some(0x1000));
        assert_eq!(library.take_module(), None);
    }

    #[test]
    fn test_null_module_is_none() {
        let library = RealLibrary::new(0, EntryPoints::default());
        assert_eq!(library.module(), None);
    }
}
