//! Config path resolution
//!
//! Handles resolving paths for configuration and log files based on the
//! proxy module's location.

use std::path::{Path, PathBuf};

use super::{ConfigError, ConfigResult};

/// Config file name, next to the proxy module
pub const CONFIG_FILE_NAME: &str = "d3d9-proxy.toml";

/// Log file name, next to the proxy module
pub const LOG_FILE_NAME: &str = "d3d9-proxy.log";

/// Returns the directory containing the proxy module.
///
/// The proxy is loaded from the game directory as `d3d9.dll`, so this is
/// usually the directory of the host executable as well.
#[cfg(windows)]
pub fn module_dir() -> ConfigResult<PathBuf> {
    module_path()?
        .parent()
        .map(Path::to_path_buf)
        .ok_or(ConfigError::NoConfigDirectory)
}

/// Full path of the module containing this code.
#[cfg(windows)]
pub fn module_path() -> ConfigResult<PathBuf> {
    use std::os::windows::ffi::OsStringExt;
    use windows_sys::Win32::System::LibraryLoader::{
        GetModuleFileNameW, GetModuleHandleExW, GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS,
        GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
    };

    let mut module = std::ptr::null_mut();
    // SAFETY: the address passed lies inside this module
    let found = unsafe {
        GetModuleHandleExW(
            GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS | GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
            module_path as *const () as *const u16,
            &mut module,
        )
    };
    if found == 0 {
        return Err(ConfigError::NoConfigDirectory);
    }

    let mut buffer = vec![0u16; 1024];
    // SAFETY: buffer length is passed alongside the pointer
    let len = unsafe { GetModuleFileNameW(module, buffer.as_mut_ptr(), buffer.len() as u32) };
    if len == 0 || len as usize >= buffer.len() {
        return Err(ConfigError::NoConfigDirectory);
    }

    Ok(PathBuf::from(std::ffi::OsString::from_wide(
        &buffer[..len as usize],
    )))
}

/// Returns the directory containing the current executable.
#[cfg(not(windows))]
pub fn module_dir() -> ConfigResult<PathBuf> {
    let exe = std::env::current_exe().map_err(ConfigError::IoError)?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or(ConfigError::NoConfigDirectory)
}

/// Returns the config file path.
///
/// Path: `<module dir>/d3d9-proxy.toml`
pub fn config_path() -> ConfigResult<PathBuf> {
    Ok(module_dir()?.join(CONFIG_FILE_NAME))
}

/// Returns the log file path.
///
/// Path: `<module dir>/d3d9-proxy.log`
pub fn log_path() -> ConfigResult<PathBuf> {
    Ok(module_dir()?.join(LOG_FILE_NAME))
}

/// Returns the config path beside an arbitrary file, e.g. the launcher.
pub fn config_path_beside(file: &Path) -> Option<PathBuf> {
    file.parent().map(|dir| dir.join(CONFIG_FILE_NAME))
}
