//! Launcher errors

use std::path::PathBuf;

/// Reasons the launcher refuses or fails to start the target
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// No target on the command line and none configured
    #[error("No target executable given and [launcher] app_exe is empty")]
    NoTarget,

    #[error("File not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a valid PE image", .0.display())]
    InvalidImage(PathBuf),

    /// The proxy module or the program was built for another processor
    #[error(
        "Architecture mismatch: launcher is {launcher}, {} is {module_machine}, {} is {target_machine}",
        .module.display(),
        .target.display()
    )]
    ArchitectureMismatch {
        launcher: &'static str,
        module: PathBuf,
        module_machine: &'static str,
        target: PathBuf,
        target_machine: &'static str,
    },

    /// A Win32 call failed
    #[error("{call}() failed; error = ({code:#x}) '{message}'")]
    OsCall {
        call: &'static str,
        code: u32,
        message: String,
    },

    #[error("Launching is only supported on Windows")]
    Unsupported,
}

impl LaunchError {
    /// Capture the calling thread's last error for `call`
    #[cfg(windows)]
    pub fn last_os_error(call: &'static str) -> Self {
        use windows_sys::Win32::Foundation::GetLastError;

        // SAFETY: no preconditions
        let code = unsafe { GetLastError() };
        Self::OsCall {
            call,
            code,
            message: system_message(code),
        }
    }
}

/// System text for an error code, trimmed of the trailing line break
#[cfg(windows)]
fn system_message(code: u32) -> String {
    use windows_sys::Win32::System::Diagnostics::Debug::{
        FormatMessageW, FORMAT_MESSAGE_FROM_SYSTEM, FORMAT_MESSAGE_IGNORE_INSERTS,
    };

    let mut buffer = [0u16; 512];
    // SAFETY: buffer length is passed; no inserts are expanded
    let len = unsafe {
        FormatMessageW(
            FORMAT_MESSAGE_FROM_SYSTEM | FORMAT_MESSAGE_IGNORE_INSERTS,
            std::ptr::null(),
            code,
            0,
            buffer.as_mut_ptr(),
            buffer.len() as u32,
            std::ptr::null(),
        )
    };
    let len = (len as usize).min(buffer.len());
    String::from_utf16_lossy(&buffer[..len]).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_call_display() {
        let err = LaunchError::OsCall {
            call: "CreateProcessW",
            code: 2,
            message: "The system cannot find the file specified.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "CreateProcessW() failed; error = (0x2) 'The system cannot find the file specified.'"
        );
    }

    #[test]
    fn test_mismatch_names_all_three() {
        let err = LaunchError::ArchitectureMismatch {
            launcher: "x64",
            module: PathBuf::from("d3d9.dll"),
            module_machine: "x64",
            target: PathBuf::from("game.exe"),
            target_machine: "x86",
        };
        assert_eq!(
            err.to_string(),
            "Architecture mismatch: launcher is x64, d3d9.dll is x64, game.exe is x86"
        );
    }
}
