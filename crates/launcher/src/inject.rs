//! Suspended process creation and remote module load

use std::ffi::{c_void, OsStr};
use std::mem::size_of;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0};
use windows_sys::Win32::System::Diagnostics::Debug::WriteProcessMemory;
use windows_sys::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
use windows_sys::Win32::System::Memory::{
    VirtualAllocEx, VirtualFreeEx, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE,
};
use windows_sys::Win32::System::Threading::{
    CreateProcessW, CreateRemoteThread, GetExitCodeThread, ResumeThread, TerminateProcess,
    WaitForSingleObject, CREATE_SUSPENDED, INFINITE, LPTHREAD_START_ROUTINE,
    PROCESS_INFORMATION, STARTUPINFOW,
};

use crate::error::LaunchError;
use crate::target::LaunchTarget;

fn wide(value: &OsStr) -> Vec<u16> {
    value.encode_wide().chain(Some(0)).collect()
}

/// Handle closed on drop
struct Owned(HANDLE);

impl Drop for Owned {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: we own the handle
            unsafe { CloseHandle(self.0) };
        }
    }
}

/// Memory committed in another process, released on drop
struct Remote {
    process: HANDLE,
    address: *mut c_void,
}

impl Drop for Remote {
    fn drop(&mut self) {
        // SAFETY: address came from VirtualAllocEx in `process`
        if unsafe { VirtualFreeEx(self.process, self.address, 0, MEM_RELEASE) } == 0 {
            tracing::warn!("{}", LaunchError::last_os_error("VirtualFreeEx"));
        }
    }
}

/// Start `target` suspended, load `module` into it, then let it run
///
/// The process is terminated if anything fails before it was resumed.
pub fn launch(target: &LaunchTarget, module: &Path) -> Result<u32, LaunchError> {
    let application = wide(target.exe.as_os_str());
    let mut command_line = wide(OsStr::new(&target.command_line()));
    let directory = target.exe.parent().filter(|d| !d.as_os_str().is_empty()).map(|d| wide(d.as_os_str()));

    // SAFETY: zeroed STARTUPINFOW with cb set is a valid request
    let mut startup: STARTUPINFOW = unsafe { std::mem::zeroed() };
    startup.cb = size_of::<STARTUPINFOW>() as u32;
    // SAFETY: filled in by CreateProcessW
    let mut info: PROCESS_INFORMATION = unsafe { std::mem::zeroed() };

    tracing::info!("Starting {}", target.command_line());
    // SAFETY: all strings are NUL-terminated; command_line is writable
    let created = unsafe {
        CreateProcessW(
            application.as_ptr(),
            command_line.as_mut_ptr(),
            std::ptr::null(),
            std::ptr::null(),
            0,
            CREATE_SUSPENDED,
            std::ptr::null(),
            directory.as_ref().map_or(std::ptr::null(), |d| d.as_ptr()),
            &startup,
            &mut info,
        )
    };
    if created == 0 {
        return Err(LaunchError::last_os_error("CreateProcessW"));
    }

    let process = Owned(info.hProcess);
    let thread = Owned(info.hThread);

    let result = load_module(process.0, module).and_then(|()| {
        // SAFETY: thread is the suspended primary thread
        if unsafe { ResumeThread(thread.0) } == u32::MAX {
            return Err(LaunchError::last_os_error("ResumeThread"));
        }
        Ok(())
    });

    if let Err(e) = result {
        // SAFETY: the process never ran past its entry point
        unsafe { TerminateProcess(process.0, 1) };
        return Err(e);
    }
    Ok(info.dwProcessId)
}

/// Run `LoadLibraryW(module)` on a remote thread and wait for it
fn load_module(process: HANDLE, module: &Path) -> Result<(), LaunchError> {
    let path = wide(module.as_os_str());
    let size = path.len() * size_of::<u16>();

    // SAFETY: plain allocation request in a process we created
    let address = unsafe {
        VirtualAllocEx(
            process,
            std::ptr::null(),
            size,
            MEM_COMMIT | MEM_RESERVE,
            PAGE_READWRITE,
        )
    };
    if address.is_null() {
        return Err(LaunchError::last_os_error("VirtualAllocEx"));
    }
    let remote = Remote { process, address };

    let mut written = 0usize;
    // SAFETY: `size` bytes were committed at `address`
    let ok = unsafe {
        WriteProcessMemory(
            process,
            remote.address,
            path.as_ptr().cast(),
            size,
            &mut written,
        )
    };
    if ok == 0 || written != size {
        return Err(LaunchError::last_os_error("WriteProcessMemory"));
    }

    let start = load_library_routine()?;
    let mut thread_id = 0u32;
    // SAFETY: kernel32 is mapped at the same base in a same-architecture process
    let thread = unsafe {
        CreateRemoteThread(
            process,
            std::ptr::null(),
            0,
            start,
            remote.address,
            0,
            &mut thread_id,
        )
    };
    if thread.is_null() {
        return Err(LaunchError::last_os_error("CreateRemoteThread"));
    }
    let thread = Owned(thread);

    // SAFETY: valid thread handle
    if unsafe { WaitForSingleObject(thread.0, INFINITE) } != WAIT_OBJECT_0 {
        return Err(LaunchError::last_os_error("WaitForSingleObject"));
    }

    let mut exit_code = 0u32;
    // SAFETY: the thread has finished
    if unsafe { GetExitCodeThread(thread.0, &mut exit_code) } != 0 && exit_code == 0 {
        // The low half of the module handle is zero only when the load failed
        tracing::warn!("LoadLibraryW({}) reported failure in the target", module.display());
    } else {
        tracing::debug!("Loaded {} on thread {}", module.display(), thread_id);
    }
    Ok(())
}

fn load_library_routine() -> Result<LPTHREAD_START_ROUTINE, LaunchError> {
    let kernel32 = wide(OsStr::new("kernel32.dll"));
    // SAFETY: kernel32 is always loaded
    let module = unsafe { GetModuleHandleW(kernel32.as_ptr()) };
    if module.is_null() {
        return Err(LaunchError::last_os_error("GetModuleHandleW"));
    }
    // SAFETY: NUL-terminated export name
    let proc = unsafe { GetProcAddress(module, c"LoadLibraryW".as_ptr().cast()) }
        .ok_or_else(|| LaunchError::last_os_error("GetProcAddress"))?;
    // SAFETY: LoadLibraryW takes one pointer argument and returns a handle,
    // which matches a thread routine's register use
    Ok(Some(unsafe {
        std::mem::transmute::<
            unsafe extern "system" fn() -> isize,
            unsafe extern "system" fn(*mut c_void) -> u32,
        >(proc)
    }))
}
