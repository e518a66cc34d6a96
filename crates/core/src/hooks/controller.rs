//! Module hooking controller
//!
//! Patches a fixed set of loader and window-system imports in the host's
//! modules. The loader shims re-run the sweep after every load, and the
//! `GetProcAddress` shim hands out shim addresses, so modules loaded later
//! or resolving these functions dynamically are covered too.
//!
//! The proxy's own module and modules under the Windows directory are
//! never patched.

use std::path::Path;

use super::iat::SymbolPatcher;

/// Every import the controller redirects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shim {
    LoadLibraryA,
    LoadLibraryW,
    LoadLibraryExA,
    LoadLibraryExW,
    FreeLibrary,
    GetProcAddress,
    RegisterClassA,
    RegisterClassW,
    RegisterClassExA,
    RegisterClassExW,
    GetForegroundWindow,
    GetActiveWindow,
    GetFocus,
}

impl Shim {
    pub const ALL: [Shim; 13] = [
        Shim::LoadLibraryA,
        Shim::LoadLibraryW,
        Shim::LoadLibraryExA,
        Shim::LoadLibraryExW,
        Shim::FreeLibrary,
        Shim::GetProcAddress,
        Shim::RegisterClassA,
        Shim::RegisterClassW,
        Shim::RegisterClassExA,
        Shim::RegisterClassExW,
        Shim::GetForegroundWindow,
        Shim::GetActiveWindow,
        Shim::GetFocus,
    ];

    /// Exported symbol name
    pub fn name(self) -> &'static str {
        match self {
            Shim::LoadLibraryA => "LoadLibraryA",
            Shim::LoadLibraryW => "LoadLibraryW",
            Shim::LoadLibraryExA => "LoadLibraryExA",
            Shim::LoadLibraryExW => "LoadLibraryExW",
            Shim::FreeLibrary => "FreeLibrary",
            Shim::GetProcAddress => "GetProcAddress",
            Shim::RegisterClassA => "RegisterClassA",
            Shim::RegisterClassW => "RegisterClassW",
            Shim::RegisterClassExA => "RegisterClassExA",
            Shim::RegisterClassExW => "RegisterClassExW",
            Shim::GetForegroundWindow => "GetForegroundWindow",
            Shim::GetActiveWindow => "GetActiveWindow",
            Shim::GetFocus => "GetFocus",
        }
    }

    /// DLL the real function is exported from
    pub fn home_dll(self) -> &'static str {
        match self {
            Shim::LoadLibraryA
            | Shim::LoadLibraryW
            | Shim::LoadLibraryExA
            | Shim::LoadLibraryExW
            | Shim::FreeLibrary
            | Shim::GetProcAddress => "kernel32.dll",
            _ => "user32.dll",
        }
    }

    /// Exact, case-sensitive lookup, matching `GetProcAddress` semantics
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|shim| shim.name() == name)
    }
}

/// Whether `path` lies under the Windows installation directory
pub fn is_system_path(path: &Path, windows_dir: &Path) -> bool {
    let windows_dir = windows_dir.to_string_lossy().to_lowercase();
    let windows_dir = windows_dir.trim_end_matches(['\\', '/']);
    if windows_dir.is_empty() {
        return false;
    }
    let path = path.to_string_lossy().to_lowercase();
    path.strip_prefix(windows_dir)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(['\\', '/']))
}

/// Apply every shim in `shims` to `module`
///
/// Missing imports are expected and silent.
///
/// # Returns
/// Number of slots patched
pub fn hook_module(
    patcher: &dyn SymbolPatcher,
    module: usize,
    shims: &[Shim],
    replacement: impl Fn(Shim) -> usize,
) -> usize {
    let mut patched = 0;
    for &shim in shims {
        match patcher.install(module, None, shim.name(), replacement(shim)) {
            Ok(Some(_)) => patched += 1,
            Ok(None) => {}
            Err(e) => {
                tracing::debug!("Skipping {} in module {:#x}: {}", shim.name(), module, e);
                break;
            }
        }
    }
    patched
}

/// Report the captured focus window instead of a foreign or missing one
///
/// # Arguments
/// * `reported` - What the real query returned
/// * `reported_is_ours` - Whether that window belongs to this process
/// * `focus` - Focus window captured at device creation, 0 if none
pub fn substitute_focus(reported: usize, reported_is_ours: bool, focus: usize) -> usize {
    if focus != 0 && (reported == 0 || !reported_is_ours) {
        focus
    } else {
        reported
    }
}

#[cfg(windows)]
pub use self::windows::{enable, is_enabled};

#[cfg(windows)]
mod windows {
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::ffi::CStr;
    use std::os::windows::ffi::OsStringExt;
    use std::path::PathBuf;
    use std::sync::OnceLock;
    use std::time::Duration;

    use windows_sys::Win32::Foundation::{FARPROC, HANDLE, HMODULE, HWND};
    use windows_sys::Win32::System::LibraryLoader::GetModuleFileNameW;
    use windows_sys::Win32::System::ProcessStatus::K32EnumProcessModules;
    use windows_sys::Win32::System::SystemInformation::GetWindowsDirectoryW;
    use windows_sys::Win32::System::Threading::{GetCurrentProcess, GetCurrentProcessId};
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        GetWindowThreadProcessId, WNDCLASSA, WNDCLASSEXA, WNDCLASSEXW, WNDCLASSW, WNDPROC,
    };

    use super::*;
    use crate::hooks::iat::{ExportResolver, IatPatcher, LoadedModules};
    use crate::hooks::interceptor::{
        class_name_a, class_name_w, interceptor_address, record_class, should_subclass,
    };
    use crate::hooks::ClassName;

    static HOOKER: OnceLock<ModuleHooker> = OnceLock::new();

    /// Resolves shim symbols against their home DLL when no DLL is named
    struct ShimExports;

    impl ExportResolver for ShimExports {
        fn export_address(&self, dll: Option<&str>, symbol: &str) -> Option<usize> {
            let dll = dll.or_else(|| Shim::from_name(symbol).map(Shim::home_dll))?;
            LoadedModules.export_address(Some(dll), symbol)
        }
    }

    struct ModuleHooker {
        patcher: IatPatcher<ShimExports>,
        own_module: usize,
        windows_dir: PathBuf,
        processed: Mutex<HashSet<usize>>,
    }

    impl ModuleHooker {
        fn sweep(&self) {
            for module in loaded_modules() {
                if module == self.own_module || !self.processed.lock().insert(module) {
                    continue;
                }
                let Some(path) = module_path(module) else {
                    continue;
                };
                if is_system_path(&path, &self.windows_dir) {
                    tracing::trace!("Skipping system module {:?}", path);
                    continue;
                }

                let patched = hook_module(&self.patcher, module, &Shim::ALL, Shim::address);
                if patched > 0 {
                    tracing::info!("Hooked {} imports in {:?}", patched, path);
                }
            }
        }

        fn forget(&self, module: usize) {
            if self.processed.lock().remove(&module) {
                let dropped = self.patcher.forget_module(module);
                tracing::debug!(
                    "Module {:#x} unloaded, dropped {} patch records",
                    module,
                    dropped
                );
            }
        }
    }

    /// Start following module loads
    ///
    /// # Arguments
    /// * `own_module` - Base of the proxy module, never patched
    /// * `delay_wait` - Cap on waiting for delay-load slots to bind
    pub fn enable(own_module: usize, delay_wait: Duration) {
        let hooker = HOOKER.get_or_init(|| ModuleHooker {
            patcher: IatPatcher::new(ShimExports, delay_wait),
            own_module,
            windows_dir: windows_directory(),
            processed: Mutex::new(HashSet::new()),
        });
        tracing::info!("Module hooking enabled (system dir {:?})", hooker.windows_dir);
        hooker.sweep();
    }

    pub fn is_enabled() -> bool {
        HOOKER.get().is_some()
    }

    fn loaded_modules() -> Vec<usize> {
        let mut modules: Vec<HMODULE> = vec![std::ptr::null_mut(); 256];
        loop {
            let mut needed = 0u32;
            // SAFETY: the buffer size is passed alongside the pointer
            let ok = unsafe {
                K32EnumProcessModules(
                    GetCurrentProcess(),
                    modules.as_mut_ptr(),
                    (modules.len() * std::mem::size_of::<HMODULE>()) as u32,
                    &mut needed,
                )
            };
            if ok == 0 {
                return Vec::new();
            }
            let count = needed as usize / std::mem::size_of::<HMODULE>();
            if count <= modules.len() {
                return modules[..count].iter().map(|m| *m as usize).collect();
            }
            modules.resize(count, std::ptr::null_mut());
        }
    }

    fn module_path(module: usize) -> Option<PathBuf> {
        let mut buffer = vec![0u16; 1024];
        // SAFETY: buffer length is passed alongside the pointer
        let len = unsafe {
            GetModuleFileNameW(module as HMODULE, buffer.as_mut_ptr(), buffer.len() as u32)
        } as usize;
        (len != 0 && len < buffer.len())
            .then(|| PathBuf::from(std::ffi::OsString::from_wide(&buffer[..len])))
    }

    fn windows_directory() -> PathBuf {
        let mut buffer = vec![0u16; 512];
        // SAFETY: buffer length is passed alongside the pointer
        let len = unsafe { GetWindowsDirectoryW(buffer.as_mut_ptr(), buffer.len() as u32) } as usize;
        if len == 0 || len >= buffer.len() {
            return PathBuf::new();
        }
        PathBuf::from(std::ffi::OsString::from_wide(&buffer[..len]))
    }

    fn original_address(shim: Shim) -> usize {
        HOOKER
            .get()
            .and_then(|hooker| hooker.patcher.original(shim.name()))
            .or_else(|| ShimExports.export_address(None, shim.name()))
            .unwrap_or(0)
    }

    fn after_load() {
        if let Some(hooker) = HOOKER.get() {
            hooker.sweep();
        }
    }

    macro_rules! originals {
        ($($shim:ident: fn($($arg:ty),*) -> $ret:ty;)*) => {
            paste::paste! {
                $(
                    fn [<original_ $shim:snake>]() -> Option<unsafe extern "system" fn($($arg),*) -> $ret> {
                        let address = original_address(Shim::$shim);
                        // SAFETY: the address is the real export, which has this signature
                        (address != 0).then(|| unsafe {
                            std::mem::transmute::<usize, unsafe extern "system" fn($($arg),*) -> $ret>(address)
                        })
                    }
                )*
            }
        };
    }

    originals! {
        LoadLibraryA: fn(*const u8) -> HMODULE;
        LoadLibraryW: fn(*const u16) -> HMODULE;
        LoadLibraryExA: fn(*const u8, HANDLE, u32) -> HMODULE;
        LoadLibraryExW: fn(*const u16, HANDLE, u32) -> HMODULE;
        FreeLibrary: fn(HMODULE) -> i32;
        GetProcAddress: fn(HMODULE, *const u8) -> FARPROC;
        RegisterClassA: fn(*const WNDCLASSA) -> u16;
        RegisterClassW: fn(*const WNDCLASSW) -> u16;
        RegisterClassExA: fn(*const WNDCLASSEXA) -> u16;
        RegisterClassExW: fn(*const WNDCLASSEXW) -> u16;
        GetForegroundWindow: fn() -> HWND;
        GetActiveWindow: fn() -> HWND;
        GetFocus: fn() -> HWND;
    }

    impl Shim {
        /// Address of the shim installed in place of this import
        pub fn address(self) -> usize {
            match self {
                Shim::LoadLibraryA => load_library_a as usize,
                Shim::LoadLibraryW => load_library_w as usize,
                Shim::LoadLibraryExA => load_library_ex_a as usize,
                Shim::LoadLibraryExW => load_library_ex_w as usize,
                Shim::FreeLibrary => free_library as usize,
                Shim::GetProcAddress => get_proc_address as usize,
                Shim::RegisterClassA => register_class_a as usize,
                Shim::RegisterClassW => register_class_w as usize,
                Shim::RegisterClassExA => register_class_ex_a as usize,
                Shim::RegisterClassExW => register_class_ex_w as usize,
                Shim::GetForegroundWindow => get_foreground_window as usize,
                Shim::GetActiveWindow => get_active_window as usize,
                Shim::GetFocus => get_focus as usize,
            }
        }
    }

    unsafe extern "system" fn load_library_a(name: *const u8) -> HMODULE {
        let Some(original) = original_load_library_a() else {
            return std::ptr::null_mut();
        };
        let module = original(name);
        if !module.is_null() {
            after_load();
        }
        module
    }

    unsafe extern "system" fn load_library_w(name: *const u16) -> HMODULE {
        let Some(original) = original_load_library_w() else {
            return std::ptr::null_mut();
        };
        let module = original(name);
        if !module.is_null() {
            after_load();
        }
        module
    }

    unsafe extern "system" fn load_library_ex_a(name: *const u8, file: HANDLE, flags: u32) -> HMODULE {
        let Some(original) = original_load_library_ex_a() else {
            return std::ptr::null_mut();
        };
        let module = original(name, file, flags);
        if !module.is_null() {
            after_load();
        }
        module
    }

    unsafe extern "system" fn load_library_ex_w(name: *const u16, file: HANDLE, flags: u32) -> HMODULE {
        let Some(original) = original_load_library_ex_w() else {
            return std::ptr::null_mut();
        };
        let module = original(name, file, flags);
        if !module.is_null() {
            after_load();
        }
        module
    }

    unsafe extern "system" fn free_library(module: HMODULE) -> i32 {
        let Some(original) = original_free_library() else {
            return 0;
        };
        let result = original(module);
        if result != 0 && module_path(module as usize).is_none() {
            if let Some(hooker) = HOOKER.get() {
                hooker.forget(module as usize);
            }
        }
        result
    }

    unsafe extern "system" fn get_proc_address(module: HMODULE, name: *const u8) -> FARPROC {
        let original = original_get_proc_address()?;
        let result = original(module, name);

        // Ordinal lookups carry the ordinal in the low word
        if result.is_none() || (name as usize) >> 16 == 0 {
            return result;
        }
        let Some(shim) = CStr::from_ptr(name.cast())
            .to_str()
            .ok()
            .and_then(Shim::from_name)
        else {
            return result;
        };

        // Only redirect the real export, not a same-named function elsewhere
        let real = ShimExports.export_address(None, shim.name());
        if real.is_some() && real == result.map(|f| f as usize) {
            tracing::trace!("Handing out shim for {}", shim.name());
            return std::mem::transmute::<usize, FARPROC>(shim.address());
        }
        result
    }

    /// Swap in the interceptor when the class should be subclassed
    ///
    /// # Returns
    /// The procedure replaced, to be recorded once registration succeeds
    fn subclass(wndproc: &mut WNDPROC, class: Option<ClassName>) -> Option<usize> {
        let runtime = crate::runtime::get()?;
        if !runtime.policy().intercepts_messages() {
            return None;
        }
        let current = wndproc.map_or(0, |f| f as usize);
        let interceptor = interceptor_address();
        if !should_subclass(&class?, current, interceptor) {
            return None;
        }
        // SAFETY: the interceptor is a window procedure
        *wndproc = unsafe { std::mem::transmute::<usize, WNDPROC>(interceptor) };
        Some(current)
    }

    macro_rules! register_class_shim {
        ($shim:ident, $original:ident, $class:ty, $decode:ident, $unicode:expr) => {
            unsafe extern "system" fn $shim(class: *const $class) -> u16 {
                let Some(original) = $original() else {
                    return 0;
                };
                if class.is_null() {
                    return original(class);
                }

                let mut copy = *class;
                let replaced = subclass(&mut copy.lpfnWndProc, $decode(copy.lpszClassName));
                let atom = original(&copy);
                if let (true, Some(previous)) = (atom != 0, replaced) {
                    record_class(atom, previous, $unicode);
                }
                atom
            }
        };
    }

    register_class_shim!(register_class_a, original_register_class_a, WNDCLASSA, class_name_a, false);
    register_class_shim!(register_class_w, original_register_class_w, WNDCLASSW, class_name_w, true);
    register_class_shim!(register_class_ex_a, original_register_class_ex_a, WNDCLASSEXA, class_name_a, false);
    register_class_shim!(register_class_ex_w, original_register_class_ex_w, WNDCLASSEXW, class_name_w, true);

    fn focus_substitute(reported: HWND) -> HWND {
        let Some(runtime) = crate::runtime::get() else {
            return reported;
        };
        if !runtime.policy().ignore_focus_loss {
            return reported;
        }

        let ours = !reported.is_null() && {
            let mut pid = 0u32;
            // SAFETY: pid is a valid out pointer
            unsafe { GetWindowThreadProcessId(reported, &mut pid) };
            pid == unsafe { GetCurrentProcessId() }
        };
        substitute_focus(reported as usize, ours, runtime.focus_window()) as HWND
    }

    unsafe extern "system" fn get_foreground_window() -> HWND {
        match original_get_foreground_window() {
            Some(original) => focus_substitute(original()),
            None => std::ptr::null_mut(),
        }
    }

    unsafe extern "system" fn get_active_window() -> HWND {
        match original_get_active_window() {
            Some(original) => focus_substitute(original()),
            None => std::ptr::null_mut(),
        }
    }

    unsafe extern "system" fn get_focus() -> HWND {
        match original_get_focus() {
            Some(original) => focus_substitute(original()),
            None => std::ptr::null_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::iat::{ExportResolver, IatPatcher};
    use crate::hooks::pe::fixture::{ImageBuilder, Thunk};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_shim_names_round_trip() {
        for shim in Shim::ALL {
            assert_eq!(Shim::from_name(shim.name()), Some(shim));
        }
        assert_eq!(Shim::from_name("getfocus"), None);
        assert_eq!(Shim::from_name("CreateWindowExW"), None);
    }

    #[test]
    fn test_home_dlls() {
        assert_eq!(Shim::GetProcAddress.home_dll(), "kernel32.dll");
        assert_eq!(Shim::LoadLibraryExW.home_dll(), "kernel32.dll");
        assert_eq!(Shim::RegisterClassExA.home_dll(), "user32.dll");
        assert_eq!(Shim::GetFocus.home_dll(), "user32.dll");
    }

    #[test]
    fn test_system_paths() {
        let windows = PathBuf::from(r"C:\Windows");
        assert!(is_system_path(
            &PathBuf::from(r"c:\windows\System32\USER32.dll"),
            &windows
        ));
        assert!(is_system_path(
            &PathBuf::from(r"C:\WINDOWS\SysWOW64\d3d9.dll"),
            &windows
        ));
        assert!(!is_system_path(
            &PathBuf::from(r"C:\WindowsApps\game\engine.dll"),
            &windows
        ));
        assert!(!is_system_path(
            &PathBuf::from(r"D:\Games\app\engine.dll"),
            &windows
        ));
        assert!(!is_system_path(&PathBuf::from(r"C:\x.dll"), &PathBuf::new()));
    }

    #[test]
    fn test_focus_substitution() {
        const FOCUS: usize = 0x100;
        assert_eq!(substitute_focus(0, false, FOCUS), FOCUS);
        assert_eq!(substitute_focus(0x200, false, FOCUS), FOCUS);
        assert_eq!(substitute_focus(0x200, true, FOCUS), 0x200);
        assert_eq!(substitute_focus(0, false, 0), 0);
    }

    struct NoExports;

    impl ExportResolver for NoExports {
        fn export_address(&self, _dll: Option<&str>, _symbol: &str) -> Option<usize> {
            None
        }
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_hook_module_patches_present_imports() {
        let mut builder = ImageBuilder::new();
        let kernel = builder.import(
            "KERNEL32.dll",
            &[Thunk::Name("LoadLibraryW"), Thunk::Name("GetTickCount")],
            &[0x7FF0_0000_0010, 0x7FF0_0000_0020],
            true,
        );
        let user = builder.import(
            "USER32.dll",
            &[Thunk::Name("RegisterClassExW"), Thunk::Name("GetFocus")],
            &[0x7FF0_0000_0030, 0x7FF0_0000_0040],
            true,
        );
        let fixture = builder.build();
        let patcher = IatPatcher::new(NoExports, Duration::ZERO);
        let replacement = |shim: Shim| 0x1000 + shim as usize;

        let patched = hook_module(&patcher, fixture.base(), &Shim::ALL, replacement);
        assert_eq!(patched, 3);
        assert_eq!(fixture.slot(kernel[0]), replacement(Shim::LoadLibraryW));
        assert_eq!(fixture.slot(kernel[1]), 0x7FF0_0000_0020);
        assert_eq!(fixture.slot(user[0]), replacement(Shim::RegisterClassExW));
        assert_eq!(fixture.slot(user[1]), replacement(Shim::GetFocus));

        // A second sweep over the same module changes nothing
        assert_eq!(hook_module(&patcher, fixture.base(), &Shim::ALL, replacement), 0);
        assert_eq!(patcher.original("GetFocus"), Some(0x7FF0_0000_0040));
    }
}
