//! Window message interceptor
//!
//! Window classes the host registers are subclassed with [`intercept_proc`]
//! unless they are common controls. The interceptor applies the
//! focus-loss, mouse-capture and always-on-top policies to top-level
//! windows, then forwards to the class's original procedure.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::LazyLock;

use d3d9_proxy_sdk::win32::{
    MAXINTATOM, WA_INACTIVE, WM_ACTIVATE, WM_ACTIVATEAPP, WM_KILLFOCUS, WM_MOUSEACTIVATE,
    WM_NCACTIVATE, WM_SETFOCUS,
};

use crate::config::Policy;

/// Standard and common-control class names, never subclassed
const SYSTEM_CLASSES: &[&str] = &[
    "BUTTON",
    "COMBOBOX",
    "EDIT",
    "LISTBOX",
    "MDICLIENT",
    "RICHEDIT",
    "RICHEDIT_CLASS",
    "SCROLLBAR",
    "STATIC",
    "ANIMATE_CLASS",
    "DATETIMEPICK_CLASS",
    "HOTKEY_CLASS",
    "LINK_CLASS",
    "MONTHCAL_CLASS",
    "NATIVEFNTCTL_CLASS",
    "PROGRESS_CLASS",
    "REBARCLASSNAME",
    "STANDARD_CLASSES",
    "STATUSCLASSNAME",
    "TOOLBARCLASSNAME",
    "TOOLTIPS_CLASS",
    "TRACKBAR_CLASS",
    "UPDOWN_CLASS",
    "WC_BUTTON",
    "WC_COMBOBOX",
    "WC_COMBOBOXEX",
    "WC_EDIT",
    "WC_HEADER",
    "WC_LISTBOX",
    "WC_IPADDRESS",
    "WC_LINK",
    "WC_LISTVIEW",
    "WC_NATIVEFONTCTL",
    "WC_PAGESCROLLER",
    "WC_SCROLLBAR",
    "WC_STATIC",
    "WC_TABCONTROL",
    "WC_TREEVIEW",
];

/// Classes subclassed so far, keyed by atom
static CLASSES: LazyLock<Mutex<ClassRegistry>> =
    LazyLock::new(|| Mutex::new(ClassRegistry::new()));

/// How a class was named at registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassName {
    Atom(u16),
    Name(String),
}

impl ClassName {
    /// Whether this names one of the standard control classes
    pub fn is_system(&self) -> bool {
        match self {
            ClassName::Atom(_) => false,
            ClassName::Name(name) => SYSTEM_CLASSES
                .iter()
                .any(|system| system.eq_ignore_ascii_case(name)),
        }
    }
}

/// Whether a class being registered should get the interceptor
///
/// Integer atoms name predefined classes and are left alone, as are
/// system control classes and classes already using the interceptor.
pub fn should_subclass(class: &ClassName, wndproc: usize, interceptor: usize) -> bool {
    if wndproc == 0 || wndproc == interceptor {
        return false;
    }
    match class {
        ClassName::Atom(atom) => *atom >= MAXINTATOM,
        name => !name.is_system(),
    }
}

/// Original procedure of a subclassed class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassRecord {
    pub atom: u16,
    pub original: usize,
    /// Registered through a wide-character entry point
    pub unicode: bool,
}

/// Atom to original procedure map, in registration order
#[derive(Debug, Default)]
pub struct ClassRegistry {
    order: Vec<u16>,
    records: HashMap<u16, ClassRecord>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subclassed class; false if the atom is already known
    pub fn insert(&mut self, atom: u16, original: usize, unicode: bool) -> bool {
        if atom == 0 || self.records.contains_key(&atom) {
            return false;
        }
        self.order.push(atom);
        self.records.insert(
            atom,
            ClassRecord {
                atom,
                original,
                unicode,
            },
        );
        true
    }

    pub fn get(&self, atom: u16) -> Option<ClassRecord> {
        self.records.get(&atom).copied()
    }

    pub fn contains(&self, atom: u16) -> bool {
        self.records.contains_key(&atom)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Records in registration order
    pub fn iter(&self) -> impl Iterator<Item = &ClassRecord> {
        self.order.iter().filter_map(|atom| self.records.get(atom))
    }
}

/// Remember a class registered with the interceptor as its procedure
pub fn record_class(atom: u16, original: usize, unicode: bool) -> bool {
    let inserted = CLASSES.lock().insert(atom, original, unicode);
    if inserted {
        tracing::debug!(
            "Subclassed window class {:#06x} (original proc {:#x})",
            atom,
            original
        );
    }
    inserted
}

/// Original procedure recorded for `atom`
pub fn class_record(atom: u16) -> Option<ClassRecord> {
    CLASSES.lock().get(atom)
}

/// Ownership questions the dispatch rule asks the OS
pub trait ProcessQuery {
    /// Process owning `hwnd`
    fn window_process(&self, hwnd: usize) -> Option<u32>;

    /// Process owning thread `thread_id`
    fn thread_process(&self, thread_id: u32) -> Option<u32>;

    fn foreground_window(&self) -> Option<usize>;

    fn current_process(&self) -> u32;
}

/// What the interceptor does with one message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Action {
    /// Return 0 without forwarding
    pub swallow: bool,
    /// Clip the cursor to the window and capture the mouse
    pub capture: bool,
}

/// The window or thread gaining activation in a deactivation message
enum Gaining {
    Window(Option<usize>),
    Thread(u32),
}

/// Decide how to treat `msg` under `policy`
///
/// Deactivations in favour of another process are swallowed when focus
/// loss is ignored. A deactivation whose counterpart is unknown counts as
/// foreign.
pub fn classify(
    policy: &Policy,
    msg: u32,
    wparam: usize,
    lparam: isize,
    query: &dyn ProcessQuery,
) -> Action {
    let gaining = match msg {
        WM_ACTIVATE if (wparam & 0xFFFF) as u32 == WA_INACTIVE => {
            Some(Gaining::Window(Some(lparam as usize)))
        }
        WM_NCACTIVATE if wparam == 0 => Some(Gaining::Window(query.foreground_window())),
        WM_ACTIVATEAPP if wparam == 0 => Some(Gaining::Thread(lparam as u32)),
        WM_KILLFOCUS => Some(Gaining::Window(Some(wparam))),
        _ => None,
    };

    let Some(gaining) = gaining else {
        let activation = matches!(
            msg,
            WM_ACTIVATE | WM_NCACTIVATE | WM_ACTIVATEAPP | WM_SETFOCUS | WM_MOUSEACTIVATE
        );
        return Action {
            swallow: false,
            capture: policy.capture_mouse && activation,
        };
    };

    if !policy.ignore_focus_loss {
        return Action::default();
    }

    let owner = match gaining {
        Gaining::Window(Some(hwnd)) if hwnd != 0 => query.window_process(hwnd),
        Gaining::Window(_) => None,
        Gaining::Thread(thread_id) => query.thread_process(thread_id),
    };
    Action {
        swallow: owner != Some(query.current_process()),
        capture: false,
    }
}

#[cfg(windows)]
pub use self::windows::{
    class_name_a, class_name_w, intercept_proc, intercept_window, interceptor_address,
};

#[cfg(windows)]
mod windows {
    use std::sync::OnceLock;

    use windows_sys::Win32::Foundation::{CloseHandle, HWND, LPARAM, LRESULT, RECT, WPARAM};
    use windows_sys::Win32::System::LibraryLoader::{GetModuleHandleA, GetProcAddress};
    use windows_sys::Win32::System::Threading::{
        GetCurrentProcessId, GetProcessIdOfThread, OpenThread, THREAD_QUERY_LIMITED_INFORMATION,
    };
    use windows_sys::Win32::UI::Input::KeyboardAndMouse::SetCapture;
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        CallWindowProcA, CallWindowProcW, ClipCursor, DefWindowProcW, GetAncestor, GetClassWord,
        GetForegroundWindow, GetWindowLongW, GetWindowRect, GetWindowThreadProcessId,
        IsWindowUnicode, SetWindowPos, GA_ROOT, GWL_EXSTYLE, HWND_TOPMOST, WNDPROC,
    };

    use d3d9_proxy_sdk::win32::{SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, WS_EX_TOPMOST};

    use super::*;

    const GCW_ATOM: i32 = -32;
    const GCLP_WNDPROC: i32 = -24;
    const GWLP_WNDPROC: i32 = -4;

    type IsTopLevelWindowFn = unsafe extern "system" fn(HWND) -> i32;

    struct Processes;

    impl ProcessQuery for Processes {
        fn window_process(&self, hwnd: usize) -> Option<u32> {
            let mut pid = 0u32;
            // SAFETY: pid is a valid out pointer
            let thread = unsafe { GetWindowThreadProcessId(hwnd as HWND, &mut pid) };
            (thread != 0).then_some(pid)
        }

        fn thread_process(&self, thread_id: u32) -> Option<u32> {
            // SAFETY: handle is closed before returning
            unsafe {
                let thread = OpenThread(THREAD_QUERY_LIMITED_INFORMATION, 0, thread_id);
                if thread.is_null() {
                    return None;
                }
                let pid = GetProcessIdOfThread(thread);
                CloseHandle(thread);
                (pid != 0).then_some(pid)
            }
        }

        fn foreground_window(&self) -> Option<usize> {
            // SAFETY: no preconditions
            let hwnd = unsafe { GetForegroundWindow() };
            (!hwnd.is_null()).then_some(hwnd as usize)
        }

        fn current_process(&self) -> u32 {
            // SAFETY: no preconditions
            unsafe { GetCurrentProcessId() }
        }
    }

    /// Address to install as a class or window procedure
    pub fn interceptor_address() -> usize {
        intercept_proc as usize
    }

    /// Decode an ANSI `lpszClassName`, which may be an atom
    ///
    /// # Safety
    /// A non-atom pointer must reference a NUL-terminated string.
    pub unsafe fn class_name_a(name: *const u8) -> Option<ClassName> {
        if name.is_null() {
            return None;
        }
        if (name as usize) >> 16 == 0 {
            return Some(ClassName::Atom(name as u16));
        }
        let bytes = std::ffi::CStr::from_ptr(name.cast()).to_bytes();
        Some(ClassName::Name(String::from_utf8_lossy(bytes).into_owned()))
    }

    /// Decode a wide `lpszClassName`, which may be an atom
    ///
    /// # Safety
    /// A non-atom pointer must reference a NUL-terminated string.
    pub unsafe fn class_name_w(name: *const u16) -> Option<ClassName> {
        if name.is_null() {
            return None;
        }
        if (name as usize) >> 16 == 0 {
            return Some(ClassName::Atom(name as u16));
        }
        let mut len = 0;
        while *name.add(len) != 0 {
            len += 1;
        }
        let wide = std::slice::from_raw_parts(name, len);
        Some(ClassName::Name(String::from_utf16_lossy(wide)))
    }

    fn is_top_level(hwnd: HWND) -> bool {
        static IS_TOP_LEVEL: OnceLock<Option<IsTopLevelWindowFn>> = OnceLock::new();
        let resolved = IS_TOP_LEVEL.get_or_init(|| {
            // SAFETY: both strings are NUL-terminated; the export has this signature
            unsafe {
                let user32 = GetModuleHandleA(c"user32".as_ptr().cast());
                if user32.is_null() {
                    return None;
                }
                GetProcAddress(user32, c"IsTopLevelWindow".as_ptr().cast())
                    .map(|f| std::mem::transmute::<_, IsTopLevelWindowFn>(f))
            }
        });

        // SAFETY: both calls tolerate stale handles
        unsafe {
            match resolved {
                Some(is_top_level_window) => is_top_level_window(hwnd) != 0,
                None => GetAncestor(hwnd, GA_ROOT) == hwnd,
            }
        }
    }

    unsafe fn reassert_topmost(hwnd: HWND) {
        let ex_style = GetWindowLongW(hwnd, GWL_EXSTYLE) as u32;
        if ex_style & WS_EX_TOPMOST == 0 {
            SetWindowPos(
                hwnd,
                HWND_TOPMOST,
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            );
        }
    }

    unsafe fn capture_mouse(hwnd: HWND) {
        let mut rect: RECT = std::mem::zeroed();
        if GetWindowRect(hwnd, &mut rect) == 0 {
            return;
        }
        rect.left = rect.left.max(0);
        rect.top = rect.top.max(0);
        ClipCursor(&rect);
        SetCapture(hwnd);
    }

    /// Window procedure installed on subclassed classes
    ///
    /// # Safety
    /// Called by the window manager only.
    pub unsafe extern "system" fn intercept_proc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        let atom = GetClassWord(hwnd, GCW_ATOM);
        let record = class_record(atom);

        if let Some(runtime) = crate::runtime::get() {
            let policy = runtime.policy();
            let focus = runtime.focus_window();
            if hwnd as usize == focus || is_top_level(hwnd) {
                if policy.always_on_top {
                    reassert_topmost(hwnd);
                }

                let action = classify(policy, msg, wparam, lparam, &Processes);
                if action.capture {
                    capture_mouse(hwnd);
                }
                if action.swallow {
                    tracing::trace!("Swallowed message {:#06x} for window {:#x}", msg, hwnd as usize);
                    return 0;
                }
            }
        }

        match record {
            Some(record) => {
                let original = std::mem::transmute::<usize, WNDPROC>(record.original);
                if record.unicode {
                    CallWindowProcW(original, hwnd, msg, wparam, lparam)
                } else {
                    CallWindowProcA(original, hwnd, msg, wparam, lparam)
                }
            }
            None => DefWindowProcW(hwnd, msg, wparam, lparam),
        }
    }

    #[cfg(target_pointer_width = "64")]
    unsafe fn class_proc(hwnd: HWND) -> usize {
        windows_sys::Win32::UI::WindowsAndMessaging::GetClassLongPtrW(hwnd, GCLP_WNDPROC)
    }

    #[cfg(target_pointer_width = "32")]
    unsafe fn class_proc(hwnd: HWND) -> usize {
        windows_sys::Win32::UI::WindowsAndMessaging::GetClassLongW(hwnd, GCLP_WNDPROC) as usize
    }

    #[cfg(target_pointer_width = "64")]
    unsafe fn set_class_proc(hwnd: HWND, proc: usize) -> usize {
        windows_sys::Win32::UI::WindowsAndMessaging::SetClassLongPtrW(hwnd, GCLP_WNDPROC, proc as isize)
    }

    #[cfg(target_pointer_width = "32")]
    unsafe fn set_class_proc(hwnd: HWND, proc: usize) -> usize {
        windows_sys::Win32::UI::WindowsAndMessaging::SetClassLongW(hwnd, GCLP_WNDPROC, proc as i32)
            as usize
    }

    #[cfg(target_pointer_width = "64")]
    unsafe fn window_proc(hwnd: HWND) -> usize {
        windows_sys::Win32::UI::WindowsAndMessaging::GetWindowLongPtrW(hwnd, GWLP_WNDPROC) as usize
    }

    #[cfg(target_pointer_width = "32")]
    unsafe fn window_proc(hwnd: HWND) -> usize {
        windows_sys::Win32::UI::WindowsAndMessaging::GetWindowLongW(hwnd, GWLP_WNDPROC) as u32
            as usize
    }

    #[cfg(target_pointer_width = "64")]
    unsafe fn set_window_proc(hwnd: HWND, proc: usize) {
        windows_sys::Win32::UI::WindowsAndMessaging::SetWindowLongPtrW(hwnd, GWLP_WNDPROC, proc as isize);
    }

    #[cfg(target_pointer_width = "32")]
    unsafe fn set_window_proc(hwnd: HWND, proc: usize) {
        windows_sys::Win32::UI::WindowsAndMessaging::SetWindowLongW(hwnd, GWLP_WNDPROC, proc as i32);
    }

    /// Subclass an existing window's class, once per class
    ///
    /// The window itself is switched over too when it still uses the
    /// class procedure; windows the host subclassed itself are left alone.
    pub fn intercept_window(hwnd: usize) {
        let window = hwnd as HWND;
        let interceptor = interceptor_address();

        // SAFETY: all calls tolerate stale handles
        unsafe {
            let atom = GetClassWord(window, GCW_ATOM);
            if atom == 0 || CLASSES.lock().contains(atom) {
                return;
            }

            let original = class_proc(window);
            if original == 0 || original == interceptor {
                return;
            }
            set_class_proc(window, interceptor);
            record_class(atom, original, IsWindowUnicode(window) != 0);

            if window_proc(window) == original {
                set_window_proc(window, interceptor);
            }
        }
        tracing::debug!("Intercepting messages for window {:#x}", hwnd);
    }
}
