//! Window style rewriting for forced-windowed presentation

use bitflags::bitflags;
use d3d9_proxy_sdk::win32::*;

bitflags! {
    /// `WS_*` window style bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WindowStyle: u32 {
        const POPUP = WS_POPUP;
        const CHILD = WS_CHILD;
        const MINIMIZE = WS_MINIMIZE;
        const MAXIMIZE = WS_MAXIMIZE;
        const CAPTION = WS_CAPTION;
        const BORDER = WS_BORDER;
        const DLGFRAME = WS_DLGFRAME;
        const SYSMENU = WS_SYSMENU;
        const THICKFRAME = WS_THICKFRAME;
        const MINIMIZEBOX = WS_MINIMIZEBOX;
        const MAXIMIZEBOX = WS_MAXIMIZEBOX;

        // Keep bits we do not name (WS_VISIBLE, WS_CLIPCHILDREN, ...)
        const _ = !0;
    }
}

bitflags! {
    /// `WS_EX_*` extended window style bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExStyle: u32 {
        const DLGMODALFRAME = WS_EX_DLGMODALFRAME;
        const TOPMOST = WS_EX_TOPMOST;
        const TOOLWINDOW = WS_EX_TOOLWINDOW;
        const WINDOWEDGE = WS_EX_WINDOWEDGE;
        const CLIENTEDGE = WS_EX_CLIENTEDGE;
        const CONTEXTHELP = WS_EX_CONTEXTHELP;
        const STATICEDGE = WS_EX_STATICEDGE;
        const APPWINDOW = WS_EX_APPWINDOW;

        const _ = !0;
    }
}

/// Target frame style for a forced-windowed device window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowMode {
    /// Leave the window's styles alone
    #[default]
    Keep,
    /// No frame, sized to the monitor
    BorderlessFullscreen,
    /// Caption and system menu, not resizable
    BorderedFixed,
    /// Caption, system menu and sizing border
    BorderedResizable,
    /// No frame, sized to the back buffer
    BorderlessWindowed,
}

impl WindowMode {
    /// Map the `window_mode` config value; unknown values keep the style
    pub fn from_config(value: i64) -> Self {
        match value {
            1 => WindowMode::BorderlessFullscreen,
            2 => WindowMode::BorderedFixed,
            3 => WindowMode::BorderedResizable,
            4 => WindowMode::BorderlessWindowed,
            _ => WindowMode::Keep,
        }
    }

    pub fn is_bordered(self) -> bool {
        matches!(self, WindowMode::BorderedFixed | WindowMode::BorderedResizable)
    }

    /// Compute the (style, ex-style) pair for this mode
    pub fn apply(self, style: WindowStyle, ex_style: ExStyle) -> (WindowStyle, ExStyle) {
        match self {
            WindowMode::Keep => (style, ex_style),
            WindowMode::BorderlessFullscreen | WindowMode::BorderlessWindowed => {
                borderless(style, ex_style)
            }
            WindowMode::BorderedFixed => bordered(style, ex_style, false),
            WindowMode::BorderedResizable => bordered(style, ex_style, true),
        }
    }
}

fn borderless(style: WindowStyle, ex_style: ExStyle) -> (WindowStyle, ExStyle) {
    let mut style = style
        - (WindowStyle::CAPTION
            | WindowStyle::THICKFRAME
            | WindowStyle::MINIMIZE
            | WindowStyle::MAXIMIZE
            | WindowStyle::SYSMENU
            | WindowStyle::MINIMIZEBOX
            | WindowStyle::MAXIMIZEBOX
            | WindowStyle::DLGFRAME);
    if !style.contains(WindowStyle::CHILD) {
        style |= WindowStyle::POPUP;
    }

    let ex_style = (ex_style
        - (ExStyle::CONTEXTHELP
            | ExStyle::DLGMODALFRAME
            | ExStyle::CLIENTEDGE
            | ExStyle::STATICEDGE
            | ExStyle::WINDOWEDGE
            | ExStyle::TOOLWINDOW))
        | ExStyle::APPWINDOW;

    (style, ex_style)
}

fn bordered(style: WindowStyle, ex_style: ExStyle, resizable: bool) -> (WindowStyle, ExStyle) {
    let mut style = (style
        - (WindowStyle::POPUP
            | WindowStyle::THICKFRAME
            | WindowStyle::MAXIMIZEBOX
            | WindowStyle::MAXIMIZE
            | WindowStyle::MINIMIZE))
        | WindowStyle::CAPTION
        | WindowStyle::SYSMENU
        | WindowStyle::MINIMIZEBOX;
    if resizable {
        style |= WindowStyle::THICKFRAME | WindowStyle::MAXIMIZEBOX;
    }

    let ex_style = (ex_style - ExStyle::TOOLWINDOW) | ExStyle::WINDOWEDGE | ExStyle::APPWINDOW;

    (style, ex_style)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WS_VISIBLE: u32 = 0x1000_0000;

    #[test]
    fn test_mode_from_config() {
        assert_eq!(WindowMode::from_config(0), WindowMode::Keep);
        assert_eq!(WindowMode::from_config(1), WindowMode::BorderlessFullscreen);
        assert_eq!(WindowMode::from_config(4), WindowMode::BorderlessWindowed);
        assert_eq!(WindowMode::from_config(-2), WindowMode::Keep);
        assert_eq!(WindowMode::from_config(9), WindowMode::Keep);
    }

    #[test]
    fn test_borderless_strips_frame() {
        let style = WindowStyle::from_bits_retain(
            WS_VISIBLE | WS_CAPTION | WS_SYSMENU | WS_THICKFRAME | WS_MINIMIZEBOX,
        );
        let (style, ex) =
            WindowMode::BorderlessFullscreen.apply(style, ExStyle::WINDOWEDGE | ExStyle::TOPMOST);

        assert_eq!(style.bits(), WS_VISIBLE | WS_POPUP);
        assert_eq!(ex, ExStyle::TOPMOST | ExStyle::APPWINDOW);
    }

    #[test]
    fn test_borderless_child_not_popup() {
        let (style, _) = WindowMode::BorderlessWindowed
            .apply(WindowStyle::CHILD | WindowStyle::CAPTION, ExStyle::empty());
        assert_eq!(style, WindowStyle::CHILD);
    }

    #[test]
    fn test_bordered_fixed_and_resizable() {
        let popup = WindowStyle::from_bits_retain(WS_VISIBLE | WS_POPUP);
        let (fixed, ex) = WindowMode::BorderedFixed.apply(popup, ExStyle::TOOLWINDOW);
        assert_eq!(
            fixed.bits(),
            WS_VISIBLE | WS_CAPTION | WS_SYSMENU | WS_MINIMIZEBOX
        );
        assert_eq!(ex, ExStyle::WINDOWEDGE | ExStyle::APPWINDOW);

        let (resizable, _) = WindowMode::BorderedResizable.apply(popup, ExStyle::empty());
        assert!(resizable.contains(WindowStyle::THICKFRAME | WindowStyle::MAXIMIZEBOX));
        assert!(!resizable.contains(WindowStyle::POPUP));
    }

    #[test]
    fn test_keep_is_identity() {
        let style = WindowStyle::from_bits_retain(0x1234_5678);
        let ex = ExStyle::from_bits_retain(0x8765);
        assert_eq!(WindowMode::Keep.apply(style, ex), (style, ex));
    }
}
