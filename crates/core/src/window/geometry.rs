//! Forced-windowed placement

/// Screen rectangle, right/bottom exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Where and how large the device window should be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// False when only the size should change (SWP_NOMOVE)
    pub reposition: bool,
}

/// Compute the window placement on `monitor`
///
/// With `fill_monitor` the window covers the monitor. Otherwise it takes
/// the requested size and, if `center` is set, is centered on the monitor,
/// never further up or left than the monitor's origin.
pub fn compute_placement(
    monitor: Rect,
    width: i32,
    height: i32,
    fill_monitor: bool,
    center: bool,
) -> Placement {
    if fill_monitor {
        return Placement {
            x: monitor.left,
            y: monitor.top,
            width: monitor.width(),
            height: monitor.height(),
            reposition: true,
        };
    }

    Placement {
        x: monitor.left + ((monitor.width() - width) / 2).max(0),
        y: monitor.top + ((monitor.height() - height) / 2).max(0),
        width,
        height,
        reposition: center,
    }
}
