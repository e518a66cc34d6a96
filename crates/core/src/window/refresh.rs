//! Full-screen refresh rate override

/// Pick the refresh rate to request
///
/// `rates` are the rates the display devices report. A configured value
/// that is not positive or falls outside the observed range is replaced by
/// the highest observed rate. With nothing enumerated the configured value
/// is used as long as it is positive.
pub fn clamp_refresh_rate(rates: &[u32], configured: i64) -> Option<u32> {
    let mut rates = rates.to_vec();
    rates.sort_unstable();
    rates.dedup();

    let (Some(&min), Some(&max)) = (rates.first(), rates.last()) else {
        return u32::try_from(configured).ok().filter(|rate| *rate > 0);
    };

    if configured <= 0 || configured < min as i64 || configured > max as i64 {
        Some(max)
    } else {
        Some(configured as u32)
    }
}

/// Every refresh rate any attached display device supports
#[cfg(windows)]
pub fn enumerate_refresh_rates() -> Vec<u32> {
    use windows_sys::Win32::Graphics::Gdi::{
        EnumDisplayDevicesW, EnumDisplaySettingsW, DEVMODEW, DISPLAY_DEVICEW,
    };

    let mut rates = Vec::new();
    let mut device_index = 0u32;
    loop {
        // SAFETY: zeroed DISPLAY_DEVICEW with cb set is a valid in/out buffer
        let mut device: DISPLAY_DEVICEW = unsafe { std::mem::zeroed() };
        device.cb = std::mem::size_of::<DISPLAY_DEVICEW>() as u32;
        if unsafe { EnumDisplayDevicesW(std::ptr::null(), device_index, &mut device, 0) } == 0 {
            break;
        }
        device_index += 1;

        let mut mode_index = 0u32;
        loop {
            // SAFETY: zeroed DEVMODEW with dmSize set is a valid out buffer
            let mut mode: DEVMODEW = unsafe { std::mem::zeroed() };
            mode.dmSize = std::mem::size_of::<DEVMODEW>() as u16;
            if unsafe { EnumDisplaySettingsW(device.DeviceName.as_ptr(), mode_index, &mut mode) }
                == 0
            {
                break;
            }
            mode_index += 1;
            if mode.dmDisplayFrequency > 1 {
                rates.push(mode.dmDisplayFrequency);
            }
        }
    }

    tracing::debug!(
        "Enumerated {} display modes across {} devices",
        rates.len(),
        device_index
    );
    rates
}

#[cfg(not(windows))]
pub fn enumerate_refresh_rates() -> Vec<u32> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_to_max() {
        let rates = [144, 60, 120, 60];
        assert_eq!(clamp_refresh_rate(&rates, 200), Some(144));
        assert_eq!(clamp_refresh_rate(&rates, -1), Some(144));
        assert_eq!(clamp_refresh_rate(&rates, 0), Some(144));
        assert_eq!(clamp_refresh_rate(&rates, 30), Some(144));
    }

    #[test]
    fn test_in_range_verbatim() {
        let rates = [60, 120, 144];
        assert_eq!(clamp_refresh_rate(&rates, 120), Some(120));
        assert_eq!(clamp_refresh_rate(&rates, 100), Some(100));
        assert_eq!(clamp_refresh_rate(&rates, 60), Some(60));
    }

    #[test]
    fn test_nothing_enumerated() {
        assert_eq!(clamp_refresh_rate(&[], 75), Some(75));
        assert_eq!(clamp_refresh_rate(&[], 0), None);
        assert_eq!(clamp_refresh_rate(&[], -1), None);
    }
}
