//! On-screen FPS counter
//!
//! Keeps the last 50 frame timestamps and draws the rate and frame time
//! with a 1-pixel black outline. Font resources are tied to the device, so
//! they follow the lost/reset discipline: released before a device is
//! replaced, notified around a reset.

use std::collections::VecDeque;

use d3d9_proxy_sdk::argb;

/// Number of frame timestamps kept for the rate computation
pub const SAMPLE_WINDOW: usize = 50;

const FPS_COLOR: u32 = argb(0xFF, 0xFF, 0xFF, 0x00);
const FRAME_TIME_COLOR: u32 = argb(0xFF, 0xFF, 0xFF, 0xFF);
const OUTLINE_COLOR: u32 = argb(0xFF, 0x00, 0x00, 0x00);
const OUTLINE_OFFSETS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const MARGIN: i32 = 8;

/// A text-rendering resource bound to one device
pub trait OverlayFont: Send {
    /// Draw `text` with its top-left corner at (`x`, `y`)
    fn draw(&mut self, text: &str, x: i32, y: i32, color: u32);

    /// Release device-dependent state ahead of a reset
    fn on_lost_device(&mut self);

    /// Reacquire device-dependent state after a successful reset
    fn on_reset_device(&mut self);
}

/// Creates fonts on a device
pub trait FontFactory: Send {
    /// Create a font of `height` pixels on `device`
    fn create_font(&mut self, device: usize, height: i32) -> Option<Box<dyn OverlayFont>>;
}

struct Fonts {
    fps: Box<dyn OverlayFont>,
    frame_time: Box<dyn OverlayFont>,
    fps_height: i32,
}

/// FPS overlay state
pub struct FpsOverlay {
    factory: Box<dyn FontFactory>,
    samples: VecDeque<u64>,
    fonts: Option<Fonts>,
}

impl FpsOverlay {
    pub fn new(factory: Box<dyn FontFactory>) -> Self {
        Self {
            factory,
            samples: VecDeque::with_capacity(SAMPLE_WINDOW),
            fonts: None,
        }
    }

    /// Record a frame completion time
    pub fn record_frame(&mut self, now: u64) {
        if self.samples.len() == SAMPLE_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(now);
    }

    /// Frames per second over the sample window
    ///
    /// None with fewer than two samples or a zero time span.
    pub fn fps(&self, frequency: u64) -> Option<f64> {
        let (oldest, newest) = (self.samples.front()?, self.samples.back()?);
        let span = newest.checked_sub(*oldest)?;
        if self.samples.len() < 2 || span == 0 {
            return None;
        }
        Some((self.samples.len() - 1) as f64 * frequency as f64 / span as f64)
    }

    /// Font height for the FPS line given the window's client height
    pub fn font_height(client_height: i32) -> i32 {
        (client_height / 20).max(12)
    }

    /// Record a frame and draw the counter
    pub fn show(&mut self, device: usize, client_height: i32, now: u64, frequency: u64) {
        self.record_frame(now);

        let height = Self::font_height(client_height);
        if self.fonts.as_ref().is_some_and(|f| f.fps_height != height) {
            self.release_fonts();
        }
        if self.fonts.is_none() {
            self.fonts = self.create_fonts(device, height);
        }

        let fps = self.fps(frequency);
        let Some(fonts) = self.fonts.as_mut() else {
            return;
        };

        let (fps_text, frame_time_text) = match fps {
            Some(fps) => (format!("{}", fps.round() as i64), format!("{:.1} ms", 1000.0 / fps)),
            None => ("0".to_string(), "0.0 ms".to_string()),
        };

        draw_outlined(fonts.fps.as_mut(), &fps_text, MARGIN, MARGIN, FPS_COLOR);
        draw_outlined(
            fonts.frame_time.as_mut(),
            &frame_time_text,
            MARGIN,
            MARGIN + fonts.fps_height,
            FRAME_TIME_COLOR,
        );
    }

    fn create_fonts(&mut self, device: usize, height: i32) -> Option<Fonts> {
        let fps = self.factory.create_font(device, height)?;
        let frame_time = self.factory.create_font(device, (height / 2).max(10))?;
        tracing::debug!("Created overlay fonts (height {})", height);
        Some(Fonts {
            fps,
            frame_time,
            fps_height: height,
        })
    }

    /// Drop the fonts; they are recreated on the next frame
    pub fn release_fonts(&mut self) {
        if self.fonts.take().is_some() {
            tracing::debug!("Released overlay fonts");
        }
    }

    pub fn on_lost_device(&mut self) {
        if let Some(fonts) = self.fonts.as_mut() {
            fonts.fps.on_lost_device();
            fonts.frame_time.on_lost_device();
        }
    }

    pub fn on_reset_device(&mut self) {
        if let Some(fonts) = self.fonts.as_mut() {
            fonts.fps.on_reset_device();
            fonts.frame_time.on_reset_device();
        }
    }
}

fn draw_outlined(font: &mut dyn OverlayFont, text: &str, x: i32, y: i32, color: u32) {
    for (dx, dy) in OUTLINE_OFFSETS {
        font.draw(text, x + dx, y + dy, OUTLINE_COLOR);
    }
    font.draw(text, x, y, color);
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Created(i32),
        Draw(String, i32, i32, u32),
        Lost,
        Reset,
    }

    #[derive(Clone, Default)]
    struct Log(Arc<Mutex<Vec<Event>>>);

    impl Log {
        fn push(&self, event: Event) {
            self.0.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<Event> {
            self.0.lock().unwrap().clone()
        }
    }

    struct FakeFont(Log);

    impl OverlayFont for FakeFont {
        fn draw(&mut self, text: &str, x: i32, y: i32, color: u32) {
            self.0.push(Event::Draw(text.to_string(), x, y, color));
        }

        fn on_lost_device(&mut self) {
            self.0.push(Event::Lost);
        }

        fn on_reset_device(&mut self) {
            self.0.push(Event::Reset);
        }
    }

    struct FakeFactory(Log);

    impl FontFactory for FakeFactory {
        fn create_font(&mut self, _device: usize, height: i32) -> Option<Box<dyn OverlayFont>> {
            self.0.push(Event::Created(height));
            Some(Box::new(FakeFont(self.0.clone())))
        }
    }

    fn overlay() -> (FpsOverlay, Log) {
        let log = Log::default();
        (FpsOverlay::new(Box::new(FakeFactory(log.clone()))), log)
    }

    #[test]
    fn test_fps_needs_two_samples() {
        let (mut overlay, _) = overlay();
        assert_eq!(overlay.fps(1000), None);
        overlay.record_frame(10);
        assert_eq!(overlay.fps(1000), None);
        overlay.record_frame(10);
        assert_eq!(overlay.fps(1000), None);
    }

    #[test]
    fn test_fps_over_window() {
        let (mut overlay, _) = overlay();
        // 60 frames, 16 ticks apart on a 1000 Hz counter
        for i in 0..60u64 {
            overlay.record_frame(i * 16);
        }
        let fps = overlay.fps(1000).unwrap();
        assert!((fps - 62.5).abs() < 1e-9);
        assert_eq!(overlay.samples.len(), SAMPLE_WINDOW);
    }

    #[test]
    fn test_outline_drawn_beneath_text() {
        let (mut overlay, log) = overlay();
        overlay.show(1, 400, 0, 1000);

        let draws: Vec<_> = log
            .events()
            .into_iter()
            .filter(|e| matches!(e, Event::Draw(..)))
            .collect();
        assert_eq!(draws.len(), 10);
        assert_eq!(draws[0], Event::Draw("0".into(), MARGIN - 1, MARGIN, OUTLINE_COLOR));
        assert_eq!(draws[4], Event::Draw("0".into(), MARGIN, MARGIN, FPS_COLOR));
        assert_eq!(
            draws[9],
            Event::Draw("0.0 ms".into(), MARGIN, MARGIN + 20, FRAME_TIME_COLOR)
        );
    }

    #[test]
    fn test_fonts_created_lazily_once() {
        let (mut overlay, log) = overlay();
        overlay.show(1, 400, 0, 1000);
        overlay.show(1, 400, 10, 1000);

        let created: Vec<_> = log
            .events()
            .into_iter()
            .filter(|e| matches!(e, Event::Created(_)))
            .collect();
        assert_eq!(created, vec![Event::Created(20), Event::Created(10)]);
    }

    #[test]
    fn test_lost_reset_lifecycle() {
        let (mut overlay, log) = overlay();
        overlay.on_lost_device();
        assert!(log.events().is_empty());

        overlay.show(1, 400, 0, 1000);
        overlay.on_lost_device();
        overlay.on_reset_device();
        let tail: Vec<_> = log.events().into_iter().rev().take(4).collect();
        assert_eq!(tail, vec![Event::Reset, Event::Reset, Event::Lost, Event::Lost]);

        overlay.release_fonts();
        overlay.show(1, 400, 10, 1000);
        let created = log
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Created(_)))
            .count();
        assert_eq!(created, 4);
    }
}
