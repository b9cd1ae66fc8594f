//! The capture workflow: take a screenshot now or after a delay, keep the
//! latest one, preview it and save it.
//!
//! The controller owns no timer. Callers pass the current [`Instant`] into
//! [`CaptureController::schedule_capture`] and later into
//! [`CaptureController::tick`], which fires the capture once its deadline has
//! passed. Window visibility and the alert sound are left to the front end,
//! which receives them as [`CaptureEvent`]s.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{ImageFormat, RgbaImage};

use crate::constants::defaults;
use crate::display::DisplaySource;
use crate::error::CaptureError;
use crate::output;
use crate::preview::{PreviewCache, PreviewImage};
use crate::settings::CaptureSettings;

/// The most recent screenshot.
///
/// Pixels are immutable once captured and shared by reference count, so
/// handing a copy to an observer never duplicates the bitmap.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pixels: Arc<RgbaImage>,
    generation: u64,
}

impl CapturedImage {
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Increases by one with every successful capture.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Notifications for the windowing layer.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    HideWindow,
    ShowWindow,
    PlayAlert,
    CaptureFinished(CapturedImage),
}

/// Receives [`CaptureEvent`]s as they happen.
pub trait CaptureObserver: Send {
    fn notify(&self, event: &CaptureEvent);
}

impl<F> CaptureObserver for F
where
    F: Fn(&CaptureEvent) + Send,
{
    fn notify(&self, event: &CaptureEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Scheduled,
    Capturing,
}

#[derive(Debug, Clone, Copy)]
struct PendingCapture {
    due: Instant,
    // ShowWindow is sent when the capture fires
    restore_window: bool,
}

pub struct CaptureController {
    display: Box<dyn DisplaySource>,
    observer: Box<dyn CaptureObserver>,
    settings: CaptureSettings,
    image: CapturedImage,
    state: CaptureState,
    pending: Option<PendingCapture>,
    preview: PreviewCache,
}

impl CaptureController {
    /// Create a controller and take the first screenshot right away.
    pub fn new(
        display: impl DisplaySource + 'static,
        observer: impl CaptureObserver + 'static,
        settings: CaptureSettings,
    ) -> Result<Self, CaptureError> {
        let mut display: Box<dyn DisplaySource> = Box::new(display);
        let pixels = display.capture_primary()?;
        log::info!("Initial capture {}x{}", pixels.width(), pixels.height());

        Ok(Self {
            display,
            observer: Box::new(observer),
            settings,
            image: CapturedImage {
                pixels: Arc::new(pixels),
                generation: 1,
            },
            state: CaptureState::Idle,
            pending: None,
            preview: PreviewCache::default(),
        })
    }

    pub fn image(&self) -> &CapturedImage {
        &self.image
    }

    pub fn settings(&self) -> CaptureSettings {
        self.settings
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state != CaptureState::Idle
    }

    /// When the pending capture will fire, if one is scheduled.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|pending| pending.due)
    }

    /// Time left until the pending capture fires.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.pending
            .map(|pending| pending.due.saturating_duration_since(now))
    }

    pub fn set_delay(&mut self, seconds: u32) -> Result<(), CaptureError> {
        self.settings.set_delay(seconds)
    }

    pub fn set_hide_window(&mut self, hide: bool) -> Result<(), CaptureError> {
        self.settings.set_hide_window(hide)
    }

    /// Capture using the current delay without hiding the window.
    ///
    /// With no delay the screenshot is taken before returning. Otherwise the
    /// alert sounds now and the screenshot is taken by the [`tick`] that
    /// reaches the deadline, followed by `ShowWindow` when the hide-window
    /// option is set.
    ///
    /// [`tick`]: CaptureController::tick
    pub fn capture(&mut self, now: Instant) -> Result<(), CaptureError> {
        if self.is_busy() {
            return Err(CaptureError::Busy);
        }

        if self.settings.delay_seconds() == 0 {
            let result = self.shoot();
            self.state = CaptureState::Idle;
            return result.map(|_| ());
        }

        let restore_window = self.settings.hide_window();
        self.arm(now, restore_window);
        Ok(())
    }

    /// Schedule a screenshot after the configured delay, hiding the window
    /// first when asked to. Even a zero delay is deferred to the next
    /// [`tick`](CaptureController::tick).
    pub fn schedule_capture(&mut self, now: Instant) -> Result<Instant, CaptureError> {
        if self.is_busy() {
            log::debug!("Ignoring capture request while another is pending");
            return Err(CaptureError::Busy);
        }

        let hide = self.settings.hide_window();
        if hide {
            self.observer.notify(&CaptureEvent::HideWindow);
        }

        Ok(self.arm(now, hide))
    }

    fn arm(&mut self, now: Instant, restore_window: bool) -> Instant {
        let due = now + self.settings.delay();
        self.state = CaptureState::Scheduled;
        self.pending = Some(PendingCapture { due, restore_window });

        if self.settings.delay_seconds() > 0 {
            self.observer.notify(&CaptureEvent::PlayAlert);
        }

        log::debug!(
            "Capture scheduled in {}s (restore window: {})",
            self.settings.delay_seconds(),
            restore_window
        );
        due
    }

    /// Fire the pending capture if its deadline has passed.
    ///
    /// Returns the new image when a capture happened. A failed capture keeps
    /// the previous image, but the controller still returns to idle and the
    /// window is still restored.
    pub fn tick(&mut self, now: Instant) -> Result<Option<CapturedImage>, CaptureError> {
        let pending = match self.pending {
            Some(pending) if now >= pending.due => pending,
            _ => return Ok(None),
        };
        self.pending = None;

        let result = self.shoot();
        self.state = CaptureState::Idle;

        if pending.restore_window {
            self.observer.notify(&CaptureEvent::ShowWindow);
        }

        result.map(Some)
    }

    /// Drop a scheduled capture. Does nothing when idle.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.state = CaptureState::Idle;
            log::info!("Scheduled capture cancelled");
            if pending.restore_window {
                self.observer.notify(&CaptureEvent::ShowWindow);
            }
        }
    }

    fn shoot(&mut self) -> Result<CapturedImage, CaptureError> {
        self.state = CaptureState::Capturing;

        let pixels = match self.display.capture_primary() {
            Ok(pixels) => pixels,
            Err(e) => {
                log::error!("Capture failed: {}", e);
                return Err(e);
            }
        };

        self.image = CapturedImage {
            pixels: Arc::new(pixels),
            generation: self.image.generation + 1,
        };
        log::info!(
            "Captured screenshot {} ({}x{})",
            self.image.generation,
            self.image.width(),
            self.image.height()
        );

        self.observer
            .notify(&CaptureEvent::CaptureFinished(self.image.clone()));
        Ok(self.image.clone())
    }

    /// Save the current image, picking the format from the extension.
    ///
    /// A path without an extension is saved as PNG with `.png` appended.
    /// Returns the path actually written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf, CaptureError> {
        self.save_with_default(path, defaults::FORMAT)
    }

    /// Like [`save`](CaptureController::save), but an extensionless path is
    /// saved as `default_format`.
    pub fn save_with_default(
        &self,
        path: impl AsRef<Path>,
        default_format: &str,
    ) -> Result<PathBuf, CaptureError> {
        let (path, format) = output::resolve_output(path.as_ref(), default_format)?;
        self.save_as(&path, format)?;
        Ok(path)
    }

    /// Save the current image in an explicit format, whatever the extension.
    pub fn save_as(&self, path: impl AsRef<Path>, format: ImageFormat) -> Result<(), CaptureError> {
        output::write_image(self.image.pixels(), path.as_ref(), format)
    }

    /// Preview of the current image fitted into a `width` x `height` box.
    ///
    /// Only rescales when the image or the box changed since the last call.
    pub fn preview(&mut self, width: u32, height: u32) -> Result<&PreviewImage, CaptureError> {
        self.preview.get_or_render(
            self.image.pixels(),
            self.image.generation(),
            width,
            height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeScreen {
        shade: u8,
        calls: usize,
        fail: bool,
    }

    #[derive(Clone)]
    struct FakeDisplay {
        size: (u32, u32),
        screen: Arc<Mutex<FakeScreen>>,
    }

    impl FakeDisplay {
        fn new(width: u32, height: u32) -> Self {
            Self {
                size: (width, height),
                screen: Arc::new(Mutex::new(FakeScreen::default())),
            }
        }

        fn set_failing(&self, fail: bool) {
            self.screen.lock().unwrap().fail = fail;
        }

        fn calls(&self) -> usize {
            self.screen.lock().unwrap().calls
        }
    }

    impl DisplaySource for FakeDisplay {
        fn capture_primary(&mut self) -> Result<RgbaImage, CaptureError> {
            let mut screen = self.screen.lock().unwrap();
            screen.calls += 1;
            if screen.fail {
                return Err(CaptureError::NoDisplay("display unplugged".to_string()));
            }
            screen.shade = screen.shade.wrapping_add(10);
            let shade = screen.shade;
            Ok(RgbaImage::from_pixel(
                self.size.0,
                self.size.1,
                Rgba([shade, 0, 0, 255]),
            ))
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<CaptureEvent>>>,
    }

    impl Recorder {
        fn observer(&self) -> impl CaptureObserver + 'static {
            let events = self.events.clone();
            move |event: &CaptureEvent| events.lock().unwrap().push(event.clone())
        }

        fn names(&self) -> Vec<&'static str> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|event| match event {
                    CaptureEvent::HideWindow => "hide",
                    CaptureEvent::ShowWindow => "show",
                    CaptureEvent::PlayAlert => "alert",
                    CaptureEvent::CaptureFinished(_) => "finished",
                })
                .collect()
        }
    }

    fn controller(delay: u32, hide: bool) -> (CaptureController, FakeDisplay, Recorder) {
        let display = FakeDisplay::new(800, 600);
        let recorder = Recorder::default();
        let settings = CaptureSettings::new(delay, hide).unwrap();
        let controller =
            CaptureController::new(display.clone(), recorder.observer(), settings).unwrap();
        (controller, display, recorder)
    }

    #[test]
    fn test_new_takes_initial_capture_silently() {
        let (controller, display, recorder) = controller(5, false);
        assert_eq!(display.calls(), 1);
        assert_eq!(controller.image().generation(), 1);
        assert_eq!(controller.image().width(), 800);
        assert_eq!(controller.state(), CaptureState::Idle);
        assert!(recorder.names().is_empty());
    }

    #[test]
    fn test_new_without_display_fails() {
        let display = FakeDisplay::new(10, 10);
        display.set_failing(true);
        let result = CaptureController::new(display, |_: &CaptureEvent| {}, CaptureSettings::default());
        assert!(matches!(result, Err(CaptureError::NoDisplay(_))));
    }

    #[test]
    fn test_immediate_capture_has_no_alert() {
        let (mut controller, _display, recorder) = controller(0, false);
        controller.capture(Instant::now()).unwrap();

        assert_eq!(controller.image().generation(), 2);
        assert_eq!(recorder.names(), vec!["finished"]);
        assert!(!controller.is_busy());
    }

    #[test]
    fn test_delayed_capture_alerts_once_before_update() {
        let (mut controller, _display, recorder) = controller(3, false);
        let start = Instant::now();

        controller.capture(start).unwrap();
        assert_eq!(recorder.names(), vec!["alert"]);
        assert_eq!(controller.image().generation(), 1);
        assert!(controller.is_busy());

        assert!(controller.tick(start + Duration::from_secs(2)).unwrap().is_none());
        let image = controller.tick(start + Duration::from_secs(3)).unwrap().unwrap();

        assert_eq!(image.generation(), 2);
        assert_eq!(recorder.names(), vec!["alert", "finished"]);
        assert!(!controller.is_busy());
    }

    #[test]
    fn test_delayed_capture_with_hide_option_shows_window() {
        let (mut controller, _display, recorder) = controller(2, true);
        let start = Instant::now();

        controller.capture(start).unwrap();
        assert_eq!(recorder.names(), vec!["alert"]);

        controller.tick(start + Duration::from_secs(2)).unwrap();
        assert_eq!(recorder.names(), vec!["alert", "finished", "show"]);
        assert!(!controller.is_busy());
    }

    #[test]
    fn test_scheduled_capture_with_hidden_window() {
        let (mut controller, _display, recorder) = controller(5, true);
        let start = Instant::now();

        let due = controller.schedule_capture(start).unwrap();
        assert_eq!(due, start + Duration::from_secs(5));
        assert_eq!(recorder.names(), vec!["hide", "alert"]);
        assert_eq!(controller.remaining(start), Some(Duration::from_secs(5)));

        controller.tick(start + Duration::from_secs(4)).unwrap();
        assert_eq!(recorder.names(), vec!["hide", "alert"]);

        controller.tick(start + Duration::from_secs(5)).unwrap();
        assert_eq!(recorder.names(), vec!["hide", "alert", "finished", "show"]);
        assert_eq!(controller.image().generation(), 2);
        assert_eq!(controller.deadline(), None);
    }

    #[test]
    fn test_zero_delay_schedule_waits_for_tick() {
        let (mut controller, _display, recorder) = controller(0, false);
        let now = Instant::now();

        controller.schedule_capture(now).unwrap();
        assert!(controller.is_busy());
        assert!(recorder.names().is_empty());

        controller.tick(now).unwrap();
        assert_eq!(recorder.names(), vec!["finished"]);
    }

    #[test]
    fn test_requests_rejected_while_busy() {
        let (mut controller, display, recorder) = controller(2, false);
        let start = Instant::now();

        controller.schedule_capture(start).unwrap();
        assert!(matches!(controller.capture(start), Err(CaptureError::Busy)));
        assert!(matches!(
            controller.schedule_capture(start),
            Err(CaptureError::Busy)
        ));

        let later = start + Duration::from_secs(2);
        assert!(controller.tick(later).unwrap().is_some());
        assert!(!controller.is_busy());
        assert!(controller.tick(later).unwrap().is_none());

        assert_eq!(display.calls(), 2);
        assert_eq!(recorder.names(), vec!["alert", "finished"]);
    }

    #[test]
    fn test_failed_delayed_capture_keeps_image_and_restores_window() {
        let (mut controller, display, recorder) = controller(1, true);
        let before = controller.image().pixels().clone();
        let start = Instant::now();

        controller.schedule_capture(start).unwrap();
        display.set_failing(true);

        let err = controller.tick(start + Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, CaptureError::NoDisplay(_)));
        assert_eq!(controller.image().pixels(), &before);
        assert_eq!(controller.image().generation(), 1);
        assert!(!controller.is_busy());
        assert_eq!(recorder.names(), vec!["hide", "alert", "show"]);
    }

    #[test]
    fn test_failed_immediate_capture_returns_to_idle() {
        let (mut controller, display, _recorder) = controller(0, false);
        display.set_failing(true);

        assert!(controller.capture(Instant::now()).is_err());
        assert_eq!(controller.state(), CaptureState::Idle);
        assert_eq!(controller.image().generation(), 1);
    }

    #[test]
    fn test_cancel_restores_window() {
        let (mut controller, display, recorder) = controller(10, true);
        let start = Instant::now();

        controller.schedule_capture(start).unwrap();
        controller.cancel();

        assert!(!controller.is_busy());
        assert!(controller.tick(start + Duration::from_secs(10)).unwrap().is_none());
        assert_eq!(display.calls(), 1);
        assert_eq!(recorder.names(), vec!["hide", "alert", "show"]);

        controller.cancel();
        assert_eq!(recorder.names().len(), 3);
    }

    #[test]
    fn test_zero_delay_clears_hide_window() {
        let (mut controller, _display, _recorder) = controller(5, true);
        controller.set_delay(0).unwrap();
        assert!(!controller.settings().hide_window());
        assert!(controller.set_hide_window(true).is_err());
        assert!(controller.set_delay(61).is_err());
    }

    #[test]
    fn test_save_does_not_touch_image() {
        let (mut controller, _display, _recorder) = controller(0, false);
        controller.capture(Instant::now()).unwrap();
        let before = controller.image().pixels().clone();

        let temp = TempDir::new().unwrap();
        let written = controller.save(temp.path().join("shot.png")).unwrap();

        assert!(written.exists());
        assert_eq!(controller.image().pixels(), &before);
        assert_eq!(controller.image().generation(), 2);
    }

    #[test]
    fn test_save_to_unwritable_path() {
        let (controller, _display, _recorder) = controller(0, false);
        let before = controller.image().pixels().clone();
        let temp = TempDir::new().unwrap();

        let err = controller
            .save(temp.path().join("readonly").join("x.png"))
            .unwrap_err();
        assert!(matches!(err, CaptureError::Write { .. }));
        assert_eq!(controller.image().pixels(), &before);
    }

    #[test]
    fn test_save_defaults_to_png() {
        let (controller, _display, _recorder) = controller(0, false);
        let temp = TempDir::new().unwrap();

        let written = controller.save(temp.path().join("untitled")).unwrap();
        assert_eq!(written, temp.path().join("untitled.png"));
        assert_eq!(
            image::ImageFormat::from_path(&written).unwrap(),
            ImageFormat::Png
        );
    }

    #[test]
    fn test_save_unknown_extension() {
        let (controller, _display, _recorder) = controller(0, false);
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("shot.xyz");

        let err = controller.save(&path).unwrap_err();
        assert!(matches!(err, CaptureError::UnsupportedFormat(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_preview_scenario() {
        let (mut controller, _display, recorder) = controller(0, false);
        controller.capture(Instant::now()).unwrap();

        let preview = controller.preview(100, 100).unwrap();
        assert_eq!((preview.width(), preview.height()), (100, 75));
        assert!(!recorder.names().contains(&"alert"));
    }

    #[test]
    fn test_preview_recomputed_after_capture() {
        let (mut controller, _display, _recorder) = controller(0, false);

        let first = controller.preview(200, 200).unwrap().generation();
        controller.preview(200, 200).unwrap();
        assert_eq!(controller.preview.renders(), 1);

        controller.capture(Instant::now()).unwrap();
        let second = controller.preview(200, 200).unwrap().generation();
        assert_eq!(controller.preview.renders(), 2);
        assert_eq!(second, first + 1);
    }
}
