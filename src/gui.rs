use eframe::egui;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::alert;
use crate::config::{self, UserDefaults};
use crate::constants::{gui as consts, limits};
use crate::controller::{CaptureController, CaptureEvent};
use crate::display::PrimaryScreen;
use crate::error::CaptureError;
use crate::output::SUPPORTED_FORMATS;

#[derive(Clone)]
enum CaptureStatus {
    Idle,
    Waiting,
    Saved(String),
    Error(String),
}

struct PreviewTexture {
    generation: u64,
    size: (u32, u32),
    handle: egui::TextureHandle,
}

pub struct ScreenshotApp {
    controller: Arc<Mutex<CaptureController>>,
    status: Arc<Mutex<CaptureStatus>>,
    texture: Option<PreviewTexture>,
    save_directory: PathBuf,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScreenshotApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Result<Self, CaptureError> {
        let user_defaults = config::load_defaults().unwrap_or_else(|e| {
            log::warn!("Could not load defaults: {:#}", e);
            UserDefaults::default()
        });

        let ctx = cc.egui_ctx.clone();
        let observer = move |event: &CaptureEvent| match event {
            CaptureEvent::HideWindow => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Visible(false));
            }
            CaptureEvent::ShowWindow => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Visible(true));
                ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
            }
            CaptureEvent::PlayAlert => alert::ring_bell(),
            CaptureEvent::CaptureFinished(_) => ctx.request_repaint(),
        };

        let controller =
            CaptureController::new(PrimaryScreen, observer, user_defaults.capture_settings())?;

        Ok(Self {
            controller: Arc::new(Mutex::new(controller)),
            status: Arc::new(Mutex::new(CaptureStatus::Idle)),
            texture: None,
            save_directory: dirs::picture_dir()
                .or_else(|| std::env::current_dir().ok())
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }

    fn new_screenshot(&mut self, ctx: &egui::Context) {
        let due = match lock(&self.controller).schedule_capture(Instant::now()) {
            Ok(due) => due,
            Err(e) => {
                log::debug!("New screenshot ignored: {}", e);
                return;
            }
        };
        *lock(&self.status) = CaptureStatus::Waiting;

        // A hidden window gets no frame updates, so the deadline is also
        // watched from a separate thread
        let controller = Arc::clone(&self.controller);
        let status = Arc::clone(&self.status);
        let ctx = ctx.clone();
        thread::spawn(move || {
            thread::sleep(due.saturating_duration_since(Instant::now()));
            let result = lock(&controller).tick(Instant::now());
            Self::record_tick(&status, result);
            ctx.request_repaint();
        });
    }

    fn record_tick(
        status: &Mutex<CaptureStatus>,
        result: Result<Option<crate::controller::CapturedImage>, CaptureError>,
    ) {
        match result {
            Ok(Some(_)) => *lock(status) = CaptureStatus::Idle,
            Ok(None) => {}
            Err(e) => *lock(status) = CaptureStatus::Error(format!("Capture failed: {}", e)),
        }
    }

    fn save_screenshot(&mut self) {
        let mut dialog = rfd::FileDialog::new()
            .set_title("Save As")
            .set_directory(&self.save_directory)
            .set_file_name(format!("{}.png", consts::DEFAULT_SAVE_NAME));
        for format in SUPPORTED_FORMATS {
            dialog = dialog.add_filter(format.to_uppercase(), &[*format]);
        }

        let Some(path) = dialog.save_file() else {
            return;
        };

        let result = lock(&self.controller).save(&path);
        *lock(&self.status) = match result {
            Ok(written) => {
                if let Some(parent) = written.parent() {
                    self.save_directory = parent.to_path_buf();
                }
                CaptureStatus::Saved(format!("Saved to: {}", written.display()))
            }
            Err(e) => {
                log::error!("Save failed: {}", e);
                CaptureStatus::Error(e.to_string())
            }
        };
    }

    fn show_preview(&mut self, ui: &mut egui::Ui) {
        let mut controller = lock(&self.controller);
        let image = controller.image();
        let min_size = egui::vec2(
            (image.width() / consts::PREVIEW_MIN_DIVISOR) as f32,
            (image.height() / consts::PREVIEW_MIN_DIVISOR) as f32,
        );
        let area = ui.available_size().max(min_size);
        let target = (area.x.max(1.0) as u32, area.y.max(1.0) as u32);

        let preview = match controller.preview(target.0, target.1) {
            Ok(preview) => preview,
            Err(e) => {
                ui.label(e.to_string());
                return;
            }
        };

        let size = (preview.width(), preview.height());
        let stale = match &self.texture {
            Some(texture) => texture.generation != preview.generation() || texture.size != size,
            None => true,
        };
        if stale {
            let color_image = egui::ColorImage::from_rgba_unmultiplied(
                [size.0 as usize, size.1 as usize],
                preview.image().as_raw(),
            );
            let handle =
                ui.ctx()
                    .load_texture("screenshot", color_image, egui::TextureOptions::LINEAR);
            self.texture = Some(PreviewTexture {
                generation: preview.generation(),
                size,
                handle,
            });
        }
        drop(controller);

        if let Some(texture) = &self.texture {
            ui.centered_and_justified(|ui| {
                ui.add(egui::Image::new(egui::load::SizedTexture::new(
                    texture.handle.id(),
                    egui::vec2(size.0 as f32, size.1 as f32),
                )));
            });
        }
    }

    fn show_options(&mut self, ui: &mut egui::Ui) {
        let mut controller = lock(&self.controller);
        let settings = controller.settings();

        ui.group(|ui| {
            ui.label("Options");

            let mut delay = settings.delay_seconds();
            ui.horizontal(|ui| {
                ui.label("Screenshot Delay:");
                let slider = egui::Slider::new(&mut delay, 0..=limits::MAX_DELAY_SECONDS)
                    .suffix(consts::DELAY_SUFFIX);
                if ui.add(slider).changed() {
                    if let Err(e) = controller.set_delay(delay) {
                        *lock(&self.status) = CaptureStatus::Error(e.to_string());
                    }
                }
            });

            let mut hide = controller.settings().hide_window();
            let can_hide = controller.settings().can_hide_window();
            if ui
                .add_enabled(can_hide, egui::Checkbox::new(&mut hide, "Hide This Window"))
                .changed()
            {
                if let Err(e) = controller.set_hide_window(hide) {
                    *lock(&self.status) = CaptureStatus::Error(e.to_string());
                }
            }
        });
    }

    fn show_status(&self, ui: &mut egui::Ui, remaining: Option<Duration>) {
        let current_status = lock(&self.status).clone();
        match &current_status {
            CaptureStatus::Idle => {}
            CaptureStatus::Waiting => {
                let seconds = remaining.map(|r| r.as_secs_f32().ceil() as u64).unwrap_or(0);
                ui.colored_label(
                    egui::Color32::BLUE,
                    format!("Capturing in {} s...", seconds),
                );
            }
            CaptureStatus::Saved(msg) => {
                ui.colored_label(egui::Color32::GREEN, msg);
            }
            CaptureStatus::Error(msg) => {
                ui.colored_label(egui::Color32::RED, msg);
            }
        }
    }
}

impl eframe::App for ScreenshotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        let (busy, remaining) = {
            let mut controller = lock(&self.controller);
            if controller.remaining(now).is_some_and(|r| r.is_zero()) {
                let result = controller.tick(now);
                Self::record_tick(&self.status, result);
            }
            (controller.is_busy(), controller.remaining(now))
        };

        if let Some(remaining) = remaining {
            ctx.request_repaint_after(remaining.min(Duration::from_secs(1)));
        }

        if ctx.input_mut(|i| i.consume_key(egui::Modifiers::COMMAND, egui::Key::Q)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.add_space(6.0);
            self.show_status(ui, remaining);
            self.show_options(ui);
            ui.add_space(6.0);

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!busy, egui::Button::new("New Screenshot"))
                    .clicked()
                {
                    self.new_screenshot(ctx);
                }

                if ui.button("Save Screenshot").clicked() {
                    self.save_screenshot();
                }

                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
            ui.add_space(6.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_preview(ui);
        });
    }
}

pub fn run_gui() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(consts::WINDOW_TITLE)
            .with_inner_size([consts::WINDOW_WIDTH, consts::WINDOW_HEIGHT]),
        ..Default::default()
    };

    eframe::run_native(
        consts::WINDOW_TITLE,
        options,
        Box::new(|cc| Ok(Box::new(ScreenshotApp::new(cc)?))),
    )
}
