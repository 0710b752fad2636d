//! Full-screen capture overlay.
//!
//! This module contains the `CaptureOverlay` struct which implements the
//! `eframe::App` trait: the frozen screen, the circle being drawn, and the
//! result panel once analysis is done.

use super::rendering::{calculate_popup_position, overlay_scene, paint_scene, to_egui_rect};
use super::selection::{InputEvent, SelectionEvent};
use super::session::ActiveSession;
use super::state::{HostSignal, SessionEvent, UiState};
use crate::analysis::AnalysisResult;
use crate::capture::DisplayCapture;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::geometry::{CaptureRect, Point};
use crate::pipeline::spawn_analysis;
use crate::presentation::{self, ViewMode};
use eframe::egui;
use egui_commonmark::{CommonMarkCache, CommonMarkViewer};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

pub struct CaptureOverlay {
    // Image state
    image_texture: Option<egui::TextureHandle>,
    /// Pre-converted image data for fast texture upload
    color_image: Option<egui::ColorImage>,
    frame: Arc<DisplayCapture>,

    // Session state
    session: ActiveSession,
    surface_size: egui::Vec2,
    outcome: Arc<Mutex<Option<AnalysisResult>>>,

    // Background analysis
    config: Config,
    rx: Receiver<SessionEvent>,
    tx: Sender<SessionEvent>,
    /// Analysis threads, joined by [`run`] after the window closes.
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,

    // Markdown rendering
    markdown_cache: CommonMarkCache,
}

impl CaptureOverlay {
    /// Creates a new overlay over `frame`.
    ///
    /// The last displayed result is written to `outcome` so the caller can
    /// read it after the window closes.
    pub fn new(
        frame: DisplayCapture,
        outcome: Arc<Mutex<Option<AnalysisResult>>>,
        workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
        config: Config,
    ) -> Self {
        let (tx, rx) = channel();

        // Pre-convert screenshot to ColorImage for fast texture upload
        let image_buffer = frame.image().to_rgba8();
        let size = [image_buffer.width() as usize, image_buffer.height() as usize];
        let pixels = image_buffer.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());

        Self {
            image_texture: None,
            color_image: Some(color_image),
            frame: Arc::new(frame),
            session: ActiveSession::new(config.min_radius),
            surface_size: egui::Vec2::ZERO,
            outcome,
            config,
            rx,
            tx,
            workers,
            markdown_cache: CommonMarkCache::default(),
        }
    }

    /// Applies results arriving from the background thread.
    fn process_session_events(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.session.apply(event);
            if let UiState::Showing { result, .. } = self.session.state() {
                if let Ok(mut slot) = self.outcome.lock() {
                    *slot = Some(result.clone());
                }
            }
        }
    }

    fn on_input(&mut self, ctx: &egui::Context, input: InputEvent) {
        match self.session.handle_input(input) {
            SelectionEvent::Completed(rect) => self.start_analysis(ctx, rect),
            SelectionEvent::Cancelled => log::info!("Selection cancelled"),
            SelectionEvent::Discarded => log::debug!("Circle too small, waiting for a new one"),
            _ => {}
        }
    }

    fn start_analysis(&self, ctx: &egui::Context, rect: CaptureRect) {
        let ctx = ctx.clone();
        let worker = spawn_analysis(
            self.frame.clone(),
            rect,
            self.session.selection().surface_size(),
            self.config.clone(),
            self.tx.clone(),
            move || ctx.request_repaint(),
        );
        match self.workers.lock() {
            Ok(mut workers) => workers.push(worker),
            Err(_) => log::warn!("Analysis thread will not be awaited on exit"),
        }
    }

    /// Renders the result panel: metadata, mode switcher, content, actions.
    fn render_result_ui(&mut self, ui: &mut egui::Ui, result: &AnalysisResult, mode: ViewMode) {
        let metadata = presentation::metadata(result);
        if !metadata.is_empty() {
            ui.horizontal_wrapped(|ui| {
                for item in &metadata {
                    ui.label(format!("{} {}:", item.icon, item.label));
                    ui.strong(&item.value);
                    ui.add_space(8.0);
                }
            });
            ui.separator();
        }

        let mut selected = mode;
        ui.horizontal(|ui| {
            for candidate in ViewMode::ALL {
                ui.selectable_value(&mut selected, candidate, candidate.label());
            }
        });
        if selected != mode {
            self.session.set_mode(selected);
        }
        ui.separator();

        let fragment = presentation::render(result, selected);
        let markdown = fragment.to_markdown();
        egui::ScrollArea::vertical()
            .max_height(400.0)
            .show(ui, |ui| {
                CommonMarkViewer::new().show(ui, &mut self.markdown_cache, &markdown);
            });

        ui.separator();

        // Action buttons
        let mut should_close = false;
        ui.horizontal(|ui| {
            if ui.button("Copy").clicked() {
                match arboard::Clipboard::new() {
                    Ok(mut clipboard) => {
                        if let Err(e) = clipboard.set_text(fragment.to_plain_text()) {
                            log::warn!("Failed to copy to clipboard: {}", e);
                        }
                    }
                    Err(e) => log::warn!("Could not access clipboard: {}", e),
                }
            }
            if ui.button("Close").clicked() {
                should_close = true;
            }
        });

        if should_close {
            self.session.close();
        }
    }

    /// Renders the error state UI.
    fn render_error_ui(&mut self, ui: &mut egui::Ui, title: &str, message: &str) {
        ui.heading(title);
        ui.label(egui::RichText::new(message).color(egui::Color32::LIGHT_RED));
        ui.horizontal(|ui| {
            if ui.button("Try again").clicked() {
                self.session.handle_signal(HostSignal::StartSelection);
            }
            if ui.button("Close").clicked() {
                self.session.close();
            }
        });
    }

    fn show_panel(&mut self, ctx: &egui::Context, screen_rect: egui::Rect, region: CaptureRect) {
        let selection_rect = to_egui_rect(region);
        // responsive width: 30% of screen width, clamped between 400 and 700
        let window_width = (screen_rect.width() * 0.3).clamp(400.0, 700.0);
        let (window_x, window_y, pivot) =
            calculate_popup_position(selection_rect, screen_rect, window_width, 10.0, 400.0);

        let state = self.session.state().clone();
        egui::Area::new(egui::Id::new("result_panel"))
            .fixed_pos(egui::pos2(window_x, window_y))
            .pivot(pivot)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style())
                    .fill(egui::Color32::from_rgb(30, 30, 30))
                    .stroke(egui::Stroke::new(1.0, egui::Color32::GRAY))
                    .inner_margin(10.0)
                    .show(ui, |ui| {
                        ui.set_width(window_width);
                        match &state {
                            UiState::Analyzing { .. } => {
                                ui.horizontal(|ui| {
                                    ui.spinner();
                                    ui.label("Analyzing...");
                                });
                            }
                            UiState::Showing { result, mode, .. } => {
                                self.render_result_ui(ui, result, *mode);
                            }
                            UiState::Failed { kind, message, .. } => {
                                self.render_error_ui(ui, kind.title(), message);
                            }
                            UiState::Selecting | UiState::Closed => {}
                        }
                    });
            });
    }
}

/// Translates this frame's raw egui events into selection input.
///
/// Touch screens report both touch events and emulated pointer events for
/// the first finger; the selection machine ignores the duplicates.
fn collect_input(ctx: &egui::Context) -> Vec<InputEvent> {
    let to_point = |pos: egui::Pos2| Point::new(pos.x as f64, pos.y as f64);
    ctx.input(|i| {
        i.events
            .iter()
            .filter_map(|event| match event {
                egui::Event::PointerButton {
                    pos,
                    button: egui::PointerButton::Primary,
                    pressed,
                    ..
                } => Some(if *pressed {
                    InputEvent::PointerDown(to_point(*pos))
                } else {
                    InputEvent::PointerUp(to_point(*pos))
                }),
                egui::Event::PointerMoved(pos) => Some(InputEvent::PointerMove(to_point(*pos))),
                egui::Event::Touch { id, phase, pos, .. } => {
                    let (id, pos) = (id.0, to_point(*pos));
                    Some(match phase {
                        egui::TouchPhase::Start => InputEvent::TouchStart { id, pos },
                        egui::TouchPhase::Move => InputEvent::TouchMove { id, pos },
                        egui::TouchPhase::End => InputEvent::TouchEnd { id, pos: Some(pos) },
                        egui::TouchPhase::Cancel => InputEvent::TouchCancel { id },
                    })
                }
                egui::Event::Key {
                    key: egui::Key::Escape,
                    pressed: true,
                    ..
                } => Some(InputEvent::Cancel),
                _ => None,
            })
            .collect()
    })
}

impl eframe::App for CaptureOverlay {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Enforce dark mode
        ctx.set_visuals(egui::Visuals::dark());

        self.process_session_events();

        // Upload texture on first frame using pre-converted data
        if self.image_texture.is_none() {
            if let Some(color_image) = self.color_image.take() {
                self.image_texture = Some(ctx.load_texture(
                    "screenshot",
                    color_image,
                    egui::TextureOptions::LINEAR,
                ));
            }
        }

        // Fullscreen panel with no margins
        let panel_frame = egui::Frame::default()
            .inner_margin(egui::Margin::same(0))
            .outer_margin(egui::Margin::same(0));

        egui::CentralPanel::default()
            .frame(panel_frame)
            .show(ctx, |ui| {
                let rect = ui.max_rect();

                // Draw screenshot as background
                if let Some(texture) = &self.image_texture {
                    ui.painter().image(
                        texture.id(),
                        rect,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                }

                if rect.size() != self.surface_size {
                    self.surface_size = rect.size();
                    self.session.handle_input(InputEvent::Resize {
                        width: rect.width() as f64,
                        height: rect.height() as f64,
                    });
                }

                // Keep drags on the surface from reaching other widgets
                if *self.session.state() == UiState::Selecting {
                    ui.interact(rect, ui.id().with("capture_surface"), egui::Sense::drag());
                }

                for input in collect_input(ctx) {
                    self.on_input(ctx, input);
                }

                let selecting = *self.session.state() == UiState::Selecting;
                let selection = self.session.selection();
                let scene = overlay_scene(selection.circle(), selecting && selection.show_instructions());
                paint_scene(ui.painter(), rect, &scene);

                if let Some(region) = self.session.state().region() {
                    self.show_panel(ctx, rect, region);
                }
            });

        if self.session.is_closed() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

/// Shows the overlay until the user closes it.
///
/// A request still in flight when the window closes is waited for, so its
/// history record is written before this returns. The request timeout
/// bounds the wait.
///
/// # Returns
/// The last result that was displayed, or `None` if the user cancelled or
/// the analysis failed.
pub fn run(frame: DisplayCapture, config: Config) -> Result<Option<AnalysisResult>> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_fullscreen(true)
            .with_decorations(false)
            .with_always_on_top(),
        ..Default::default()
    };

    let outcome = Arc::new(Mutex::new(None));
    let app_outcome = outcome.clone();
    let workers = Arc::new(Mutex::new(Vec::new()));
    let app_workers = workers.clone();

    eframe::run_native(
        "SnapCircle",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(CaptureOverlay::new(frame, app_outcome, app_workers, config))
                as Box<dyn eframe::App>)
        }),
    )
    .map_err(|e| AppError::ui(format!("Failed to run UI: {}", e)))?;

    let pending: Vec<_> = workers
        .lock()
        .map_err(|_| AppError::ui("Failed to acquire worker lock"))?
        .drain(..)
        .filter(|worker| !worker.is_finished())
        .collect();
    if !pending.is_empty() {
        log::info!("Waiting for the analysis in flight to finish");
    }
    for worker in pending {
        if worker.join().is_err() {
            log::error!("Analysis thread panicked");
        }
    }

    let lock = outcome
        .lock()
        .map_err(|_| AppError::ui("Failed to acquire result lock"))?;
    Ok(lock.clone())
}
