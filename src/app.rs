//! eframe application shell: toolbar, drag-and-drop, and the seven
//! viewport panels.
//!
//! The shell is deliberately thin: every state mutation goes through
//! [`ViewerController`], and every viewport draw goes through the gpu
//! module's paint callback. Layout mirrors the inspector's fixed split:
//! interactive view on the left, a 2x3 grid of canonical views on the
//! right.

use std::time::Instant;

use egui::{Align2, Color32, FontId, PointerButton, Pos2, Rect, Sense, Vec2};

use crate::gpu::ViewportPaintCallback;
use crate::loader::{AssetSource, ACCEPTED_EXTENSIONS};
use crate::session::ViewerController;
use crate::viewport::ViewportId;

const MAIN_BACKGROUND: Color32 = Color32::from_rgb(15, 23, 42);
const FIXED_BACKGROUND: Color32 = Color32::from_rgb(2, 6, 23);
const PANEL_GAP: f32 = 1.0;

pub struct InspectorApp {
    controller: ViewerController,
    last_frame: Instant,
}

impl InspectorApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            controller: ViewerController::new(),
            last_frame: Instant::now(),
        }
    }

    fn open_file_dialog(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("3D Model", &ACCEPTED_EXTENSIONS)
            .pick_file();
        if let Some(path) = picked {
            self.upload_path(&path);
        }
    }

    fn upload_path(&mut self, path: &std::path::Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        match std::fs::read(path) {
            Ok(bytes) => self.controller.upload(AssetSource::new(name, bytes)),
            Err(e) => log::warn!("could not read {}: {e}", path.display()),
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        self.controller.session.drag_in_progress =
            ctx.input(|i| !i.raw.hovered_files.is_empty());

        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            if let Some(bytes) = file.bytes {
                let name = file.name.clone();
                self.controller
                    .upload(AssetSource::new(name, bytes.to_vec()));
            } else if let Some(path) = file.path {
                self.upload_path(&path);
            }
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("HexaView 3D");
            if let Some(label) = &self.controller.session.asset_label {
                ui.separator();
                ui.label(label);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Upload Model").clicked() {
                    self.open_file_dialog();
                }
                ui.separator();
                if self.controller.has_model() {
                    let session = &self.controller.session;
                    let (wireframe, auto_rotate, grid) =
                        (session.wireframe, session.auto_rotate, session.grid_visible);
                    if ui.selectable_label(grid, "Grid").clicked() {
                        self.controller.toggle_grid();
                    }
                    if ui.selectable_label(auto_rotate, "Auto-Spin").clicked() {
                        self.controller.toggle_auto_rotate();
                    }
                    if ui.selectable_label(wireframe, "Wireframe").clicked() {
                        self.controller.toggle_wireframe();
                    }
                }
            });
        });

        if let Some(status) = self.controller.status() {
            let status = status.to_string();
            ui.horizontal(|ui| {
                ui.colored_label(Color32::from_rgb(248, 113, 113), status);
                if ui.small_button("Dismiss").clicked() {
                    self.controller.clear_status();
                }
            });
        }
    }

    /// Background, label, input handling, and render-target binding for one
    /// viewport panel. Returns the rect the paint callback should cover.
    fn viewport_panel(&mut self, ui: &mut egui::Ui, id: ViewportId, rect: Rect, label: &str) {
        let interactive = id == ViewportId::Main;
        let background = if interactive {
            MAIN_BACKGROUND
        } else {
            FIXED_BACKGROUND
        };
        ui.painter().rect_filled(rect, 0.0, background);

        if self.controller.has_model() {
            let aspect = rect.width() / rect.height().max(1.0);
            self.controller.viewports.bind_target(id, aspect);

            if interactive {
                let response = ui.interact(rect, egui::Id::new(("viewport", id.index())), {
                    Sense::click_and_drag()
                });
                let camera = self.controller.viewports.orbit_camera_mut();
                if response.dragged_by(PointerButton::Primary) {
                    let delta = response.drag_delta();
                    camera.orbit(delta.x, delta.y);
                }
                if response.dragged_by(PointerButton::Secondary)
                    || response.dragged_by(PointerButton::Middle)
                {
                    let delta = response.drag_delta();
                    camera.pan(delta.x, delta.y);
                }
                if response.hovered() {
                    let scroll = ui.input(|i| i.raw_scroll_delta.y);
                    if scroll.abs() > 0.0 {
                        camera.zoom(scroll / 100.0);
                    }
                }
            }
        } else if interactive && !self.controller.is_loading() {
            ui.painter().text(
                rect.center(),
                Align2::CENTER_CENTER,
                "Drop a .glb / .gltf file or use Upload Model",
                FontId::proportional(16.0),
                Color32::from_rgb(148, 163, 184),
            );
        }

        ui.painter().text(
            rect.left_top() + Vec2::new(8.0, 6.0),
            Align2::LEFT_TOP,
            label,
            FontId::proportional(11.0),
            Color32::from_rgb(100, 116, 139),
        );
    }

    fn viewport_area(&mut self, ui: &mut egui::Ui) {
        let area = ui.available_rect_before_wrap();
        let split_x = area.min.x + area.width() * 0.6;

        let main_rect = Rect::from_min_max(area.min, Pos2::new(split_x - PANEL_GAP, area.max.y));
        let grid_area = Rect::from_min_max(Pos2::new(split_x, area.min.y), area.max);

        self.controller.viewports.begin_frame();

        let descriptors = crate::viewport::descriptors();
        let mut rects = [main_rect; 7];

        self.viewport_panel(ui, ViewportId::Main, main_rect, descriptors[0].label);

        let cell = Vec2::new(
            (grid_area.width() - PANEL_GAP) / 2.0,
            (grid_area.height() - 2.0 * PANEL_GAP) / 3.0,
        );
        for (i, descriptor) in descriptors.iter().skip(1).enumerate() {
            let col = (i % 2) as f32;
            let row = (i / 2) as f32;
            let min = grid_area.min
                + Vec2::new(col * (cell.x + PANEL_GAP), row * (cell.y + PANEL_GAP));
            let rect = Rect::from_min_size(min, cell);
            rects[descriptor.id.index()] = rect;
            self.viewport_panel(ui, descriptor.id, rect, descriptor.label);
        }

        // All targets are bound; dispatch one draw per bound viewport.
        let grid_visible = self.controller.session.grid_visible;
        for request in self.controller.viewports.draw_requests(grid_visible) {
            let rect = rects[request.viewport.index()];
            ui.painter().add(egui_wgpu::Callback::new_paint_callback(
                rect,
                ViewportPaintCallback::new(request),
            ));
        }

        if self.controller.is_loading() {
            ui.painter().rect_filled(
                area,
                0.0,
                Color32::from_rgba_unmultiplied(2, 6, 23, 160),
            );
            ui.painter().text(
                area.center(),
                Align2::CENTER_CENTER,
                "Rendering...",
                FontId::proportional(18.0),
                Color32::from_rgb(226, 232, 240),
            );
        }

        if self.controller.session.drag_in_progress {
            ui.painter().rect_filled(
                area,
                8.0,
                Color32::from_rgba_unmultiplied(37, 99, 235, 60),
            );
            ui.painter().text(
                area.center(),
                Align2::CENTER_CENTER,
                "Drop .GLB file here",
                FontId::proportional(24.0),
                Color32::WHITE,
            );
        }
    }
}

impl eframe::App for InspectorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32().min(0.1);
        self.last_frame = now;

        self.handle_dropped_files(ctx);
        self.controller.pump();
        self.controller
            .viewports
            .frame_tick(dt, self.controller.session.auto_rotate);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ui);
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::from_rgb(30, 41, 59)))
            .show(ctx, |ui| {
                self.viewport_area(ui);
            });

        // Animation and pending decodes need continuous frames.
        if self.controller.session.auto_rotate || self.controller.is_loading() {
            ctx.request_repaint();
        }
    }
}
