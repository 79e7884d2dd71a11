//! Native GUI viewer using egui
//!
//! Orbit-projected plot of shows and users, a user dropdown, hover tooltips
//! and click-to-select on user markers.

use egui_plot::{Line, MarkerShape, PlotPoints, Points};
use tracing::{debug, info};

use crate::config::Config;
use crate::picking::{pick, OrbitProjection, Pick};
use crate::scene::{Appearance, ConnectorKind, Highlight, LineStyle, Palette};
use crate::selection::SelectionController;

/// Run the native GUI viewer
pub fn run_viewer(config: Config, controller: SelectionController) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.viewer.window_size)
            .with_title("TV Show Visualizer"),
        ..Default::default()
    };

    eframe::run_native(
        "TV Show Visualizer",
        options,
        Box::new(|cc| Ok(Box::new(VisualizerApp::new(cc, config, controller)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}

struct VisualizerApp {
    config: Config,
    controller: SelectionController,
    /// Dropdown value; `None` is the placeholder entry
    selected_user: Option<String>,
    projection: OrbitProjection,
    show_grid: bool,
    auto_rotate: bool,
}

impl VisualizerApp {
    fn new(cc: &eframe::CreationContext<'_>, config: Config, controller: SelectionController) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        let projection = OrbitProjection::new(config.viewer.camera_target);

        Self {
            config,
            controller,
            selected_user: None,
            projection,
            show_grid: true,
            auto_rotate: false,
        }
    }

    /// Single entry point for dropdown changes and marker clicks
    fn handle_user_selection(&mut self) {
        debug!("Selection changed to {:?}", self.selected_user);
        self.controller.select_user(self.selected_user.as_deref());
    }

    fn center_view(&mut self) {
        self.projection = OrbitProjection::new(self.config.viewer.camera_target);
    }

    fn user_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("TV Shows");
        ui.separator();

        let old_selection = self.selected_user.clone();
        let selected_text = self
            .selected_user
            .as_deref()
            .and_then(|id| self.controller.scene().find_user(id))
            .and_then(|slot| self.controller.scene().user(slot))
            .map(|u| u.name.clone())
            .unwrap_or_else(|| "-- Select a user --".to_string());

        ui.horizontal(|ui| {
            ui.label("User:");
            egui::ComboBox::from_id_salt("user_selector")
                .selected_text(selected_text)
                .width(180.0)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.selected_user, None, "-- Select a user --");
                    for user in self.controller.scene().users() {
                        ui.selectable_value(&mut self.selected_user, Some(user.id.clone()), &user.name);
                    }
                });
        });
        if self.selected_user != old_selection {
            self.handle_user_selection();
        }

        ui.separator();
        let scene = self.controller.scene();
        if scene.is_empty() {
            ui.colored_label(egui::Color32::GRAY, "No data loaded");
        } else {
            ui.label(format!("{} shows | {} users", scene.shows().len(), scene.users().len()));
        }

        if let Some(id) = self.controller.selection().user_id() {
            ui.label(format!("Watched: {}", self.controller.watched(id).len()));
            if let Some(recs) = self.controller.recommendations(id) {
                ui.separator();
                ui.label("Recommended:");
                for rec in recs {
                    ui.label(format!("  {} (#{})", rec.name, rec.index));
                }
            }
        }

        ui.separator();
        legend(ui, &self.config.palette);
    }
}

impl eframe::App for VisualizerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.auto_rotate {
            self.projection.yaw += 0.005;
            ctx.request_repaint();
        }

        egui::SidePanel::left("users_panel").min_width(250.0).show(ctx, |ui| {
            self.user_panel(ui);
        });

        egui::TopBottomPanel::bottom("controls_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.checkbox(&mut self.show_grid, "Grid");
                ui.checkbox(&mut self.auto_rotate, "Auto-rotate");

                ui.separator();
                ui.label("Rotate:");
                ui.add(egui::DragValue::new(&mut self.projection.pitch).speed(0.02).prefix("X:"));
                ui.add(egui::DragValue::new(&mut self.projection.yaw).speed(0.02).prefix("Y:"));

                ui.separator();
                if ui.button("Center").clicked() {
                    self.center_view();
                }
                let idle = self.controller.scene().is_idle();
                if ui.add_enabled(!idle, egui::Button::new("Clear")).clicked() {
                    self.selected_user = None;
                    self.controller.clear();
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.label("Right-drag: rotate | Left-drag: pan | Scroll: zoom | Click a user to select");

            ctx.input(|i| {
                if i.key_down(egui::Key::ArrowLeft) { self.projection.yaw -= 0.03; }
                if i.key_down(egui::Key::ArrowRight) { self.projection.yaw += 0.03; }
                if i.key_down(egui::Key::ArrowUp) { self.projection.pitch -= 0.03; }
                if i.key_down(egui::Key::ArrowDown) { self.projection.pitch += 0.03; }
                if i.key_pressed(egui::Key::Home) { self.center_view(); }
                if i.pointer.secondary_down() {
                    let delta = i.pointer.delta();
                    self.projection.yaw += delta.x * 0.005;
                    self.projection.pitch += delta.y * 0.005;
                }
            });
            self.projection.pitch = self.projection.pitch.clamp(-1.5, 1.5);

            let projection = self.projection;
            let palette = &self.config.palette;
            let scene = self.controller.scene();
            let pick_radius = self.config.viewer.pick_radius;

            let plot = egui_plot::Plot::new("scene_plot")
                .data_aspect(1.0)
                .allow_drag(true)
                .allow_zoom(true)
                .allow_scroll(true)
                .show_axes(false)
                .show_grid(self.show_grid);

            let response = plot.show(ui, |plot_ui| {
                for connector in scene.connectors() {
                    let style = palette.line(connector.kind);
                    let name = match connector.kind {
                        ConnectorKind::Watched => "Watched",
                        ConnectorKind::Recommended => "Recommended",
                    };
                    let points = PlotPoints::from(vec![projection.project(connector.from), projection.project(connector.to)]);
                    plot_ui.line(Line::new(points).color(line_color(&style)).width(style.width).name(name));
                }

                for highlight in [Highlight::Default, Highlight::Recommended] {
                    let points: Vec<[f64; 2]> = scene
                        .shows()
                        .iter()
                        .filter(|s| s.highlight == highlight)
                        .map(|s| projection.project(s.position))
                        .collect();
                    if !points.is_empty() {
                        plot_ui.points(
                            Points::new(points)
                                .shape(MarkerShape::Circle)
                                .radius(4.0)
                                .color(marker_color(&palette.show(highlight)))
                                .name("Shows"),
                        );
                    }
                }

                for highlight in [Highlight::Default, Highlight::Selected] {
                    let points: Vec<[f64; 2]> = scene
                        .users()
                        .iter()
                        .filter(|u| u.highlight == highlight)
                        .map(|u| projection.project(u.position))
                        .collect();
                    if !points.is_empty() {
                        plot_ui.points(
                            Points::new(points)
                                .shape(MarkerShape::Square)
                                .radius(5.0)
                                .filled(true)
                                .color(marker_color(&palette.user(highlight)))
                                .name("Users"),
                        );
                    }
                }

                plot_ui
                    .pointer_coordinate()
                    .and_then(|p| pick(scene, &projection, [p.x, p.y], pick_radius))
            });

            let hovered = response.inner;
            let clicked = response.response.clicked();
            if let Some(label) = hovered.and_then(|p| p.label(self.controller.scene())) {
                response.response.on_hover_text_at_pointer(label.to_string());
            }

            if clicked {
                if let Some(Pick::User(slot)) = hovered {
                    if let Some(user) = self.controller.scene().user(slot) {
                        info!("Clicked user marker '{}'", user.id);
                        self.selected_user = Some(user.id.clone());
                        self.handle_user_selection();
                    }
                }
            }
        });
    }
}

fn legend(ui: &mut egui::Ui, palette: &Palette) {
    ui.label("Legend:");
    let entries = [
        ("Show", marker_color(&palette.show(Highlight::Default))),
        ("Recommended show", marker_color(&palette.show(Highlight::Recommended))),
        ("User", marker_color(&palette.user(Highlight::Default))),
        ("Selected user", marker_color(&palette.user(Highlight::Selected))),
        ("Watched", line_color(&palette.line(ConnectorKind::Watched))),
        ("Recommended", line_color(&palette.line(ConnectorKind::Recommended))),
    ];
    for (name, color) in entries {
        ui.horizontal(|ui| {
            ui.colored_label(color, "●");
            ui.label(name);
        });
    }
}

fn marker_color(appearance: &Appearance) -> egui::Color32 {
    let [r, g, b] = appearance.display_color();
    egui::Color32::from_rgb(r, g, b)
}

fn line_color(style: &LineStyle) -> egui::Color32 {
    let [r, g, b] = style.color;
    let alpha = (style.opacity.clamp(0.0, 1.0) * 255.0) as u8;
    egui::Color32::from_rgba_unmultiplied(r, g, b, alpha)
}
