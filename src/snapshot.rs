//! Snapshot renderer
//!
//! Opens a small three-d window, renders the scene for one selection,
//! captures pixels and saves a PNG plus a JSON summary next to it.

use std::path::{Path, PathBuf};
use three_d::*;
use tracing::{info, warn};

use crate::config::Config;
use crate::scene::{ConnectorKind, Rgb, Scene};
use crate::selection::Selection;

/// Render `scene` to `output` as a square PNG of `size` pixels
pub fn render(
    config: &Config,
    scene: &Scene,
    selection: &Selection,
    output: &Path,
    size: u32,
    fit: bool,
) -> anyhow::Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let window = Window::new(WindowSettings {
        title: "TV Show Visualizer - Snapshot".to_string(),
        max_size: Some((size, size)),
        min_size: (size, size),
        ..Default::default()
    })?;

    let context = window.gl();
    let viewer = &config.viewer;
    let mut camera = Camera::new_perspective(
        Viewport { x: 0, y: 0, width: size, height: size },
        to_vec3(viewer.camera_position),
        to_vec3(viewer.camera_target),
        vec3(0.0, 1.0, 0.0),
        degrees(75.0),
        0.1,
        2000.0,
    );
    if fit {
        if let Some((eye, target)) = fitted_view(scene) {
            camera.set_view(to_vec3(eye), to_vec3(target), vec3(0.0, 1.0, 0.0));
        }
    }

    let renderables = build_renderables(&context, config, scene);
    let output = output.to_path_buf();
    let summary = summary_json(scene, selection);
    let mut captured = false;

    window.render_loop(move |frame_input| {
        if captured {
            return FrameOutput { exit: true, ..Default::default() };
        }

        camera.set_viewport(frame_input.viewport);
        frame_input
            .screen()
            .clear(ClearState::color_and_depth(0.0, 0.0, 0.0, 1.0, 1.0));
        for obj in &renderables {
            obj.render(&camera, &[]);
        }

        let vp = frame_input.viewport;
        let pixels: Vec<[u8; 4]> = frame_input.screen().read_color();
        let flat: Vec<u8> = pixels.iter().flat_map(|p| p.iter().copied()).collect();

        match image::RgbaImage::from_raw(vp.width, vp.height, flat) {
            Some(mut img) => {
                // GL rows start at the bottom
                image::imageops::flip_vertical_in_place(&mut img);
                match img.save(&output) {
                    Ok(()) => {
                        info!("Saved {}", output.display());
                        write_summary(&output, &summary);
                    }
                    Err(e) => warn!("Failed to save {}: {}", output.display(), e),
                }
            }
            None => warn!("Captured buffer does not match viewport {}x{}", vp.width, vp.height),
        }

        captured = true;
        FrameOutput::default()
    });

    Ok(())
}

fn build_renderables(context: &Context, config: &Config, scene: &Scene) -> Vec<Gm<InstancedMesh, ColorMaterial>> {
    let palette = &config.palette;
    let viewer = &config.viewer;
    let mut renderables = Vec::new();

    // Shows (spheres)
    let mut shows = Instances::default();
    let mut show_colors = Vec::new();
    for show in scene.shows() {
        shows.transformations.push(
            Mat4::from_translation(to_vec3(show.position)) * Mat4::from_scale(viewer.show_radius),
        );
        show_colors.push(srgba(palette.show(show.highlight).display_color(), 1.0));
    }
    shows.colors = Some(show_colors);
    if !shows.transformations.is_empty() {
        renderables.push(Gm::new(
            InstancedMesh::new(context, &shows, &CpuMesh::sphere(16)),
            ColorMaterial::default(),
        ));
    }

    // Users (cubes; the unit cube spans -1..1)
    let mut users = Instances::default();
    let mut user_colors = Vec::new();
    for user in scene.users() {
        users.transformations.push(
            Mat4::from_translation(to_vec3(user.position)) * Mat4::from_scale(viewer.user_size * 0.5),
        );
        user_colors.push(srgba(palette.user(user.highlight).display_color(), 1.0));
    }
    users.colors = Some(user_colors);
    if !users.transformations.is_empty() {
        renderables.push(Gm::new(
            InstancedMesh::new(context, &users, &CpuMesh::cube()),
            ColorMaterial::default(),
        ));
    }

    // Connectors (thin cylinders along +X, scaled to length)
    let mut lines = Instances::default();
    let mut line_colors = Vec::new();
    for connector in scene.connectors() {
        let from = to_vec3(connector.from);
        let dir = to_vec3(connector.to) - from;
        let length = dir.magnitude();
        if length < 0.001 {
            continue;
        }
        let style = palette.line(connector.kind);
        let radius = match connector.kind {
            ConnectorKind::Watched => 0.03,
            ConnectorKind::Recommended => 0.06,
        } * style.width.max(1.0);
        let rotation: Mat4 = Quat::from_arc(vec3(1.0, 0.0, 0.0), dir / length, None).into();

        lines.transformations.push(
            Mat4::from_translation(from) * rotation * Mat4::from_nonuniform_scale(length, radius, radius),
        );
        line_colors.push(srgba(style.color, style.opacity));
    }
    lines.colors = Some(line_colors);
    if !lines.transformations.is_empty() {
        renderables.push(Gm::new(
            InstancedMesh::new(context, &lines, &CpuMesh::cylinder(12)),
            connector_material(),
        ));
    }

    renderables
}

/// Blended material so per-instance alpha carries the palette's line opacity
fn connector_material() -> ColorMaterial {
    ColorMaterial {
        is_transparent: true,
        render_states: RenderStates {
            write_mask: WriteMask::COLOR,
            blend: Blend::TRANSPARENCY,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Eye and target that keep every marker in view
fn fitted_view(scene: &Scene) -> Option<([f32; 3], [f32; 3])> {
    let (min, max) = scene.bounds()?;
    let center = [
        (min[0] + max[0]) * 0.5,
        (min[1] + max[1]) * 0.5,
        (min[2] + max[2]) * 0.5,
    ];
    let extent = [max[0] - min[0], max[1] - min[1], max[2] - min[2]];
    let diag = (extent[0].powi(2) + extent[1].powi(2) + extent[2].powi(2)).sqrt().max(1.0);

    // Look from the front, slightly raised
    let distance = diag * 1.2;
    let eye = [center[0], center[1] + distance * 0.3, center[2] + distance];
    Some((eye, center))
}

fn to_vec3(p: [f32; 3]) -> Vec3 {
    vec3(p[0], p[1], p[2])
}

fn srgba(color: Rgb, opacity: f32) -> Srgba {
    Srgba::new(color[0], color[1], color[2], (opacity.clamp(0.0, 1.0) * 255.0) as u8)
}

/// Sidecar summary written next to the PNG
fn summary_json(scene: &Scene, selection: &Selection) -> serde_json::Value {
    serde_json::json!({
        "generated": chrono::Local::now().to_rfc3339(),
        "selection": selection,
        "shows": scene.shows().len(),
        "users": scene.users().len(),
        "watched_connectors": scene.connectors_of(ConnectorKind::Watched).count(),
        "recommended_connectors": scene.connectors_of(ConnectorKind::Recommended).count(),
    })
}

fn summary_path(output: &Path) -> PathBuf {
    output.with_extension("json")
}

fn write_summary(output: &Path, summary: &serde_json::Value) {
    let path = summary_path(output);
    match serde_json::to_string_pretty(summary) {
        Ok(text) => {
            if let Err(e) = std::fs::write(&path, text) {
                warn!("Failed to write {}: {}", path.display(), e);
            }
        }
        Err(e) => warn!("Failed to encode snapshot summary: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, ShowRecord, UserRecord};
    use crate::recommend::RecommendationTable;
    use crate::scene::Palette;
    use crate::selection::SelectionController;

    #[test]
    fn test_summary_counts() {
        let data = Dataset {
            shows: vec![ShowRecord { name: "S".into(), x: 0.0, y: 0.0, z: 0.0 }],
            users: vec![UserRecord { id: "u".into(), name: "U".into(), x: 1.0, y: 0.0, z: 0.0 }],
            ratings: [("u".to_string(), vec![0])].into_iter().collect(),
        };
        let mut ctl = SelectionController::new(&data, RecommendationTable::default());
        ctl.select_user(Some("u"));

        let summary = summary_json(ctl.scene(), ctl.selection());
        assert_eq!(summary["watched_connectors"], 1);
        assert_eq!(summary["recommended_connectors"], 0);
        assert_eq!(summary["selection"]["state"], "selected");
        assert_eq!(summary["selection"]["user"], "u");
        assert!(summary["generated"].is_string());
    }

    #[test]
    fn test_fitted_view_centers_scene() {
        let data = Dataset {
            shows: vec![
                ShowRecord { name: "A".into(), x: -10.0, y: 0.0, z: 0.0 },
                ShowRecord { name: "B".into(), x: 10.0, y: 4.0, z: 2.0 },
            ],
            users: vec![],
            ratings: Default::default(),
        };
        let (eye, target) = fitted_view(&Scene::from_dataset(&data)).unwrap();
        assert_eq!(target, [0.0, 2.0, 1.0]);
        assert!(eye[2] > target[2]);
        assert!(fitted_view(&Scene::default()).is_none());
    }

    #[test]
    fn test_connector_material_blends() {
        let material = connector_material();
        assert!(material.is_transparent);
        assert_eq!(material.render_states.blend, Blend::TRANSPARENCY);
        assert_eq!(material.render_states.write_mask, WriteMask::COLOR);

        let style = Palette::default().line(ConnectorKind::Watched);
        assert_eq!(srgba(style.color, style.opacity).a, 153);
    }

    #[test]
    fn test_summary_path() {
        assert_eq!(summary_path(Path::new("out/user.png")), PathBuf::from("out/user.json"));
    }
}
