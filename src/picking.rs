//! Orbit projection and marker picking for the plot-based viewer

use crate::scene::Scene;

/// Rotates the scene around a target point, then drops depth
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitProjection {
    pub yaw: f32,
    pub pitch: f32,
    pub target: [f32; 3],
}

impl OrbitProjection {
    pub fn new(target: [f32; 3]) -> Self {
        Self { yaw: 0.0, pitch: 0.0, target }
    }

    /// Plot coordinates plus view depth (larger = closer to the viewer)
    pub fn project_with_depth(&self, p: [f32; 3]) -> ([f64; 2], f32) {
        let (sin_x, cos_x) = self.pitch.sin_cos();
        let (sin_y, cos_y) = self.yaw.sin_cos();

        let rel = [p[0] - self.target[0], p[1] - self.target[1], p[2] - self.target[2]];

        // Yaw around Y
        let x1 = rel[0] * cos_y + rel[2] * sin_y;
        let z1 = -rel[0] * sin_y + rel[2] * cos_y;

        // Pitch around X
        let y1 = rel[1] * cos_x - z1 * sin_x;
        let z2 = rel[1] * sin_x + z1 * cos_x;

        ([x1 as f64, y1 as f64], z2)
    }

    pub fn project(&self, p: [f32; 3]) -> [f64; 2] {
        self.project_with_depth(p).0
    }
}

/// What the pointer is over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    Show(usize),
    User(usize),
}

impl Pick {
    /// Tooltip text for the picked marker
    pub fn label<'a>(&self, scene: &'a Scene) -> Option<&'a str> {
        match *self {
            Pick::Show(index) => scene.show(index).map(|s| s.name.as_str()),
            Pick::User(slot) => scene.user(slot).map(|u| u.name.as_str()),
        }
    }
}

/// Marker nearest to `cursor` within `radius`
///
/// Distance ties go to the marker closest to the viewer.
pub fn pick(scene: &Scene, projection: &OrbitProjection, cursor: [f64; 2], radius: f64) -> Option<Pick> {
    let shows = scene
        .shows()
        .iter()
        .map(|s| (Pick::Show(s.index), s.position));
    let users = scene
        .users()
        .iter()
        .enumerate()
        .map(|(slot, u)| (Pick::User(slot), u.position));

    let mut best: Option<(Pick, f64, f32)> = None;
    for (candidate, position) in shows.chain(users) {
        let (p, depth) = projection.project_with_depth(position);
        let dist = ((p[0] - cursor[0]).powi(2) + (p[1] - cursor[1]).powi(2)).sqrt();
        if dist > radius {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, best_dist, best_depth)) => dist < best_dist || (dist == best_dist && depth > best_depth),
        };
        if better {
            best = Some((candidate, dist, depth));
        }
    }

    best.map(|(p, _, _)| p)
}
