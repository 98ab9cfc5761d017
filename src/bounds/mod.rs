//! Axis-aligned bounds and camera fitting.
//!
//! `fit` is the piece that makes seven differently-oriented cameras all
//! frame the same model: given the model's bounding volume it derives a
//! camera distance along an arbitrary view direction so the volume fills
//! the viewport under a configurable margin, and clipping planes scaled to
//! the volume so nothing is clipped whether the asset was authored in
//! millimeters or kilometers.

use glam::Vec3;

use crate::scene::SceneGraph;

/// Extra clip-plane slack, in bounding-sphere radii.
const CLIP_SAFETY: f32 = 2.0;

/// Axis-aligned bounding box. Transient; computed per fit invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    pub fn include(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Radius of the bounding sphere enclosing the box.
    pub fn radius(&self) -> f32 {
        self.size().length() * 0.5
    }

    /// Tightest box around all mesh geometry in the graph, post
    /// local-transform accumulation. `None` when the graph has no vertices.
    pub fn of_scene(graph: &SceneGraph) -> Option<Self> {
        let mut aabb: Option<Aabb> = None;
        graph.visit_meshes(|mesh, world| {
            for p in &mesh.positions {
                let wp = world.transform_point3(*p);
                match &mut aabb {
                    Some(b) => b.include(wp),
                    None => aabb = Some(Aabb::from_point(wp)),
                }
            }
        });
        aabb
    }
}

/// Camera parameters derived by [`fit`]; consumed immediately by the
/// viewport orchestrator, never retained across model changes.
#[derive(Debug, Clone, Copy)]
pub struct CameraFrame {
    pub position: Vec3,
    pub target: Vec3,
    pub near: f32,
    pub far: f32,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Bounding-sphere radius the frame was fitted to. Carried so cameras
    /// can keep their clip planes tracking the model as the user zooms.
    pub radius: f32,
}

/// Clip planes for a camera `distance` away from a model of bounding
/// `radius`, with [`CLIP_SAFETY`] slack. Near falls back to a fraction of
/// the distance when the camera sits inside the safety band.
pub fn clip_planes(distance: f32, radius: f32) -> (f32, f32) {
    let near = (distance - radius * CLIP_SAFETY).max(distance * 1e-3);
    let far = distance + radius * CLIP_SAFETY;
    (near, far)
}

/// Place a camera along `view_direction` (unit vector from target towards
/// the camera) so the bounding volume fills `(1 - margin)` of the limiting
/// field of view. The model is assumed re-centered so the volume's center
/// sits at the world origin; the fitted camera always targets the origin.
///
/// Larger margins zoom out, leaving more empty border. `fov_y` is the
/// vertical field of view in radians.
pub fn fit(aabb: &Aabb, view_direction: Vec3, fov_y: f32, aspect: f32, margin: f32) -> CameraFrame {
    let radius = aabb.radius().max(f32::EPSILON);
    let margin = margin.clamp(0.0, 0.95);

    // The narrower angular extent limits how close the camera can sit.
    let half_y = fov_y * 0.5;
    let half_x = (half_y.tan() * aspect).atan();
    let half_limit = half_y.min(half_x);

    // Sphere subtends asin(r/d); solve for the distance where that equals
    // the margin-reduced half angle.
    let wanted = (half_limit * (1.0 - margin)).max(1e-3);
    let distance = radius / wanted.sin().min(0.999);

    let dir = view_direction.normalize_or_zero();
    let dir = if dir == Vec3::ZERO { Vec3::Z } else { dir };
    let position = dir * distance;

    // Clip planes scale with the volume so framing is uniform across asset
    // scales.
    let (near, far) = clip_planes(distance, radius);

    CameraFrame {
        position,
        target: Vec3::ZERO,
        near,
        far,
        fov: fov_y,
        radius,
    }
}
