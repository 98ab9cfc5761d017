//! Perspective camera with orbit-style navigation.
//!
//! The interactive viewport manipulates its camera directly between bounds
//! fits; fixed viewports only ever receive fitted frames.

use glam::{Mat4, Vec3};

use crate::bounds::{clip_planes, CameraFrame};

/// Perspective camera looking at a target point.
#[derive(Debug, Clone)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
    /// Bounding radius of the last fitted frame; zero until a fit happens.
    /// Zoom uses it to floor the distance and track the clip planes.
    pub scene_radius: f32,

    pub orbit_sensitivity: f32,
    pub pan_sensitivity: f32,
    pub zoom_sensitivity: f32,
}

impl Default for Camera3D {
    fn default() -> Self {
        Self {
            position: Vec3::new(5.0, 5.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 45.0_f32.to_radians(),
            near: 0.1,
            far: 100.0,
            aspect: 1.0,
            scene_radius: 0.0,
            orbit_sensitivity: 0.01,
            pan_sensitivity: 0.002,
            zoom_sensitivity: 0.1,
        }
    }
}

impl Camera3D {
    pub fn build_view_projection_matrix(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.position, self.target, self.up);
        let proj = Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far);
        proj * view
    }

    /// Adopt a fitted frame, keeping navigation sensitivities.
    pub fn apply_frame(&mut self, frame: &CameraFrame) {
        self.position = frame.position;
        self.target = frame.target;
        self.near = frame.near;
        self.far = frame.far;
        self.fov = frame.fov;
        self.scene_radius = frame.radius;
    }

    /// Unit vector from the target towards the camera. This is the view
    /// direction the bounds-fit engine preserves on refit.
    pub fn view_direction(&self) -> Vec3 {
        let offset = self.position - self.target;
        if offset.length_squared() < 1e-12 {
            Vec3::Z
        } else {
            offset.normalize()
        }
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).length()
    }

    /// Orbit around the target in spherical coordinates.
    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        let offset = self.position - self.target;
        let radius = offset.length();
        if radius < 1e-6 {
            return;
        }

        let mut theta = offset.z.atan2(offset.x);
        let mut phi = (offset.y / radius).acos();

        theta += delta_x * self.orbit_sensitivity;
        phi += delta_y * self.orbit_sensitivity;

        // Keep away from the poles to avoid gimbal lock.
        phi = phi.clamp(0.01, std::f32::consts::PI - 0.01);

        self.position = self.target
            + Vec3::new(
                radius * phi.sin() * theta.cos(),
                radius * phi.cos(),
                radius * phi.sin() * theta.sin(),
            );
    }

    /// Advance the azimuth by `radians` while keeping radius and elevation.
    /// Drives the auto-rotate mode, one constant increment per frame.
    pub fn rotate_azimuth(&mut self, radians: f32) {
        let offset = self.position - self.target;
        let radius = offset.length();
        if radius < 1e-6 {
            return;
        }
        let theta = offset.z.atan2(offset.x) + radians;
        let phi = (offset.y / radius).acos().clamp(0.01, std::f32::consts::PI - 0.01);
        self.position = self.target
            + Vec3::new(
                radius * phi.sin() * theta.cos(),
                radius * phi.cos(),
                radius * phi.sin() * theta.sin(),
            );
    }

    /// Move target and position together, scaled so a pixel of drag matches
    /// a pixel of on-screen movement at the target distance.
    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        let forward = (self.target - self.position).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward).normalize();

        let scale = self.distance() * self.pan_sensitivity;
        let pan_vector = right * (-delta_x * scale) + up * (delta_y * scale);

        self.position += pan_vector;
        self.target += pan_vector;
    }

    /// Move the camera along the view direction. Positive `delta` zooms in.
    /// The distance floor and the clip planes track the fitted bounding
    /// radius so the model stays visible at any zoom level.
    pub fn zoom(&mut self, delta: f32) {
        let direction = self.view_direction();
        let distance = self.distance();
        let floor = if self.scene_radius > 0.0 {
            self.scene_radius * 0.05
        } else {
            1e-3
        };
        let new_distance = (distance * (1.0 - delta * self.zoom_sensitivity)).max(floor);
        self.position = self.target + direction * new_distance;

        if self.scene_radius > 0.0 {
            let (near, far) = clip_planes(new_distance, self.scene_radius);
            self.near = near;
            self.far = far;
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orbit_preserves_radius() {
        let mut camera = Camera3D::default();
        let radius = camera.distance();
        camera.orbit(35.0, -12.0);
        assert!((camera.distance() - radius).abs() < 1e-4);
        assert_eq!(camera.target, Vec3::ZERO);
    }

    #[test]
    fn test_rotate_azimuth_keeps_elevation() {
        let mut camera = Camera3D::default();
        let y = camera.position.y;
        let radius = camera.distance();
        camera.rotate_azimuth(0.5);
        assert!((camera.position.y - y).abs() < 1e-4);
        assert!((camera.distance() - radius).abs() < 1e-4);
    }

    #[test]
    fn test_pan_moves_target_with_position() {
        let mut camera = Camera3D::default();
        let offset_before = camera.position - camera.target;
        camera.pan(40.0, -25.0);
        let offset_after = camera.position - camera.target;
        assert!((offset_before - offset_after).length() < 1e-4);
    }

    #[test]
    fn test_zoom_in_reduces_distance() {
        let mut camera = Camera3D::default();
        let before = camera.distance();
        camera.zoom(1.0);
        assert!(camera.distance() < before);
        // Zoom never crosses the target.
        for _ in 0..100 {
            camera.zoom(1.0);
        }
        assert!(camera.distance() > 0.0);
    }

    #[test]
    fn test_zoom_in_after_fit_moves_closer() {
        use crate::bounds::{fit, Aabb};
        use crate::scene::SceneGraph;

        let aabb = Aabb::of_scene(&SceneGraph::unit_cube("cube.glb")).unwrap();
        let mut camera = Camera3D::default();
        let frame = fit(&aabb, camera.view_direction(), camera.fov, 1.0, 0.5);
        camera.apply_frame(&frame);

        let before = camera.distance();
        camera.zoom(1.0);
        assert!(
            camera.distance() < before,
            "zoom in moved the camera away: {} >= {before}",
            camera.distance()
        );

        // Deep zoom stops short of the target and keeps a valid near plane.
        for _ in 0..200 {
            camera.zoom(1.0);
        }
        assert!(camera.distance() > 0.0);
        assert!(camera.near > 0.0);
        assert!(camera.far > camera.near);
    }

    #[test]
    fn test_clip_planes_follow_zoom_out() {
        use crate::bounds::{fit, Aabb};
        use crate::scene::SceneGraph;

        let aabb = Aabb::of_scene(&SceneGraph::unit_cube("cube.glb")).unwrap();
        let mut camera = Camera3D::default();
        let frame = fit(&aabb, camera.view_direction(), camera.fov, 1.0, 0.5);
        camera.apply_frame(&frame);

        for _ in 0..5 {
            camera.zoom(-1.0);
        }
        let distance = camera.distance();
        let radius = aabb.radius();
        assert!(
            camera.far >= distance + radius,
            "far plane clips the model: far={} distance={distance} radius={radius}",
            camera.far
        );
        assert!(camera.near <= distance - radius);
        assert!(camera.near > 0.0);
    }

    #[test]
    fn test_apply_frame_preserves_view_direction() {
        use crate::bounds::{fit, Aabb};
        use crate::scene::SceneGraph;

        let mut camera = Camera3D::default();
        camera.orbit(100.0, 40.0);
        let direction = camera.view_direction();

        let aabb = Aabb::of_scene(&SceneGraph::unit_cube("cube.glb")).unwrap();
        let frame = fit(&aabb, direction, camera.fov, camera.aspect, 0.5);
        camera.apply_frame(&frame);

        assert!((camera.view_direction() - direction).length() < 1e-4);
    }
}
