//! Viewport registry and render orchestration.
//!
//! Seven viewports are a fixed, known-ahead-of-time set: one orbit-controlled
//! interactive view plus six canonical fixed views. Each slot owns its own
//! camera and its own normalized scene instance; the orchestrator rebuilds
//! those instances on model or display-state change and emits one draw
//! request per bound viewport each frame. Binding and unbinding a render
//! target is the only externally-triggered slot transition; an unbound
//! viewport is skipped, not destroyed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::{Mat3, Mat4, Vec2, Vec3};

use crate::bounds::{fit, Aabb};
use crate::camera::Camera3D;
use crate::materials::{normalize, DisplayState};
use crate::scene::SceneGraph;

/// Auto-rotate rate for the interactive view, radians per second
/// (about two turns per minute).
pub const AUTO_SPIN_RATE: f32 = 0.21;

/// Fractional empty border around the model. The interactive view keeps a
/// looser fit (room to orbit) than the fixed views.
pub const ORBIT_MARGIN: f32 = 0.5;
pub const FIXED_MARGIN: f32 = 0.35;

const ORBIT_FOV_DEGREES: f32 = 45.0;
const FIXED_FOV_DEGREES: f32 = 35.0;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Logical view identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewportId {
    Main,
    Front,
    Back,
    Left,
    Right,
    Top,
    Bottom,
}

impl ViewportId {
    pub const ALL: [ViewportId; 7] = [
        ViewportId::Main,
        ViewportId::Front,
        ViewportId::Back,
        ViewportId::Left,
        ViewportId::Right,
        ViewportId::Top,
        ViewportId::Bottom,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|id| *id == self).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraKind {
    Orbit,
    Fixed,
}

/// Static per-viewport configuration.
#[derive(Debug, Clone, Copy)]
pub struct ViewportDescriptor {
    pub id: ViewportId,
    pub label: &'static str,
    pub camera_kind: CameraKind,
    /// Unit vector from the origin towards the camera. `None` for the
    /// orbit view, whose direction is wherever the user left it.
    pub fixed_direction: Option<Vec3>,
    pub fov_degrees: f32,
    pub margin: f32,
}

/// The static seven-viewport set: one orbit view plus the six canonical
/// directions, all fixed views looking at the world origin.
pub fn descriptors() -> [ViewportDescriptor; 7] {
    let fixed = |id, label, direction: Vec3| ViewportDescriptor {
        id,
        label,
        camera_kind: CameraKind::Fixed,
        fixed_direction: Some(direction),
        fov_degrees: FIXED_FOV_DEGREES,
        margin: FIXED_MARGIN,
    };
    [
        ViewportDescriptor {
            id: ViewportId::Main,
            label: "Interactive Inspection",
            camera_kind: CameraKind::Orbit,
            fixed_direction: None,
            fov_degrees: ORBIT_FOV_DEGREES,
            margin: ORBIT_MARGIN,
        },
        fixed(ViewportId::Front, "Front View", Vec3::Z),
        fixed(ViewportId::Back, "Back View", Vec3::NEG_Z),
        fixed(ViewportId::Left, "Left View", Vec3::NEG_X),
        fixed(ViewportId::Right, "Right View", Vec3::X),
        fixed(ViewportId::Top, "Top View", Vec3::Y),
        fixed(ViewportId::Bottom, "Bottom View", Vec3::NEG_Y),
    ]
}

/// Up vector that stays non-parallel to the view direction.
fn up_for_direction(direction: Vec3) -> Vec3 {
    if direction.y.abs() > 0.9 {
        // Looking straight down or up: use Z so the view keeps a stable roll.
        Vec3::new(0.0, 0.0, -direction.y.signum())
    } else {
        Vec3::Y
    }
}

/// Fixed light presets supplied alongside each draw; not user-configurable.
#[derive(Debug, Clone, Copy)]
pub struct LightRig {
    pub ambient: f32,
    pub directional_direction: Vec3,
    pub directional_intensity: f32,
    pub point_position: Vec3,
    pub point_intensity: f32,
}

impl LightRig {
    pub fn orbit_preset() -> Self {
        Self {
            ambient: 0.45,
            directional_direction: Vec3::new(10.0, 10.0, 5.0).normalize(),
            directional_intensity: 0.9,
            point_position: Vec3::new(0.0, 10.0, 0.0),
            point_intensity: 0.5,
        }
    }

    pub fn fixed_preset() -> Self {
        Self {
            ambient: 0.55,
            directional_direction: Vec3::new(10.0, 10.0, 10.0).normalize(),
            directional_intensity: 0.7,
            point_position: Vec3::new(10.0, 10.0, 10.0),
            point_intensity: 0.4,
        }
    }
}

/// One mesh flattened to recentered world space, ready for GPU upload.
#[derive(Debug, Clone)]
pub struct RenderMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub wireframe: bool,
}

/// A viewport's normalized scene instance. The id keys GPU buffer
/// ownership: a new instance supersedes the old one's uploads.
#[derive(Debug, Clone)]
pub struct StagedScene {
    pub instance_id: u64,
    pub meshes: Arc<Vec<RenderMesh>>,
}

/// Flatten a normalized graph to recentered world space, baking node
/// transforms and the `-center` offset into the vertex data so the
/// bounding-volume center lands on the world origin.
fn flatten(graph: &SceneGraph, offset: Vec3) -> Vec<RenderMesh> {
    let mut out = Vec::new();
    graph.visit_meshes(|mesh, world| {
        let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
        out.push(RenderMesh {
            positions: mesh
                .positions
                .iter()
                .map(|p| world.transform_point3(*p) + offset)
                .collect(),
            normals: mesh
                .normals
                .iter()
                .map(|n| (normal_matrix * *n).normalize_or_zero())
                .collect(),
            uvs: mesh.uvs.clone(),
            indices: mesh.indices.clone(),
            base_color: mesh.material.base_color,
            metallic: mesh.material.metallic,
            roughness: mesh.material.roughness,
            wireframe: mesh.material.wireframe,
        });
    });
    out
}

/// Everything the render boundary needs for one viewport draw.
#[derive(Debug, Clone)]
pub struct DrawRequest {
    pub viewport: ViewportId,
    pub epoch: u64,
    pub scene: StagedScene,
    pub view_projection: Mat4,
    pub camera_position: Vec3,
    pub lights: LightRig,
    pub show_grid: bool,
    pub show_axes: bool,
    /// Half-extent for the grid / axes overlays, scaled to the model.
    pub overlay_extent: f32,
}

/// Per-viewport state: descriptor, camera, staged instance, target binding.
struct ViewportSlot {
    descriptor: ViewportDescriptor,
    camera: Camera3D,
    staged: Option<StagedScene>,
    /// Centered bounding volume of the staged instance; kept for refits
    /// when the viewport aspect changes.
    aabb: Option<Aabb>,
    bound: bool,
}

impl ViewportSlot {
    fn new(descriptor: ViewportDescriptor) -> Self {
        let mut camera = Camera3D::default();
        camera.fov = descriptor.fov_degrees.to_radians();
        if let Some(direction) = descriptor.fixed_direction {
            camera.position = direction * camera.distance();
            camera.up = up_for_direction(direction);
        }
        Self {
            descriptor,
            camera,
            staged: None,
            aabb: None,
            bound: false,
        }
    }

    fn fit_direction(&self) -> Vec3 {
        self.descriptor
            .fixed_direction
            .unwrap_or_else(|| self.camera.view_direction())
    }

    fn refit(&mut self) {
        if let Some(aabb) = self.aabb {
            let frame = fit(
                &aabb,
                self.fit_direction(),
                self.descriptor.fov_degrees.to_radians(),
                self.camera.aspect,
                self.descriptor.margin,
            );
            self.camera.apply_frame(&frame);
        }
    }
}

/// Owns the seven viewport slots and drives per-frame render dispatch.
pub struct ViewportOrchestrator {
    slots: Vec<ViewportSlot>,
    epoch: u64,
}

impl Default for ViewportOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportOrchestrator {
    pub fn new() -> Self {
        Self {
            slots: descriptors().into_iter().map(ViewportSlot::new).collect(),
            epoch: 0,
        }
    }

    fn slot(&self, id: ViewportId) -> &ViewportSlot {
        &self.slots[id.index()]
    }

    fn slot_mut(&mut self, id: ViewportId) -> &mut ViewportSlot {
        &mut self.slots[id.index()]
    }

    /// Derive every viewport's scene instance and camera frame from the
    /// pristine graph. Called on asset load and on wireframe toggle, never
    /// per frame. Previous instances are dropped here; their GPU buffers
    /// are released by the renderer when it sees the new epoch.
    pub fn rebuild(&mut self, pristine: &SceneGraph, display: &DisplayState) {
        self.epoch += 1;
        log::debug!(
            "rebuilding viewport instances for {} (epoch {})",
            pristine.label,
            self.epoch
        );
        for slot in &mut self.slots {
            let instance = normalize(pristine, display);
            let Some(aabb) = Aabb::of_scene(&instance) else {
                slot.staged = None;
                slot.aabb = None;
                continue;
            };

            let offset = -aabb.center();
            let centered = Aabb {
                min: aabb.min + offset,
                max: aabb.max + offset,
            };
            slot.staged = Some(StagedScene {
                instance_id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
                meshes: Arc::new(flatten(&instance, offset)),
            });
            slot.aabb = Some(centered);
            slot.refit();
        }
    }

    /// Mark every render target unbound; panels re-bind as they mount
    /// during the frame.
    pub fn begin_frame(&mut self) {
        for slot in &mut self.slots {
            slot.bound = false;
        }
    }

    /// Bind a viewport's render target for this frame and update its
    /// aspect ratio. An aspect change refits the camera so the model keeps
    /// filling the frame.
    pub fn bind_target(&mut self, id: ViewportId, aspect: f32) {
        let slot = self.slot_mut(id);
        slot.bound = true;
        if (slot.camera.aspect - aspect).abs() > 1e-3 {
            slot.camera.set_aspect(aspect);
            slot.refit();
        }
    }

    pub fn is_bound(&self, id: ViewportId) -> bool {
        self.slot(id).bound
    }

    /// Interactive camera, for orbit/pan/zoom input between fits.
    pub fn orbit_camera_mut(&mut self) -> &mut Camera3D {
        &mut self.slot_mut(ViewportId::Main).camera
    }

    pub fn camera(&self, id: ViewportId) -> &Camera3D {
        &self.slot(id).camera
    }

    /// Advance per-frame animation: the constant azimuth increment of
    /// auto-rotate on the interactive view.
    pub fn frame_tick(&mut self, dt: f32, auto_rotate: bool) {
        if auto_rotate {
            self.slot_mut(ViewportId::Main)
                .camera
                .rotate_azimuth(AUTO_SPIN_RATE * dt);
        }
    }

    /// One draw request per bound viewport with a staged scene, in fixed
    /// order (interactive view first, then the six canonical views). The
    /// ground grid only ever renders in the interactive view; fixed views
    /// carry the orientation-axes marker instead.
    pub fn draw_requests(&self, grid_visible: bool) -> Vec<DrawRequest> {
        let mut requests = Vec::new();
        for slot in &self.slots {
            if !slot.bound {
                continue;
            }
            let Some(scene) = &slot.staged else { continue };
            let Some(aabb) = &slot.aabb else { continue };

            let orbit = slot.descriptor.camera_kind == CameraKind::Orbit;
            requests.push(DrawRequest {
                viewport: slot.descriptor.id,
                epoch: self.epoch,
                scene: scene.clone(),
                view_projection: slot.camera.build_view_projection_matrix(),
                camera_position: slot.camera.position,
                lights: if orbit {
                    LightRig::orbit_preset()
                } else {
                    LightRig::fixed_preset()
                },
                show_grid: orbit && grid_visible,
                show_axes: !orbit,
                overlay_extent: aabb.radius() * 2.0,
            });
        }
        requests
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MeshData, SceneNode};
    use glam::Mat4;

    fn loaded_orchestrator(graph: &SceneGraph) -> ViewportOrchestrator {
        let mut orchestrator = ViewportOrchestrator::new();
        orchestrator.rebuild(graph, &DisplayState::default());
        orchestrator.begin_frame();
        for id in ViewportId::ALL {
            orchestrator.bind_target(id, 1.0);
        }
        orchestrator
    }

    fn staged_center(request: &DrawRequest) -> Vec3 {
        let mut aabb: Option<Aabb> = None;
        for mesh in request.scene.meshes.iter() {
            for p in &mesh.positions {
                match &mut aabb {
                    Some(b) => b.include(*p),
                    None => aabb = Some(Aabb::from_point(*p)),
                }
            }
        }
        aabb.expect("staged scene has geometry").center()
    }

    #[test]
    fn test_exactly_one_orbit_viewport() {
        let set = descriptors();
        assert_eq!(set.len(), 7);
        let orbit_count = set
            .iter()
            .filter(|d| d.camera_kind == CameraKind::Orbit)
            .count();
        assert_eq!(orbit_count, 1);
        for d in set.iter().filter(|d| d.camera_kind == CameraKind::Fixed) {
            let direction = d.fixed_direction.expect("fixed views have a direction");
            assert!((direction.length() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_cube_framed_in_all_seven_viewports() {
        let graph = SceneGraph::unit_cube("cube.glb");
        let orchestrator = loaded_orchestrator(&graph);

        let requests = orchestrator.draw_requests(true);
        assert_eq!(requests.len(), 7);

        let radius = Aabb::of_scene(&graph).unwrap().radius();
        for id in ViewportId::ALL {
            let camera = orchestrator.camera(id);
            assert_eq!(camera.target, Vec3::ZERO, "{id:?} looks at the origin");
            assert!(
                camera.distance() > radius,
                "{id:?} camera sits outside the model"
            );
            assert!(camera.near > 0.0 && camera.far > camera.distance());
        }
    }

    #[test]
    fn test_top_view_camera_has_positive_y() {
        let graph = SceneGraph::unit_cube("cube.glb");
        let orchestrator = loaded_orchestrator(&graph);
        let camera = orchestrator.camera(ViewportId::Top);
        assert!(camera.position.y > 0.0);
        assert!(camera.position.x.abs() < 1e-5);
        assert!(camera.position.z.abs() < 1e-5);
        assert_eq!(camera.target, Vec3::ZERO);
    }

    #[test]
    fn test_recentering_is_camera_independent() {
        // Model authored far from the origin: every viewport's staged
        // instance must still be centered on the world origin.
        let mut root = SceneNode::new("root");
        root.transform = Mat4::from_translation(Vec3::new(250.0, -40.0, 13.0));
        root.meshes.push(MeshData::unit_cube());
        let graph = SceneGraph::new("offset.glb", root);

        let orchestrator = loaded_orchestrator(&graph);
        for request in orchestrator.draw_requests(false) {
            assert!(
                staged_center(&request).length() < 1e-3,
                "{:?} instance not recentered",
                request.viewport
            );
        }
    }

    #[test]
    fn test_orbit_view_fits_looser_than_fixed_views() {
        let graph = SceneGraph::unit_cube("cube.glb");
        let orchestrator = loaded_orchestrator(&graph);
        // Compare against a fixed view with the same field of view by
        // refitting main's margin only; distances scale with margin, so the
        // looser orbit margin must sit at least as far out relative to its
        // own tight fit.
        let aabb = Aabb::of_scene(&graph).unwrap();
        let direction = orchestrator.camera(ViewportId::Main).view_direction();
        let fov = orchestrator.camera(ViewportId::Main).fov;
        let loose = fit(&aabb, direction, fov, 1.0, ORBIT_MARGIN);
        let tight = fit(&aabb, direction, fov, 1.0, FIXED_MARGIN);
        assert!(loose.position.length() > tight.position.length());
    }

    #[test]
    fn test_unbound_viewports_are_skipped_not_destroyed() {
        let graph = SceneGraph::unit_cube("cube.glb");
        let mut orchestrator = loaded_orchestrator(&graph);

        orchestrator.begin_frame();
        orchestrator.bind_target(ViewportId::Main, 1.0);
        let requests = orchestrator.draw_requests(false);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].viewport, ViewportId::Main);

        // Rebinding resumes rendering without a rebuild.
        orchestrator.begin_frame();
        for id in ViewportId::ALL {
            orchestrator.bind_target(id, 1.0);
        }
        assert_eq!(orchestrator.draw_requests(false).len(), 7);
    }

    #[test]
    fn test_grid_only_in_orbit_view_axes_only_in_fixed_views() {
        let graph = SceneGraph::unit_cube("cube.glb");
        let orchestrator = loaded_orchestrator(&graph);
        for request in orchestrator.draw_requests(true) {
            if request.viewport == ViewportId::Main {
                assert!(request.show_grid);
                assert!(!request.show_axes);
            } else {
                assert!(!request.show_grid);
                assert!(request.show_axes);
            }
        }
        for request in orchestrator.draw_requests(false) {
            assert!(!request.show_grid);
        }
    }

    #[test]
    fn test_auto_rotate_advances_azimuth_only() {
        let graph = SceneGraph::unit_cube("cube.glb");
        let mut orchestrator = loaded_orchestrator(&graph);

        let before = orchestrator.camera(ViewportId::Main).position;
        let distance = orchestrator.camera(ViewportId::Main).distance();

        orchestrator.frame_tick(0.5, false);
        assert_eq!(orchestrator.camera(ViewportId::Main).position, before);

        orchestrator.frame_tick(0.5, true);
        let after = orchestrator.camera(ViewportId::Main).position;
        assert_ne!(after, before);
        assert!((after.y - before.y).abs() < 1e-5, "elevation unchanged");
        assert!(
            (orchestrator.camera(ViewportId::Main).distance() - distance).abs() < 1e-4,
            "radius unchanged"
        );

        // Fixed views never auto-rotate.
        let front = orchestrator.camera(ViewportId::Front).position;
        orchestrator.frame_tick(1.0, true);
        assert_eq!(orchestrator.camera(ViewportId::Front).position, front);
    }

    #[test]
    fn test_aspect_change_refits_fixed_camera() {
        let graph = SceneGraph::unit_cube("cube.glb");
        let mut orchestrator = loaded_orchestrator(&graph);

        let wide = orchestrator.camera(ViewportId::Front).distance();
        orchestrator.begin_frame();
        orchestrator.bind_target(ViewportId::Front, 0.4);
        let narrow = orchestrator.camera(ViewportId::Front).distance();
        assert!(narrow > wide, "narrower viewport must zoom out");
    }

    #[test]
    fn test_wireframe_rebuild_flags_every_instance() {
        let graph = SceneGraph::unit_cube("cube.glb");
        let mut orchestrator = loaded_orchestrator(&graph);
        let epoch = orchestrator.current_epoch();

        orchestrator.rebuild(&graph, &DisplayState { wireframe: true });
        assert_eq!(orchestrator.current_epoch(), epoch + 1);

        for request in orchestrator.draw_requests(false) {
            for mesh in request.scene.meshes.iter() {
                assert!(mesh.wireframe);
            }
        }
    }
}
