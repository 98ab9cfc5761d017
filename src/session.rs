//! Viewer session state and the controller that mutates it.
//!
//! All mutation flows through [`ViewerController`] on the UI event stream:
//! toolbar toggles flip one session field each, uploads go through the
//! loader, and completed decodes are committed from [`pump`] once per
//! frame. Every failure path leaves the last-known-good model displayed.

use std::sync::Arc;

use crate::loader::{AssetLoader, AssetSource, LoadEvent};
use crate::materials::DisplayState;
use crate::scene::SceneGraph;
use crate::viewport::ViewportOrchestrator;

/// Single-instance session state, lifetime = the running session.
#[derive(Debug, Clone, Default)]
pub struct ViewerSession {
    pub loaded: Option<Arc<SceneGraph>>,
    pub asset_label: Option<String>,
    pub wireframe: bool,
    pub auto_rotate: bool,
    pub grid_visible: bool,
    pub drag_in_progress: bool,
}

impl ViewerSession {
    pub fn new() -> Self {
        Self {
            grid_visible: true,
            ..Default::default()
        }
    }
}

/// Owns the session, the asset loader, and the viewport orchestrator.
pub struct ViewerController {
    pub session: ViewerSession,
    pub viewports: ViewportOrchestrator,
    loader: AssetLoader,
    status: Option<String>,
}

impl Default for ViewerController {
    fn default() -> Self {
        Self::with_loader(AssetLoader::new())
    }
}

impl ViewerController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct with a preconfigured loader. Test seam.
    pub fn with_loader(loader: AssetLoader) -> Self {
        Self {
            session: ViewerSession::new(),
            viewports: ViewportOrchestrator::new(),
            loader,
            status: None,
        }
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            wireframe: self.session.wireframe,
        }
    }

    /// Start loading an uploaded or dropped file. Unsupported extensions
    /// surface as a status message; the session is left untouched.
    pub fn upload(&mut self, source: AssetSource) {
        self.status = None;
        if let Err(error) = self.loader.request(source) {
            log::warn!("upload rejected: {error}");
            self.status = Some(format!("Please upload a valid .glb or .gltf file ({error})"));
        }
    }

    /// Commit completed loads. Returns true when the displayed model
    /// changed. Stale results were already discarded by the loader.
    pub fn pump(&mut self) -> bool {
        match self.loader.poll() {
            Some(LoadEvent::Loaded { graph }) => {
                self.session.asset_label = Some(graph.label.clone());
                self.session.loaded = Some(graph);
                self.rebuild();
                true
            }
            Some(LoadEvent::Failed { label, error }) => {
                // Previously loaded model stays displayed unchanged.
                self.status = Some(format!("Could not load {label}: {error}"));
                false
            }
            None => false,
        }
    }

    pub fn toggle_wireframe(&mut self) {
        self.session.wireframe = !self.session.wireframe;
        self.rebuild();
    }

    pub fn toggle_auto_rotate(&mut self) {
        self.session.auto_rotate = !self.session.auto_rotate;
    }

    pub fn toggle_grid(&mut self) {
        self.session.grid_visible = !self.session.grid_visible;
    }

    fn rebuild(&mut self) {
        let display = self.display_state();
        if let Some(graph) = &self.session.loaded {
            self.viewports.rebuild(graph, &display);
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    pub fn has_model(&self) -> bool {
        self.session.loaded.is_some()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadError;
    use crate::viewport::{DrawRequest, ViewportId};
    use std::thread;
    use std::time::{Duration, Instant};

    fn cube_decoder(source: &AssetSource) -> Result<SceneGraph, LoadError> {
        Ok(SceneGraph::unit_cube(&source.name))
    }

    fn slow_first_decoder(source: &AssetSource) -> Result<SceneGraph, LoadError> {
        if source.name.starts_with('a') {
            thread::sleep(Duration::from_millis(150));
        }
        Ok(SceneGraph::unit_cube(&source.name))
    }

    fn dark_cube_decoder(source: &AssetSource) -> Result<SceneGraph, LoadError> {
        let mut graph = SceneGraph::unit_cube(&source.name);
        graph.visit_materials_mut(|m| {
            m.base_color = [0.02, 0.02, 0.02, 1.0];
            m.metallic = 0.9;
            m.roughness = 0.1;
        });
        Ok(graph)
    }

    fn controller(decoder: fn(&AssetSource) -> Result<SceneGraph, LoadError>) -> ViewerController {
        ViewerController::with_loader(AssetLoader::with_decoder(decoder))
    }

    fn pump_until_change(controller: &mut ViewerController) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if controller.pump() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn main_view_requests(controller: &mut ViewerController) -> Vec<DrawRequest> {
        controller.viewports.begin_frame();
        controller.viewports.bind_target(ViewportId::Main, 1.0);
        controller
            .viewports
            .draw_requests(controller.session.grid_visible)
    }

    #[test]
    fn test_unsupported_upload_leaves_session_unset() {
        let mut controller = controller(cube_decoder);
        controller.upload(AssetSource::new("model.txt", vec![1, 2, 3]));

        assert!(controller.session.loaded.is_none());
        assert!(controller.session.asset_label.is_none());
        assert!(controller.status().is_some());
        assert!(!controller.is_loading());
    }

    #[test]
    fn test_successful_upload_commits_session() {
        let mut controller = controller(cube_decoder);
        controller.upload(AssetSource::new("cube.glb", vec![0]));
        assert!(pump_until_change(&mut controller));
        assert_eq!(controller.session.asset_label.as_deref(), Some("cube.glb"));
        assert!(controller.has_model());
        assert!(controller.status().is_none());
    }

    #[test]
    fn test_decode_failure_keeps_previous_model() {
        fn flaky(source: &AssetSource) -> Result<SceneGraph, LoadError> {
            if source.name.starts_with("bad") {
                Err(LoadError::Decode("corrupt chunk".into()))
            } else {
                Ok(SceneGraph::unit_cube(&source.name))
            }
        }

        let mut controller = controller(flaky);
        controller.upload(AssetSource::new("good.glb", vec![0]));
        assert!(pump_until_change(&mut controller));

        controller.upload(AssetSource::new("bad.glb", vec![0]));
        assert!(!pump_until_change(&mut controller));
        assert_eq!(controller.session.asset_label.as_deref(), Some("good.glb"));
        assert!(controller.status().unwrap().contains("bad.glb"));
    }

    #[test]
    fn test_rapid_reupload_displays_second_model_once() {
        let mut controller = controller(slow_first_decoder);
        controller.upload(AssetSource::new("a.glb", vec![0]));
        controller.upload(AssetSource::new("b.glb", vec![0]));

        assert!(pump_until_change(&mut controller));
        assert_eq!(controller.session.asset_label.as_deref(), Some("b.glb"));

        // The superseded first decode must never flicker in afterwards.
        thread::sleep(Duration::from_millis(250));
        assert!(!controller.pump());
        assert_eq!(controller.session.asset_label.as_deref(), Some("b.glb"));
    }

    #[test]
    fn test_wireframe_round_trip_restores_render_state() {
        let mut controller = controller(dark_cube_decoder);
        controller.upload(AssetSource::new("dark.glb", vec![0]));
        assert!(pump_until_change(&mut controller));

        let before: Vec<_> = main_view_requests(&mut controller)
            .iter()
            .flat_map(|r| {
                r.scene
                    .meshes
                    .iter()
                    .map(|m| (m.base_color, m.metallic, m.roughness, m.wireframe))
                    .collect::<Vec<_>>()
            })
            .collect();

        controller.toggle_wireframe();
        assert!(controller.session.wireframe);
        controller.toggle_wireframe();
        assert!(!controller.session.wireframe);

        let after: Vec<_> = main_view_requests(&mut controller)
            .iter()
            .flat_map(|r| {
                r.scene
                    .meshes
                    .iter()
                    .map(|m| (m.base_color, m.metallic, m.roughness, m.wireframe))
                    .collect::<Vec<_>>()
            })
            .collect();

        assert_eq!(before, after);
    }

    #[test]
    fn test_grid_and_auto_rotate_do_not_rebuild_instances() {
        let mut controller = controller(cube_decoder);
        controller.upload(AssetSource::new("cube.glb", vec![0]));
        assert!(pump_until_change(&mut controller));

        let epoch = controller.viewports.current_epoch();
        controller.toggle_grid();
        controller.toggle_auto_rotate();
        assert_eq!(controller.viewports.current_epoch(), epoch);
        assert!(!controller.session.grid_visible);
        assert!(controller.session.auto_rotate);
    }
}
