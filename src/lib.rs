//! HexaView - a multi-viewport 3D model inspector.
//!
//! One loaded asset is rendered simultaneously into an interactive orbit
//! viewport and six fixed-angle canonical viewports, all driven from one
//! decoded scene graph. Each viewport owns an independently normalized
//! scene instance and an auto-fitted camera.

pub mod app;
pub mod bounds;
pub mod camera;
pub mod gpu;
pub mod loader;
pub mod materials;
pub mod scene;
pub mod session;
pub mod viewport;

pub use bounds::{fit, Aabb, CameraFrame};
pub use camera::Camera3D;
pub use loader::{AssetLoader, AssetSource, LoadError, LoadEvent};
pub use materials::{normalize, DisplayState, NormalizeSettings};
pub use scene::{MaterialData, MeshData, SceneGraph, SceneNode};
pub use session::{ViewerController, ViewerSession};
pub use viewport::{DrawRequest, ViewportId, ViewportOrchestrator};
