//! wgpu render boundary: pipelines, buffer ownership, and the egui paint
//! callback the application shell hands each viewport's draw request to.

pub mod viewport_callback;
pub mod viewport_rendering;

pub use viewport_callback::ViewportPaintCallback;
pub use viewport_rendering::{ViewportRenderer, DEPTH_FORMAT};
