//! egui paint callback bridging viewport draw requests to the shared
//! wgpu renderer.

use std::sync::{Arc, Mutex};

use egui_wgpu::CallbackTrait;
use once_cell::sync::Lazy;

use super::viewport_rendering::ViewportRenderer;
use crate::viewport::DrawRequest;

// One renderer serves all seven viewports; they share one GPU context and
// draws are issued sequentially within the frame.
static SHARED_RENDERER: Lazy<Arc<Mutex<ViewportRenderer>>> =
    Lazy::new(|| Arc::new(Mutex::new(ViewportRenderer::new())));

/// Paint callback carrying one viewport's draw request for this frame.
pub struct ViewportPaintCallback {
    renderer: Arc<Mutex<ViewportRenderer>>,
    request: DrawRequest,
}

impl ViewportPaintCallback {
    pub fn new(request: DrawRequest) -> Self {
        Self {
            renderer: SHARED_RENDERER.clone(),
            request,
        }
    }
}

impl CallbackTrait for ViewportPaintCallback {
    fn prepare(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        _screen_descriptor: &egui_wgpu::ScreenDescriptor,
        _egui_encoder: &mut wgpu::CommandEncoder,
        _callback_resources: &mut egui_wgpu::CallbackResources,
    ) -> Vec<wgpu::CommandBuffer> {
        match self.renderer.lock() {
            Ok(mut renderer) => {
                renderer.initialize(device);
                renderer.prepare(device, queue, &self.request);
            }
            Err(e) => log::error!("viewport renderer lock poisoned in prepare: {e}"),
        }
        Vec::new()
    }

    fn paint(
        &self,
        _info: egui::PaintCallbackInfo,
        render_pass: &mut wgpu::RenderPass<'static>,
        _callback_resources: &egui_wgpu::CallbackResources,
    ) {
        match self.renderer.lock() {
            Ok(renderer) => {
                if renderer.is_initialized() {
                    renderer.paint(render_pass, &self.request);
                }
            }
            Err(e) => log::error!("viewport renderer lock poisoned in paint: {e}"),
        }
    }
}
