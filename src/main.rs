//! Application entry point.

use hexaview::app::InspectorApp;

fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title("HexaView 3D"),
        depth_buffer: 32,
        ..Default::default()
    };

    eframe::run_native(
        "HexaView 3D",
        options,
        Box::new(|cc| Ok(Box::new(InspectorApp::new(cc)))),
    )
}
